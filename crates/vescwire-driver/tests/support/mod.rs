//! Simulated controller for driver tests.
//!
//! Records every byte the driver writes, one byte at a time with a yield
//! in between, so two writers racing on the stream would interleave in the
//! log. Answers getter requests the way firmware does.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use vescwire_driver::DriverConfig;
use vescwire_frame::{frame, scan_frame, wire_size, FrameReader, Scan};
use vescwire_schema::{catalog, ids, pack, FieldSet, Message};
use vescwire_transport::{ByteStream, TransportError};

struct SimState {
    firmware: (u8, u8),
    rpm: i32,
    v_in: f64,
    size_left: i32,
    respond: bool,
    preamble: Vec<u8>,
    wire: Vec<u8>,
    inbox: FrameReader,
    outbox: VecDeque<u8>,
    closed: bool,
    broken: bool,
}

struct Shared {
    state: Mutex<SimState>,
    output: Condvar,
}

/// Device side of the stream; hand it to `Vesc::open`.
pub struct SimDevice {
    shared: Arc<Shared>,
}

/// Test-side view of the same device.
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Shared>,
}

pub fn device(major: u8, minor: u8) -> (SimDevice, SimHandle) {
    let shared = Arc::new(Shared {
        state: Mutex::new(SimState {
            firmware: (major, minor),
            rpm: 1200,
            v_in: 24.5,
            size_left: 512,
            respond: true,
            preamble: Vec::new(),
            wire: Vec::new(),
            inbox: FrameReader::new(),
            outbox: VecDeque::new(),
            closed: false,
            broken: false,
        }),
        output: Condvar::new(),
    });
    (
        SimDevice {
            shared: Arc::clone(&shared),
        },
        SimHandle { shared },
    )
}

/// Fast timings for tests; no heartbeat unless a test starts one.
pub fn quiet_config() -> DriverConfig {
    DriverConfig {
        heartbeat_interval: Duration::from_millis(10),
        response_timeout: Duration::from_millis(300),
        start_heartbeat: false,
        ..DriverConfig::default()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state lock")
    }
}

impl SimState {
    fn handle_request(&mut self, payload: &[u8]) {
        let Some(&id) = payload.first() else {
            return;
        };
        let response = match id {
            ids::FW_VERSION => Some(vec![ids::FW_VERSION, self.firmware.0, self.firmware.1]),
            ids::GET_VALUES => Some(self.snapshot()),
            ids::GPD_BUFFER_SIZE_LEFT => {
                let mut out = vec![ids::GPD_BUFFER_SIZE_LEFT];
                out.extend_from_slice(&self.size_left.to_be_bytes());
                Some(out)
            }
            _ => None,
        };
        if let (Some(response), true) = (response, self.respond) {
            let preamble = self.preamble.clone();
            self.outbox.extend(preamble);
            self.outbox
                .extend(frame(&response).expect("response should frame").iter());
        }
    }

    fn snapshot(&self) -> Vec<u8> {
        let field_set = FieldSet::for_firmware_major(self.firmware.0);
        let schema = field_set.get_values();
        let mut message = Message::new(schema);
        for spec in schema.fields {
            message.set(spec.name, 0).expect("field exists");
        }
        message.set("rpm", self.rpm).expect("rpm exists");
        message.set("v_in", self.v_in).expect("v_in exists");
        let current = match field_set {
            FieldSet::Current => "avg_motor_current",
            FieldSet::PreV3 => "current_motor",
        };
        message.set(current, 2.5).expect("current exists");
        pack(&message, false).expect("snapshot should pack").to_vec()
    }
}

impl ByteStream for SimDevice {
    fn write_all(&mut self, data: &[u8]) -> vescwire_transport::Result<()> {
        {
            let state = self.shared.lock();
            if state.closed {
                return Err(TransportError::Closed);
            }
            if state.broken {
                return Err(TransportError::Io(io::ErrorKind::BrokenPipe.into()));
            }
        }
        for &byte in data {
            self.shared.lock().wire.push(byte);
            thread::yield_now();
        }

        let mut state = self.shared.lock();
        state.inbox.extend_from_slice(data);
        while let Some(payload) = state.inbox.next_buffered() {
            state.handle_request(&payload);
        }
        drop(state);
        self.shared.output.notify_all();
        Ok(())
    }

    fn read_available(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> vescwire_transport::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            if state.closed {
                return Err(TransportError::Closed);
            }
            if !state.outbox.is_empty() {
                let n = buf.len().min(state.outbox.len());
                for (slot, byte) in buf.iter_mut().zip(state.outbox.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(0);
            }
            state = self
                .shared
                .output
                .wait_timeout(state, deadline - now)
                .expect("sim state lock")
                .0;
        }
    }

    fn close(&mut self) -> vescwire_transport::Result<()> {
        self.shared.lock().closed = true;
        self.shared.output.notify_all();
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.shared.lock().closed
    }
}

impl SimHandle {
    pub fn set_respond(&self, respond: bool) {
        self.shared.lock().respond = respond;
    }

    pub fn set_rpm(&self, rpm: i32) {
        self.shared.lock().rpm = rpm;
    }

    /// Bytes emitted ahead of every response.
    pub fn set_preamble(&self, bytes: &[u8]) {
        self.shared.lock().preamble = bytes.to_vec();
    }

    /// Queue unsolicited bytes, as if the device printed something.
    pub fn push_output(&self, bytes: &[u8]) {
        self.shared.lock().outbox.extend(bytes.iter().copied());
        self.shared.output.notify_all();
    }

    /// Simulate the device end going away.
    pub fn hang_up(&self) {
        self.shared.lock().closed = true;
        self.shared.output.notify_all();
    }

    /// Fail every later write with a broken pipe, as a reset TCP peer does.
    pub fn break_pipe(&self) {
        self.shared.lock().broken = true;
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn wire(&self) -> Vec<u8> {
        self.shared.lock().wire.clone()
    }

    /// Payloads of every frame written so far.
    ///
    /// Panics unless the log is an unbroken sequence of valid frames.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let wire = self.wire();
        let mut rest = wire.as_slice();
        let mut payloads = Vec::new();
        while !rest.is_empty() {
            let offset = wire.len() - rest.len();
            match scan_frame(rest) {
                Scan::Frame { payload, consumed } => {
                    assert_eq!(
                        consumed,
                        wire_size(payload.len()),
                        "stray bytes before frame at offset {offset}"
                    );
                    payloads.push(payload.to_vec());
                    rest = &rest[consumed..];
                }
                other => panic!("malformed wire at offset {offset}: {other:?}"),
            }
        }
        payloads
    }

    pub fn count_id(&self, id: u8) -> usize {
        self.frames().iter().filter(|p| p.first() == Some(&id)).count()
    }

    pub fn alive_count(&self) -> usize {
        self.count_id(ids::ALIVE)
    }

    /// Frames other than keep-alives.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.frames()
            .into_iter()
            .filter(|p| p.first() != Some(&ids::ALIVE))
            .collect()
    }
}

/// Payload of a one-field command, for comparing against the wire log.
pub fn command_payload(schema: vescwire_schema::MessageSchema, field: &str, value: f64) -> Vec<u8> {
    let message = Message::with(schema, [(field, value)]).expect("message should build");
    pack(&message, false).expect("message should pack").to_vec()
}

pub fn print_frame(text: &str) -> Vec<u8> {
    let message = Message::with(catalog::PRINT, [("text", text)]).expect("print should build");
    frame(&pack(&message, false).expect("print should pack"))
        .expect("print should frame")
        .to_vec()
}

/// A device that answers the firmware probe, then streams `0x55` forever,
/// like a floating receive line.
pub struct NoisyDevice {
    firmware: (u8, u8),
    inbox: FrameReader,
    pending: VecDeque<u8>,
    noisy: bool,
}

pub fn noisy_device(major: u8, minor: u8) -> NoisyDevice {
    NoisyDevice {
        firmware: (major, minor),
        inbox: FrameReader::new(),
        pending: VecDeque::new(),
        noisy: false,
    }
}

impl ByteStream for NoisyDevice {
    fn write_all(&mut self, data: &[u8]) -> vescwire_transport::Result<()> {
        self.inbox.extend_from_slice(data);
        while let Some(payload) = self.inbox.next_buffered() {
            if payload.first() == Some(&ids::FW_VERSION) {
                let response = [ids::FW_VERSION, self.firmware.0, self.firmware.1];
                self.pending
                    .extend(frame(&response).expect("response should frame").iter());
                self.noisy = true;
            }
        }
        Ok(())
    }

    fn read_available(
        &mut self,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> vescwire_transport::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.pending.pop_front() {
            buf[0] = byte;
            return Ok(1);
        }
        if !self.noisy {
            return Ok(0);
        }
        thread::sleep(Duration::from_micros(100));
        buf[0] = 0x55;
        Ok(1)
    }

    fn close(&mut self) -> vescwire_transport::Result<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }
}
