use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn};
use vescwire_frame::frame;
use vescwire_schema::ids::message_name;
use vescwire_schema::{catalog, pack, unpack, FieldSet, Message, SchemaCatalog};
use vescwire_transport::{ByteStream, Endpoint, IoStream};

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::firmware::FirmwareVersion;
use crate::heartbeat::Heartbeat;
use crate::link::{lock, Link, SharedLink};

/// Lifecycle of a [`Vesc`] connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Open, no keep-alive running.
    Open,
    /// Open with the keep-alive thread sending.
    HeartbeatRunning,
    /// Closed; every operation fails.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Open => "open",
            ConnectionState::HeartbeatRunning => "heartbeat-running",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Cached header-only getter request.
#[derive(Debug, Clone)]
struct Request {
    wire: Bytes,
    id: u8,
    response_len: usize,
}

/// A connection to one motor controller.
///
/// All traffic, including keep-alives from the background thread, goes
/// through a single mutex that is held for a whole write-then-read
/// exchange, so frames never interleave on the wire.
pub struct Vesc {
    link: SharedLink,
    heartbeat: Option<Heartbeat>,
    catalog: SchemaCatalog,
    firmware: FirmwareVersion,
    alive_frame: Bytes,
    get_values: Request,
    config: DriverConfig,
    closed: bool,
}

impl Vesc {
    /// Take over an open stream and bring the connection up.
    ///
    /// Switches rotor position display off when `has_sensor` is set, starts
    /// the keep-alive when `start_heartbeat` is set, reads the firmware
    /// version and selects the GET_VALUES layout from it. If any step fails
    /// the heartbeat is stopped, the stream closed, and the error returned.
    pub fn open<S>(stream: S, config: DriverConfig) -> Result<Self>
    where
        S: ByteStream + 'static,
    {
        let link = Link::shared(Box::new(stream), &config.frame);
        let alive_frame = frame(&pack(&Message::new(catalog::ALIVE), false)?)?;
        let field_set = FieldSet::default();

        let mut vesc = Self {
            link,
            heartbeat: None,
            catalog: SchemaCatalog::standard(field_set)?,
            firmware: FirmwareVersion::default(),
            alive_frame,
            get_values: Self::getter(field_set.get_values())?,
            config,
            closed: false,
        };

        if let Err(err) = vesc.initialize() {
            warn!(error = %err, "connection setup failed");
            if let Err(close_err) = vesc.close() {
                debug!(error = %close_err, "close after failed setup");
            }
            return Err(err);
        }
        Ok(vesc)
    }

    /// Connect to an endpoint and open a connection over it.
    pub fn connect(endpoint: &Endpoint, config: DriverConfig) -> Result<Self> {
        let stream = IoStream::connect(endpoint)?;
        info!(%endpoint, "connected");
        Self::open(stream, config)
    }

    fn initialize(&mut self) -> Result<()> {
        if self.config.has_sensor {
            self.set_rotor_position_mode(crate::RotorPositionMode::Off)?;
        }
        if self.config.start_heartbeat {
            self.start_heartbeat()?;
        }

        let firmware = self.get_firmware_version()?;
        let field_set = firmware.field_set();
        self.firmware = firmware;
        self.catalog = SchemaCatalog::standard(field_set)?;
        self.get_values = Self::getter(field_set.get_values())?;
        info!(%firmware, ?field_set, "controller ready");
        Ok(())
    }

    fn getter(schema: vescwire_schema::MessageSchema) -> Result<Request> {
        let response_len = schema
            .fixed_len()
            .ok_or(vescwire_schema::SchemaError::InvalidSchema {
                schema: schema.name,
                reason: "getter response must have a fixed length",
            })?;
        Ok(Request {
            wire: frame(&pack(&Message::request(schema), true)?)?,
            id: schema.id,
            response_len,
        })
    }

    pub fn state(&self) -> ConnectionState {
        if self.closed {
            ConnectionState::Closed
        } else if self.heartbeat.as_ref().is_some_and(Heartbeat::is_running) {
            ConnectionState::HeartbeatRunning
        } else {
            ConnectionState::Open
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start the keep-alive thread. Does nothing if it is already running.
    pub fn start_heartbeat(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.heartbeat.as_ref().is_some_and(Heartbeat::is_running) {
            return Ok(());
        }
        self.heartbeat = Some(Heartbeat::spawn(
            self.link.clone(),
            self.alive_frame.clone(),
            self.config.heartbeat_interval,
        )?);
        Ok(())
    }

    /// Stop the keep-alive thread and wait for it to exit. Idempotent.
    pub fn stop_heartbeat(&mut self) {
        if let Some(mut heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
    }

    /// Stop the keep-alive and close the stream. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.stop_heartbeat();
        self.closed = true;
        lock(&self.link).close()?;
        info!("connection closed");
        Ok(())
    }

    /// Write raw, already framed bytes; with a length hint, also read and decode one response.
    ///
    /// The hint is the response payload length to wait for before the
    /// first decode attempt. Whatever message arrives first is returned.
    pub fn send(&self, data: &[u8], expect_response_length: Option<usize>) -> Result<Option<Message>> {
        self.ensure_open()?;
        let mut link = lock(&self.link);
        let Some(min_buffered) = expect_response_length else {
            link.write_raw(data)?;
            return Ok(None);
        };

        let deadline = Instant::now() + self.config.response_timeout;
        link.discard_input(deadline)?;
        link.write_raw(data)?;
        let payload = link
            .read_frame(deadline, min_buffered)
            .map_err(|err| DriverError::from_read(err, self.config.response_timeout))?;
        Ok(Some(unpack(&payload, &self.catalog)?))
    }

    /// Pack and send a command that has no response.
    pub(crate) fn command(&self, message: &Message) -> Result<()> {
        self.ensure_open()?;
        let payload = pack(message, false)?;
        lock(&self.link).write_payload(&payload)
    }

    /// Send a getter request and wait for the response with the same id.
    ///
    /// Decodable frames carrying other ids (device print output, late
    /// answers to earlier requests) are skipped. Decode failures surface
    /// without retry.
    pub(crate) fn query(&self, schema: vescwire_schema::MessageSchema) -> Result<Message> {
        let request = if schema.id == self.get_values.id {
            self.get_values.clone()
        } else {
            Self::getter(schema)?
        };
        self.exchange(&request)
    }

    fn exchange(&self, request: &Request) -> Result<Message> {
        self.ensure_open()?;
        let timeout = self.config.response_timeout;
        let mut link = lock(&self.link);
        let deadline = Instant::now() + timeout;
        link.discard_input(deadline)?;
        link.write_raw(&request.wire)?;

        let mut min_buffered = request.response_len;
        loop {
            let payload = link
                .read_frame(deadline, min_buffered)
                .map_err(|err| DriverError::from_read(err, timeout))?;
            min_buffered = 0;

            let message = unpack(&payload, &self.catalog)?;
            if message.id() == request.id {
                return Ok(message);
            }
            debug!(
                expected = message_name(request.id),
                received = message.name(),
                "skipping unrelated frame"
            );
        }
    }

    /// The framed GET_VALUES request and its expected response length for this firmware.
    pub fn get_values_request(&self) -> (Bytes, usize) {
        (self.get_values.wire.clone(), self.get_values.response_len)
    }

    /// Firmware version read when the connection opened.
    pub fn firmware_version(&self) -> FirmwareVersion {
        self.firmware
    }

    pub fn field_set(&self) -> FieldSet {
        self.catalog.field_set()
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        Ok(())
    }
}

impl fmt::Debug for Vesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vesc")
            .field("state", &self.state())
            .field("firmware", &self.firmware)
            .field("field_set", &self.field_set())
            .finish_non_exhaustive()
    }
}

impl Drop for Vesc {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "close on drop failed");
        }
    }
}
