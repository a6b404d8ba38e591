use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand, ValueEnum};
use vescwire_driver::{DriverConfig, Vesc};
use vescwire_transport::Endpoint;

use crate::exit::{driver_error, transport_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod engage;
pub mod halt;
pub mod info;
pub mod set;
pub mod terminal;
pub mod values;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show version information.
    Version(VersionArgs),
    /// Read the firmware version and the measurement layout it selects.
    Info(InfoArgs),
    /// Print one measurement snapshot.
    Values(ValuesArgs),
    /// Apply a setpoint (current, brake, duty, rpm, speed or servo).
    Set(SetArgs),
    /// Spin the motor open loop.
    Engage(EngageArgs),
    /// Release the motor (zero current).
    Halt(HaltArgs),
    /// Run a firmware terminal command.
    Terminal(TerminalArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => version::run(args),
        Command::Info(args) => info::run(args, format),
        Command::Values(args) => values::run(args, format),
        Command::Set(args) => set::run(args, format),
        Command::Engage(args) => engage::run(args, format),
        Command::Halt(args) => halt::run(args, format),
        Command::Terminal(args) => terminal::run(args, format),
    }
}

/// Connection options shared by every device subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Device endpoint (tcp://host:port, host:port or unix:/path).
    pub endpoint: String,
    /// Maximum wait for each response (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub timeout: Duration,
    /// Keep-alive period.
    #[arg(long, default_value = "100ms", value_parser = parse_duration)]
    pub heartbeat_interval: Duration,
    /// Motor has a position sensor; switch rotor position display off on connect.
    #[arg(long, env = "VESCWIRE_HAS_SENSOR")]
    pub has_sensor: bool,
}

impl ConnectArgs {
    pub fn endpoint(&self) -> CliResult<Endpoint> {
        Endpoint::parse(&self.endpoint).map_err(|err| transport_error("invalid endpoint", err))
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            heartbeat_interval: self.heartbeat_interval,
            response_timeout: self.timeout,
            has_sensor: self.has_sensor,
            ..DriverConfig::default()
        }
    }

    /// Parse the endpoint, connect and bring the controller up.
    pub fn connect(&self) -> CliResult<Vesc> {
        let endpoint = self.endpoint()?;
        Vesc::connect(&endpoint, self.driver_config())
            .map_err(|err| driver_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct ValuesArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Setpoint {
    /// Motor current in amps.
    Current,
    /// Braking current in amps.
    Brake,
    /// Duty cycle, -1 to 1.
    Duty,
    /// Electrical RPM.
    Rpm,
    /// Speed in miles per hour.
    Speed,
    /// Servo position, 0 to 1.
    Servo,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Quantity to set.
    #[arg(value_enum)]
    pub setpoint: Setpoint,
    /// New value.
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
    /// Keep the setpoint alive this long (or until Ctrl-C), then halt.
    #[arg(long, value_parser = parse_duration)]
    pub hold: Option<Duration>,
    /// ERPM per mile per hour, for the speed setpoint.
    #[arg(long, default_value_t = 784.0)]
    pub erpm_per_mph: f64,
}

#[derive(Args, Debug)]
pub struct EngageArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Open-loop current in amps.
    #[arg(long)]
    pub current: f64,
    /// Open-loop electrical frequency in Hz.
    #[arg(long)]
    pub frequency: f64,
    /// Keep the motor engaged this long (or until Ctrl-C), then halt.
    #[arg(long, value_parser = parse_duration)]
    pub hold: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct HaltArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct TerminalArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Command words, joined with spaces.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    pub command: Vec<String>,
    /// Wait for the first line of output and print it.
    #[arg(long)]
    pub wait: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Block for `hold` or until Ctrl-C, while the heartbeat keeps the last command alive.
pub fn hold(hold: Duration) -> CliResult<()> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })?;

    tracing::info!(hold_ms = hold.as_millis() as u64, "holding setpoint");
    let deadline = Instant::now() + hold;
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    if !running.load(Ordering::SeqCst) {
        tracing::info!("interrupted");
    }
    Ok(())
}

/// Halt and close after a held command, keeping the first error.
pub fn release(mut vesc: Vesc, result: CliResult<()>) -> CliResult<()> {
    let halted = vesc.halt().map_err(|err| driver_error("halt failed", err));
    let closed = vesc.close().map_err(|err| driver_error("close failed", err));
    result.and(halted).and(closed)
}

pub fn usage(message: impl Into<String>) -> CliError {
    CliError::new(USAGE, message)
}
