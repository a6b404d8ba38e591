use std::time::Duration;

use vescwire_frame::FrameConfig;

/// Per-connection driver settings.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Period between keep-alive frames.
    pub heartbeat_interval: Duration,
    /// Upper bound on waiting for a response.
    pub response_timeout: Duration,
    /// Start the keep-alive thread as part of [`Vesc::open`](crate::Vesc::open).
    pub start_heartbeat: bool,
    /// Motor has a position sensor; rotor position display is switched off on open.
    pub has_sensor: bool,
    /// Electrical RPM per mile per hour, used by `set_speed_mph`.
    pub erpm_per_mph: f64,
    /// Frame size limit and read poll slice.
    pub frame: FrameConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(100),
            response_timeout: Duration::from_secs(1),
            start_heartbeat: true,
            has_sensor: false,
            erpm_per_mph: 784.0,
            frame: FrameConfig::default(),
        }
    }
}
