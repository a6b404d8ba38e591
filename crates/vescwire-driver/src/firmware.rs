use std::fmt;
use std::str::FromStr;

use vescwire_schema::{FieldSet, Message};

use crate::error::DriverError;

/// Firmware version reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// GET_VALUES layout this firmware speaks.
    pub fn field_set(self) -> FieldSet {
        FieldSet::for_firmware_major(self.major)
    }

    /// Extract the version from a decoded FW_VERSION response.
    pub fn from_message(message: &Message) -> Result<Self, DriverError> {
        let part = |name: &str| {
            message
                .get_i64(name)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| {
                    DriverError::InvalidFirmwareVersion(format!(
                        "{name} field missing or negative in {}",
                        message.name()
                    ))
                })
        };
        Ok(Self::new(part("major")?, part("minor")?))
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for FirmwareVersion {
    type Err = DriverError;

    /// Parse `<major>.<minor>` with an optional numeric `.<patch>`, which is ignored.
    fn from_str(version: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            DriverError::InvalidFirmwareVersion(format!("'{version}': {reason}"))
        };
        let mut parts = version.trim().split('.');

        let major = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| invalid("missing major"))?;
        let minor = parts.next().ok_or_else(|| invalid("missing minor"))?;
        if let Some(patch) = parts.next() {
            patch
                .parse::<u16>()
                .map_err(|_| invalid("non-numeric patch"))?;
        }
        if parts.next().is_some() {
            return Err(invalid("expected '<major>.<minor>[.<patch>]'"));
        }

        let major = major.parse::<u8>().map_err(|_| invalid("non-numeric major"))?;
        let minor = minor.parse::<u8>().map_err(|_| invalid("non-numeric minor"))?;
        Ok(Self::new(major, minor))
    }
}
