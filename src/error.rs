use std::fmt;

/// Conditions an [`Instrument`](crate::instrument::Instrument) can report.
///
/// Only `UnsupportedEnvironment` is ever returned to a caller. The other two
/// are built so they can be logged with a consistent message, and the
/// instrument carries on with silence or a default value.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentError {
    /// The audio engine capability is not available in this host.
    UnsupportedEnvironment,
    /// Neither the pitch table nor an explicit frequency produced a tone.
    NoFrequencyResolved { pitch: Option<String> },
    /// A configuration field had a value outside its domain and was replaced
    /// by its default.
    InvalidConfigValue { field: &'static str, value: String },
}

impl fmt::Display for InstrumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentError::UnsupportedEnvironment => {
                write!(f, "Audio engine is not supported in this environment")
            }
            InstrumentError::NoFrequencyResolved { pitch: Some(pitch) } => {
                write!(f, "No frequency for pitch '{pitch}' and no explicit frequency given")
            }
            InstrumentError::NoFrequencyResolved { pitch: None } => {
                write!(f, "No frequency: neither pitch nor frequency given")
            }
            InstrumentError::InvalidConfigValue { field, value } => {
                write!(f, "Invalid value {value} for '{field}', using default")
            }
        }
    }
}

impl std::error::Error for InstrumentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let e = InstrumentError::NoFrequencyResolved {
            pitch: Some("Z9".to_string()),
        };
        assert!(e.to_string().contains("Z9"));

        let e = InstrumentError::InvalidConfigValue {
            field: "oscillatorType",
            value: "\"organ\"".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("oscillatorType") && msg.contains("organ"), "got {msg}");
    }
}
