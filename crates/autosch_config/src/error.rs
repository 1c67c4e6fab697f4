//! Error types for configuration loading and validation.

/// Why an `autosch.toml` could not be turned into an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has keys of the wrong type.
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but the engine cannot work with it.
    #[error("invalid `{key}`: {reason}")]
    Invalid {
        /// Dotted key of the offending value, e.g. `canvas.grid`.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// The dotted key of an invalid value, if this is a validation failure.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_names_the_key() {
        let err = ConfigError::invalid("canvas.grid", "must be positive, got 0");
        assert_eq!(err.to_string(), "invalid `canvas.grid`: must be positive, got 0");
        assert_eq!(err.key(), Some("canvas.grid"));
    }

    #[test]
    fn parse_errors_carry_toml_detail() {
        let toml_err = toml::from_str::<toml::Table>("grid = ").unwrap_err();
        let err = ConfigError::from(toml_err);
        assert!(err.to_string().starts_with("malformed configuration:"));
        assert_eq!(err.key(), None);
    }

    #[test]
    fn io_errors_wrap() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConfigError::from(io_err);
        assert!(err.to_string().starts_with("cannot read configuration:"));
    }
}
