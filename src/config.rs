use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Intake constraints and flags for a file-upload pipeline.
#[derive(Debug, Clone, Default)]
pub struct UploadConfig {
    /// Comma-separated accepted patterns: exact MIME types (`image/png`),
    /// wildcard subtypes (`image/*`), or extensions (`.pdf`). `None` accepts
    /// everything.
    pub accept: Option<String>,
    /// Maximum number of tracked files
    pub max_files: Option<usize>,
    /// Maximum size per file in bytes
    pub max_size: Option<u64>,
    /// Whether pickers should offer multi-selection. Surfaced to
    /// collaborators; the validator does not enforce it.
    pub multiple: bool,
    /// When true, intake is a no-op.
    pub disabled: bool,
}

impl UploadConfig {
    /// Load intake constraints from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let accept = std::env::var("ACCEPT").ok().filter(|s| !s.trim().is_empty());

        let max_files = std::env::var("MAX_FILES")
            .ok()
            .and_then(|s| s.parse().ok());

        let max_size = std::env::var("MAX_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let multiple = std::env::var("MULTIPLE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let disabled = std::env::var("DISABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let config = UploadConfig {
            accept,
            max_files,
            max_size: Some(max_size),
            multiple,
            disabled,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_files == Some(0) {
            return Err(ConfigError::ValidationError(
                "MAX_FILES must be at least 1".to_string(),
            ));
        }

        if self.max_size == Some(0) {
            return Err(ConfigError::ValidationError(
                "MAX_SIZE must be at least 1".to_string(),
            ));
        }

        if let Some(accept) = &self.accept {
            if accept.split(',').any(|entry| entry.trim().is_empty()) {
                return Err(ConfigError::ValidationError(
                    "ACCEPT must not contain empty entries".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Accepted patterns parsed from the comma-separated `accept` string.
    /// Empty when every type is accepted.
    pub fn accept_list(&self) -> Vec<&str> {
        match &self.accept {
            Some(accept) => accept
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}
