//! Configuration loading and persistence.

use super::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::Path;

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let names = [
            ("streams.incoming", &self.streams.incoming),
            ("streams.outgoing", &self.streams.outgoing),
            ("streams.task", &self.streams.task),
            ("streams.task_response", &self.streams.task_response),
        ];

        for (field, name) in &names {
            if name.is_empty() {
                errors.push(format!("{field} cannot be empty"));
            }
        }

        // Stream names must be pairwise distinct; a producer and a consumer
        // sharing a stream by accident would loop messages back.
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                if !names[i].1.is_empty() && names[i].1 == names[j].1 {
                    errors.push(format!(
                        "{} and {} must not share the name {:?}",
                        names[i].0, names[j].0, names[i].1
                    ));
                }
            }
        }

        if self.delivery.throttle_interval_ms == 0 {
            errors.push("delivery.throttle_interval_ms cannot be 0".to_string());
        }

        if self.attachments.default_mime.is_empty() {
            errors.push("attachments.default_mime cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
