//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DispatchConfig, LogOutput, LoggingConfig, WeaConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &WeaConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_dispatch(&config.dispatch)?;
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(target) = logging.filters.keys().find(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Log filter target cannot be empty: {target:?}"
        )));
    }

    Ok(())
}

fn validate_dispatch(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.command_prefix.is_empty() {
        return Err(ConfigError::missing_field("dispatch.command_prefix"));
    }

    if dispatch.command_prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "Command prefix cannot contain whitespace",
        ));
    }

    if dispatch.deadline_ms == Some(0) {
        return Err(ConfigError::validation(
            "Dispatch deadline must be greater than 0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&WeaConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let mut config = WeaConfig::default();
        config.dispatch.command_prefix.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.dispatch.command_prefix = "! ".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let mut config = WeaConfig::default();
        config.dispatch.deadline_ms = Some(0);
        assert!(validate_config(&config).is_err());
        config.dispatch.deadline_ms = Some(1);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = WeaConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
        config.logging.file_path = Some(PathBuf::from("logs/wea.log"));
        assert!(validate_config(&config).is_ok());
    }
}
