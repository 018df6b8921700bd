// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Tidedesk support backend.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides via the `TIDEDESK_` prefix.
//!
//! # Usage
//!
//! ```no_run
//! use tidedesk_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Service name: {}", config.service.name);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TidedeskConfig;
pub use validation::{ConfigError, render_errors, validate_config};

/// Load configuration from the XDG hierarchy and validate it.
///
/// The high-level entry point: loads config from TOML files + env vars via
/// Figment, then runs post-deserialization validation. Returns either a valid
/// `TidedeskConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<TidedeskConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Load {
            message: err.to_string(),
        }]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<TidedeskConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Load {
            message: err.to_string(),
        }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_validate_str_accepts_valid_toml() {
        let config = load_and_validate_str(
            r#"
            [service]
            name = "support-core"
            "#,
        )
        .unwrap();
        assert_eq!(config.service.name, "support-core");
    }

    #[test]
    fn load_and_validate_str_surfaces_validation_errors() {
        let errors = load_and_validate_str(
            r#"
            [memory]
            continuity_window_hours = -1
            "#,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("continuity_window_hours"));
    }

    #[test]
    fn load_and_validate_str_surfaces_parse_errors() {
        let errors = load_and_validate_str("not valid toml [[[").unwrap_err();
        assert!(matches!(errors[0], ConfigError::Load { .. }));
    }
}
