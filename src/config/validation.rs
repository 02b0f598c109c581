//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity > 0, timeouts > 0, unit <= ceiling)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: config → Result<(), Vec<ValidationError>>
//! - Runs before options are accepted by `Group::new`

use crate::config::schema::{ClientConfig, PoolOptions};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("max_cap must be greater than 0")]
    ZeroCapacity,

    #[error("init_num ({init_num}) must not exceed max_cap ({max_cap})")]
    InitExceedsCapacity { init_num: usize, max_cap: usize },

    #[error("idle_timeout_ms must be greater than 0")]
    ZeroIdleTimeout,

    #[error("time_to_open_unit_ms must be greater than 0")]
    ZeroCooldownUnit,

    #[error("time_to_open_unit_ms ({unit}) must not exceed time_to_open_max_ms ({max})")]
    CooldownUnitExceedsMax { unit: u64, max: u64 },

    #[error("at least one address is required")]
    NoAddresses,

    #[error("address must not be empty")]
    EmptyAddress,
}

/// Validate the options shared by every pool of a group.
pub fn validate_options(options: &PoolOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if options.max_cap == 0 {
        errors.push(ValidationError::ZeroCapacity);
    } else if options.init_num > options.max_cap {
        errors.push(ValidationError::InitExceedsCapacity {
            init_num: options.init_num,
            max_cap: options.max_cap,
        });
    }
    if options.idle_timeout_ms == 0 {
        errors.push(ValidationError::ZeroIdleTimeout);
    }
    if options.time_to_open_unit_ms == 0 {
        errors.push(ValidationError::ZeroCooldownUnit);
    } else if options.time_to_open_unit_ms > options.time_to_open_max_ms {
        errors.push(ValidationError::CooldownUnitExceedsMax {
            unit: options.time_to_open_unit_ms,
            max: options.time_to_open_max_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a whole client configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_options(&config.pool).err().unwrap_or_default();

    if config.addresses.is_empty() {
        errors.push(ValidationError::NoAddresses);
    }
    if config.addresses.iter().any(|a| a.trim().is_empty()) {
        errors.push(ValidationError::EmptyAddress);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
