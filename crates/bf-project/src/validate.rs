//! Configuration validation.

use std::collections::HashSet;

use crate::schema::{AnalysisConfig, IterateSelection};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No simulations configured")]
    NoSimulations,

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_config(config: &AnalysisConfig) -> Result<(), ValidationError> {
    if config.version == 0 || config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    if config.store_file.trim().is_empty() {
        return Err(invalid("store_file", &config.store_file, "must not be empty"));
    }

    if let Some(locations) = &config.locations {
        let starting_time = locations.starting_time;
        if !starting_time.is_finite() || starting_time < 0.0 {
            return Err(invalid(
                "locations.starting_time",
                starting_time,
                "must be finite and non-negative",
            ));
        }
    }

    if let IterateSelection::List(list) = &config.roughness.iterates
        && list.is_empty()
    {
        return Err(invalid("roughness.iterates", "[]", "list must not be empty"));
    }

    if config.simulations.is_empty() {
        return Err(ValidationError::NoSimulations);
    }

    let mut ids = HashSet::new();
    for sim in &config.simulations {
        if sim.id.trim().is_empty() {
            return Err(invalid("simulations.id", &sim.id, "must not be empty"));
        }
        if !ids.insert(&sim.id) {
            return Err(ValidationError::DuplicateId {
                id: sim.id.clone(),
                context: "simulations".to_string(),
            });
        }
        if sim.path.as_os_str().is_empty() {
            return Err(invalid(
                &format!("simulations[{}].path", sim.id),
                "",
                "must not be empty",
            ));
        }
    }

    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
