use std::collections::BTreeSet;

use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{CleanupConfig, LoggingConfig};

/// Oldest release with the collections framework.
const MIN_JAVA_RELEASE: u16 = 2;

impl CleanupConfig {
    /// Validate semantic invariants, reporting as many problems as possible.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        if self.max_passes == 0 {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: "max_passes".to_string(),
                message: "must be >= 1".to_string(),
            });
        }
        if self.java_release < MIN_JAVA_RELEASE {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: "java_release".to_string(),
                message: format!("must be >= {MIN_JAVA_RELEASE}"),
            });
        }

        let mut seen = BTreeSet::new();
        for id in &self.disabled_rules {
            if !seen.insert(id.as_str()) {
                out.warnings
                    .push(ConfigWarning::DuplicateDisabledRule { id: id.clone() });
            }
        }

        validate_logging(&self.logging, &mut out);
        out
    }
}

fn validate_logging(logging: &LoggingConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&logging.level);
    if !logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: logging.level.clone(),
            normalized,
        });
    }
}
