use jclean_config::{CleanupConfig, ConfigError, ConfigValidationError, ConfigWarning};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn empty_document_yields_defaults() {
    let config = CleanupConfig::load_from_str("").expect("config should parse");
    assert_eq!(config, CleanupConfig::default());
    assert_eq!(config.max_passes, 100);
    assert_eq!(config.java_release, 8);
    assert!(!config.trust_getters);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn loads_every_field_from_a_file() {
    let mut file = NamedTempFile::new().expect("tempfile");
    write!(
        file,
        r#"
max_passes = 7
java_release = 11
trust_getters = true
disabled_rules = ["comments", "collapse_if"]

[logging]
level = "debug"
json = true
"#
    )
    .expect("write config");

    let config = CleanupConfig::load_from_path(file.path()).expect("config should load");
    assert_eq!(config.max_passes, 7);
    assert_eq!(config.java_release, 11);
    assert!(config.trust_getters);
    assert_eq!(config.disabled_rules, vec!["comments", "collapse_if"]);
    assert!(config.logging.json);
    assert!(!config.is_rule_enabled("comments"));
}

#[test]
fn missing_file_reports_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = CleanupConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
}

#[test]
fn type_errors_do_not_echo_the_source_line() {
    let err = CleanupConfig::load_from_str("max_passes = \"many\"").unwrap_err();
    let ConfigError::Toml(message) = err else {
        panic!("expected a toml error");
    };
    assert!(!message.contains("max_passes = "), "{message}");
}

#[test]
fn reports_unknown_keys_with_full_paths() {
    let text = r#"
max_pases = 3

[logging]
levle = "debug"
"#;

    let (_config, diagnostics) =
        CleanupConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(diagnostics.unknown_keys, vec!["logging.levle", "max_pases"]);
    assert!(diagnostics.is_ok());
}

#[test]
fn reports_semantic_errors_and_warnings() {
    let text = r#"
max_passes = 0
java_release = 1
disabled_rules = ["boolean", "boolean"]

[logging]
level = "jclean=loud"
"#;

    let (_config, diagnostics) =
        CleanupConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.errors,
        vec![
            ConfigValidationError::InvalidValue {
                toml_path: "max_passes".into(),
                message: "must be >= 1".into(),
            },
            ConfigValidationError::InvalidValue {
                toml_path: "java_release".into(),
                message: "must be >= 2".into(),
            },
        ]
    );
    assert_eq!(
        diagnostics.warnings,
        vec![
            ConfigWarning::DuplicateDisabledRule {
                id: "boolean".into()
            },
            ConfigWarning::LoggingLevelInvalid {
                value: "jclean=loud".into(),
                normalized: "jclean=loud".into(),
            },
        ]
    );
    assert!(!diagnostics.is_ok());
}
