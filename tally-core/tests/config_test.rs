//! Tests for the tally configuration system.

use std::sync::Mutex;

use tally_core::config::TallyConfig;
use tally_core::errors::ConfigError;

/// Serializes tests that touch `TALLY_*` environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn tempdir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

fn clear_tally_env_vars() {
    for key in [
        "TALLY_MAX_SQL_PARAMS",
        "TALLY_CHECK_CONSISTENCY",
        "TALLY_TABLE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tally_env_vars();

    let dir = tempdir();
    let config = TallyConfig::load(dir.path()).unwrap();

    assert_eq!(config, TallyConfig::default());
    assert_eq!(config.storage.effective_max_sql_params(), 999);
    assert_eq!(config.storage.effective_table(), "votes");
    assert_eq!(config.counter.effective_initial_capacity(), 1024);
    assert_eq!(
        config.storage.effective_check_consistency(),
        cfg!(debug_assertions)
    );
}

#[test]
fn test_env_overrides_project_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tally_env_vars();

    let dir = tempdir();
    std::fs::write(
        dir.path().join("tally.toml"),
        r#"
[storage]
max_sql_params = 300
table = "post_votes"

[counter]
initial_capacity = 64
"#,
    )
    .unwrap();

    std::env::set_var("TALLY_MAX_SQL_PARAMS", "30");
    std::env::set_var("TALLY_CHECK_CONSISTENCY", "true");

    let config = TallyConfig::load(dir.path()).unwrap();
    assert_eq!(config.storage.max_sql_params, Some(30));
    assert_eq!(config.storage.check_consistency, Some(true));
    assert_eq!(config.storage.effective_table(), "post_votes");
    assert_eq!(config.counter.effective_initial_capacity(), 64);

    clear_tally_env_vars();
}

#[test]
fn test_unparseable_env_value_is_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tally_env_vars();

    let dir = tempdir();
    std::env::set_var("TALLY_MAX_SQL_PARAMS", "lots");

    let config = TallyConfig::load(dir.path()).unwrap();
    assert_eq!(config.storage.max_sql_params, None);

    clear_tally_env_vars();
}

#[test]
fn test_invalid_toml_syntax() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tally_env_vars();

    let dir = tempdir();
    std::fs::write(dir.path().join("tally.toml"), "[storage\nnot toml").unwrap();

    match TallyConfig::load(dir.path()) {
        Err(ConfigError::ParseError { .. }) => {}
        other => panic!("Expected ParseError, got: {other:?}"),
    }
}

#[test]
fn test_env_table_name_is_validated() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tally_env_vars();

    let dir = tempdir();
    std::env::set_var("TALLY_TABLE", "votes; DROP TABLE votes");

    match TallyConfig::load(dir.path()) {
        Err(ConfigError::ValidationFailed { field, .. }) => assert_eq!(field, "storage.table"),
        other => panic!("Expected ValidationFailed, got: {other:?}"),
    }

    clear_tally_env_vars();
}

#[test]
fn test_max_sql_params_lower_bound() {
    let result = TallyConfig::from_toml("[storage]\nmax_sql_params = 2\n");
    assert!(matches!(
        result,
        Err(ConfigError::ValidationFailed { .. })
    ));

    let config = TallyConfig::from_toml("[storage]\nmax_sql_params = 3\n").unwrap();
    assert_eq!(config.storage.effective_max_sql_params(), 3);
}

#[test]
fn test_zero_initial_capacity_rejected() {
    let result = TallyConfig::from_toml("[counter]\ninitial_capacity = 0\n");
    assert!(matches!(
        result,
        Err(ConfigError::ValidationFailed { .. })
    ));
}

#[test]
fn test_custom_column_names() {
    let config = TallyConfig::from_toml(
        r#"
[storage]
key_column = "post_id"
actor_column = "user_id"
value_column = "rate"
"#,
    )
    .unwrap();
    assert_eq!(config.storage.effective_key_column(), "post_id");
    assert_eq!(config.storage.effective_actor_column(), "user_id");
    assert_eq!(config.storage.effective_value_column(), "rate");

    assert!(TallyConfig::from_toml("[storage]\nvalue_column = \"1rate\"\n").is_err());
}

#[test]
fn test_toml_round_trip() {
    let config = TallyConfig::from_toml(
        r#"
[storage]
max_sql_params = 120
check_consistency = false
table = "votes_v2"
"#,
    )
    .unwrap();

    let serialized = config.to_toml().unwrap();
    let back = TallyConfig::from_toml(&serialized).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_empty_toml_is_default() {
    let config = TallyConfig::from_toml("").unwrap();
    assert_eq!(config, TallyConfig::default());
}
