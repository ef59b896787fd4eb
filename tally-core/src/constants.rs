/// Default upper bound on bound parameters per SQL statement.
/// Matches SQLite's historical `SQLITE_MAX_VARIABLE_NUMBER`.
pub const DEFAULT_MAX_SQL_PARAMS: usize = 999;

/// Number of columns in a persisted vote row: key, actor, value.
pub const VOTE_ROW_COLUMNS: usize = 3;

/// Default initial capacity of a counter's count cache.
pub const DEFAULT_COUNT_CACHE_CAPACITY: usize = 1024;

/// Maximum number of per-key mismatches logged by the consistency checker.
pub const MAX_REPORTED_MISMATCHES: usize = 10;

/// Default vote table layout.
pub const DEFAULT_TABLE: &str = "votes";
pub const DEFAULT_KEY_COLUMN: &str = "key_id";
pub const DEFAULT_ACTOR_COLUMN: &str = "actor_id";
pub const DEFAULT_VALUE_COLUMN: &str = "value";

/// Environment variable consulted by [`crate::tracing_setup::init_tracing`].
pub const LOG_ENV_VAR: &str = "TALLY_LOG";
