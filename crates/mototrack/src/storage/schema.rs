//! `SQLite` schema definitions for mototrack.
//!
//! Only device-local state lives here. The fleet itself belongs to the
//! backend.

/// Key-value preferences (theme, language, session, ...).
pub const CREATE_PREFERENCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Locally scheduled notifications.
///
/// `trigger_spec` holds the JSON-encoded trigger. `delivered_at` stays NULL for
/// pending entries; repeating entries never get one and move `fire_at`
/// forward instead.
pub const CREATE_NOTIFICATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    motorcycle_id INTEGER,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    trigger_spec TEXT NOT NULL,
    priority TEXT NOT NULL,
    sound INTEGER NOT NULL DEFAULT 1,
    fire_at TEXT NOT NULL,
    delivered_at TEXT,
    created_at TEXT NOT NULL
)
";

/// Pending notifications are read in fire order.
pub const CREATE_FIRE_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_notifications_fire_at ON notifications(fire_at)
    WHERE delivered_at IS NULL
";

/// Lookups by motorcycle.
pub const CREATE_MOTORCYCLE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_notifications_motorcycle ON notifications(motorcycle_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Schema version 1: preferences only.
pub const V1_STATEMENTS: &[&str] = &[CREATE_PREFERENCES_TABLE];

/// Schema version 2: the local notification schedule.
pub const V2_STATEMENTS: &[&str] = &[
    CREATE_NOTIFICATIONS_TABLE,
    CREATE_FIRE_AT_INDEX,
    CREATE_MOTORCYCLE_INDEX,
];

/// Statements for each schema version, oldest first.
pub const MIGRATIONS: &[&[&str]] = &[V1_STATEMENTS, V2_STATEMENTS];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_statements_not_empty() {
        assert!(!MIGRATIONS.is_empty());
        for statements in MIGRATIONS {
            assert!(!statements.is_empty());
            for stmt in *statements {
                assert!(!stmt.trim().is_empty());
            }
        }
    }

    #[test]
    fn test_notifications_table_columns() {
        for column in ["kind TEXT NOT NULL", "fire_at TEXT NOT NULL", "delivered_at TEXT"] {
            assert!(CREATE_NOTIFICATIONS_TABLE.contains(column), "{column}");
        }
    }

    #[test]
    fn test_preferences_table_structure() {
        assert!(CREATE_PREFERENCES_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_PREFERENCES_TABLE.contains("value TEXT NOT NULL"));
    }
}
