//! `SQLite` schema definitions for birdscribe.
//!
//! Column names match the hosted tables so rows serialize identically from
//! either backend.

/// SQL statement to create the uploads table.
pub const CREATE_UPLOADS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS uploads (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    image_url TEXT NOT NULL,
    file_name TEXT NOT NULL
)
";

/// SQL statement to create an index on `created_at` for newest-first listing.
pub const CREATE_UPLOADS_CREATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_uploads_created_at ON uploads(created_at DESC)
";

/// SQL statement to create the bird descriptions table.
pub const CREATE_DESCRIPTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS bird_descriptions (
    id TEXT PRIMARY KEY,
    bird_name TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the analysis responses table.
pub const CREATE_RESPONSES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS responses (
    id TEXT PRIMARY KEY,
    response TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_UPLOADS_TABLE,
    CREATE_UPLOADS_CREATED_INDEX,
    CREATE_DESCRIPTIONS_TABLE,
    CREATE_RESPONSES_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_uploads_table_columns() {
        assert!(CREATE_UPLOADS_TABLE.contains("id TEXT PRIMARY KEY"));
        assert!(CREATE_UPLOADS_TABLE.contains("created_at TEXT NOT NULL"));
        assert!(CREATE_UPLOADS_TABLE.contains("image_url TEXT NOT NULL"));
        assert!(CREATE_UPLOADS_TABLE.contains("file_name TEXT NOT NULL"));
    }

    #[test]
    fn test_annotation_tables_columns() {
        assert!(CREATE_DESCRIPTIONS_TABLE.contains("bird_name TEXT NOT NULL"));
        assert!(CREATE_DESCRIPTIONS_TABLE.contains("description TEXT NOT NULL"));
        assert!(CREATE_RESPONSES_TABLE.contains("response TEXT NOT NULL"));
    }
}
