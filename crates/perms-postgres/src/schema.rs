//! Table and index provisioning

/// Table holding one row per triple
pub const TABLE: &str = "perms";

/// Statements that bring a fresh database up to the expected schema.
///
/// Every statement is idempotent, so running the list against an already
/// provisioned database is a no-op. They are executed one at a time because
/// prepared statements cannot contain more than one command.
pub fn statements() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "create_perms_table",
            r#"
            CREATE TABLE IF NOT EXISTS perms (
                subject_uuid UUID NOT NULL,
                predicate TEXT NOT NULL,
                object_uuid UUID NOT NULL,
                CONSTRAINT perms_triple_unique UNIQUE (subject_uuid, predicate, object_uuid)
            )
            "#,
        ),
        (
            "index_subject_uuid",
            "CREATE INDEX IF NOT EXISTS idx_perms_subject_uuid ON perms (subject_uuid)",
        ),
        (
            "index_predicate",
            "CREATE INDEX IF NOT EXISTS idx_perms_predicate ON perms (predicate)",
        ),
        (
            "index_object_uuid",
            "CREATE INDEX IF NOT EXISTS idx_perms_object_uuid ON perms (object_uuid)",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_statement_is_idempotent() {
        for (name, sql) in statements() {
            assert!(sql.contains("IF NOT EXISTS"), "{} must be re-runnable", name);
        }
    }

    #[test]
    fn test_statements_are_single_commands() {
        for (name, sql) in statements() {
            assert!(!sql.contains(';'), "{} must hold exactly one statement", name);
        }
    }

    #[test]
    fn test_every_column_is_indexed() {
        let sql: Vec<&str> = statements().into_iter().map(|(_, sql)| sql).collect();
        for column in ["subject_uuid", "predicate", "object_uuid"] {
            assert!(
                sql.iter().any(|s| s.contains(&format!("ON {} ({})", TABLE, column))),
                "missing index on {}",
                column
            );
        }
    }
}
