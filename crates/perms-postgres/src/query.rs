//! SQL generation for filters and batched inserts

use perms_core::{Filter, Triple};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::schema::TABLE;

/// Rows per INSERT statement. Three binds per row keeps each statement well
/// under the 65535 bind parameter limit of the wire protocol.
pub const INSERT_CHUNK: usize = 1000;

const COLUMNS: &str = "subject_uuid, predicate, object_uuid";

/// Append a `WHERE` clause for `filter`, one `col = ANY($n)` per non-empty
/// component joined with `AND`. An empty filter appends nothing.
pub fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    if filter.is_empty() {
        return;
    }

    builder.push(" WHERE ");
    let mut conditions = builder.separated(" AND ");
    if !filter.subject_uuids.is_empty() {
        conditions.push("subject_uuid = ANY(");
        conditions.push_bind_unseparated(filter.subject_uuids.iter().copied().collect::<Vec<Uuid>>());
        conditions.push_unseparated(")");
    }
    if !filter.predicates.is_empty() {
        conditions.push("predicate = ANY(");
        conditions.push_bind_unseparated(filter.predicates.iter().cloned().collect::<Vec<String>>());
        conditions.push_unseparated(")");
    }
    if !filter.object_uuids.is_empty() {
        conditions.push("object_uuid = ANY(");
        conditions.push_bind_unseparated(filter.object_uuids.iter().copied().collect::<Vec<Uuid>>());
        conditions.push_unseparated(")");
    }
}

pub fn select(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM {}", COLUMNS, TABLE));
    push_filter(&mut builder, filter);
    builder
}

/// `DELETE ... RETURNING` so the removed rows come back with the same call
pub fn delete(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("DELETE FROM {}", TABLE));
    push_filter(&mut builder, filter);
    builder.push(format!(" RETURNING {}", COLUMNS));
    builder
}

/// Multi-row insert that skips rows already present
pub fn insert<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {} ({}) ", TABLE, COLUMNS));
    builder.push_values(triples, |mut row, triple| {
        row.push_bind(triple.subject_uuid)
            .push_bind(triple.predicate.clone())
            .push_bind(triple.object_uuid);
    });
    builder.push(" ON CONFLICT DO NOTHING");
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_filter_selects_everything() {
        assert_eq!(
            select(&Filter::all()).sql(),
            "SELECT subject_uuid, predicate, object_uuid FROM perms"
        );
    }

    #[test]
    fn test_single_component_filter() {
        let filter = Filter::all().with_predicates(["read", "write"]);
        assert_eq!(
            select(&filter).sql(),
            "SELECT subject_uuid, predicate, object_uuid FROM perms WHERE predicate = ANY($1)"
        );
    }

    #[test]
    fn test_components_are_conjoined_in_column_order() {
        let filter = Filter::all()
            .with_objects([Uuid::new_v4()])
            .with_subjects([Uuid::new_v4()])
            .with_predicates(["read"]);
        assert_eq!(
            select(&filter).sql(),
            "SELECT subject_uuid, predicate, object_uuid FROM perms \
             WHERE subject_uuid = ANY($1) AND predicate = ANY($2) AND object_uuid = ANY($3)"
        );
    }

    #[test]
    fn test_filter_values_are_bound_not_inlined() {
        let filter = Filter::all().with_predicates(["x'; DROP TABLE perms; --"]);
        let sql = select(&filter).into_sql();
        assert!(!sql.contains("DROP"));
    }

    #[test]
    fn test_delete_returns_removed_rows() {
        let filter = Filter::all().with_objects([Uuid::new_v4()]);
        assert_eq!(
            delete(&filter).sql(),
            "DELETE FROM perms WHERE object_uuid = ANY($1) \
             RETURNING subject_uuid, predicate, object_uuid"
        );
        assert_eq!(
            delete(&Filter::all()).sql(),
            "DELETE FROM perms RETURNING subject_uuid, predicate, object_uuid"
        );
    }

    #[test]
    fn test_insert_ignores_conflicts() {
        let triples = vec![
            Triple::new(Uuid::new_v4(), "read", Uuid::new_v4()),
            Triple::new(Uuid::new_v4(), "write", Uuid::new_v4()),
        ];
        assert_eq!(
            insert(&triples).sql(),
            "INSERT INTO perms (subject_uuid, predicate, object_uuid) \
             VALUES ($1, $2, $3), ($4, $5, $6) ON CONFLICT DO NOTHING"
        );
    }
}
