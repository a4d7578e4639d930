//! Cypher statements. Filter values are always passed as parameters.

use neo4rs::Query;
use perms_core::{Filter, Triple};
use uuid::Uuid;

pub const INDEX_STATEMENTS: [&str; 2] = [
    "CREATE INDEX perms_node_uuid IF NOT EXISTS FOR (n:NODE) ON (n.uuid)",
    "CREATE INDEX perms_edge_predicate IF NOT EXISTS FOR ()-[r:PREDICATE]-() ON (r.predicate)",
];

const PATTERN: &str = "MATCH (subject:NODE)-[edge:PREDICATE]->(object:NODE)";

/// Merge one batch given as three parallel lists
const CREATE: &str = "UNWIND range(0, size($subject_uuids) - 1) AS i \
     WITH $subject_uuids[i] AS subject_uuid, $predicates[i] AS predicate, $object_uuids[i] AS object_uuid \
     MERGE (subject:NODE {uuid: subject_uuid}) \
     MERGE (object:NODE {uuid: object_uuid}) \
     MERGE (subject)-[:PREDICATE {predicate: predicate}]->(object)";

/// A `WHERE` clause and the list parameters it references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CypherFilter {
    pub clause: String,
    pub params: Vec<(&'static str, Vec<String>)>,
}

fn sorted_strings<'a, T: ToString + 'a>(values: impl IntoIterator<Item = &'a T>) -> Vec<String> {
    let mut values: Vec<String> = values.into_iter().map(ToString::to_string).collect();
    values.sort_unstable();
    values
}

impl CypherFilter {
    pub fn new(filter: &Filter) -> Self {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if !filter.subject_uuids.is_empty() {
            conditions.push("subject.uuid IN $subject_uuids");
            params.push(("subject_uuids", sorted_strings(&filter.subject_uuids)));
        }
        if !filter.predicates.is_empty() {
            conditions.push("edge.predicate IN $predicates");
            params.push(("predicates", sorted_strings(&filter.predicates)));
        }
        if !filter.object_uuids.is_empty() {
            conditions.push("object.uuid IN $object_uuids");
            params.push(("object_uuids", sorted_strings(&filter.object_uuids)));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        Self { clause, params }
    }

    fn into_query(self, text: String) -> Query {
        self.params
            .into_iter()
            .fold(Query::new(text), |query, (name, values)| query.param(name, values))
    }
}

pub fn read_statement(filter: &CypherFilter) -> String {
    format!(
        "{}{} RETURN subject.uuid AS subject_uuid, edge.predicate AS predicate, object.uuid AS object_uuid",
        PATTERN, filter.clause
    )
}

/// The predicate is captured before the relationship is deleted, since a
/// deleted relationship's properties can no longer be read.
pub fn delete_statement(filter: &CypherFilter) -> String {
    format!(
        "{}{} WITH subject, object, edge, edge.predicate AS predicate \
         DELETE edge \
         RETURN subject.uuid AS subject_uuid, predicate, object.uuid AS object_uuid",
        PATTERN, filter.clause
    )
}

pub fn read_query(filter: &Filter) -> Query {
    let filter = CypherFilter::new(filter);
    let text = read_statement(&filter);
    filter.into_query(text)
}

pub fn delete_query(filter: &Filter) -> Query {
    let filter = CypherFilter::new(filter);
    let text = delete_statement(&filter);
    filter.into_query(text)
}

/// The three parallel lists bound by the create statement
pub fn create_params(batch: &[Triple]) -> [(&'static str, Vec<String>); 3] {
    let subjects = batch.iter().map(|t| t.subject_uuid.to_string()).collect();
    let predicates = batch.iter().map(|t| t.predicate.clone()).collect();
    let objects = batch.iter().map(|t| t.object_uuid.to_string()).collect();
    [("subject_uuids", subjects), ("predicates", predicates), ("object_uuids", objects)]
}

pub fn create_query(batch: &[Triple]) -> Query {
    create_params(batch)
        .into_iter()
        .fold(Query::new(CREATE.to_string()), |query, (name, values)| query.param(name, values))
}

pub fn parse_uuid(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value).ok()
}
