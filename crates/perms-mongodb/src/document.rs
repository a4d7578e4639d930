//! Mapping between triples, filters and BSON

use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use perms_core::{Filter, Triple};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored shape of a triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub subject_uuid: bson::Uuid,
    pub predicate: String,
    pub object_uuid: bson::Uuid,
}

impl From<&Triple> for PermDocument {
    fn from(triple: &Triple) -> Self {
        Self {
            id: None,
            subject_uuid: to_bson_uuid(&triple.subject_uuid),
            predicate: triple.predicate.clone(),
            object_uuid: to_bson_uuid(&triple.object_uuid),
        }
    }
}

impl From<PermDocument> for Triple {
    fn from(document: PermDocument) -> Self {
        Triple::new(
            Uuid::from_bytes(document.subject_uuid.bytes()),
            document.predicate,
            Uuid::from_bytes(document.object_uuid.bytes()),
        )
    }
}

fn to_bson_uuid(uuid: &Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(uuid.into_bytes())
}

fn uuid_list<'a>(uuids: impl IntoIterator<Item = &'a Uuid>) -> Vec<Bson> {
    let mut values: Vec<&Uuid> = uuids.into_iter().collect();
    values.sort_unstable();
    values.into_iter().map(|u| Bson::from(to_bson_uuid(u))).collect()
}

/// Query document for `filter`: one `$in` clause per non-empty component.
///
/// Fields left out of the document are unconstrained, so the empty filter
/// becomes `{}` and matches every document.
pub fn filter_document(filter: &Filter) -> Document {
    let mut query = Document::new();

    if !filter.subject_uuids.is_empty() {
        query.insert("subject_uuid", doc! { "$in": uuid_list(&filter.subject_uuids) });
    }
    if !filter.predicates.is_empty() {
        let mut predicates: Vec<&str> = filter.predicates.iter().map(String::as_str).collect();
        predicates.sort_unstable();
        query.insert("predicate", doc! { "$in": predicates });
    }
    if !filter.object_uuids.is_empty() {
        query.insert("object_uuid", doc! { "$in": uuid_list(&filter.object_uuids) });
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_filter_is_empty_document() {
        assert_eq!(filter_document(&Filter::all()), doc! {});
    }

    #[test]
    fn test_only_present_components_are_constrained() {
        let subject = Uuid::new_v4();
        let filter = Filter::all()
            .with_subjects([subject])
            .with_predicates(["write", "read"]);

        let query = filter_document(&filter);

        assert_eq!(
            query,
            doc! {
                "subject_uuid": { "$in": [Bson::from(to_bson_uuid(&subject))] },
                "predicate": { "$in": ["read", "write"] },
            }
        );
        assert!(!query.contains_key("object_uuid"));
    }

    #[test]
    fn test_uuids_are_stored_as_standard_binary() {
        let triple = Triple::new(Uuid::new_v4(), "read", Uuid::new_v4());
        let stored = bson::to_document(&PermDocument::from(&triple)).unwrap();

        match stored.get("subject_uuid") {
            Some(Bson::Binary(binary)) => {
                assert_eq!(binary.subtype, bson::spec::BinarySubtype::Uuid);
                assert_eq!(binary.bytes, triple.subject_uuid.as_bytes().to_vec());
            }
            other => panic!("expected binary UUID, got {:?}", other),
        }
        assert!(!stored.contains_key("_id"));
    }

    #[test]
    fn test_document_converts_back_to_triple() {
        let triple = Triple::new(Uuid::new_v4(), "delete", Uuid::new_v4());
        let mut document = PermDocument::from(&triple);
        document.id = Some(ObjectId::new());

        assert_eq!(Triple::from(document), triple);
    }
}
