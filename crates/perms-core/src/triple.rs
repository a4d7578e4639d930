//! Triple and filter value types

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display};
use std::hash::Hash;
use uuid::Uuid;

/// A single permission fact: `subject` may perform `predicate` on `object`.
///
/// Equality and hashing are structural over all three fields, so a set of
/// triples never holds the same permission twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject_uuid: Uuid,
    pub predicate: String,
    pub object_uuid: Uuid,
}

impl Triple {
    pub fn new(subject_uuid: Uuid, predicate: impl Into<String>, object_uuid: Uuid) -> Self {
        Self {
            subject_uuid,
            predicate: predicate.into(),
            object_uuid,
        }
    }
}

impl Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject_uuid, self.predicate, self.object_uuid)
    }
}

/// Restriction applied by `read` and `delete`.
///
/// A triple matches when, for every non-empty component, its field is a
/// member of that component. Empty components place no constraint, so the
/// default filter matches every triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, deserialize_with = "nullable_set")]
    pub subject_uuids: HashSet<Uuid>,
    #[serde(default, deserialize_with = "nullable_set")]
    pub predicates: HashSet<String>,
    #[serde(default, deserialize_with = "nullable_set")]
    pub object_uuids: HashSet<Uuid>,
}

impl Filter {
    /// The match-everything filter
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_subjects(mut self, subjects: impl IntoIterator<Item = Uuid>) -> Self {
        self.subject_uuids.extend(subjects);
        self
    }

    pub fn with_predicates<S: Into<String>>(mut self, predicates: impl IntoIterator<Item = S>) -> Self {
        self.predicates.extend(predicates.into_iter().map(Into::into));
        self
    }

    pub fn with_objects(mut self, objects: impl IntoIterator<Item = Uuid>) -> Self {
        self.object_uuids.extend(objects);
        self
    }

    /// True when no component constrains anything
    pub fn is_empty(&self) -> bool {
        self.subject_uuids.is_empty() && self.predicates.is_empty() && self.object_uuids.is_empty()
    }

    pub fn admits_subject(&self, subject_uuid: &Uuid) -> bool {
        self.subject_uuids.is_empty() || self.subject_uuids.contains(subject_uuid)
    }

    pub fn admits_predicate(&self, predicate: &str) -> bool {
        self.predicates.is_empty() || self.predicates.contains(predicate)
    }

    pub fn admits_object(&self, object_uuid: &Uuid) -> bool {
        self.object_uuids.is_empty() || self.object_uuids.contains(object_uuid)
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        self.admits_subject(&triple.subject_uuid)
            && self.admits_predicate(&triple.predicate)
            && self.admits_object(&triple.object_uuid)
    }
}

/// Absent, `null` and `[]` all mean "no constraint on this field".
fn nullable_set<'de, D, T>(deserializer: D) -> Result<HashSet<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Eq + Hash,
{
    Ok(Option::<HashSet<T>>::deserialize(deserializer)?.unwrap_or_default())
}
