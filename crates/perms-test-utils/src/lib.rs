//! Testing utilities for the perms backends.
//!
//! [`Fixtures`] hands out a small, fixed universe of subjects, objects and
//! predicates; [`conformance::run_suite`] drives any [`PermissionBackend`]
//! through the behaviour every adapter has to share.
//!
//! [`PermissionBackend`]: perms_core::PermissionBackend

pub mod conformance;

use perms_core::{Filter, Triple};
use uuid::Uuid;

pub const READ: &str = "read";
pub const WRITE: &str = "write";
pub const DELETE: &str = "delete";

/// Every predicate the fixtures use
pub const PREDICATES: [&str; 3] = [READ, WRITE, DELETE];

/// Fresh random identifiers for one test run
#[derive(Debug, Clone)]
pub struct Fixtures {
    pub subjects: [Uuid; 3],
    pub objects: [Uuid; 3],
}

impl Default for Fixtures {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            subjects: [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()],
            objects: [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()],
        }
    }

    pub fn subject_one(&self) -> Uuid {
        self.subjects[0]
    }

    pub fn subject_two(&self) -> Uuid {
        self.subjects[1]
    }

    pub fn subject_three(&self) -> Uuid {
        self.subjects[2]
    }

    pub fn object_a(&self) -> Uuid {
        self.objects[0]
    }

    pub fn object_b(&self) -> Uuid {
        self.objects[1]
    }

    pub fn object_c(&self) -> Uuid {
        self.objects[2]
    }

    /// Every subject x predicate x object combination (27 triples)
    pub fn full_grid(&self) -> Vec<Triple> {
        let mut triples = Vec::with_capacity(27);
        for subject in self.subjects {
            for predicate in PREDICATES {
                for object in self.objects {
                    triples.push(Triple::new(subject, predicate, object));
                }
            }
        }
        triples
    }

    /// A sparse, irregular selection so filters have something to exclude
    pub fn sparse(&self) -> Vec<Triple> {
        let [s1, s2, s3] = self.subjects;
        let [oa, ob, oc] = self.objects;
        vec![
            Triple::new(s1, READ, oa),
            Triple::new(s1, WRITE, oa),
            Triple::new(s1, READ, ob),
            Triple::new(s2, READ, oa),
            Triple::new(s2, DELETE, oc),
            Triple::new(s3, WRITE, ob),
            Triple::new(s3, WRITE, oc),
        ]
    }

    /// Filters restricting the fixture universe, one per combination of
    /// "unconstrained", "one value" and "two values" for each component.
    pub fn filters(&self) -> Vec<Filter> {
        let subject_choices: [Vec<Uuid>; 3] =
            [vec![], vec![self.subjects[0]], vec![self.subjects[1], self.subjects[2]]];
        let predicate_choices: [Vec<&str>; 3] = [vec![], vec![READ], vec![WRITE, DELETE]];
        let object_choices: [Vec<Uuid>; 3] =
            [vec![], vec![self.objects[0]], vec![self.objects[1], self.objects[2]]];

        let mut filters = Vec::with_capacity(27);
        for subjects in &subject_choices {
            for predicates in &predicate_choices {
                for objects in &object_choices {
                    filters.push(
                        Filter::all()
                            .with_subjects(subjects.iter().copied())
                            .with_predicates(predicates.iter().copied())
                            .with_objects(objects.iter().copied()),
                    );
                }
            }
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_full_grid_has_no_duplicates() {
        let fixtures = Fixtures::new();
        let grid: HashSet<Triple> = fixtures.full_grid().into_iter().collect();
        assert_eq!(grid.len(), 27);
    }

    #[test]
    fn test_filters_cover_every_combination() {
        let fixtures = Fixtures::new();
        let filters = fixtures.filters();

        assert_eq!(filters.len(), 27);
        assert!(filters.iter().any(Filter::is_empty));
    }
}
