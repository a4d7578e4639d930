//! Behaviour every [`PermissionBackend`] must share.
//!
//! The suite owns the store it runs against: every check starts by deleting
//! everything. Point it at a dedicated database, never a shared one.

use perms_core::{Filter, PermissionBackend, Triple};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use tracing::info;

use crate::{Fixtures, DELETE, READ, WRITE};

fn set(triples: impl IntoIterator<Item = Triple>) -> HashSet<Triple> {
    triples.into_iter().collect()
}

async fn reset(backend: &dyn PermissionBackend) {
    backend
        .delete(&Filter::all())
        .await
        .unwrap_or_else(|e| panic!("{}: reset failed: {}", backend.name(), e));
}

async fn seed(backend: &dyn PermissionBackend, triples: &[Triple]) {
    reset(backend).await;
    backend
        .create(triples)
        .await
        .unwrap_or_else(|e| panic!("{}: seeding failed: {}", backend.name(), e));
}

async fn read_all(backend: &dyn PermissionBackend) -> HashSet<Triple> {
    backend.read(&Filter::all()).await.expect("read all")
}

/// Run every conformance check against `backend`, in order
pub async fn run_suite(backend: &dyn PermissionBackend) {
    info!(backend = backend.name(), "running conformance suite");

    empty_create(backend).await;
    round_trip(backend).await;
    idempotent_create(backend).await;
    empty_filter_matches_all(backend).await;
    read_filter_correctness(backend).await;
    delete_filter_correctness(backend).await;
    delete_is_idempotent(backend).await;
    delete_without_match(backend).await;
    scenario(backend).await;

    reset(backend).await;
}

pub async fn empty_create(backend: &dyn PermissionBackend) {
    reset(backend).await;

    let created = backend.create(&[]).await.expect("create nothing");

    assert_eq!(created, HashSet::new(), "{}", backend.name());
    assert_eq!(read_all(backend).await, HashSet::new(), "{}", backend.name());
}

pub async fn round_trip(backend: &dyn PermissionBackend) {
    reset(backend).await;
    let fixtures = Fixtures::new();
    let triple = Triple::new(fixtures.subject_one(), READ, fixtures.object_a());

    let created = backend.create(&[triple.clone()]).await.expect("create");
    assert_eq!(created, set([triple.clone()]), "{}: create", backend.name());

    assert_eq!(read_all(backend).await, set([triple.clone()]), "{}: read", backend.name());

    let deleted = backend.delete(&Filter::all()).await.expect("delete");
    assert_eq!(deleted, set([triple]), "{}: delete", backend.name());

    assert_eq!(read_all(backend).await, HashSet::new(), "{}: read after delete", backend.name());
}

pub async fn idempotent_create(backend: &dyn PermissionBackend) {
    reset(backend).await;
    let fixtures = Fixtures::new();
    let triples = fixtures.sparse();

    let first = backend.create(&triples).await.expect("first create");
    let after_first = read_all(backend).await;

    let second = backend.create(&triples).await.expect("second create");
    let after_second = read_all(backend).await;

    assert_eq!(first, set(triples.clone()), "{}: first create", backend.name());
    assert_eq!(second, set(triples.clone()), "{}: repeated create still reports", backend.name());
    assert_eq!(after_first, after_second, "{}: storage unchanged", backend.name());

    // Duplicates inside a single call collapse too
    let triple = triples[0].clone();
    let doubled = backend
        .create(&[triple.clone(), triple.clone()])
        .await
        .expect("create with duplicates");
    assert_eq!(doubled, set([triple]), "{}: in-call duplicates", backend.name());
    assert_eq!(read_all(backend).await, after_first, "{}: no extra rows", backend.name());
}

pub async fn empty_filter_matches_all(backend: &dyn PermissionBackend) {
    let fixtures = Fixtures::new();
    let grid = fixtures.full_grid();
    seed(backend, &grid).await;

    assert_eq!(read_all(backend).await, set(grid.clone()), "{}: read all", backend.name());

    let deleted = backend.delete(&Filter::all()).await.expect("delete all");
    assert_eq!(deleted, set(grid), "{}: delete all", backend.name());
    assert_eq!(read_all(backend).await, HashSet::new(), "{}: emptied", backend.name());
}

/// `read(f)` returns exactly the stored triples `f` matches, for every
/// combination of unconstrained, single-valued and multi-valued components.
pub async fn read_filter_correctness(backend: &dyn PermissionBackend) {
    let fixtures = Fixtures::new();
    let stored = fixtures.sparse();
    seed(backend, &stored).await;

    for filter in fixtures.filters() {
        let expected = set(stored.iter().filter(|t| filter.matches(t)).cloned());
        let results = backend.read(&filter).await.expect("filtered read");
        assert_eq!(results, expected, "{}: read {:?}", backend.name(), filter);
    }
}

/// `delete(f)` removes and returns exactly the matching triples and leaves
/// the rest in place.
pub async fn delete_filter_correctness(backend: &dyn PermissionBackend) {
    let fixtures = Fixtures::new();
    let stored = fixtures.sparse();

    for filter in fixtures.filters() {
        seed(backend, &stored).await;

        let (expected, remaining): (Vec<Triple>, Vec<Triple>) =
            stored.iter().cloned().partition(|t| filter.matches(t));

        let deleted = backend.delete(&filter).await.expect("filtered delete");
        assert_eq!(deleted, set(expected), "{}: delete {:?}", backend.name(), filter);
        assert_eq!(
            read_all(backend).await,
            set(remaining),
            "{}: left after delete {:?}",
            backend.name(),
            filter
        );
    }
}

pub async fn delete_is_idempotent(backend: &dyn PermissionBackend) {
    let fixtures = Fixtures::new();
    seed(backend, &fixtures.sparse()).await;
    let filter = Filter::all().with_predicates([WRITE]);

    let first = backend.delete(&filter).await.expect("first delete");
    let remaining = read_all(backend).await;
    let second = backend.delete(&filter).await.expect("second delete");

    assert!(!first.is_empty(), "{}: fixtures include write triples", backend.name());
    assert_eq!(second, HashSet::new(), "{}: second delete", backend.name());
    assert_eq!(read_all(backend).await, remaining, "{}: storage unchanged", backend.name());
}

pub async fn delete_without_match(backend: &dyn PermissionBackend) {
    let fixtures = Fixtures::new();
    let stored = fixtures.sparse();
    seed(backend, &stored).await;

    // subject_three never holds a delete permission in the sparse fixtures
    let filter = Filter::all()
        .with_subjects([fixtures.subject_three()])
        .with_predicates([DELETE]);

    let deleted = backend.delete(&filter).await.expect("delete");
    assert_eq!(deleted, HashSet::new(), "{}", backend.name());
    assert_eq!(read_all(backend).await, set(stored), "{}: untouched", backend.name());
}

/// A=(s1,read,o1), B=(s1,write,o1), C=(s2,read,o1)
pub async fn scenario(backend: &dyn PermissionBackend) {
    let fixtures = Fixtures::new();
    let (s1, s2, o1) = (fixtures.subject_one(), fixtures.subject_two(), fixtures.object_a());
    let a = Triple::new(s1, READ, o1);
    let b = Triple::new(s1, WRITE, o1);
    let c = Triple::new(s2, READ, o1);
    seed(backend, &[a.clone(), b.clone(), c.clone()]).await;

    let by_subject = backend
        .read(&Filter::all().with_subjects([s1]))
        .await
        .expect("read by subject");
    assert_eq!(by_subject, set([a.clone(), b.clone()]), "{}", backend.name());

    let by_predicate = backend
        .read(&Filter::all().with_predicates([READ]))
        .await
        .expect("read by predicate");
    assert_eq!(by_predicate, set([a.clone(), c.clone()]), "{}", backend.name());

    let deleted = backend
        .delete(&Filter::all().with_subjects([s1]).with_predicates([WRITE]))
        .await
        .expect("delete");
    assert_eq!(deleted, set([b]), "{}", backend.name());

    assert_eq!(read_all(backend).await, set([a, c]), "{}", backend.name());
}
