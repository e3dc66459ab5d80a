//! End-to-end tests for check, fix and store lifecycle.

use simpledb_core::{tid62_at, CheckOptions, ErrorKind, IdAlgorithm, ProblemKind, Registry, Store};
use simpledb_testkit::prelude::*;
use simpledb_testkit::scenarios::{multi_collection_store, populated_store, POPULATED_COLLECTION};
use std::fs;

#[test]
fn removed_collection_directory_is_recreated() {
    let test_store = populated_store(3);
    let registry_before = fs::read(test_store.path().join("_registry.json")).unwrap();
    fs::remove_dir_all(test_store.path().join(POPULATED_COLLECTION)).unwrap();

    let report = test_store.check().unwrap();
    assert_eq!(report.problems.len(), 1);
    assert_eq!(report.problems[0].kind, ProblemKind::MissingDirectory);

    let fixed = test_store.fix().unwrap();
    assert_eq!(fixed.fixed, 1);
    assert_eq!(fixed.unresolved().count(), 0);
    assert!(test_store.path().join(POPULATED_COLLECTION).is_dir());
    assert_eq!(
        fs::read(test_store.path().join("_registry.json")).unwrap(),
        registry_before
    );

    assert!(test_store.check().unwrap().is_clean());
}

#[test]
fn deep_check_of_every_algorithm_is_clean() {
    let (test_store, names) = multi_collection_store();
    let report = test_store
        .check_with(&CheckOptions::new().deep(true))
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.problems);

    let test_store = test_store.reopen();
    assert_eq!(test_store.collections().unwrap().len(), names.len());
}

#[test]
fn orphan_directory_is_registered_by_fix() {
    let test_store = TestStore::new();
    let orphan = test_store.path().join("legacy");
    fs::create_dir(&orphan).unwrap();
    fs::write(orphan.join("_seq"), "0000000002").unwrap();
    fs::write(orphan.join("0000000001.json"), "{}").unwrap();
    fs::write(orphan.join("0000000002.json"), "{}").unwrap();

    let report = test_store.check().unwrap();
    assert_eq!(report.of_kind(ProblemKind::OrphanDirectory).count(), 1);

    test_store.fix().unwrap();
    assert_eq!(
        test_store.collection_metadata("legacy").unwrap().algorithm().unwrap(),
        IdAlgorithm::Seq10
    );
    assert_eq!(
        test_store.raw_collection("legacy").create(b"{}").unwrap(),
        "0000000003"
    );

    let on_disk = Registry::decode(&fs::read(test_store.path().join("_registry.json")).unwrap())
        .unwrap();
    assert!(on_disk.contains("legacy"));
}

#[test]
fn sequence_behind_is_only_found_by_deep_check() {
    let test_store = populated_store(5);
    let seq = test_store.path().join(POPULATED_COLLECTION).join("_seq");
    fs::write(&seq, "0000000002").unwrap();

    assert!(test_store.check().unwrap().is_clean());

    let deep = CheckOptions::new().deep(true);
    let report = test_store.check_with(&deep).unwrap();
    assert_eq!(report.of_kind(ProblemKind::SequenceBehind).count(), 1);

    test_store.fix_with(&deep).unwrap();
    assert_eq!(fs::read_to_string(&seq).unwrap().trim(), "0000000005");
    assert_eq!(
        test_store.raw_collection(POPULATED_COLLECTION).create(b"{}").unwrap(),
        "0000000006"
    );
}

#[test]
fn scoped_check_ignores_other_collections() {
    let (test_store, _) = multi_collection_store();
    fs::remove_dir_all(test_store.path().join("seq10items")).unwrap();

    let scoped = CheckOptions::new().collection("cuid2items");
    assert!(test_store.check_with(&scoped).unwrap().is_clean());

    let scoped = CheckOptions::new().collection("seq10items");
    assert_eq!(test_store.check_with(&scoped).unwrap().problems.len(), 1);
}

#[test]
fn sequential_ids_survive_deletes_and_reopen() {
    let test_store = TestStore::new();
    test_store.add_collection("seq", IdAlgorithm::Seq10).unwrap();
    let seq = test_store.raw_collection("seq");

    assert_eq!(seq.create(b"{}").unwrap(), "0000000001");
    assert_eq!(seq.create(b"{}").unwrap(), "0000000002");
    assert_eq!(seq.create(b"{}").unwrap(), "0000000003");
    seq.delete("0000000002").unwrap();
    assert_eq!(seq.create(b"{}").unwrap(), "0000000004");

    let test_store = test_store.reopen();
    let seq = test_store.raw_collection("seq");
    assert_eq!(seq.create(b"{}").unwrap(), "0000000005");
    assert!(!seq.exists("0000000002").unwrap());
    assert_eq!(
        seq.read("0000000002").map_err(|e| e.kind()),
        Err(ErrorKind::NotFound)
    );
}

#[test]
fn tid62_ids_sort_by_time() {
    let earlier = tid62_at(1_700_000_000);
    let later = tid62_at(1_700_000_001);
    assert_eq!(earlier.len(), 17);
    assert!(earlier < later);
}

#[test]
fn closed_store_rejects_everything_but_close() {
    let test_store = populated_store(1);
    let items = test_store.raw_collection(POPULATED_COLLECTION);
    test_store.close();
    test_store.close();

    assert!(!test_store.is_open());
    assert_eq!(items.count().map_err(|e| e.kind()), Err(ErrorKind::Closed));
    assert_eq!(
        items.create(b"{}").map_err(|e| e.kind()),
        Err(ErrorKind::Closed)
    );
    assert_eq!(
        test_store.collections().map_err(|e| e.kind()),
        Err(ErrorKind::Closed)
    );
    assert_eq!(
        test_store.check().map(|_| ()).map_err(|e| e.kind()),
        Err(ErrorKind::Closed)
    );
}

#[test]
fn second_open_of_locked_store_fails() {
    let test_store = TestStore::new();
    let second = Store::open_with_config(test_store.path(), test_config());
    assert!(second.is_err());
}

#[test]
fn concurrent_creates_across_threads_are_unique() {
    let test_store = TestStore::new();
    test_store.add_collection("shared", IdAlgorithm::Seq36).unwrap();

    let outcome = stress_concurrent_creates(
        &test_store.raw_collection("shared"),
        &StressConfig {
            operations: 40,
            threads: 8,
        },
    );
    assert_eq!(outcome.result.failed_ops, 0);
    assert_eq!(outcome.distinct_ids(), 320);
    assert!(test_store
        .check_with(&CheckOptions::new().deep(true))
        .unwrap()
        .is_clean());
}

#[test]
fn fix_loop_leaves_concurrent_registrations_alone() {
    let test_store = TestStore::new();
    test_store.add_collection("ledger", IdAlgorithm::Seq10).unwrap();

    let outcome = stress_fix_during_registration(
        &test_store,
        "ledger",
        120,
        IdAlgorithm::Cuid2,
        &StressConfig {
            operations: 40,
            threads: 3,
        },
    );
    assert_eq!(outcome.result.failed_ops, 0);
    assert_eq!(
        outcome.ids.iter().collect::<std::collections::BTreeSet<_>>().len(),
        120
    );

    let test_store = test_store.reopen();
    for i in 0..120 {
        let name = format!("r{i}");
        assert_eq!(
            test_store.collection_metadata(&name).unwrap().algorithm().unwrap(),
            IdAlgorithm::Cuid2,
            "{name}"
        );
    }
    assert_eq!(
        test_store.raw_collection("ledger").create(b"{}").unwrap(),
        "0000000121"
    );
    assert!(test_store
        .check_with(&CheckOptions::new().deep(true))
        .unwrap()
        .is_clean());
}
