//! Stress tests for SimpleDB.
//!
//! These helpers drive a collection from several threads at once and
//! collect what happened, so callers can assert on uniqueness and
//! conflict outcomes.

use simpledb_core::{ErrorKind, IdAlgorithm, RawCollection, Store};
use simpledb_storage::AtomicWriter;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 250,
            threads: 4,
        }
    }
}

/// Outcome of [`stress_concurrent_creates`].
#[derive(Debug, Clone)]
pub struct CreateStressResult {
    /// Throughput and failure counts.
    pub result: StressTestResult,
    /// Every id returned by a successful create.
    pub ids: Vec<String>,
}

impl CreateStressResult {
    /// Returns the number of distinct ids handed out.
    pub fn distinct_ids(&self) -> usize {
        self.ids.iter().collect::<BTreeSet<_>>().len()
    }
}

/// Creates records with generated ids from every thread at once.
pub fn stress_concurrent_creates(
    collection: &RawCollection,
    config: &StressConfig,
) -> CreateStressResult {
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(config.threads));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let collection = collection.clone();
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let operations = config.operations;

            thread::spawn(move || {
                barrier.wait();
                let mut ids = Vec::with_capacity(operations);
                for i in 0..operations {
                    let data = format!(r#"{{"thread":{t},"op":{i}}}"#);
                    match collection.create(data.as_bytes()) {
                        Ok(id) => ids.push(id),
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                ids
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.extend(handle.join().expect("Thread panicked"));
    }

    CreateStressResult {
        result: StressTestResult::new(ids.len(), failed.load(Ordering::Relaxed), start.elapsed()),
        ids,
    }
}

/// Outcome of [`stress_create_with_id_race`].
#[derive(Debug, Clone, Default)]
pub struct RaceResult {
    /// Creates that succeeded.
    pub winners: usize,
    /// Creates rejected with `AlreadyExists`.
    pub conflicts: usize,
    /// Creates that failed any other way.
    pub errors: usize,
}

/// Has every thread call `create_with_id` for the same `ids`.
///
/// With correct exclusive creation there is exactly one winner per id.
pub fn stress_create_with_id_race(
    collection: &RawCollection,
    ids: &[String],
    threads: usize,
) -> RaceResult {
    let winners = Arc::new(AtomicUsize::new(0));
    let conflicts = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(threads));
    let ids: Arc<[String]> = ids.into();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let collection = collection.clone();
            let ids = Arc::clone(&ids);
            let barrier = Arc::clone(&barrier);
            let counters = (
                Arc::clone(&winners),
                Arc::clone(&conflicts),
                Arc::clone(&errors),
            );

            thread::spawn(move || {
                barrier.wait();
                for id in ids.iter() {
                    let data = format!(r#"{{"writer":{t}}}"#);
                    let counter = match collection.create_with_id(id, data.as_bytes()) {
                        Ok(()) => &counters.0,
                        Err(e) if e.kind() == ErrorKind::AlreadyExists => &counters.1,
                        Err(_) => &counters.2,
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    RaceResult {
        winners: winners.load(Ordering::Relaxed),
        conflicts: conflicts.load(Ordering::Relaxed),
        errors: errors.load(Ordering::Relaxed),
    }
}

/// Runs a mixed create/read/update/delete workload against `collection`
/// from several threads. Each thread works on its own ids, so every
/// operation is expected to succeed.
pub fn stress_mixed_operations(collection: &RawCollection, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let collection = collection.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;

            thread::spawn(move || {
                for i in 0..operations {
                    let id = format!("t{t}-{}", i / 4);
                    let data = format!(r#"{{"step":{i}}}"#);
                    let result = match i % 4 {
                        0 => collection.create_with_id(&id, data.as_bytes()),
                        1 => collection.read(&id).map(|_| ()),
                        2 => collection.update(&id, data.as_bytes()),
                        _ => collection.delete(&id),
                    };
                    let counter = if result.is_ok() { &successful } else { &failed };
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Outcome of [`stress_fix_during_registration`].
#[derive(Debug, Clone)]
pub struct RegistrationStressResult {
    /// Collections added plus records created, and failures among them.
    pub result: StressTestResult,
    /// Ids returned by the concurrent creates.
    pub ids: Vec<String>,
    /// Fix passes completed while the writers ran.
    pub fix_passes: usize,
}

/// Adds `collections` collections named `r0`, `r1`, ... with `algorithm`
/// while other threads create records in `sequenced` and one thread runs
/// Fix in a loop until the writers are done.
pub fn stress_fix_during_registration(
    store: &Store,
    sequenced: &str,
    collections: usize,
    algorithm: IdAlgorithm,
    config: &StressConfig,
) -> RegistrationStressResult {
    let writers_done = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let failed = AtomicUsize::new(0);
    let fix_passes = AtomicUsize::new(0);
    let writers = config.threads + 1;
    let start = Instant::now();

    let ids = thread::scope(|scope| {
        scope.spawn(|| {
            while !stop.load(Ordering::SeqCst) {
                if store.fix().is_ok() {
                    fix_passes.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        let registrar = scope.spawn(|| {
            for i in 0..collections {
                if store.add_collection(&format!("r{i}"), algorithm).is_err() {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            if writers_done.fetch_add(1, Ordering::SeqCst) + 1 == writers {
                stop.store(true, Ordering::SeqCst);
            }
        });

        let creators: Vec<_> = (0..config.threads)
            .map(|t| {
                let collection = store.raw_collection(sequenced);
                let (failed, writers_done, stop) = (&failed, &writers_done, &stop);
                scope.spawn(move || {
                    let mut ids = Vec::with_capacity(config.operations);
                    for i in 0..config.operations {
                        let data = format!(r#"{{"thread":{t},"op":{i}}}"#);
                        match collection.create(data.as_bytes()) {
                            Ok(id) => ids.push(id),
                            Err(_) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    if writers_done.fetch_add(1, Ordering::SeqCst) + 1 == writers {
                        stop.store(true, Ordering::SeqCst);
                    }
                    ids
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in creators {
            ids.extend(handle.join().expect("Thread panicked"));
        }
        registrar.join().expect("Thread panicked");
        ids
    });

    let failed = failed.load(Ordering::Relaxed);
    let successful = (collections + config.threads * config.operations).saturating_sub(failed);
    RegistrationStressResult {
        result: StressTestResult::new(successful, failed, start.elapsed()),
        ids,
        fix_passes: fix_passes.load(Ordering::Relaxed),
    }
}

/// Races `threads` exclusive creates of the same file at the storage
/// layer. Returns how many succeeded.
pub fn stress_exclusive_creates(path: &Path, threads: usize) -> usize {
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let path = path.to_path_buf();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                AtomicWriter::new(false)
                    .create(&path, format!("{t}").as_bytes())
                    .is_ok()
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .filter(|won| *won)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestStore;
    use simpledb_core::IdAlgorithm;

    #[test]
    fn test_concurrent_sequential_creates() {
        let test_store = TestStore::new();
        test_store.add_collection("seq", IdAlgorithm::Seq10).unwrap();
        let config = StressConfig {
            operations: 50,
            threads: 4,
        };

        let outcome = stress_concurrent_creates(&test_store.raw_collection("seq"), &config);
        outcome.result.print_summary("concurrent sequential creates");
        assert_eq!(outcome.result.failed_ops, 0);
        assert_eq!(outcome.distinct_ids(), 200);
        assert!(outcome.ids.contains(&"0000000200".to_string()));
    }

    #[test]
    fn test_concurrent_random_creates() {
        let test_store = TestStore::new();
        test_store.add_collection("rnd", IdAlgorithm::Cuid2).unwrap();

        let outcome =
            stress_concurrent_creates(&test_store.raw_collection("rnd"), &StressConfig::default());
        assert_eq!(outcome.result.failed_ops, 0);
        assert_eq!(outcome.distinct_ids(), 1000);
        assert_eq!(test_store.raw_collection("rnd").count().unwrap(), 1000);
    }

    #[test]
    fn test_create_with_id_race_has_one_winner() {
        let test_store = TestStore::new();
        test_store.add_collection("race", IdAlgorithm::Custom).unwrap();
        let ids: Vec<String> = (0..20).map(|i| format!("id{i}")).collect();

        let race = stress_create_with_id_race(&test_store.raw_collection("race"), &ids, 6);
        assert_eq!(race.winners, 20);
        assert_eq!(race.conflicts, 20 * 5);
        assert_eq!(race.errors, 0);
    }

    #[test]
    fn test_mixed_operations() {
        let test_store = TestStore::new();
        test_store.add_collection("mixed", IdAlgorithm::Custom).unwrap();

        let result = stress_mixed_operations(&test_store.raw_collection("mixed"), &StressConfig::default());
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1000);
        assert_eq!(test_store.raw_collection("mixed").count().unwrap(), 0);
    }

    #[test]
    fn test_fix_during_registration() {
        let test_store = TestStore::new();
        test_store.add_collection("seq", IdAlgorithm::Seq10).unwrap();
        let config = StressConfig {
            operations: 30,
            threads: 2,
        };

        let outcome = stress_fix_during_registration(&test_store, "seq", 40, IdAlgorithm::Cuid2, &config);
        outcome.result.print_summary("fix during registration");
        assert_eq!(outcome.result.failed_ops, 0);
        assert_eq!(outcome.ids.iter().collect::<BTreeSet<_>>().len(), 60);
        assert_eq!(test_store.collections().unwrap().len(), 41);
    }

    #[test]
    fn test_exclusive_creates() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(stress_exclusive_creates(&dir.path().join("one.json"), 8), 1);
    }
}
