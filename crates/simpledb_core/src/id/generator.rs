//! Candidate id production for one collection.

use crate::error::{CoreError, CoreResult};
use crate::id::{new_cuid, new_tid62, IdAlgorithm, SequenceFile};
use parking_lot::Mutex;
use simpledb_storage::AtomicWriter;
use std::path::PathBuf;
use std::sync::Arc;

/// Produces candidate ids for a collection according to its algorithm.
///
/// Each variant carries only what it needs: nothing for the stateless
/// strategies, the counter file and its lock for sequential ones.
/// A candidate is not reserved; the caller publishes the record with an
/// exclusive create and asks for another candidate on collision.
#[derive(Debug)]
pub enum IdGenerator {
    /// Random collision-resistant ids.
    Cuid2,
    /// Time-sortable ids.
    Tid62,
    /// Counter-backed ids.
    Sequential {
        /// The collection's counter file.
        counter: SequenceFile,
        /// Serializes increment-and-persist for this collection.
        lock: Arc<Mutex<()>>,
    },
    /// Caller-supplied ids only.
    Custom,
}

impl IdGenerator {
    /// Builds the generator for `algorithm`.
    ///
    /// `counter_path` and `lock` are only used by sequential algorithms.
    #[must_use]
    pub fn new(algorithm: IdAlgorithm, counter_path: PathBuf, lock: Arc<Mutex<()>>) -> Self {
        match algorithm.sequence_format() {
            Some(format) => Self::Sequential {
                counter: SequenceFile::new(counter_path, format),
                lock,
            },
            None => match algorithm {
                IdAlgorithm::Cuid2 => Self::Cuid2,
                IdAlgorithm::Tid62 => Self::Tid62,
                _ => Self::Custom,
            },
        }
    }

    /// Returns true if generating mutates persisted state.
    #[must_use]
    pub fn requires_state(&self) -> bool {
        matches!(self, Self::Sequential { .. })
    }

    /// Produces the next candidate id.
    ///
    /// For sequential generators this increments and persists the counter
    /// inside the collection's critical section; the value is consumed even
    /// if the caller's create later fails.
    ///
    /// # Errors
    ///
    /// `GenerationUnsupported` for custom collections; counter I/O and
    /// exhaustion errors for sequential ones.
    pub fn generate(&self, writer: &AtomicWriter, collection: &str) -> CoreResult<String> {
        match self {
            Self::Cuid2 => Ok(new_cuid()),
            Self::Tid62 => Ok(new_tid62()),
            Self::Sequential { counter, lock } => {
                let _guard = lock.lock();
                let value = counter.next(writer, collection)?;
                Ok(counter.format().format(value))
            }
            Self::Custom => Err(CoreError::GenerationUnsupported {
                collection: collection.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{validate_id, CUID_LEN, SEQUENCE_FILE, TID62_LEN};
    use std::thread;
    use tempfile::tempdir;

    fn generator(alg: IdAlgorithm, dir: &std::path::Path) -> IdGenerator {
        IdGenerator::new(alg, dir.join(SEQUENCE_FILE), Arc::new(Mutex::new(())))
    }

    #[test]
    fn stateless_generators() {
        let dir = tempdir().unwrap();
        let writer = AtomicWriter::new(false);

        let cuid = generator(IdAlgorithm::Cuid2, dir.path());
        assert!(!cuid.requires_state());
        assert_eq!(cuid.generate(&writer, "c").unwrap().len(), CUID_LEN);

        let tid = generator(IdAlgorithm::Tid62, dir.path());
        assert!(!tid.requires_state());
        let id = tid.generate(&writer, "c").unwrap();
        assert_eq!(id.len(), TID62_LEN);
        assert!(validate_id(&id).is_ok());

        assert!(!dir.path().join(SEQUENCE_FILE).exists());
    }

    #[test]
    fn sequential_generators() {
        let dir = tempdir().unwrap();
        let writer = AtomicWriter::new(false);

        let seq = generator(IdAlgorithm::Seq10, dir.path());
        assert!(seq.requires_state());
        assert_eq!(seq.generate(&writer, "c").unwrap(), "0000000001");
        assert_eq!(seq.generate(&writer, "c").unwrap(), "0000000002");

        let dir36 = tempdir().unwrap();
        let seq36 = generator(IdAlgorithm::Seq36, dir36.path());
        for _ in 0..35 {
            seq36.generate(&writer, "c").unwrap();
        }
        assert_eq!(seq36.generate(&writer, "c").unwrap(), "0000010");
    }

    #[test]
    fn custom_refuses_to_generate() {
        let dir = tempdir().unwrap();
        let custom = generator(IdAlgorithm::Custom, dir.path());
        let err = custom
            .generate(&AtomicWriter::new(false), "c")
            .unwrap_err();
        assert!(matches!(err, CoreError::GenerationUnsupported { .. }));
    }

    #[test]
    fn concurrent_sequential_ids_are_unique() {
        let dir = tempdir().unwrap();
        let seq = Arc::new(generator(IdAlgorithm::Seq10, dir.path()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| seq.generate(&AtomicWriter::new(false), "c").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
        assert_eq!(ids.last().unwrap(), "0000000100");
    }
}
