//! Persisted counters for sequential ids.

use crate::error::{CoreError, CoreResult};
use simpledb_storage::{read_file, AtomicWriter};
use std::path::{Path, PathBuf};

/// Name of the counter file inside a sequential collection's directory.
pub const SEQUENCE_FILE: &str = "_seq";

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// How a counter value is written: radix and zero-padded width.
///
/// The width is the length of `u32::MAX` in the radix, so every value up to
/// the maximum has the same length and string order equals numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceFormat {
    radix: u32,
    width: usize,
}

impl SequenceFormat {
    /// Decimal, 10 digits (`4294967295`).
    pub const DECIMAL: Self = Self {
        radix: 10,
        width: 10,
    };

    /// Lowercase base-36, 7 digits (`1z141z3`).
    pub const BASE36: Self = Self { radix: 36, width: 7 };

    /// Largest value a counter may reach.
    pub const MAX_VALUE: u64 = u32::MAX as u64;

    /// Returns the radix.
    #[must_use]
    pub const fn radix(&self) -> u32 {
        self.radix
    }

    /// Returns the padded width.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Formats `value` zero-padded to the width.
    #[must_use]
    pub fn format(&self, mut value: u64) -> String {
        let radix = u64::from(self.radix);
        let mut digits = Vec::with_capacity(self.width);
        while value > 0 {
            digits.push(DIGITS[(value % radix) as usize]);
            value /= radix;
        }
        while digits.len() < self.width {
            digits.push(b'0');
        }
        digits.reverse();
        digits.into_iter().map(char::from).collect()
    }

    /// Parses a padded value. Surrounding whitespace is ignored.
    ///
    /// Returns `None` unless the text has exactly the format's width, uses
    /// only this radix's lowercase digits, and fits in [`Self::MAX_VALUE`].
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.len() != self.width {
            return None;
        }

        let mut value: u64 = 0;
        for b in text.bytes() {
            let digit = DIGITS[..self.radix as usize].iter().position(|&d| d == b)?;
            value = value * u64::from(self.radix) + digit as u64;
        }
        (value <= Self::MAX_VALUE).then_some(value)
    }

    /// Guesses the format of an existing counter file's content from its
    /// width.
    #[must_use]
    pub fn infer(text: &str) -> Option<Self> {
        [Self::DECIMAL, Self::BASE36]
            .into_iter()
            .find(|f| f.parse(text).is_some())
    }
}

/// The counter file of one sequential collection.
///
/// This type does no locking; callers serialize [`next`](Self::next)
/// through the collection's sequence lock.
#[derive(Debug, Clone)]
pub struct SequenceFile {
    path: PathBuf,
    format: SequenceFormat,
}

impl SequenceFile {
    /// Creates a handle for the counter at `path`.
    #[must_use]
    pub fn new(path: PathBuf, format: SequenceFormat) -> Self {
        Self { path, format }
    }

    /// Returns the counter file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the counter format.
    #[must_use]
    pub fn format(&self) -> SequenceFormat {
        self.format
    }

    /// Reads the last issued value; `None` if the file does not exist.
    pub fn read(&self) -> CoreResult<Option<u64>> {
        let bytes = match read_file(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let text = std::str::from_utf8(&bytes)
            .map_err(|_| CoreError::corrupt_sequence(&self.path, "not UTF-8"))?;
        self.format.parse(text).map(Some).ok_or_else(|| {
            CoreError::corrupt_sequence(
                &self.path,
                format!("expected {} base-{} digits", self.format.width, self.format.radix),
            )
        })
    }

    /// Atomically stores `value`, replacing any previous content.
    pub fn store(&self, writer: &AtomicWriter, value: u64) -> CoreResult<()> {
        writer.write(&self.path, self.line(value).as_bytes())?;
        Ok(())
    }

    /// Creates the counter file with `value` unless one already exists.
    ///
    /// Returns `true` if the file was created.
    pub fn init(&self, writer: &AtomicWriter, value: u64) -> CoreResult<bool> {
        match writer.create(&self.path, self.line(value).as_bytes()) {
            Ok(()) => Ok(true),
            Err(e) if e.is_already_exists() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Increments the counter, persists it, and returns the new value.
    ///
    /// A missing counter file counts as zero.
    pub fn next(&self, writer: &AtomicWriter, collection: &str) -> CoreResult<u64> {
        let current = match self.read()? {
            Some(value) => value,
            None => {
                tracing::warn!(
                    collection,
                    path = %self.path.display(),
                    "sequence file missing, starting from zero"
                );
                0
            }
        };

        if current >= SequenceFormat::MAX_VALUE {
            return Err(CoreError::SequenceExhausted {
                collection: collection.to_string(),
            });
        }

        let next = current + 1;
        self.store(writer, next)?;
        Ok(next)
    }

    fn line(&self, value: u64) -> String {
        format!("{}\n", self.format.format(value))
    }
}
