//! Forward-only collection cursors.

use crate::collection::{list_record_ids, RawCollection};
use crate::error::CoreResult;
use crate::store::StoreInner;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::vec;

#[derive(Debug)]
enum CursorState {
    /// Directory not listed yet.
    Pending,
    Listed(vec::IntoIter<String>),
    Done,
}

/// Cursor over record ids in ascending byte order.
///
/// The directory is listed on the first call to `next`, so ids created or
/// deleted afterwards may or may not be observed. Once the store is closed
/// the cursor yields `Closed` once and then ends.
#[derive(Debug)]
pub struct Ids {
    inner: Arc<StoreInner>,
    dir: PathBuf,
    start: String,
    state: CursorState,
}

impl Ids {
    pub(crate) fn new(inner: Arc<StoreInner>, dir: PathBuf, start: String) -> Self {
        Self {
            inner,
            dir,
            start,
            state: CursorState::Pending,
        }
    }
}

impl Iterator for Ids {
    type Item = CoreResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, CursorState::Done) {
            return None;
        }
        if let Err(e) = self.inner.ensure_open() {
            self.state = CursorState::Done;
            return Some(Err(e));
        }

        if matches!(self.state, CursorState::Pending) {
            match list_record_ids(&self.dir, &self.start) {
                Ok(ids) => self.state = CursorState::Listed(ids.into_iter()),
                Err(e) => {
                    self.state = CursorState::Done;
                    return Some(Err(e));
                }
            }
        }

        let next = match &mut self.state {
            CursorState::Listed(ids) => ids.next(),
            _ => None,
        };
        if next.is_none() {
            self.state = CursorState::Done;
        }
        next.map(Ok)
    }
}

/// Cursor over `(id, payload)` pairs.
///
/// Each payload is read when the cursor reaches it. Records removed since
/// the listing are skipped; a corrupt record is reported as an error item
/// and iteration continues.
#[derive(Debug)]
pub struct Items {
    ids: Ids,
    collection: RawCollection,
}

impl Items {
    pub(crate) fn new(ids: Ids, collection: RawCollection) -> Self {
        Self { ids, collection }
    }
}

impl Iterator for Items {
    type Item = CoreResult<(String, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = match self.ids.next()? {
                Ok(id) => id,
                Err(e) => return Some(Err(e)),
            };
            match self.collection.read(&id) {
                Ok(payload) => return Some(Ok((id, payload))),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Cursor over deserialized records of a typed collection.
pub struct TypedItems<T> {
    items: Items,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedItems<T> {
    pub(crate) fn new(items: Items) -> Self {
        Self {
            items,
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for TypedItems<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedItems").field("items", &self.items).finish()
    }
}

impl<T: DeserializeOwned> Iterator for TypedItems<T> {
    type Item = CoreResult<(String, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, payload) = match self.items.next()? {
            Ok(item) => item,
            Err(e) => return Some(Err(e)),
        };
        Some(
            serde_json::from_slice(&payload)
                .map(|value| (id, value))
                .map_err(Into::into),
        )
    }
}
