//! Typed collection implementation.

use crate::collection::{Ids, RawCollection, TypedItems};
use crate::error::CoreResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// A typed view of a collection.
///
/// `Collection<T>` serializes `T` with `serde_json` and delegates to
/// [`RawCollection`]. `T` must serialize to a JSON object. On read the
/// object carries the record id in its `id` field, so `T` may declare an
/// `id: String` field (it is stripped again on write) or ignore it.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use simpledb_core::{IdAlgorithm, Store};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     #[serde(default, skip_serializing_if = "String::is_empty")]
///     id: String,
///     name: String,
/// }
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = Store::open(dir.path()).unwrap();
/// store.add_collection("users", IdAlgorithm::Cuid2).unwrap();
///
/// let users = store.collection::<User>("users");
/// let id = users.create(&User { id: String::new(), name: "Ann".into() }).unwrap();
///
/// let user = users.read(&id).unwrap();
/// assert_eq!(user.id, id);
/// assert_eq!(user.name, "Ann");
/// ```
pub struct Collection<T> {
    raw: RawCollection,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.raw.name())
            .finish()
    }
}

impl<T> Collection<T> {
    pub(crate) fn new(raw: RawCollection) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.raw.name()
    }

    /// Returns the underlying byte-level handle.
    #[must_use]
    pub fn raw(&self) -> &RawCollection {
        &self.raw
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    /// Stores `value` under a newly generated id and returns the id.
    pub fn create(&self, value: &T) -> CoreResult<String> {
        self.raw.create(&serde_json::to_vec(value)?)
    }

    /// Stores `value` under `id`.
    pub fn create_with_id(&self, id: &str, value: &T) -> CoreResult<()> {
        self.raw.create_with_id(id, &serde_json::to_vec(value)?)
    }

    /// Reads and deserializes a record.
    pub fn read(&self, id: &str) -> CoreResult<T> {
        let bytes = self.raw.read(id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replaces an existing record.
    pub fn update(&self, id: &str, value: &T) -> CoreResult<()> {
        self.raw.update(id, &serde_json::to_vec(value)?)
    }

    /// Deletes a record.
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        self.raw.delete(id)
    }

    /// Returns true if a record with `id` exists.
    pub fn exists(&self, id: &str) -> CoreResult<bool> {
        self.raw.exists(id)
    }

    /// Returns the number of records.
    pub fn count(&self) -> CoreResult<usize> {
        self.raw.count()
    }

    /// Returns a cursor over record ids `>= start`.
    pub fn ids(&self, start: &str) -> CoreResult<Ids> {
        self.raw.ids(start)
    }

    /// Returns a cursor over deserialized records with ids `>= start`.
    ///
    /// Filtering is done with ordinary iterator adapters:
    ///
    /// ```rust,ignore
    /// let adults: Vec<User> = users
    ///     .items("")?
    ///     .filter_map(Result::ok)
    ///     .map(|(_, user)| user)
    ///     .filter(|u| u.age >= 18)
    ///     .collect();
    /// ```
    pub fn items(&self, start: &str) -> CoreResult<TypedItems<T>> {
        Ok(TypedItems::new(self.raw.items(start)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::ErrorKind;
    use crate::id::IdAlgorithm;
    use crate::store::Store;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        id: String,
        customer: String,
        total: u64,
    }

    fn invoice(customer: &str, total: u64) -> Invoice {
        Invoice {
            id: String::new(),
            customer: customer.to_string(),
            total,
        }
    }

    #[test]
    fn typed_crud() {
        let dir = tempdir().unwrap();
        let store = Store::open_with_config(dir.path(), Config::default().sync_writes(false)).unwrap();
        store.add_collection("invoices", IdAlgorithm::Seq36).unwrap();
        let invoices = store.collection::<Invoice>("invoices");

        let id = invoices.create(&invoice("acme", 10)).unwrap();
        assert_eq!(id, "0000001");

        let mut stored = invoices.read(&id).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.total, 10);

        // The id field matches the target and is accepted.
        stored.total = 25;
        invoices.update(&id, &stored).unwrap();
        assert_eq!(invoices.read(&id).unwrap().total, 25);

        invoices.delete(&id).unwrap();
        assert!(!invoices.exists(&id).unwrap());
        assert_eq!(invoices.read(&id).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn typed_items_in_id_order() {
        let dir = tempdir().unwrap();
        let store = Store::open_with_config(dir.path(), Config::default().sync_writes(false)).unwrap();
        store.add_collection("invoices", IdAlgorithm::Custom).unwrap();
        let invoices = store.collection::<Invoice>("invoices");

        invoices.create_with_id("b", &invoice("beta", 2)).unwrap();
        invoices.create_with_id("a", &invoice("alpha", 1)).unwrap();
        invoices.create_with_id("c", &invoice("gamma", 3)).unwrap();

        let customers: Vec<String> = invoices
            .items("")
            .unwrap()
            .map(|r| r.unwrap().1.customer)
            .collect();
        assert_eq!(customers, vec!["alpha", "beta", "gamma"]);

        let big: u64 = invoices
            .items("b")
            .unwrap()
            .map(|r| r.unwrap().1.total)
            .sum();
        assert_eq!(big, 5);
        assert_eq!(invoices.count().unwrap(), 3);
    }

    #[test]
    fn non_object_values_are_rejected() {
        let dir = tempdir().unwrap();
        let store = Store::open_with_config(dir.path(), Config::default().sync_writes(false)).unwrap();
        store.add_collection("numbers", IdAlgorithm::Tid62).unwrap();
        let numbers = store.collection::<u64>("numbers");

        assert_eq!(numbers.create(&7).unwrap_err().kind(), ErrorKind::InvalidInput);
    }
}
