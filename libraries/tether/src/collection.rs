//! A collection is one independently synced data set, plus the rules for merging its two copies.

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};

use crate::remote::Order;

/// The outcome of merging a remote copy with a local copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Merged<V, R> {
    /// The unified view, to become the new local copy.
    pub value: V,
    /// Rows the remote store is missing. Empty when remote already has everything.
    pub upload: Vec<R>,
}

pub trait Collection {
    /// Name of the local snapshot and of the collection in sync status.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Columns the upsert conflicts on, always starting with `user_id`.
    const CONFLICT_KEY: &'static [&'static str];
    const ORDER_BY: &'static [(&'static str, Order)] = &[];

    type Value: Serialize + DeserializeOwned + Default + Clone + PartialEq + Debug;
    type Row: Serialize + DeserializeOwned + Clone + Debug;

    fn from_rows(rows: Vec<Self::Row>) -> Self::Value;

    /// Must be deterministic, and must produce no upload once remote holds the merged view.
    fn merge(user_id: &str, remote: &Self::Value, local: &Self::Value)
    -> Merged<Self::Value, Self::Row>;

    /// Applied to every value before it is stored locally (sorting, retention caps).
    fn normalize(value: Self::Value) -> Self::Value {
        value
    }
}
