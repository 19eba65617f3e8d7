//! The remote store: a user-scoped row store reachable through async select/upsert/delete.

use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    collections::BTreeMap,
};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed rows: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("remote store unavailable")]
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Equality constraints plus ordering for a select or delete.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub eq: Vec<(String, String)>,
    pub order: Vec<(String, Order)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.eq
            .iter()
            .all(|(column, expected)| row.get(column).is_some_and(|v| cell_text(v) == *expected))
    }
}

/// The text PostgREST would compare an `eq` filter against.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(a), Some(b)) => cell_text(a).cmp(&cell_text(b)),
        (None, None) => Ordering::Equal,
        // nulls sort last, as in Postgres
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn select_rows(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, RemoteError>;

    /// Insert-or-update keyed by `conflict_key`; upserting the same rows twice leaves one copy.
    async fn upsert_rows(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_key: &[&str],
    ) -> Result<(), RemoteError>;

    async fn delete_rows(&self, table: &str, filter: &Filter) -> Result<(), RemoteError>;
}

impl<R: RemoteStore> RemoteStore for &R {
    async fn select_rows(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, RemoteError> {
        (**self).select_rows(table, filter).await
    }

    async fn upsert_rows(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_key: &[&str],
    ) -> Result<(), RemoteError> {
        (**self).upsert_rows(table, rows, conflict_key).await
    }

    async fn delete_rows(&self, table: &str, filter: &Filter) -> Result<(), RemoteError> {
        (**self).delete_rows(table, filter).await
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub selects: usize,
    pub upserts: usize,
    pub deletes: usize,
}

/// In-process tables. Counts calls and can be switched offline, which makes it the test double
/// for the hosted store.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    tables: RefCell<BTreeMap<String, Vec<Value>>>,
    calls: Cell<CallCounts>,
    offline: Cell<bool>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`RemoteError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    pub fn reset_calls(&self) {
        self.calls.set(CallCounts::default());
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    /// Seed a table directly, bypassing call counting.
    pub fn insert_rows(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    fn record(&self, f: impl FnOnce(&mut CallCounts)) -> Result<(), RemoteError> {
        let mut calls = self.calls.get();
        f(&mut calls);
        self.calls.set(calls);
        if self.offline.get() {
            return Err(RemoteError::Unavailable);
        }
        Ok(())
    }
}

impl RemoteStore for MemoryRemote {
    async fn select_rows(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, RemoteError> {
        self.record(|calls| calls.selects += 1)?;

        let mut rows: Vec<Value> = self
            .tables
            .borrow()
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            filter
                .order
                .iter()
                .map(|(column, order)| {
                    let ordering = compare_cells(a.get(column), b.get(column));
                    match order {
                        Order::Ascending => ordering,
                        Order::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        Ok(rows)
    }

    async fn upsert_rows(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_key: &[&str],
    ) -> Result<(), RemoteError> {
        self.record(|calls| calls.upserts += 1)?;

        let mut tables = self.tables.borrow_mut();
        let stored = tables.entry(table.to_string()).or_default();
        for row in rows {
            let existing = stored.iter().position(|existing| {
                conflict_key
                    .iter()
                    .all(|column| existing.get(*column) == row.get(*column))
            });
            match existing {
                Some(index) => stored[index] = row,
                None => stored.push(row),
            }
        }
        Ok(())
    }

    async fn delete_rows(&self, table: &str, filter: &Filter) -> Result<(), RemoteError> {
        self.record(|calls| calls.deletes += 1)?;

        if let Some(stored) = self.tables.borrow_mut().get_mut(table) {
            stored.retain(|row| !filter.matches(row));
        }
        Ok(())
    }
}
