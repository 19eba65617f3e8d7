//! # Reconciliation passes
//! One pass for one collection runs: fetch remote -> read local -> merge -> upload delta -> write back.
//! A pass never returns an error. Failures are logged, recorded on the [`SyncBoard`] and in the
//! returned [`SyncReport`], and the local copy is left as it was (or improved, never damaged).
//!
//! Passes for different collections may run concurrently on one thread; they touch disjoint keys.
//! Two passes for the same collection may also interleave. That is tolerated rather than
//! prevented: uploads are idempotent upserts and the final local write is last-write-wins.

use std::cell::RefCell;

use chrono::Utc;

use crate::{
    UserContext,
    collection::{Collection, Merged},
    remote::{Filter, RemoteError, RemoteStore},
    snapshot::{LocalSnapshots, SnapshotStore, StorageError},
    status::SyncBoard,
};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    pub collection: &'static str,
    /// No user was signed in, so nothing was attempted.
    pub skipped: bool,
    pub uploaded: usize,
    /// Whether the local copy was rewritten.
    pub changed_locally: bool,
    pub error: Option<String>,
}

impl SyncReport {
    fn new(collection: &'static str) -> Self {
        Self {
            collection,
            skipped: false,
            uploaded: 0,
            changed_locally: false,
            error: None,
        }
    }

    fn skipped(collection: &'static str) -> Self {
        Self {
            skipped: true,
            ..Self::new(collection)
        }
    }

    pub fn succeeded(&self) -> bool {
        !self.skipped && self.error.is_none()
    }
}

#[derive(Debug)]
pub struct Reconciler<S, R> {
    local: LocalSnapshots<S>,
    remote: R,
    // never hold a borrow of this across an .await
    board: RefCell<SyncBoard>,
}

impl<S: SnapshotStore, R: RemoteStore> Reconciler<S, R> {
    pub fn new(local: LocalSnapshots<S>, remote: R) -> Self {
        Self {
            local,
            remote,
            board: RefCell::new(SyncBoard::default()),
        }
    }

    pub fn local(&self) -> &LocalSnapshots<S> {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn board(&self) -> &RefCell<SyncBoard> {
        &self.board
    }

    /// The local copy of `C`. Always succeeds.
    pub fn load<C: Collection>(&self) -> C::Value {
        C::normalize(self.local.read(C::NAME))
    }

    /// Replace the local copy of `C`, normalized.
    pub fn save<C: Collection>(&self, value: C::Value) -> Result<(), StorageError> {
        self.local.write(C::NAME, &C::normalize(value))
    }

    /// Run one reconciliation pass for `C`. Without a user this is a no-op.
    pub async fn reconcile<C: Collection>(&self, user: Option<&UserContext>) -> SyncReport {
        let Some(user) = user else {
            log::debug!("No signed-in user, skipping {} sync", C::NAME);
            return SyncReport::skipped(C::NAME);
        };

        self.board.borrow_mut().mark_sync_started(C::NAME, Utc::now());
        self.flush_notifications();

        let report = self.reconcile_inner::<C>(user).await;

        self.board.borrow_mut().mark_sync_finished(
            C::NAME,
            Utc::now(),
            report.uploaded,
            report.error.clone(),
        );
        self.flush_notifications();

        report
    }

    async fn reconcile_inner<C: Collection>(&self, user: &UserContext) -> SyncReport {
        let mut report = SyncReport::new(C::NAME);

        // 1) Fetch. Without a trustworthy remote view there is nothing safe to upload.
        let remote = match self.fetch::<C>(user).await {
            Ok(remote) => remote,
            Err(e) => {
                log::warn!("Failed to fetch {} from remote, keeping local copy: {e}", C::NAME);
                report.error = Some(e.to_string());
                return report;
            }
        };

        // 2) Merge against the local copy
        let local = self.load::<C>();
        let Merged { value, upload } = C::merge(&user.user_id, &remote, &local);

        // 3) Upload what remote is missing
        if !upload.is_empty() {
            let count = upload.len();
            match self.upload::<C>(upload).await {
                Ok(()) => {
                    log::info!("Uploaded {count} {} row(s)", C::NAME);
                    report.uploaded = count;
                }
                Err(e) => {
                    // the merged view still holds the local-only items, so the next pass retries
                    log::warn!("Failed to upload {} row(s) of {}: {e}", count, C::NAME);
                    report.error = Some(e.to_string());
                }
            }
        }

        // 4) Write the merged view back
        let value = C::normalize(value);
        if value != local {
            match self.local.write(C::NAME, &value) {
                Ok(()) => report.changed_locally = true,
                Err(e) => {
                    log::warn!("Failed to write merged {} locally: {e}", C::NAME);
                    report.error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        report
    }

    async fn fetch<C: Collection>(&self, user: &UserContext) -> Result<C::Value, RemoteError> {
        let mut filter = Filter::new().eq("user_id", user.user_id.as_str());
        for (column, order) in C::ORDER_BY {
            filter = filter.order_by(*column, *order);
        }

        let rows = self.remote.select_rows(C::TABLE, &filter).await?;
        let rows = rows
            .into_iter()
            .map(serde_json::from_value::<C::Row>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(C::from_rows(rows))
    }

    async fn upload<C: Collection>(&self, rows: Vec<C::Row>) -> Result<(), RemoteError> {
        let rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.remote
            .upsert_rows(C::TABLE, rows, C::CONFLICT_KEY)
            .await
    }

    /// Best-effort removal of the rows matching `eq` (scoped to `user`) from `C`'s table.
    /// Returns whether the remote store confirmed the delete.
    pub async fn remove_remote<C: Collection>(
        &self,
        user: Option<&UserContext>,
        eq: &[(&str, String)],
    ) -> bool {
        let Some(user) = user else {
            return false;
        };

        let filter = eq.iter().fold(
            Filter::new().eq("user_id", user.user_id.as_str()),
            |filter, (column, value)| filter.eq(*column, value.as_str()),
        );

        match self.remote.delete_rows(C::TABLE, &filter).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to delete from remote {}: {e}", C::NAME);
                false
            }
        }
    }

    /// Run queued status listeners. Never called with the board borrowed.
    pub fn flush_notifications(&self) {
        let notifications = self.board.borrow_mut().drain_due_notifications();
        for notification in notifications {
            notification();
        }
    }
}
