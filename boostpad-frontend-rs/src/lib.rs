pub mod collections;
pub mod config;
pub mod gating;
pub mod packs;
pub mod streaks;

#[cfg(all(target_arch = "wasm32", feature = "supabase"))]
mod web;

use std::{collections::BTreeMap, sync::LazyLock};

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use tether::{
    Collection, ListenerKey, LocalSnapshots, Merged, Reconciler, RemoteStore, SnapshotStore,
    StorageError, SyncReport, SyncStatus, UserContext,
};
use training_utils::{FocusTag, Pack, PlanLimits, PlanTier, RankSnapshot, SessionAnnotation};

pub use collections::{
    Annotations, Completions, DrillQueue, PackProgress, RANK_HISTORY_CAP, RankSnapshots,
    SavedDrills,
};
pub use config::SyncConfig;
pub use packs::{PackStatus, PackSummary};
pub use streaks::{FocusBreakdown, Streaks};

#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    #[error("your plan allows at most {limit} {what}")]
    Reached { what: &'static str, limit: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// a static, so that the logger is only ever initialized once
static LOGGER: LazyLock<()> = LazyLock::new(|| {
    #[cfg(target_arch = "wasm32")]
    {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::default());
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        // tests and other hosts may have installed a logger already
        let _ = env_logger::try_init();
    }
    log::info!("Logging initialized");
});

/// The app core. Every mutation goes to the local snapshot first; syncing is separate and
/// best-effort. One instance serves one user (or the logged-out area).
#[derive(Debug)]
pub struct Boostpad<S, R> {
    sync: Reconciler<S, R>,
    user: Option<UserContext>,
    config: SyncConfig,
}

impl<S: SnapshotStore, R: RemoteStore> Boostpad<S, R> {
    /// When signed in, anything recorded while logged out on this device is folded into the
    /// user's own snapshots.
    pub fn new(store: S, remote: R, user: Option<UserContext>, config: SyncConfig) -> Self {
        LazyLock::force(&LOGGER);

        let namespace = config.namespace_for(user.as_ref().map(|user| user.user_id.as_str()));
        let this = Self {
            sync: Reconciler::new(LocalSnapshots::new(store, namespace), remote),
            user,
            config,
        };

        if this.user.is_some() {
            match this.adopt_logged_out_data() {
                Ok(0) => {}
                Ok(n) => log::info!("Adopted {n} logged-out collection(s)"),
                Err(e) => log::error!("Error importing logged out data: {e}"),
            }
        }

        this
    }

    pub fn user(&self) -> Option<&UserContext> {
        self.user.as_ref()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn remote(&self) -> &R {
        self.sync.remote()
    }

    pub fn local(&self) -> &LocalSnapshots<S> {
        self.sync.local()
    }

    pub fn load_local<C: Collection>(&self) -> C::Value {
        self.sync.load::<C>()
    }

    pub fn save_local<C: Collection>(&self, value: C::Value) -> Result<(), StorageError> {
        self.sync.save::<C>(value)
    }

    /// One pass for `C`. Never fails; check the report or the status board for errors.
    pub async fn reconcile<C: Collection>(&self) -> SyncReport {
        self.sync.reconcile::<C>(self.user.as_ref()).await
    }

    /// Passes for every collection, run concurrently. Rank history pulled back from remote is
    /// trimmed to `plan`'s retention afterwards.
    pub async fn reconcile_all(&self, plan: PlanTier) -> Vec<SyncReport> {
        let (completions, annotations, ranks, saved, queue, packs) = futures::join!(
            self.reconcile::<Completions>(),
            self.reconcile::<Annotations>(),
            self.reconcile::<RankSnapshots>(),
            self.reconcile::<SavedDrills>(),
            self.reconcile::<DrillQueue>(),
            self.reconcile::<PackProgress>(),
        );
        if let Err(e) = self.apply_rank_retention(plan) {
            log::warn!("Failed to apply rank retention after sync: {e}");
        }
        vec![completions, annotations, ranks, saved, queue, packs]
    }

    /// Returns the number of collections that had logged-out data.
    pub fn adopt_logged_out_data(&self) -> Result<usize, StorageError> {
        let logged_out = self
            .sync
            .local()
            .with_namespace(self.config.namespace_for(None));
        if logged_out.namespace() == self.sync.local().namespace() {
            return Ok(0);
        }

        let adopted = [
            self.adopt::<Completions>(&logged_out)?,
            self.adopt::<Annotations>(&logged_out)?,
            self.adopt::<RankSnapshots>(&logged_out)?,
            self.adopt::<SavedDrills>(&logged_out)?,
            self.adopt::<DrillQueue>(&logged_out)?,
            self.adopt::<PackProgress>(&logged_out)?,
        ];
        Ok(adopted.into_iter().filter(|adopted| *adopted).count())
    }

    fn adopt<C: Collection>(&self, from: &LocalSnapshots<&S>) -> Result<bool, StorageError> {
        let theirs: C::Value = from.read(C::NAME);
        if theirs == C::Value::default() {
            return Ok(false);
        }
        let user_id = self.user.as_ref().map_or("", |user| user.user_id.as_str());
        // the user's own copy plays "remote" so its ordering wins
        let Merged { value, .. } = C::merge(user_id, &self.load_local::<C>(), &theirs);
        self.save_local::<C>(value)?;
        from.clear(C::NAME)?;
        Ok(true)
    }

    // completions

    /// Returns whether the day was newly marked.
    pub fn mark_day_trained(&self, day: NaiveDate) -> Result<bool, StorageError> {
        let mut days = self.load_local::<Completions>();
        if !days.insert(day) {
            return Ok(false);
        }
        self.save_local::<Completions>(days)?;
        Ok(true)
    }

    /// Returns whether the day was marked before.
    pub async fn unmark_day(&self, day: NaiveDate) -> Result<bool, StorageError> {
        let mut days = self.load_local::<Completions>();
        if !days.remove(&day) {
            return Ok(false);
        }
        self.save_local::<Completions>(days)?;
        self.sync
            .remove_remote::<Completions>(self.user.as_ref(), &[("day", day.to_string())])
            .await;
        Ok(true)
    }

    /// Returns whether the day is trained afterwards.
    pub async fn toggle_day(&self, day: NaiveDate) -> Result<bool, StorageError> {
        if self.load_local::<Completions>().contains(&day) {
            self.unmark_day(day).await?;
            Ok(false)
        } else {
            self.mark_day_trained(day)?;
            Ok(true)
        }
    }

    pub fn annotate_day(
        &self,
        day: NaiveDate,
        focus_tags: Vec<FocusTag>,
        duration_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut annotations = self.load_local::<Annotations>();
        annotations.insert(
            day,
            SessionAnnotation {
                focus_tags,
                duration_minutes,
                // the remote store keeps microseconds; anything finer would never compare equal
                updated_at: now.trunc_subsecs(6),
            },
        );
        self.save_local::<Annotations>(annotations)
    }

    pub fn streaks(&self, today: NaiveDate) -> Streaks {
        streaks::compute_streaks(&self.load_local::<Completions>(), today)
    }

    pub fn consistency(&self, today: NaiveDate) -> u8 {
        streaks::compute_consistency(
            &self.load_local::<Completions>(),
            today,
            self.config.consistency_window_days,
        )
    }

    pub fn focus_breakdown(&self, today: NaiveDate) -> FocusBreakdown {
        streaks::focus_breakdown(
            &self.load_local::<Annotations>(),
            today,
            self.config.consistency_window_days,
        )
    }

    // ranks

    /// Saves the snapshot, syncs rank history, then applies the plan's retention.
    pub async fn log_rank(
        &self,
        snapshot: RankSnapshot,
        plan: PlanTier,
    ) -> Result<SyncReport, StorageError> {
        let mut snapshots = self.load_local::<RankSnapshots>();
        if !snapshots.contains(&snapshot) {
            snapshots.push(snapshot);
            self.save_local::<RankSnapshots>(snapshots)?;
        }

        let report = self.reconcile::<RankSnapshots>().await;
        self.apply_rank_retention(plan)?;
        Ok(report)
    }

    /// Drops local rank snapshots beyond the plan's limit, oldest first. Returns how many went.
    pub fn apply_rank_retention(&self, plan: PlanTier) -> Result<usize, StorageError> {
        let Some(limit) = PlanLimits::for_plan(plan).rank_history else {
            return Ok(0);
        };
        let mut snapshots = self.load_local::<RankSnapshots>();
        if snapshots.len() <= limit {
            return Ok(0);
        }
        let dropped = snapshots.len() - limit;
        snapshots.truncate(limit);
        self.save_local::<RankSnapshots>(snapshots)?;
        Ok(dropped)
    }

    // drills

    /// Returns whether the drill was newly saved.
    pub fn save_drill(&self, drill_id: &str, plan: PlanTier) -> Result<bool, LimitError> {
        let mut saved = self.load_local::<SavedDrills>();
        if saved.contains(drill_id) {
            return Ok(false);
        }
        if let Some(limit) = PlanLimits::for_plan(plan).saved_drills
            && saved.len() >= limit
        {
            return Err(LimitError::Reached {
                what: "saved drills",
                limit,
            });
        }
        saved.insert(drill_id.to_string());
        self.save_local::<SavedDrills>(saved)?;
        Ok(true)
    }

    pub async fn unsave_drill(&self, drill_id: &str) -> Result<bool, StorageError> {
        let mut saved = self.load_local::<SavedDrills>();
        if !saved.remove(drill_id) {
            return Ok(false);
        }
        self.save_local::<SavedDrills>(saved)?;
        self.sync
            .remove_remote::<SavedDrills>(self.user.as_ref(), &[("drill_id", drill_id.to_string())])
            .await;
        Ok(true)
    }

    /// Appends to the queue. Returns whether the drill was newly queued.
    pub fn enqueue_drill(&self, drill_id: &str, plan: PlanTier) -> Result<bool, LimitError> {
        let mut queue = self.load_local::<DrillQueue>();
        if queue.iter().any(|queued| queued == drill_id) {
            return Ok(false);
        }
        if let Some(limit) = PlanLimits::for_plan(plan).queued_drills
            && queue.len() >= limit
        {
            return Err(LimitError::Reached {
                what: "queued drills",
                limit,
            });
        }
        queue.push(drill_id.to_string());
        self.save_local::<DrillQueue>(queue)?;
        Ok(true)
    }

    pub async fn dequeue_drill(&self, drill_id: &str) -> Result<bool, StorageError> {
        let mut queue = self.load_local::<DrillQueue>();
        let before = queue.len();
        queue.retain(|queued| queued != drill_id);
        if queue.len() == before {
            return Ok(false);
        }
        self.save_local::<DrillQueue>(queue)?;
        self.sync
            .remove_remote::<DrillQueue>(self.user.as_ref(), &[("drill_id", drill_id.to_string())])
            .await;
        Ok(true)
    }

    // packs

    /// Returns whether the drill was newly completed in the pack.
    pub fn complete_pack_drill(
        &self,
        pack_id: &str,
        drill_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut progress = self.load_local::<PackProgress>();
        let newly = progress
            .entry(pack_id.to_string())
            .or_default()
            .complete_drill(drill_id, now);
        if newly {
            self.save_local::<PackProgress>(progress)?;
        }
        Ok(newly)
    }

    /// `available` should already be filtered to what the user can access.
    pub fn next_pack<'a>(&self, available: &'a [Pack]) -> Option<&'a Pack> {
        packs::recommend_next_pack(available, &self.load_local::<PackProgress>())
    }

    pub fn pack_summaries(&self, available: &[Pack]) -> Vec<PackSummary> {
        packs::summarize(available, &self.load_local::<PackProgress>())
    }

    // status

    pub fn subscribe(&self, listener: impl Fn(&str, &SyncStatus) + 'static) -> ListenerKey {
        self.sync.board().borrow_mut().register_listener(listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.sync.board().borrow_mut().unregister_listener(key)
    }

    pub fn sync_status(&self, collection: &str) -> SyncStatus {
        self.sync.board().borrow().status(collection)
    }

    pub fn sync_statuses(&self) -> BTreeMap<String, SyncStatus> {
        self.sync.board().borrow().statuses().clone()
    }
}
