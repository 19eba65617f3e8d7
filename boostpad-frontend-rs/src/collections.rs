//! The synced collections and their merge rules.
//!
//! | Collection     | Identity                   | Merge                                        |
//! |----------------|----------------------------|----------------------------------------------|
//! | completions    | day                        | set union                                    |
//! | annotations    | day                        | whole annotation, newest `updated_at` wins   |
//! | rank snapshots | (date, playlist, rank)     | set union, newest 50 kept locally            |
//! | saved drills   | drill id                   | set union                                    |
//! | drill queue    | drill id                   | remote order, then local-only items          |
//! | pack progress  | pack id                    | union of drills, earliest start              |

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet, HashSet},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tether::{Collection, Merged, Order};
use training_utils::{PackProgressEntry, RankSnapshot, SessionAnnotation};

/// Local rank history never grows past this, whatever the plan.
pub const RANK_HISTORY_CAP: usize = 50;

fn set_union<T: Ord + Clone, R>(
    remote: &BTreeSet<T>,
    local: &BTreeSet<T>,
    row: impl Fn(&T) -> R,
) -> Merged<BTreeSet<T>, R> {
    Merged {
        value: remote.union(local).cloned().collect(),
        upload: local.difference(remote).map(row).collect(),
    }
}

/// Days the user marked as trained.
pub struct Completions;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletionRow {
    pub user_id: String,
    pub day: NaiveDate,
}

impl Collection for Completions {
    const NAME: &'static str = "completions";
    const TABLE: &'static str = "training_completions";
    const CONFLICT_KEY: &'static [&'static str] = &["user_id", "day"];

    type Value = BTreeSet<NaiveDate>;
    type Row = CompletionRow;

    fn from_rows(rows: Vec<CompletionRow>) -> Self::Value {
        rows.into_iter().map(|row| row.day).collect()
    }

    fn merge(
        user_id: &str,
        remote: &Self::Value,
        local: &Self::Value,
    ) -> Merged<Self::Value, CompletionRow> {
        set_union(remote, local, |day| CompletionRow {
            user_id: user_id.to_string(),
            day: *day,
        })
    }
}

/// Focus tags and duration per trained day.
pub struct Annotations;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub user_id: String,
    pub day: NaiveDate,
    #[serde(flatten)]
    pub annotation: SessionAnnotation,
}

impl Collection for Annotations {
    const NAME: &'static str = "annotations";
    const TABLE: &'static str = "session_annotations";
    const CONFLICT_KEY: &'static [&'static str] = &["user_id", "day"];

    type Value = BTreeMap<NaiveDate, SessionAnnotation>;
    type Row = AnnotationRow;

    fn from_rows(rows: Vec<AnnotationRow>) -> Self::Value {
        let mut value: Self::Value = BTreeMap::new();
        for row in rows {
            match value.get(&row.day) {
                Some(existing) if existing.updated_at >= row.annotation.updated_at => {}
                _ => {
                    value.insert(row.day, row.annotation);
                }
            }
        }
        value
    }

    fn merge(
        user_id: &str,
        remote: &Self::Value,
        local: &Self::Value,
    ) -> Merged<Self::Value, AnnotationRow> {
        let mut value = remote.clone();
        let mut upload = Vec::new();

        for (day, annotation) in local {
            // ties go to remote, so an already-synced annotation is never re-sent
            if let Some(existing) = remote.get(day)
                && existing.updated_at >= annotation.updated_at
            {
                continue;
            }
            value.insert(*day, annotation.clone());
            upload.push(AnnotationRow {
                user_id: user_id.to_string(),
                day: *day,
                annotation: annotation.clone(),
            });
        }

        Merged { value, upload }
    }
}

/// Logged ranks, newest first.
pub struct RankSnapshots;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankSnapshotRow {
    pub user_id: String,
    #[serde(flatten)]
    pub snapshot: RankSnapshot,
}

impl Collection for RankSnapshots {
    const NAME: &'static str = "rank_snapshots";
    const TABLE: &'static str = "rank_snapshots";
    const CONFLICT_KEY: &'static [&'static str] = &["user_id", "date", "playlist", "rank"];

    type Value = Vec<RankSnapshot>;
    type Row = RankSnapshotRow;

    fn from_rows(rows: Vec<RankSnapshotRow>) -> Self::Value {
        rows.into_iter().map(|row| row.snapshot).collect()
    }

    fn merge(
        user_id: &str,
        remote: &Self::Value,
        local: &Self::Value,
    ) -> Merged<Self::Value, RankSnapshotRow> {
        let remote: BTreeSet<RankSnapshot> = remote.iter().copied().collect();
        let local: BTreeSet<RankSnapshot> = local.iter().copied().collect();
        let Merged { value, upload } = set_union(&remote, &local, |snapshot| RankSnapshotRow {
            user_id: user_id.to_string(),
            snapshot: *snapshot,
        });
        Merged {
            value: value.into_iter().collect(),
            upload,
        }
    }

    fn normalize(mut value: Self::Value) -> Self::Value {
        value.sort_by_key(|snapshot| Reverse(*snapshot));
        value.dedup();
        value.truncate(RANK_HISTORY_CAP);
        value
    }
}

/// Drills bookmarked by the user.
pub struct SavedDrills;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedDrillRow {
    pub user_id: String,
    pub drill_id: String,
}

impl Collection for SavedDrills {
    const NAME: &'static str = "saved_drills";
    const TABLE: &'static str = "saved_drills";
    const CONFLICT_KEY: &'static [&'static str] = &["user_id", "drill_id"];

    type Value = BTreeSet<String>;
    type Row = SavedDrillRow;

    fn from_rows(rows: Vec<SavedDrillRow>) -> Self::Value {
        rows.into_iter().map(|row| row.drill_id).collect()
    }

    fn merge(
        user_id: &str,
        remote: &Self::Value,
        local: &Self::Value,
    ) -> Merged<Self::Value, SavedDrillRow> {
        set_union(remote, local, |drill_id| SavedDrillRow {
            user_id: user_id.to_string(),
            drill_id: drill_id.clone(),
        })
    }
}

/// Drills lined up to train next, in order.
pub struct DrillQueue;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedDrillRow {
    pub user_id: String,
    pub drill_id: String,
    pub position: u32,
}

fn dedup_in_order(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

impl Collection for DrillQueue {
    const NAME: &'static str = "drill_queue";
    const TABLE: &'static str = "drill_queue";
    const CONFLICT_KEY: &'static [&'static str] = &["user_id", "drill_id"];
    const ORDER_BY: &'static [(&'static str, Order)] = &[("position", Order::Ascending)];

    type Value = Vec<String>;
    type Row = QueuedDrillRow;

    fn from_rows(mut rows: Vec<QueuedDrillRow>) -> Self::Value {
        rows.sort_by_key(|row| row.position);
        let ids: Vec<String> = rows.into_iter().map(|row| row.drill_id).collect();
        dedup_in_order(&ids)
    }

    /// Remote order wins; local-only drills go to the back in local order. When anything is
    /// appended the whole queue is re-sent with dense positions, so gaps left by earlier
    /// removals can't interleave the new items.
    fn merge(
        user_id: &str,
        remote: &Self::Value,
        local: &Self::Value,
    ) -> Merged<Self::Value, QueuedDrillRow> {
        let remote = dedup_in_order(remote);
        let in_remote: HashSet<&str> = remote.iter().map(String::as_str).collect();
        let local_only: Vec<String> = dedup_in_order(local)
            .into_iter()
            .filter(|id| !in_remote.contains(id.as_str()))
            .collect();

        if local_only.is_empty() {
            return Merged {
                value: remote,
                upload: Vec::new(),
            };
        }

        let mut value = remote;
        value.extend(local_only);

        let upload = value
            .iter()
            .zip(0u32..)
            .map(|(drill_id, position)| QueuedDrillRow {
                user_id: user_id.to_string(),
                drill_id: drill_id.clone(),
                position,
            })
            .collect();

        Merged { value, upload }
    }
}

/// Completed drills per pack.
pub struct PackProgress;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackProgressRow {
    pub user_id: String,
    pub pack_id: String,
    #[serde(flatten)]
    pub entry: PackProgressEntry,
}

impl Collection for PackProgress {
    const NAME: &'static str = "pack_progress";
    const TABLE: &'static str = "pack_progress";
    const CONFLICT_KEY: &'static [&'static str] = &["user_id", "pack_id"];

    type Value = BTreeMap<String, PackProgressEntry>;
    type Row = PackProgressRow;

    fn from_rows(rows: Vec<PackProgressRow>) -> Self::Value {
        let mut value: Self::Value = BTreeMap::new();
        for row in rows {
            let merged = match value.get(&row.pack_id) {
                Some(existing) => existing.merge(&row.entry),
                None => row.entry,
            };
            value.insert(row.pack_id, merged);
        }
        value
    }

    fn merge(
        user_id: &str,
        remote: &Self::Value,
        local: &Self::Value,
    ) -> Merged<Self::Value, PackProgressRow> {
        let mut value = remote.clone();
        let mut upload = Vec::new();

        for (pack_id, entry) in local {
            let merged = match remote.get(pack_id) {
                Some(existing) => existing.merge(entry),
                None => entry.clone(),
            };
            if remote.get(pack_id) != Some(&merged) {
                upload.push(PackProgressRow {
                    user_id: user_id.to_string(),
                    pack_id: pack_id.clone(),
                    entry: merged.clone(),
                });
            }
            value.insert(pack_id.clone(), merged);
        }

        Merged { value, upload }
    }
}
