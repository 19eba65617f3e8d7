//! Pack status and the "what to train next" pick.
//!
//! Status is never stored. It is recomputed against the pack's current drill list every time,
//! so drills removed from a pack stop counting and a shrunken pack can become complete.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use training_utils::{Pack, PackProgressEntry, PlanTier};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, parse_display::Display)]
#[serde(rename_all = "snake_case")]
#[display(style = "snake_case")]
pub enum PackStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Completed drills that are still part of the pack.
pub fn completed_count(pack: &Pack, entry: Option<&PackProgressEntry>) -> usize {
    let Some(entry) = entry else {
        return 0;
    };
    pack.drill_ids
        .iter()
        .filter(|drill_id| entry.completed_drill_ids.contains(*drill_id))
        .count()
}

pub fn status(pack: &Pack, entry: Option<&PackProgressEntry>) -> PackStatus {
    let completed = completed_count(pack, entry);
    if completed == 0 {
        PackStatus::NotStarted
    } else if completed >= pack.drill_ids.len() {
        PackStatus::Completed
    } else {
        PackStatus::InProgress
    }
}

/// The pack to suggest next, from an already access-filtered list.
///
/// The in-progress pack started most recently wins; among equal start times the one listed first
/// wins. Without one, the first not-started pack in list order.
pub fn recommend_next_pack<'a>(
    packs: &'a [Pack],
    progress: &BTreeMap<String, PackProgressEntry>,
) -> Option<&'a Pack> {
    let mut resume: Option<(&Pack, Option<chrono::DateTime<chrono::Utc>>)> = None;
    for pack in packs {
        let entry = progress.get(&pack.id);
        if status(pack, entry) != PackStatus::InProgress {
            continue;
        }
        let started = entry.and_then(|entry| entry.last_started_at);
        // strictly greater, so earlier packs keep ties
        if resume.is_none_or(|(_, best)| started > best) {
            resume = Some((pack, started));
        }
    }

    if let Some((pack, _)) = resume {
        return Some(pack);
    }

    packs
        .iter()
        .find(|pack| status(pack, progress.get(&pack.id)) == PackStatus::NotStarted)
}

/// Packs available on `plan`, in catalog order.
pub fn accessible_packs(catalog: &[Pack], plan: PlanTier) -> Vec<Pack> {
    catalog
        .iter()
        .filter(|pack| pack.min_plan <= plan)
        .cloned()
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSummary {
    pub pack_id: String,
    pub title: String,
    pub status: PackStatus,
    pub completed: usize,
    pub total: usize,
}

pub fn summarize(packs: &[Pack], progress: &BTreeMap<String, PackProgressEntry>) -> Vec<PackSummary> {
    packs
        .iter()
        .map(|pack| {
            let entry = progress.get(&pack.id);
            PackSummary {
                pack_id: pack.id.clone(),
                title: pack.title.clone(),
                status: status(pack, entry),
                completed: completed_count(pack, entry),
                total: pack.drill_ids.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pack(id: &str, drills: &[&str]) -> Pack {
        Pack {
            id: id.to_string(),
            title: id.to_uppercase(),
            drill_ids: drills.iter().map(|s| s.to_string()).collect(),
            min_plan: PlanTier::Free,
        }
    }

    fn entry(drills: &[&str], started_day: Option<u32>) -> PackProgressEntry {
        PackProgressEntry {
            completed_drill_ids: drills.iter().map(|s| s.to_string()).collect(),
            last_started_at: started_day
                .map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_status_transitions_follow_catalog() {
        let mut p = pack("p", &["a", "b", "c"]);

        assert_eq!(status(&p, None), PackStatus::NotStarted);
        assert_eq!(status(&p, Some(&entry(&[], None))), PackStatus::NotStarted);
        assert_eq!(status(&p, Some(&entry(&["a", "b"], Some(1)))), PackStatus::InProgress);
        assert_eq!(
            status(&p, Some(&entry(&["a", "b", "c"], Some(1)))),
            PackStatus::Completed
        );

        p.drill_ids.pop();
        assert_eq!(
            status(&p, Some(&entry(&["a", "b"], Some(1)))),
            PackStatus::Completed,
            "dropping a drill from the pack should complete it"
        );
    }

    #[test]
    fn test_stale_drills_dont_count() {
        let p = pack("p", &["a", "b"]);
        let e = entry(&["removed", "also-removed"], Some(1));
        assert_eq!(completed_count(&p, Some(&e)), 0);
        assert_eq!(status(&p, Some(&e)), PackStatus::NotStarted);
    }

    #[test]
    fn test_in_progress_beats_not_started() {
        let packs = vec![pack("b", &["x"]), pack("a", &["y", "z"])];
        let progress = [("a".to_string(), entry(&["y"], Some(1)))].into();

        assert_eq!(recommend_next_pack(&packs, &progress).unwrap().id, "a");
    }

    #[test]
    fn test_most_recently_started_wins() {
        let packs = vec![pack("a", &["1", "2"]), pack("b", &["3", "4"])];
        let progress = [
            ("a".to_string(), entry(&["1"], Some(2))),
            ("b".to_string(), entry(&["3"], Some(9))),
        ]
        .into();
        assert_eq!(recommend_next_pack(&packs, &progress).unwrap().id, "b");
    }

    #[test]
    fn test_equal_start_prefers_list_order() {
        let packs = vec![pack("a", &["1", "2"]), pack("b", &["3", "4"])];
        let progress = [
            ("b".to_string(), entry(&["3"], Some(5))),
            ("a".to_string(), entry(&["1"], Some(5))),
        ]
        .into();
        assert_eq!(recommend_next_pack(&packs, &progress).unwrap().id, "a");
    }

    #[test]
    fn test_falls_back_to_first_not_started_then_none() {
        let packs = vec![pack("done", &["1"]), pack("first", &["2"]), pack("second", &["3"])];
        let progress = [("done".to_string(), entry(&["1"], Some(1)))].into();
        assert_eq!(recommend_next_pack(&packs, &progress).unwrap().id, "first");

        let all_done: BTreeMap<String, PackProgressEntry> = [
            ("done".to_string(), entry(&["1"], Some(1))),
            ("first".to_string(), entry(&["2"], Some(1))),
            ("second".to_string(), entry(&["3"], Some(1))),
        ]
        .into();
        assert!(recommend_next_pack(&packs, &all_done).is_none());
        assert!(recommend_next_pack(&[], &all_done).is_none());
    }

    #[test]
    fn test_accessible_packs_keep_order() {
        let mut pro = pack("pro", &["1"]);
        pro.min_plan = PlanTier::Pro;
        let mut starter = pack("starter", &["2"]);
        starter.min_plan = PlanTier::Starter;
        let catalog = vec![pro, pack("free", &["3"]), starter];

        let ids = |packs: Vec<Pack>| packs.into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(accessible_packs(&catalog, PlanTier::Free)), vec!["free"]);
        assert_eq!(
            ids(accessible_packs(&catalog, PlanTier::Starter)),
            vec!["free", "starter"]
        );
        assert_eq!(accessible_packs(&catalog, PlanTier::Pro).len(), 3);
    }

    #[test]
    fn test_summaries() {
        let packs = vec![pack("a", &["1", "2"])];
        let progress = [("a".to_string(), entry(&["2", "gone"], Some(1)))].into();
        let summaries = summarize(&packs, &progress);
        assert_eq!(
            summaries,
            vec![PackSummary {
                pack_id: "a".to_string(),
                title: "A".to_string(),
                status: PackStatus::InProgress,
                completed: 1,
                total: 2,
            }]
        );
        assert_eq!(PackStatus::InProgress.to_string(), "in_progress");
    }
}
