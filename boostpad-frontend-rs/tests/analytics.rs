use boostpad_frontend_rs::{
    Boostpad, PackStatus, Streaks, SyncConfig,
    gating::{can_start_trial, effective_plan, is_trial_active, start_trial, trial_days_remaining},
    packs::accessible_packs,
};
use chrono::{Days, Duration, NaiveDate, TimeZone, Utc};
use tether::{MemoryRemote, MemoryStorage};
use training_utils::{FocusTag, Pack, PlanTier, TrialInfo, day::parse_day};

fn day(s: &str) -> NaiveDate {
    parse_day(s).unwrap()
}

fn app() -> Boostpad<MemoryStorage, MemoryRemote> {
    Boostpad::new(
        MemoryStorage::new(),
        MemoryRemote::new(),
        None,
        SyncConfig::default(),
    )
}

fn pack(id: &str, drills: &[&str], min_plan: PlanTier) -> Pack {
    Pack {
        id: id.to_string(),
        title: id.to_string(),
        drill_ids: drills.iter().map(|s| s.to_string()).collect(),
        min_plan,
    }
}

#[test]
fn test_streaks_and_consistency_from_local_days() {
    let app = app();
    let today = day("2024-06-14");

    assert_eq!(app.streaks(today), Streaks::default());

    for back in [1u64, 2, 3, 6, 8, 10, 12] {
        app.mark_day_trained(today - Days::new(back)).unwrap();
    }

    assert_eq!(app.streaks(today), Streaks { current: 3, best: 3 });
    assert_eq!(app.consistency(today), 50);

    app.mark_day_trained(today).unwrap();
    assert_eq!(app.streaks(today).current, 4);
}

#[test]
fn test_focus_breakdown_uses_latest_annotation() {
    let app = app();
    let today = day("2024-06-14");
    let morning = Utc.with_ymd_and_hms(2024, 6, 14, 8, 0, 0).unwrap();

    app.annotate_day(today, vec![FocusTag::Saves], Some(20), morning)
        .unwrap();
    app.annotate_day(
        today,
        vec![FocusTag::Aerials, FocusTag::Dribbling],
        Some(45),
        morning + Duration::hours(3),
    )
    .unwrap();

    let breakdown = app.focus_breakdown(today);
    assert_eq!(breakdown.annotated_days, 1);
    assert_eq!(breakdown.total_minutes, 45);
    assert!(!breakdown.tag_counts.contains_key(&FocusTag::Saves));
}

#[test]
fn test_pack_journey() {
    let app = app();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let catalog = vec![
        pack("pro-only", &["x"], PlanTier::Pro),
        pack("basics", &["a", "b", "c"], PlanTier::Free),
        pack("shooting", &["s1", "s2"], PlanTier::Free),
    ];
    let available = accessible_packs(&catalog, PlanTier::Free);

    assert_eq!(app.next_pack(&available).unwrap().id, "basics");

    app.complete_pack_drill("shooting", "s1", now).unwrap();
    assert_eq!(
        app.next_pack(&available).unwrap().id,
        "shooting",
        "unfinished work comes before new packs"
    );

    app.complete_pack_drill("shooting", "s2", now).unwrap();
    app.complete_pack_drill("basics", "a", now).unwrap();
    app.complete_pack_drill("basics", "b", now).unwrap();
    let statuses: Vec<PackStatus> = app
        .pack_summaries(&available)
        .into_iter()
        .map(|summary| summary.status)
        .collect();
    assert_eq!(statuses, vec![PackStatus::InProgress, PackStatus::Completed]);

    app.complete_pack_drill("basics", "c", now).unwrap();
    assert!(app.next_pack(&available).is_none());
}

#[test]
fn test_trial_gates_limits_end_to_end() {
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 0).unwrap();
    let profile = TrialInfo::default();
    assert!(can_start_trial(&profile));

    let trial = start_trial(&profile, now, SyncConfig::default().trial_length_days).unwrap();
    assert!(is_trial_active(&trial, now));
    assert_eq!(trial_days_remaining(&trial, now + Duration::hours(30)), 6);
    assert_eq!(effective_plan(&trial, now), PlanTier::Starter);

    let later = now + Duration::days(8);
    assert!(!is_trial_active(&trial, later));
    assert_eq!(trial_days_remaining(&trial, later), 0);
    assert_eq!(effective_plan(&trial, later), PlanTier::Free);
}
