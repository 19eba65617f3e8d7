//! Trial and plan predicates over a profile's [`TrialInfo`].
//! These decide the limits callers apply; syncing itself never looks at the plan.

use chrono::{DateTime, Duration, Utc};
use training_utils::{PlanTier, TrialInfo};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrialError {
    #[error("a trial was already used on this account")]
    AlreadyUsed,
    #[error("trials are only available on the {0} plan")]
    NotOnFreePlan(PlanTier),
}

pub fn is_trial_active(info: &TrialInfo, now: DateTime<Utc>) -> bool {
    info.plan == PlanTier::TRIAL
        && !info.has_subscription()
        && info.trial_ends_at.is_some_and(|ends| now < ends)
}

/// Doesn't look at the plan; combine with a plan check where that matters.
pub fn is_trial_expired(info: &TrialInfo, now: DateTime<Utc>) -> bool {
    !info.has_subscription() && info.trial_ends_at.is_some_and(|ends| now >= ends)
}

pub fn can_start_trial(info: &TrialInfo) -> bool {
    !info.trial_used && info.plan == PlanTier::Free
}

/// Whole days left in an active trial, rounded up. Zero otherwise.
pub fn trial_days_remaining(info: &TrialInfo, now: DateTime<Utc>) -> u32 {
    if !is_trial_active(info, now) {
        return 0;
    }
    let Some(ends) = info.trial_ends_at else {
        return 0;
    };
    let remaining = (ends - now).num_seconds().max(0);
    let day = Duration::days(1).num_seconds();
    u32::try_from((remaining + day - 1) / day).unwrap_or(u32::MAX)
}

/// The profile after starting a trial of `length_days` at `now`.
pub fn start_trial(
    info: &TrialInfo,
    now: DateTime<Utc>,
    length_days: u32,
) -> Result<TrialInfo, TrialError> {
    if info.trial_used {
        return Err(TrialError::AlreadyUsed);
    }
    if info.plan != PlanTier::Free {
        return Err(TrialError::NotOnFreePlan(PlanTier::Free));
    }

    Ok(TrialInfo {
        trial_started_at: Some(now),
        trial_ends_at: Some(now + Duration::days(i64::from(length_days))),
        trial_used: true,
        plan: PlanTier::TRIAL,
        subscription_id: info.subscription_id.clone(),
    })
}

/// The tier limits should follow: an unpaid trial past its end falls back to free.
pub fn effective_plan(info: &TrialInfo, now: DateTime<Utc>) -> PlanTier {
    if info.plan == PlanTier::TRIAL && is_trial_expired(info, now) {
        PlanTier::Free
    } else {
        info.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_trial_lifecycle() {
        let free = TrialInfo::default();
        assert!(can_start_trial(&free));
        assert!(!is_trial_active(&free, now()));
        assert_eq!(trial_days_remaining(&free, now()), 0);

        let trial = start_trial(&free, now(), 7).unwrap();
        assert!(trial.trial_used);
        assert_eq!(trial.plan, PlanTier::Starter);
        assert!(is_trial_active(&trial, now()));
        assert_eq!(trial_days_remaining(&trial, now()), 7);
        assert_eq!(
            trial_days_remaining(&trial, now() + Duration::hours(1)),
            7,
            "a partial day rounds up"
        );
        assert_eq!(trial_days_remaining(&trial, now() + Duration::days(6)), 1);
        assert!(!can_start_trial(&trial));

        let after = now() + Duration::days(7);
        assert!(!is_trial_active(&trial, after));
        assert!(is_trial_expired(&trial, after));
        assert_eq!(trial_days_remaining(&trial, after), 0);
        assert_eq!(effective_plan(&trial, after), PlanTier::Free);
        assert_eq!(effective_plan(&trial, now()), PlanTier::Starter);
    }

    #[test]
    fn test_subscription_ends_trial_state() {
        let info = TrialInfo {
            trial_ends_at: Some(now() + Duration::days(3)),
            trial_used: true,
            plan: PlanTier::Starter,
            subscription_id: Some("sub_1".to_string()),
            ..TrialInfo::default()
        };
        assert!(!is_trial_active(&info, now()));
        assert!(!is_trial_expired(&info, now() + Duration::days(10)));
        assert_eq!(effective_plan(&info, now() + Duration::days(10)), PlanTier::Starter);
    }

    #[test]
    fn test_expired_ignores_plan() {
        let info = TrialInfo {
            trial_ends_at: Some(now() - Duration::days(1)),
            plan: PlanTier::Pro,
            ..TrialInfo::default()
        };
        assert!(is_trial_expired(&info, now()));
        assert!(!is_trial_active(&info, now()));
        assert_eq!(effective_plan(&info, now()), PlanTier::Pro);
    }

    #[test]
    fn test_start_trial_eligibility() {
        let used = TrialInfo {
            trial_used: true,
            ..TrialInfo::default()
        };
        assert_eq!(start_trial(&used, now(), 7), Err(TrialError::AlreadyUsed));

        let pro = TrialInfo {
            plan: PlanTier::Pro,
            ..TrialInfo::default()
        };
        assert!(!can_start_trial(&pro));
        assert_eq!(
            start_trial(&pro, now(), 7),
            Err(TrialError::NotOnFreePlan(PlanTier::Free))
        );
    }
}
