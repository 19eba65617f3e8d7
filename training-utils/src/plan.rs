use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    tsify::Tsify,
    parse_display::Display,
    parse_display::FromStr,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
#[display(style = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
}

impl PlanTier {
    /// The tier a free trial grants.
    pub const TRIAL: PlanTier = PlanTier::Starter;
}

/// The subscription fields of a user's profile.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct TrialInfo {
    #[serde(default)]
    #[tsify(type = "string | null")]
    pub trial_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[tsify(type = "string | null")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_used: bool,
    #[serde(default)]
    pub plan: PlanTier,
    #[serde(default)]
    pub subscription_id: Option<String>,
}

impl TrialInfo {
    /// Whether a paid subscription is attached. An empty id counts as none.
    pub fn has_subscription(&self) -> bool {
        self.subscription_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}

/// Per-tier caps that callers enforce. `None` means unlimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub saved_drills: Option<usize>,
    pub queued_drills: Option<usize>,
    /// Rank snapshots kept locally, on top of the global history cap.
    pub rank_history: Option<usize>,
}

impl PlanLimits {
    pub fn for_plan(plan: PlanTier) -> Self {
        match plan {
            PlanTier::Free => PlanLimits {
                saved_drills: Some(5),
                queued_drills: Some(3),
                rank_history: Some(3),
            },
            PlanTier::Starter => PlanLimits {
                saved_drills: Some(25),
                queued_drills: Some(10),
                rank_history: None,
            },
            PlanTier::Pro => PlanLimits {
                saved_drills: None,
                queued_drills: None,
                rank_history: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_info_decodes_sparse_profile() {
        let info: TrialInfo = serde_json::from_str(r#"{"plan":"starter"}"#).unwrap();
        assert_eq!(info.plan, PlanTier::Starter);
        assert!(!info.trial_used);
        assert!(info.trial_ends_at.is_none());
        assert!(!info.has_subscription());
    }

    #[test]
    fn test_empty_subscription_id_is_no_subscription() {
        let mut info = TrialInfo {
            subscription_id: Some(String::new()),
            ..TrialInfo::default()
        };
        assert!(!info.has_subscription());
        info.subscription_id = Some("sub_123".to_string());
        assert!(info.has_subscription());
    }

    #[test]
    fn test_limits_loosen_with_tier() {
        let free = PlanLimits::for_plan(PlanTier::Free);
        let starter = PlanLimits::for_plan(PlanTier::Starter);
        assert_eq!(free.rank_history, Some(3));
        assert!(starter.saved_drills > free.saved_drills);
        assert_eq!(PlanLimits::for_plan(PlanTier::Pro).queued_drills, None);
        assert_eq!(PlanTier::Starter.to_string(), "starter");
    }
}
