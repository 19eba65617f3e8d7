use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Copy,
    Clone,
    Debug,
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
#[serde(rename_all = "snake_case")]
#[display(style = "snake_case")]
pub enum FocusTag {
    Mechanics,
    Aerials,
    Dribbling,
    Shooting,
    Saves,
    Rotation,
    BoostManagement,
    Kickoffs,
    Recoveries,
    GameSense,
}

/// What a training day was spent on. One per day; a newer annotation replaces an older one whole.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct SessionAnnotation {
    #[serde(default)]
    pub focus_tags: Vec<FocusTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[tsify(type = "string")]
    pub updated_at: DateTime<Utc>,
}
