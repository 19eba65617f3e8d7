use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Prefix for every local snapshot key. The user id is appended to it.
    pub namespace: String,
    pub consistency_window_days: u32,
    pub trial_length_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace: "boostpad".to_string(),
            consistency_window_days: 14,
            trial_length_days: 7,
        }
    }
}

impl SyncConfig {
    pub(crate) const LOGGED_OUT: &'static str = "logged-out";

    /// Where snapshots for `user_id` live. Without a user, data goes to a shared
    /// logged-out area that is adopted on first sign-in.
    pub fn namespace_for(&self, user_id: Option<&str>) -> String {
        format!("{}:{}", self.namespace, user_id.unwrap_or(Self::LOGGED_OUT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"namespace":"staging"}"#).unwrap();
        assert_eq!(config.namespace, "staging");
        assert_eq!(config.consistency_window_days, 14);
        assert_eq!(config.namespace_for(Some("u1")), "staging:u1");
        assert_eq!(config.namespace_for(None), "staging:logged-out");
    }
}
