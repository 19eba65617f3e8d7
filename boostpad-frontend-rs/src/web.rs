//! The browser surface. wasm-bindgen types can't be generic, so this wraps a concrete
//! [`Boostpad`] over `localStorage` and Supabase. Structured values cross as JSON strings.

use chrono::Utc;
use slotmap::{Key, KeyData};
use tether::{
    ListenerKey, UserContext, WebStorage,
    supabase::{SupabaseConfig, SupabaseRemote},
};
use training_utils::{Pack, PlanTier, RankSnapshot, day};
use wasm_bindgen::prelude::*;

use crate::{Boostpad, SyncConfig};

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_json(value: &impl serde::Serialize) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_error)
}

fn parse_day(s: &str) -> Result<chrono::NaiveDate, JsValue> {
    day::parse_day(s).ok_or_else(|| JsValue::from_str(&format!("not a YYYY-MM-DD day: {s}")))
}

fn parse_plan(s: &str) -> Result<PlanTier, JsValue> {
    s.parse().map_err(|_| JsValue::from_str(&format!("unknown plan: {s}")))
}

#[wasm_bindgen]
pub struct BoostpadWeb {
    inner: Boostpad<WebStorage, SupabaseRemote>,
}

#[wasm_bindgen]
impl BoostpadWeb {
    /// Without an access token, requests go out with the anon key only.
    #[wasm_bindgen(constructor)]
    pub fn new(
        supabase_url: String,
        supabase_anon_key: String,
        user_id: Option<String>,
        access_token: Option<String>,
    ) -> Result<BoostpadWeb, JsValue> {
        let storage = WebStorage::local().map_err(js_error)?;
        let config = SupabaseConfig {
            supabase_url,
            supabase_anon_key,
        };
        let token = access_token.unwrap_or_else(|| config.supabase_anon_key.clone());
        let remote = SupabaseRemote::new(&config, &token);

        Ok(Self {
            inner: Boostpad::new(
                storage,
                remote,
                user_id.map(UserContext::new),
                SyncConfig::default(),
            ),
        })
    }

    /// Sync every collection, then trim rank history to `plan`.
    /// Resolves to a JSON array of reports; rejects only on an unknown plan.
    pub async fn sync_all(&self, plan: String) -> Result<String, JsValue> {
        let plan = parse_plan(&plan)?;
        to_json(&self.inner.reconcile_all(plan).await)
    }

    pub async fn toggle_day(&self, day: String) -> Result<bool, JsValue> {
        self.inner
            .toggle_day(parse_day(&day)?)
            .await
            .map_err(js_error)
    }

    pub fn completions(&self) -> Result<String, JsValue> {
        to_json(&self.inner.load_local::<crate::Completions>())
    }

    pub fn streaks(&self) -> Result<String, JsValue> {
        to_json(&self.inner.streaks(day::today_local()))
    }

    pub fn consistency(&self) -> u8 {
        self.inner.consistency(day::today_local())
    }

    /// `focus_tags` is a JSON array of tag names.
    pub fn annotate_day(
        &self,
        day: String,
        focus_tags: String,
        duration_minutes: Option<u32>,
    ) -> Result<(), JsValue> {
        let focus_tags = serde_json::from_str(&focus_tags).map_err(js_error)?;
        self.inner
            .annotate_day(parse_day(&day)?, focus_tags, duration_minutes, Utc::now())
            .map_err(js_error)
    }

    pub fn focus_breakdown(&self) -> Result<String, JsValue> {
        to_json(&self.inner.focus_breakdown(day::today_local()))
    }

    /// Saves and syncs a rank snapshot given as JSON, then trims history to the plan.
    pub async fn log_rank(&self, snapshot: String, plan: String) -> Result<String, JsValue> {
        let snapshot: RankSnapshot = serde_json::from_str(&snapshot).map_err(js_error)?;
        let report = self
            .inner
            .log_rank(snapshot, parse_plan(&plan)?)
            .await
            .map_err(js_error)?;
        to_json(&report)
    }

    pub fn rank_history(&self) -> Result<String, JsValue> {
        to_json(&self.inner.load_local::<crate::RankSnapshots>())
    }

    pub fn save_drill(&self, drill_id: String, plan: String) -> Result<bool, JsValue> {
        self.inner
            .save_drill(&drill_id, parse_plan(&plan)?)
            .map_err(js_error)
    }

    pub async fn unsave_drill(&self, drill_id: String) -> Result<bool, JsValue> {
        self.inner.unsave_drill(&drill_id).await.map_err(js_error)
    }

    pub fn enqueue_drill(&self, drill_id: String, plan: String) -> Result<bool, JsValue> {
        self.inner
            .enqueue_drill(&drill_id, parse_plan(&plan)?)
            .map_err(js_error)
    }

    pub async fn dequeue_drill(&self, drill_id: String) -> Result<bool, JsValue> {
        self.inner.dequeue_drill(&drill_id).await.map_err(js_error)
    }

    pub fn complete_pack_drill(&self, pack_id: String, drill_id: String) -> Result<bool, JsValue> {
        self.inner
            .complete_pack_drill(&pack_id, &drill_id, Utc::now())
            .map_err(js_error)
    }

    /// `catalog` is the full pack list as JSON; it is filtered to `plan` here.
    pub fn next_pack(&self, catalog: String, plan: String) -> Result<Option<String>, JsValue> {
        let catalog: Vec<Pack> = serde_json::from_str(&catalog).map_err(js_error)?;
        let available = crate::packs::accessible_packs(&catalog, parse_plan(&plan)?);
        Ok(self.inner.next_pack(&available).map(|pack| pack.id.clone()))
    }

    pub fn pack_summaries(&self, catalog: String, plan: String) -> Result<String, JsValue> {
        let catalog: Vec<Pack> = serde_json::from_str(&catalog).map_err(js_error)?;
        let available = crate::packs::accessible_packs(&catalog, parse_plan(&plan)?);
        to_json(&self.inner.pack_summaries(&available))
    }

    /// `callback` receives the collection name and its status as JSON.
    /// Returns a handle for [`BoostpadWeb::unsubscribe`].
    pub fn subscribe(&self, callback: js_sys::Function) -> u64 {
        let key = self.inner.subscribe(move |collection, status| {
            let this = JsValue::null();
            let status = serde_json::to_string(status).unwrap_or_default();
            let _ = callback.call2(
                &this,
                &JsValue::from_str(collection),
                &JsValue::from_str(&status),
            );
        });
        key.data().as_ffi()
    }

    pub fn unsubscribe(&self, handle: u64) {
        self.inner
            .unsubscribe(ListenerKey::from(KeyData::from_ffi(handle)))
    }

    pub fn sync_statuses(&self) -> Result<String, JsValue> {
        to_json(&self.inner.sync_statuses())
    }
}
