//! A [`RemoteStore`] backed by a Supabase (PostgREST) database.
//! Row-level security on the Supabase side is expected to scope every table to `auth.uid()`;
//! the `user_id` filters sent from here are a second line, not the only one.

use postgrest::Postgrest;
use serde_json::Value;

use crate::remote::{Filter, Order, RemoteError, RemoteStore};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl SupabaseConfig {
    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            supabase_url: std::env::var("SUPABASE_URL").ok()?,
            supabase_anon_key: std::env::var("SUPABASE_ANON_KEY").ok()?,
        })
    }
}

pub struct SupabaseRemote {
    client: Postgrest,
}

impl SupabaseRemote {
    pub fn new(config: &SupabaseConfig, access_token: &str) -> Self {
        let SupabaseConfig {
            supabase_url,
            supabase_anon_key,
        } = config;

        let client = Postgrest::new(format!("{supabase_url}/rest/v1"))
            .insert_header("apikey", supabase_anon_key)
            .insert_header("Authorization", format!("Bearer {access_token}"));

        Self { client }
    }
}

fn transport(e: impl std::fmt::Debug) -> RemoteError {
    RemoteError::Transport(format!("{e:?}"))
}

impl RemoteStore for SupabaseRemote {
    async fn select_rows(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, RemoteError> {
        let mut query = self.client.from(table).select("*");
        for (column, value) in &filter.eq {
            query = query.eq(column, value);
        }
        for (column, order) in &filter.order {
            let direction = match order {
                Order::Ascending => "asc",
                Order::Descending => "desc",
            };
            query = query.order(format!("{column}.{direction}"));
        }

        let response = query
            .execute()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn upsert_rows(
        &self,
        table: &str,
        rows: Vec<Value>,
        conflict_key: &[&str],
    ) -> Result<(), RemoteError> {
        let body = serde_json::to_string(&rows)?;
        let response = self
            .client
            .from(table)
            .upsert(body)
            .on_conflict(conflict_key.join(","))
            .execute()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(transport)?;
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn delete_rows(&self, table: &str, filter: &Filter) -> Result<(), RemoteError> {
        let mut query = self.client.from(table).delete();
        for (column, value) in &filter.eq {
            query = query.eq(column, value);
        }

        let response = query
            .execute()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(transport)?;
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
