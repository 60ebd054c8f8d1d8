use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;

use super::{Filter, Row, TableStore, check_identifier, require_filters};
use crate::error::{Error, Result};

/// Postgres migration a hosted project needs before this client can use
/// it: food rows carry their owner, and meals are unique per owner, day and
/// meal type so `on_conflict` upserts have a constraint to merge on.
pub const HOSTED_MIGRATION: &str = "\
alter table nutrition_foods add column if not exists user_id text;

update nutrition_foods f
   set user_id = m.user_id
  from nutrition_meals m
 where f.meal_id = m.id
   and f.user_id is null;

alter table nutrition_foods alter column user_id set not null;

create index if not exists nutrition_foods_user_id_idx
    on nutrition_foods (user_id);

create unique index if not exists nutrition_meals_owner_day_meal_key
    on nutrition_meals (user_id, date_label, meal_type);
";

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project URL, e.g. `https://<ref>.supabase.co`. `/rest/v1` is appended.
    pub url: String,
    /// Public (anon) API key, sent as `apikey` on every request.
    pub api_key: String,
    /// Session token of the signed-in user. Falls back to the API key.
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl PostgrestConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            access_token: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Table store backed by a PostgREST endpoint.
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl PostgrestStore {
    pub fn new(config: PostgrestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("fitlog/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        let bearer = config
            .access_token
            .unwrap_or_else(|| config.api_key.clone());
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            bearer,
        })
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder> {
        check_identifier(table)?;
        let url = table_url(&self.base_url, table);
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer))
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{base_url}/rest/v1/{table}")
}

/// Render equality filters as PostgREST query parameters.
pub(crate) fn filter_params(filters: &[Filter]) -> Result<Vec<(String, String)>> {
    filters
        .iter()
        .map(|f| {
            check_identifier(&f.column)?;
            let op = match &f.value {
                Value::Null => "is.null".to_string(),
                Value::String(s) => format!("eq.{s}"),
                other => format!("eq.{other}"),
            };
            Ok((f.column.clone(), op))
        })
        .collect()
}

async fn read_rows(table: &str, resp: Response) -> Result<Vec<Row>> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            table: table.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn first_row(table: &str, rows: Vec<Row>) -> Result<Row> {
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::MissingRow(table.to_string()))
}

#[async_trait]
impl TableStore for PostgrestStore {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        tracing::debug!(table, filters = filters.len(), "select");
        let resp = self
            .request(Method::GET, table)?
            .query(&[("select", "*")])
            .query(&filter_params(filters)?)
            .send()
            .await?;
        read_rows(table, resp).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        tracing::debug!(table, "insert");
        let resp = self
            .request(Method::POST, table)?
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row)
            .send()
            .await?;
        first_row(table, read_rows(table, resp).await?)
    }

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<Vec<Row>> {
        require_filters("update", table, filters)?;
        tracing::debug!(table, filters = filters.len(), "update");
        let resp = self
            .request(Method::PATCH, table)?
            .query(&filter_params(filters)?)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch)
            .send()
            .await?;
        read_rows(table, resp).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        require_filters("delete", table, filters)?;
        tracing::debug!(table, filters = filters.len(), "delete");
        let resp = self
            .request(Method::DELETE, table)?
            .query(&filter_params(filters)?)
            .header("Prefer", RETURN_REPRESENTATION)
            .send()
            .await?;
        read_rows(table, resp).await
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &[&str]) -> Result<Row> {
        for column in on_conflict {
            check_identifier(column)?;
        }
        tracing::debug!(table, on_conflict = ?on_conflict, "upsert");
        let resp = self
            .request(Method::POST, table)?
            .query(&[("on_conflict", on_conflict.join(","))])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&row)
            .send()
            .await?;
        first_row(table, read_rows(table, resp).await?)
    }
}
