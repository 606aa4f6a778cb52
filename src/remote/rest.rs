use color_eyre::{eyre::eyre, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{id_to_filter_value, RemoteStore, SelectQuery};
use crate::config::Config;

/// HTTP client for a PostgREST-style data service.
#[derive(Clone)]
pub struct RestStore {
  client: Client,
  base_url: Url,
  api_key: String,
}

impl RestStore {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;
    Self::with_key(&config.remote.url, api_key, config.remote.timeout_secs)
  }

  pub fn with_key(url: &str, api_key: String, timeout_secs: u64) -> Result<Self> {
    let mut base_url =
      Url::parse(url).map_err(|e| eyre!("Invalid remote url '{}': {}", url, e))?;
    // Url::join drops the last path segment unless it ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      api_key,
    })
  }

  /// URL of a collection endpoint.
  fn endpoint(&self, table: &str) -> Result<Url> {
    self
      .base_url
      .join(&format!("rest/v1/{}", table))
      .map_err(|e| eyre!("Invalid collection name '{}': {}", table, e))
  }

  /// URL of a collection endpoint filtered to a single id.
  fn endpoint_for_id(&self, table: &str, id: &Value) -> Result<Url> {
    let mut url = self.endpoint(table)?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id_to_filter_value(id)));
    Ok(url)
  }

  fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
    builder
      .header("apikey", &self.api_key)
      .bearer_auth(&self.api_key)
  }

  async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
    let response = self
      .authorized(builder)
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", what, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Failed to {}: HTTP {} {}", what, status, body));
    }

    Ok(response)
  }
}

impl RemoteStore for RestStore {
  async fn insert(&self, target: &str, record: &Value) -> Result<()> {
    let url = self.endpoint(target)?;
    debug!(%url, "insert");
    let request = self
      .client
      .post(url)
      .header("Prefer", "return=minimal")
      .json(record);
    self
      .send(request, &format!("insert into {}", target))
      .await?;
    Ok(())
  }

  async fn update(&self, target: &str, id: &Value, changes: &Value) -> Result<()> {
    let url = self.endpoint_for_id(target, id)?;
    debug!(%url, "update");
    let request = self
      .client
      .patch(url)
      .header("Prefer", "return=minimal")
      .json(changes);
    self
      .send(request, &format!("update {} id {}", target, id))
      .await?;
    Ok(())
  }

  async fn delete(&self, target: &str, id: &Value) -> Result<()> {
    let url = self.endpoint_for_id(target, id)?;
    debug!(%url, "delete");
    let request = self.client.delete(url);
    self
      .send(request, &format!("delete from {} id {}", target, id))
      .await?;
    Ok(())
  }

  async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>> {
    let mut url = self.endpoint(&query.table)?;
    url.query_pairs_mut().extend_pairs(query.query_pairs());
    debug!(%url, "select");

    let response = self
      .send(self.client.get(url), &format!("query {}", query.table))
      .await?;

    response
      .json::<Vec<Value>>()
      .await
      .map_err(|e| eyre!("Failed to parse {} rows: {}", query.table, e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn store(url: &str) -> RestStore {
    RestStore::with_key(url, "key".to_string(), 5).unwrap()
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let s = store("https://example.supabase.co");
    assert_eq!(
      s.endpoint("tanks").unwrap().as_str(),
      "https://example.supabase.co/rest/v1/tanks"
    );

    let s = store("https://proxy.local/db");
    assert_eq!(
      s.endpoint("tanks").unwrap().as_str(),
      "https://proxy.local/db/rest/v1/tanks"
    );
  }

  #[test]
  fn test_endpoint_for_id() {
    let s = store("https://example.supabase.co/");
    assert_eq!(
      s.endpoint_for_id("tanks", &json!(1)).unwrap().as_str(),
      "https://example.supabase.co/rest/v1/tanks?id=eq.1"
    );
  }

  #[test]
  fn test_invalid_url_is_an_error() {
    assert!(RestStore::with_key("not a url", "key".to_string(), 5).is_err());
  }
}
