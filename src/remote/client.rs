//! HTTP client for the remote LoRA manager instance
//!
//! Wraps the manager's REST endpoints and layers the metadata cache over
//! the list endpoints. Higher-level lookups (`lora_info`, hash queries)
//! degrade to empty metadata on network failure; the local file-loading
//! path must stay usable when the remote is down.

use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use tracing::warn;

use crate::config::AppConfig;
use crate::remote::cache::Fetched;
use crate::remote::cache::MetadataCache;
use crate::remote::map_transport_error;
use crate::LoraBridgeError;
use crate::Result;

const LORA_LIST_ENDPOINT: &str = "/api/lm/loras/list";
const CHECKPOINT_LIST_ENDPOINT: &str = "/api/lm/checkpoints/list";
const TRIGGER_WORDS_ENDPOINT: &str = "/api/lm/loras/get-trigger-words";
const RANDOM_SAMPLE_ENDPOINT: &str = "/api/lm/loras/random-sample";
const CYCLER_LIST_ENDPOINT: &str = "/api/lm/loras/cycler-list";

/// Full list pages are fetched in one request.
const LIST_PAGE_SIZE: &str = "9999";

pub struct RemoteClient {
    config: Arc<AppConfig>,
    http: reqwest::Client,
    cache: Arc<MetadataCache>,
}

impl RemoteClient {
    pub fn new(config: Arc<AppConfig>, cache: Arc<MetadataCache>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            config,
            http,
            cache,
        })
    }

    fn base_url(&self) -> Result<&str> {
        if self.config.is_configured() {
            Ok(&self.config.remote.url)
        } else {
            Err(LoraBridgeError::RemoteNotConfigured)
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url()?, path);
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.config.remote.timeout_secs))?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url()?, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.config.remote.timeout_secs))?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Full remote lora list, cached.
    pub async fn lora_list(&self) -> Result<Fetched<Vec<Value>>> {
        let params = [("page_size", LIST_PAGE_SIZE)];
        let fetched = self
            .cache
            .fetch_cached(LORA_LIST_ENDPOINT, &params, || async {
                self.get_json(LORA_LIST_ENDPOINT, &params).await
            })
            .await?;
        Ok(fetched.map(extract_items))
    }

    /// Full remote checkpoint list, cached.
    pub async fn checkpoint_list(&self) -> Result<Fetched<Vec<Value>>> {
        let params = [("page_size", LIST_PAGE_SIZE)];
        let fetched = self
            .cache
            .fetch_cached(CHECKPOINT_LIST_ENDPOINT, &params, || async {
                self.get_json(CHECKPOINT_LIST_ENDPOINT, &params).await
            })
            .await?;
        Ok(fetched.map(extract_items))
    }

    /// Trigger words for one entry, from the per-name endpoint.
    pub async fn trigger_words(&self, name: &str) -> Result<Vec<String>> {
        let value = self
            .get_json(TRIGGER_WORDS_ENDPOINT, &[("name", name)])
            .await?;
        Ok(string_array(value.get("trigger_words")))
    }

    /// Ask the remote to sample random entries for a pool.
    pub async fn random_sample(&self, request: &Value) -> Result<Vec<Value>> {
        let value = self.post_json(RANDOM_SAMPLE_ENDPOINT, request).await?;
        Ok(lora_array(value))
    }

    /// Ask the remote for the sorted pool list used by cycling nodes.
    pub async fn cycler_list(&self, pool_config: Option<&Value>) -> Result<Vec<Value>> {
        let body = json!({
            "pool_config": pool_config,
            "sort_by": "filename",
        });
        let value = self.post_json(CYCLER_LIST_ENDPOINT, &body).await?;
        Ok(lora_array(value))
    }

    /// `(relative_path, trigger_words)` for an entry by display name.
    ///
    /// Resolved from the cached list; falls back to the per-name trigger
    /// word endpoint when the list has no such entry. Any remote failure
    /// degrades to `(name, [])` with a warning so callers never block on
    /// missing metadata.
    pub async fn lora_info(&self, name: &str) -> (String, Vec<String>) {
        match self.lora_list().await {
            Ok(list) => {
                if list.is_stale() {
                    warn!("Using stale lora list for '{name}' lookup");
                }
                if let Some(item) = find_by_file_name(&list.value, name) {
                    let file_path = item.get("file_path").and_then(Value::as_str).unwrap_or("");
                    let mapped = self.config.translate_path(file_path);
                    let folder = item.get("folder").and_then(Value::as_str).unwrap_or("");
                    let words = trained_words(item);
                    return (relative_model_path(&mapped, folder), words);
                }
                match self.trigger_words(name).await {
                    Ok(words) => (name.to_string(), words),
                    Err(err) => {
                        warn!("Trigger word lookup for '{name}' failed: {err}");
                        (name.to_string(), Vec::new())
                    }
                }
            }
            Err(err) => {
                warn!("lora_info('{name}') failed: {err}");
                (name.to_string(), Vec::new())
            }
        }
    }

    /// SHA-256 hash of a lora by display name, if the remote knows it.
    pub async fn lora_hash(&self, name: &str) -> Option<String> {
        match self.lora_list().await {
            Ok(list) => find_by_file_name(&list.value, name).and_then(item_hash),
            Err(err) => {
                warn!("lora_hash('{name}') failed: {err}");
                None
            }
        }
    }

    /// SHA-256 hash of a checkpoint by display name, if the remote knows it.
    pub async fn checkpoint_hash(&self, name: &str) -> Option<String> {
        match self.checkpoint_list().await {
            Ok(list) => find_by_file_name(&list.value, name).and_then(item_hash),
            Err(err) => {
                warn!("checkpoint_hash('{name}') failed: {err}");
                None
            }
        }
    }
}

/// `{"items": [...]}` → the items, tolerating other shapes.
fn extract_items(value: Value) -> Vec<Value> {
    value
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Responses that are either a bare list or `{"loras": [...]}`.
fn lora_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => other
            .get("loras")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn find_by_file_name<'a>(items: &'a [Value], name: &str) -> Option<&'a Value> {
    items
        .iter()
        .find(|item| item.get("file_name").and_then(Value::as_str) == Some(name))
}

/// Trigger words from the enrichment block, when present.
fn trained_words(item: &Value) -> Vec<String> {
    string_array(item.get("civitai").and_then(|c| c.get("trainedWords")))
}

fn item_hash(item: &Value) -> Option<String> {
    item.get("sha256")
        .or_else(|| item.get("hash"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Build the loader-relative path from the mapped absolute path and the
/// remote's subfolder field: `folder/basename`, or just the basename when
/// the entry sits in the model root.
fn relative_model_path(mapped_path: &str, folder: &str) -> String {
    let basename = mapped_path.rsplit('/').next().unwrap_or(mapped_path);
    if folder.is_empty() {
        basename.to_string()
    } else {
        format!("{folder}/{basename}")
    }
}
