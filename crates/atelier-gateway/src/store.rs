//! # Configuration Store
//!
//! REST client for persisted configurations.
//!
//! ## Contract
//! ```text
//! POST   {base_url}/configurations       NewConfiguration → ConfigurationRecord
//! DELETE {base_url}/configurations/{id}  → 2xx
//! ```
//!
//! Creates are sent once: a POST that timed out may still have been stored, and
//! retrying it could duplicate the record. Deletes are idempotent and retried.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use url::Url;

use crate::config::StoreSettings;
use crate::error::{GatewayError, GatewayResult};
use crate::http::{self, RetryPolicy};

// =============================================================================
// Records
// =============================================================================

/// A configuration ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConfiguration {
    /// Customer-facing name.
    pub name: String,

    /// Canonical code the configuration was built from.
    pub prompt: String,

    /// Opaque to the store; the pipeline puts spec, quote and artifacts here.
    pub config_data: serde_json::Value,

    /// Total price in whole currency units.
    pub price: i64,

    /// Empty when generation was unavailable.
    pub glb_url: String,

    #[serde(default)]
    pub dxf_url: Option<String>,

    #[serde(default)]
    pub thumbnail_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A configuration as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    /// Store-assigned id (numeric or string on the wire).
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    #[serde(flatten)]
    pub configuration: NewConfiguration,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Persistence for configurations.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn create(&self, configuration: &NewConfiguration) -> GatewayResult<ConfigurationRecord>;

    async fn delete(&self, id: &str) -> GatewayResult<()>;
}

// =============================================================================
// HTTP Store
// =============================================================================

/// Configuration store over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConfigurationStore {
    client: reqwest::Client,
    collection: Url,
    create_policy: RetryPolicy,
    delete_policy: RetryPolicy,
}

impl HttpConfigurationStore {
    pub fn new(settings: &StoreSettings) -> GatewayResult<Self> {
        Ok(HttpConfigurationStore {
            client: http::client(settings.connect_timeout())?,
            collection: http::endpoint(&settings.base_url, "configurations")?,
            create_policy: settings.create_policy(),
            delete_policy: settings.delete_policy(),
        })
    }

    fn record_url(&self, id: &str) -> GatewayResult<Url> {
        if id.is_empty() {
            return Err(GatewayError::InvalidUrl("configuration id is empty".into()));
        }
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.collection.to_string()))?
            .push(id);
        Ok(url)
    }

    async fn post(&self, configuration: &NewConfiguration) -> GatewayResult<ConfigurationRecord> {
        let response = self
            .client
            .post(self.collection.clone())
            .json(configuration)
            .send()
            .await?;
        let response = http::error_for_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_delete(&self, url: &Url) -> GatewayResult<()> {
        let response = self.client.delete(url.clone()).send().await?;
        http::error_for_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigurationStore for HttpConfigurationStore {
    async fn create(&self, configuration: &NewConfiguration) -> GatewayResult<ConfigurationRecord> {
        let record = self
            .create_policy
            .run("store.create", move || self.post(configuration))
            .await?;
        info!(id = %record.id, name = %record.configuration.name, "Configuration stored");
        Ok(record)
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        let url = &self.record_url(id)?;
        self.delete_policy
            .run("store.delete", move || self.send_delete(url))
            .await?;
        info!(id, "Configuration deleted");
        Ok(())
    }
}
