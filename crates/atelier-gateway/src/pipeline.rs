//! # Configurator Pipeline
//!
//! End-to-end flow from a code to a stored configuration.
//!
//! ```text
//! code ──► check ──► price ─────────────────────────┐
//!            │                                      ▼
//!            └────► generate ──(ok / degraded)──► NewConfiguration ──► store
//! ```
//!
//! Pricing never waits on generation and never fails because of it: a failed
//! generation is recorded as [`ArtifactStatus::Unavailable`] and the record is
//! stored with empty artifact URLs.

use atelier_core::{
    check, price_with_policy, HeightPolicy, PriceQuote, SupplementSelection,
    ValidatedSpecification,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{GatewayConfig, PricingCatalog};
use crate::error::GatewayResult;
use crate::generation::{Artifacts, GenerationGateway, GenerationKey, HttpGenerationGateway};
use crate::store::{ConfigurationRecord, ConfigurationStore, HttpConfigurationStore, NewConfiguration};

// =============================================================================
// Requests and Results
// =============================================================================

/// Pricing choices for one quote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteRequest {
    /// Tier name; the configured default when `None`.
    pub tier: Option<String>,

    /// `(supplement id, quantity)` picks, in order.
    pub supplements: Vec<(String, u32)>,

    /// Height rule; the configured policy when `None`.
    pub policy: Option<HeightPolicy>,
}

/// A validated specification with its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quoted {
    pub spec: ValidatedSpecification,
    pub tier: String,
    pub supplements: SupplementSelection,
    pub quote: PriceQuote,
}

/// Outcome of the generation step of [`Configurator::finalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Ready(Artifacts),
    Unavailable { reason: String },
}

impl ArtifactStatus {
    pub fn artifacts(&self) -> Option<&Artifacts> {
        match self {
            ArtifactStatus::Ready(artifacts) => Some(artifacts),
            ArtifactStatus::Unavailable { .. } => None,
        }
    }
}

/// A stored configuration plus what went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    pub record: ConfigurationRecord,
    pub quoted: Quoted,
    pub artifacts: ArtifactStatus,
}

// =============================================================================
// Configurator
// =============================================================================

/// Wires the core to the generation service and the configuration store.
///
/// ## Usage
/// ```rust,ignore
/// let configurator = Configurator::from_config(&GatewayConfig::load(None)?)?;
///
/// let quoted = configurator.quote("M1(1500,730,500)b", &QuoteRequest::default())?;
/// println!("{} → {}", quoted.spec, quoted.quote.total_price);
///
/// let finalized = configurator
///     .finalize("Hall cabinet", "M1(1500,730,500)b", &QuoteRequest::default(), true)
///     .await?;
/// ```
pub struct Configurator {
    catalog: PricingCatalog,
    generation: Arc<dyn GenerationGateway>,
    store: Arc<dyn ConfigurationStore>,
}

impl Configurator {
    pub fn new(
        catalog: PricingCatalog,
        generation: Arc<dyn GenerationGateway>,
        store: Arc<dyn ConfigurationStore>,
    ) -> Self {
        Configurator {
            catalog,
            generation,
            store,
        }
    }

    /// Builds the HTTP-backed configurator from a validated configuration.
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        Ok(Configurator::new(
            config.pricing_catalog()?,
            Arc::new(HttpGenerationGateway::new(&config.generation)?),
            Arc::new(HttpConfigurationStore::new(&config.store)?),
        ))
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    /// The generation gateway, for callers that coordinate previews.
    pub fn generation(&self) -> Arc<dyn GenerationGateway> {
        Arc::clone(&self.generation)
    }

    /// Parses, validates and prices `code`. Synchronous and side-effect free.
    pub fn quote(&self, code: &str, request: &QuoteRequest) -> GatewayResult<Quoted> {
        let spec = check(code)?;
        self.quote_spec(spec, request)
    }

    fn quote_spec(&self, spec: ValidatedSpecification, request: &QuoteRequest) -> GatewayResult<Quoted> {
        let tier_name = request
            .tier
            .as_deref()
            .unwrap_or(&self.catalog.default_tier);
        let tier = self.catalog.tiers.get(tier_name)?;
        let supplements = self.catalog.supplements.selection(
            request
                .supplements
                .iter()
                .map(|(id, quantity)| (id.as_str(), *quantity)),
        )?;
        let policy = request.policy.unwrap_or(self.catalog.height_policy);

        let quote = price_with_policy(&spec, tier, &supplements, policy)?;
        Ok(Quoted {
            spec,
            tier: tier.name().to_string(),
            supplements,
            quote,
        })
    }

    /// Validates `code` and requests its artifacts.
    pub async fn generate(&self, code: &str, closed: bool) -> GatewayResult<Artifacts> {
        let spec = check(code)?;
        self.generation
            .generate(&GenerationKey::new(&spec, closed))
            .await
    }

    /// Prices, generates and stores a named configuration.
    ///
    /// Fails only on an invalid code, a bad pricing request or a store error.
    pub async fn finalize(
        &self,
        name: &str,
        code: &str,
        request: &QuoteRequest,
        closed: bool,
    ) -> GatewayResult<Finalized> {
        let quoted = self.quote(code, request)?;
        let key = GenerationKey::new(&quoted.spec, closed);

        let artifacts = match self.generation.generate(&key).await {
            Ok(artifacts) => ArtifactStatus::Ready(artifacts),
            Err(e) => {
                warn!(%key, error = %e, "Generation unavailable, storing without artifacts");
                ArtifactStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        let (glb_url, dxf_url) = match &artifacts {
            ArtifactStatus::Ready(a) => (a.glb_url.clone(), a.dxf_url.clone()),
            ArtifactStatus::Unavailable { .. } => (String::new(), None),
        };

        let configuration = NewConfiguration {
            name: name.to_string(),
            prompt: quoted.spec.canonical_code(),
            config_data: json!({
                "specification": &quoted.spec,
                "tier": &quoted.tier,
                "supplements": &quoted.supplements,
                "quote": &quoted.quote,
                "closed": closed,
                "artifacts": &artifacts,
            }),
            price: quoted.quote.total_price,
            glb_url,
            dxf_url,
            thumbnail_url: None,
            created_at: Utc::now(),
        };

        let record = self.store.create(&configuration).await?;
        info!(
            id = %record.id,
            code = %configuration.prompt,
            price = configuration.price,
            "Configuration finalized"
        );

        Ok(Finalized {
            record,
            quoted,
            artifacts,
        })
    }

    /// Removes a stored configuration.
    pub async fn delete(&self, id: &str) -> GatewayResult<()> {
        self.store.delete(id).await
    }
}
