//! # atelier-gateway: External Boundaries for Atelier
//!
//! Everything that leaves the process lives here: the 3D/DXF generation
//! service, the configuration store, and the configuration file that points
//! at them. The pure specification logic stays in `atelier-core`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Gateway Architecture                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  Configurator (pipeline.rs)                      │  │
//! │  │                                                                  │  │
//! │  │  quote:     code → check → price            (sync, no I/O)       │  │
//! │  │  finalize:  quote + generate (degradable) → store                │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Preview        │  │ Generation     │  │ Configuration          │    │
//! │  │ Coordinator    │─►│ Gateway        │  │ Store                  │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Dedup per key  │  │ POST /generate │  │ POST /configurations   │    │
//! │  │ moka cache     │  │ timeout+retry  │  │ DELETE /configurations │    │
//! │  │ Supersede/abort│  │                │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  GatewayConfig: defaults → atelier.toml → ATELIER_* env → validate    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Service endpoints, retry settings, tiers and supplements
//! - [`error`] - Gateway error types
//! - [`generation`] - Generation key, artifacts, HTTP gateway
//! - [`preview`] - Keyed, cancellable preview requests
//! - [`store`] - Configuration store client
//! - [`pipeline`] - End-to-end `Configurator`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atelier_gateway::{Configurator, GatewayConfig, QuoteRequest};
//!
//! let config = GatewayConfig::load_or_default(None);
//! let configurator = Configurator::from_config(&config)?;
//!
//! let quoted = configurator.quote("M1(1000,400,1000)bE", &QuoteRequest::default())?;
//! println!("Total: {}", quoted.quote.total_price);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod generation;
mod http;
pub mod pipeline;
pub mod preview;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{
    GatewayConfig, GenerationSettings, PricingCatalog, PricingSettings, StoreSettings,
    SupplementEntry, TierEntry, CONFIG_FILE_NAME,
};
pub use error::{GatewayError, GatewayResult};
pub use generation::{Artifacts, GenerationGateway, GenerationKey, HttpGenerationGateway};
pub use http::RetryPolicy;
pub use pipeline::{ArtifactStatus, Configurator, Finalized, QuoteRequest, Quoted};
pub use preview::{PreviewCoordinator, PreviewOutcome};
pub use store::{ConfigurationRecord, ConfigurationStore, HttpConfigurationStore, NewConfiguration};
