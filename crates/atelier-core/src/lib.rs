//! # atelier-core: Pure Specification Logic for Atelier
//!
//! This crate is the **heart** of the Atelier furniture configurator. It owns
//! the specification language, the preset schema and the price formula, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atelier Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Configurator UI / Admin Catalog                 │   │
//! │  │    Code input ──► Preview pane ──► Quote ──► Save configuration│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atelier-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌────────────┐  ┌──────────┐    │   │
//! │  │   │ registry │  │  parser  │  │ validation │  │ pricing  │    │   │
//! │  │   │ presets  │  │  codes   │  │   schema   │  │  quotes  │    │   │
//! │  │   └──────────┘  └──────────┘  └────────────┘  └──────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO FLOATS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               atelier-gateway (Boundary Layer)                  │   │
//! │  │      3D/DXF generation, preview coordination, config store      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - Preset families and their dimensional/flag schema
//! - [`parser`] - Code string → [`ParsedSpecification`] (syntax only)
//! - [`validation`] - Schema checks producing a [`ValidatedSpecification`]
//! - [`pricing`] - Volumetric price formula, tiers and supplements
//! - [`money`] - Decimal money with one explicit rounding point
//! - [`types`] - Specification types
//! - [`error`] - Typed, addressable errors
//!
//! ## Example Usage
//!
//! ```rust
//! use atelier_core::{check, price, PriceTier, SupplementSelection};
//! use rust_decimal::Decimal;
//!
//! // Parse and validate in one step
//! let spec = check("M1(1500,730,500)b").unwrap();
//!
//! // Price it
//! let tier = PriceTier::new("standard", "Melamine", Decimal::from(1500)).unwrap();
//! let quote = price(&spec, &tier, &SupplementSelection::new()).unwrap();
//!
//! // 0.5475 m³ × 1500 = 821.25 → 821
//! assert_eq!(quote.total_price, 821);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod parser;
pub mod pricing;
pub mod registry;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use atelier_core::check` instead of
// `use atelier_core::validation::check`

pub use error::{
    PricingError, PricingResult, SpecError, SpecResult, SpecificationError, SyntaxError,
    SyntaxErrorKind, ValidationErrors,
};
pub use money::Money;
pub use parser::{parse, serialize};
pub use pricing::{
    price, price_with_policy, HeightPolicy, PriceQuote, PriceTier, Supplement,
    SupplementCatalog, SupplementKind, SupplementLine, SupplementSelection, TierCatalog,
};
pub use registry::{PresetRegistry, PresetTemplate};
pub use types::*;
pub use validation::{check, check_with, validate, validate_with};
