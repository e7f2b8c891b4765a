//! # Domain Types
//!
//! Specification types shared by the parser, the validator and the pricing
//! engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐   validate()   ┌────────────────────────┐    │
//! │  │ ParsedSpecification  │ ─────────────► │ ValidatedSpecification │    │
//! │  │ ──────────────────── │                │ ────────────────────── │    │
//! │  │ preset_id  "M1"      │                │ (private fields)       │    │
//! │  │ dimensions [..]      │                │ only the validator can │    │
//! │  │ flags      FlagSet   │                │ construct one          │    │
//! │  └──────────────────────┘                └───────────┬────────────┘    │
//! │                                                      │                  │
//! │                                    ┌─────────────────┴──────────┐      │
//! │                                    ▼                            ▼      │
//! │                              Pricing Engine           Generation Gateway│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Canonical Form
//! `<PresetId>(<d1>,...,<dN>)<flags>` with flags in ascending byte order.
//! Two codes that differ only in flag order share one canonical form, which is
//! what the generation cache keys on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::SyntaxError;
use crate::parser;

// =============================================================================
// Flag Set
// =============================================================================

/// Set of single-letter feature tokens (`b` base board, `E` shelves, ...).
///
/// Backed by a `BTreeSet` so iteration, equality and serialization are all in
/// canonical (sorted) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FlagSet(BTreeSet<char>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a flag. Returns `false` if it was already present.
    pub fn insert(&mut self, flag: char) -> bool {
        self.0.insert(flag)
    }

    pub fn contains(&self, flag: char) -> bool {
        self.0.contains(&flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if every flag of `self` is in `other`.
    pub fn is_subset(&self, other: &FlagSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Flags of `self` that are not in `other`, in sorted order.
    pub fn difference<'a>(&'a self, other: &'a FlagSet) -> impl Iterator<Item = char> + 'a {
        self.0.difference(&other.0).copied()
    }
}

impl FromIterator<char> for FlagSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        FlagSet(iter.into_iter().collect())
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in &self.0 {
            write!(f, "{flag}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Parsed Specification
// =============================================================================

/// Syntactically well-formed specification, not yet checked against a preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParsedSpecification {
    /// Preset family id, e.g. `M1`.
    pub preset_id: String,

    /// Dimensions in millimeters, in slot order.
    pub dimensions: Vec<u32>,

    /// Feature tokens.
    pub flags: FlagSet,
}

impl ParsedSpecification {
    pub fn new(preset_id: impl Into<String>, dimensions: Vec<u32>, flags: FlagSet) -> Self {
        ParsedSpecification {
            preset_id: preset_id.into(),
            dimensions,
            flags,
        }
    }

    /// Canonical code string (flags sorted).
    pub fn canonical_code(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParsedSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.preset_id)?;
        for (i, dim) in self.dimensions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "){}", self.flags)
    }
}

impl FromStr for ParsedSpecification {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)
    }
}

// =============================================================================
// Validated Specification
// =============================================================================

/// A specification proven to satisfy its preset's ranges and required flags.
///
/// ## Illegal States Unrepresentable
/// There is no public constructor and no `Deserialize` impl: the validator is
/// the only way to obtain one. The pricing engine and the generation gateway
/// accept nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export)]
pub struct ValidatedSpecification {
    #[serde(flatten)]
    parsed: ParsedSpecification,
}

impl ValidatedSpecification {
    pub(crate) fn new_unchecked(parsed: ParsedSpecification) -> Self {
        ValidatedSpecification { parsed }
    }

    pub fn preset_id(&self) -> &str {
        &self.parsed.preset_id
    }

    pub fn dimensions(&self) -> &[u32] {
        &self.parsed.dimensions
    }

    pub fn flags(&self) -> &FlagSet {
        &self.parsed.flags
    }

    /// The underlying parse, for re-serialization and comparison.
    pub fn parsed(&self) -> &ParsedSpecification {
        &self.parsed
    }

    pub fn into_parsed(self) -> ParsedSpecification {
        self.parsed
    }

    /// Canonical code string, byte-exact across producers.
    ///
    /// ```rust
    /// let spec = atelier_core::check("M1(1000,400,1000)Eb").unwrap();
    /// assert_eq!(spec.canonical_code(), "M1(1000,400,1000)Eb");
    /// ```
    pub fn canonical_code(&self) -> String {
        self.parsed.to_string()
    }
}

impl fmt::Display for ValidatedSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.parsed.fmt(f)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
