//! # Error Types
//!
//! Domain-specific error types for atelier-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atelier-core errors (this file)                                       │
//! │  ├── SyntaxError         - Malformed code string (parser)              │
//! │  ├── ValidationErrors    - Accumulated schema violations (validator)   │
//! │  │   └── SpecError       - One field-addressable violation             │
//! │  ├── SpecificationError  - Either of the above (check = parse+validate)│
//! │  └── PricingError        - Tier / supplement catalog boundary failures │
//! │                                                                         │
//! │  atelier-gateway errors (separate crate)                               │
//! │  └── GatewayError        - Generation / persistence failures           │
//! │                                                                         │
//! │  Flow: SyntaxError | ValidationErrors → SpecificationError → UI        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every error is addressable: a character position or a field path
//! 3. Errors are enum variants, never String
//! 4. Expected conditions are returned, never panicked

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Syntax Error
// =============================================================================

/// Why a code string failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "char", rename_all = "snake_case")]
pub enum SyntaxErrorKind {
    /// The code string is empty.
    #[error("specification is empty")]
    Empty,

    /// The preset id is not a letter followed by one or more digits.
    #[error("preset id must be a letter followed by digits")]
    InvalidPresetId,

    /// The preset id is not followed by `(`.
    #[error("expected '(' after the preset id")]
    ExpectedOpenParen,

    /// Two separators with nothing between them, or an empty list.
    #[error("dimension is empty")]
    EmptyDimension,

    /// A non-digit character inside the dimension list.
    #[error("unexpected character '{0}' in dimension list")]
    InvalidDimension(char),

    /// A multi-digit dimension starting with `0`.
    #[error("dimension has a leading zero")]
    LeadingZero,

    /// A dimension that does not fit in 32 bits.
    #[error("dimension is too large")]
    DimensionOverflow,

    /// The input ended before the closing `)`.
    #[error("missing closing ')'")]
    UnclosedParenthesis,

    /// A trailing character that is not a flag letter.
    #[error("'{0}' is not a valid flag character")]
    InvalidFlag(char),

    /// The same flag letter appears twice.
    #[error("flag '{0}' appears more than once")]
    DuplicateFlag(char),

    /// Whitespace is never allowed inside a code.
    #[error("whitespace is not allowed")]
    Whitespace,
}

/// Malformed specification code.
///
/// `position` is the 0-based character offset of the offending character (or
/// the input length when the input ended too early), so a UI can put a caret
/// under it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, TS)]
#[ts(export)]
#[error("syntax error at position {position}: {reason}")]
pub struct SyntaxError {
    pub position: usize,
    pub reason: SyntaxErrorKind,
}

impl SyntaxError {
    pub(crate) const fn new(position: usize, reason: SyntaxErrorKind) -> Self {
        SyntaxError { position, reason }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single schema violation found by the validator.
///
/// ## When Each Variant Occurs
/// ```text
/// M9(100,100,100)b          → UnknownPreset   (nothing else is checked)
/// M1(1000,400)b             → ArityMismatch   { expected: 3, actual: 2 }
/// M1(1000,400,9000)b        → OutOfRange      { slot: 2, ... }
/// M1(1000,400,1000)E        → MissingRequiredFlag { flag: 'b' }
/// M1(1000,400,1000)bX       → UnknownFlag     { flag: 'X' }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecError {
    /// The preset id is not in the registry.
    #[error("unknown preset '{preset_id}'")]
    UnknownPreset { preset_id: String },

    /// Wrong number of dimensions for the preset.
    #[error("preset expects {expected} dimensions, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// A dimension outside its inclusive range.
    #[error("{slot_name} must be between {min} and {max} mm, got {actual}")]
    OutOfRange {
        slot: usize,
        slot_name: String,
        min: u32,
        max: u32,
        actual: u32,
    },

    /// A mandatory structural token is absent.
    #[error("required flag '{flag}' is missing")]
    MissingRequiredFlag { flag: char },

    /// A flag the preset does not recognize.
    #[error("flag '{flag}' is not recognized for this preset")]
    UnknownFlag { flag: char },
}

impl SpecError {
    /// Field path the UI should highlight.
    ///
    /// ```rust
    /// use atelier_core::SpecError;
    ///
    /// let err = SpecError::MissingRequiredFlag { flag: 'b' };
    /// assert_eq!(err.field(), "flags.b");
    /// ```
    pub fn field(&self) -> String {
        match self {
            SpecError::UnknownPreset { .. } => "preset".to_string(),
            SpecError::ArityMismatch { .. } => "dimensions".to_string(),
            SpecError::OutOfRange { slot, .. } => format!("dimensions[{slot}]"),
            SpecError::MissingRequiredFlag { flag } | SpecError::UnknownFlag { flag } => {
                format!("flags.{flag}")
            }
        }
    }
}

/// Non-empty list of everything wrong with a parsed specification.
///
/// ## Invariant
/// Never empty: the only constructor returns `None` for an empty list, so a
/// `ValidationErrors` value always carries at least one [`SpecError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ValidationErrors(Vec<SpecError>);

impl ValidationErrors {
    pub(crate) fn from_vec(errors: Vec<SpecError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(ValidationErrors(errors))
        }
    }

    pub(crate) fn single(error: SpecError) -> Self {
        ValidationErrors(vec![error])
    }

    /// The first violation (always present).
    pub fn first(&self) -> &SpecError {
        &self.0[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpecError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[SpecError] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<SpecError> {
        self.0
    }

    /// Returns true if any violation matches the predicate.
    pub fn contains(&self, predicate: impl Fn(&SpecError) -> bool) -> bool {
        self.0.iter().any(predicate)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a SpecError;
    type IntoIter = std::slice::Iter<'a, SpecError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Specification Error
// =============================================================================

/// Outcome of a failed parse-then-validate cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, TS)]
#[ts(export)]
#[serde(tag = "stage", content = "errors", rename_all = "snake_case")]
pub enum SpecificationError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("invalid specification: {0}")]
    Invalid(#[from] ValidationErrors),
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Pricing failures: bad catalog input, or amounts too large to represent.
///
/// Apart from [`PricingError::Overflow`] these are raised while building the
/// inputs, never by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Tier price must be strictly positive.
    #[error("price tier '{tier}' must have a positive price per cubic meter, got {price}")]
    NonPositiveTierPrice { tier: String, price: String },

    /// Supplement unit price must not be negative.
    #[error("supplement '{id}' has a negative unit price: {price}")]
    NegativeSupplementPrice { id: String, price: String },

    /// Supplement id not in the catalog.
    #[error("unknown supplement '{0}'")]
    UnknownSupplement(String),

    /// A supplement selected with quantity zero.
    #[error("supplement '{0}' selected with quantity 0")]
    ZeroQuantity(String),

    /// Supplement id registered twice.
    #[error("supplement '{0}' is already in the catalog")]
    DuplicateSupplement(String),

    /// Tier name not in the catalog.
    #[error("unknown price tier '{0}'")]
    UnknownTier(String),

    /// Tier name registered twice.
    #[error("price tier '{0}' is already in the catalog")]
    DuplicateTier(String),

    /// An amount left the representable range.
    #[error("{0} is too large to price")]
    Overflow(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience alias for parse-then-validate results.
pub type SpecResult<T> = Result<T, SpecificationError>;

/// Convenience alias for pricing boundary results.
pub type PricingResult<T> = Result<T, PricingError>;

// =============================================================================
// Unit Tests
// =============================================================================
