//! # Pricing Engine
//!
//! Volumetric pricing of a [`ValidatedSpecification`] plus additive supplements.
//!
//! ## Price Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Quote Calculation                                  │
//! │                                                                         │
//! │  volume_m3         = (width × depth × height) / 1_000_000_000          │
//! │  base_price        = volume_m3 × tier.price_per_cubic_meter            │
//! │  supplements_total = Σ unit_price × quantity                           │
//! │  total_price       = round_half_away_from_zero(base + supplements)     │
//! │                                                                         │
//! │  Sloped presets (4 slots):                                              │
//! │    DeclaredHeight      height = d[2]            (default)              │
//! │    AverageWithMaximum  height = (d[2] + d[3]) / 2                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is a pure function: the UI preview, the admin catalog and order
//! totals all call [`price`] and therefore agree to the unit. All arithmetic
//! is checked; an amount that cannot be represented is a
//! [`PricingError::Overflow`], never a clamped price.
//!
//! ## Usage
//! ```rust
//! use atelier_core::pricing::{price, PriceTier, SupplementSelection};
//! use rust_decimal::Decimal;
//!
//! let spec = atelier_core::check("M1(1500,730,500)b").unwrap();
//! let tier = PriceTier::new("standard", "Melamine", Decimal::from(1500)).unwrap();
//!
//! let quote = price(&spec, &tier, &SupplementSelection::new()).unwrap();
//! assert_eq!(quote.volume_cubic_meters, Decimal::new(5475, 4));
//! assert_eq!(quote.total_price, 821);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::error::{PricingError, PricingResult};
use crate::money::Money;
use crate::types::ValidatedSpecification;

/// mm³ → m³ is a decimal shift of nine places.
const CUBIC_MM_SCALE: u32 = 9;

// =============================================================================
// Price Tier
// =============================================================================

/// A named price per cubic meter (e.g. "standard", "oak veneer").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PriceTier {
    name: String,
    description: String,
    #[ts(type = "string")]
    price_per_cubic_meter: Decimal,
}

impl PriceTier {
    /// Creates a tier, rejecting a zero or negative price.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price_per_cubic_meter: Decimal,
    ) -> PricingResult<Self> {
        let name = name.into();
        if price_per_cubic_meter <= Decimal::ZERO {
            return Err(PricingError::NonPositiveTierPrice {
                tier: name,
                price: price_per_cubic_meter.to_string(),
            });
        }
        Ok(PriceTier {
            name,
            description: description.into(),
            price_per_cubic_meter,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price_per_cubic_meter(&self) -> Decimal {
        self.price_per_cubic_meter
    }
}

/// Tiers keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TierCatalog {
    tiers: BTreeMap<String, PriceTier>,
}

impl TierCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tier. Names are unique.
    pub fn insert(&mut self, tier: PriceTier) -> PricingResult<()> {
        if self.tiers.contains_key(tier.name()) {
            return Err(PricingError::DuplicateTier(tier.name));
        }
        self.tiers.insert(tier.name.clone(), tier);
        Ok(())
    }

    pub fn get(&self, name: &str) -> PricingResult<&PriceTier> {
        self.tiers
            .get(name)
            .ok_or_else(|| PricingError::UnknownTier(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceTier> {
        self.tiers.values()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

// =============================================================================
// Supplements
// =============================================================================

/// What a supplement adds to the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SupplementKind {
    /// Material upgrade (veneer, lacquer).
    Material,
    /// Base board / plinth.
    Base,
    Drawer,
    WardrobeRail,
}

impl fmt::Display for SupplementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupplementKind::Material => "material",
            SupplementKind::Base => "base",
            SupplementKind::Drawer => "drawer",
            SupplementKind::WardrobeRail => "wardrobe_rail",
        };
        f.write_str(s)
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Supplement {
    pub id: String,
    pub kind: SupplementKind,
    pub label: String,
    #[ts(type = "string")]
    pub unit_price: Money,
}

/// One selected supplement with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SupplementLine {
    pub id: String,
    pub kind: SupplementKind,
    #[ts(type = "string")]
    pub unit_price: Money,
    pub quantity: u32,
}

impl SupplementLine {
    /// `unit_price × quantity`
    pub fn line_total(&self) -> PricingResult<Money> {
        self.unit_price
            .checked_mul_quantity(self.quantity)
            .ok_or_else(|| PricingError::Overflow(format!("supplement '{}' × {}", self.id, self.quantity)))
    }
}

/// Ordered supplement lines. The engine sums whatever is supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SupplementSelection {
    lines: Vec<SupplementLine>,
}

impl SupplementSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: SupplementLine) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[SupplementLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of every line total.
    pub fn total(&self) -> PricingResult<Money> {
        self.lines.iter().try_fold(Money::zero(), |sum, line| {
            sum.checked_add(line.line_total()?)
                .ok_or_else(|| PricingError::Overflow("supplements total".to_string()))
        })
    }
}

impl FromIterator<SupplementLine> for SupplementSelection {
    fn from_iter<I: IntoIterator<Item = SupplementLine>>(iter: I) -> Self {
        SupplementSelection {
            lines: iter.into_iter().collect(),
        }
    }
}

/// Supplements the shop offers, keyed by id.
///
/// ## Invariants
/// - Unit prices are never negative (checked on insert)
/// - Ids are unique
/// - A selection never contains a zero quantity
#[derive(Debug, Clone, Default)]
pub struct SupplementCatalog {
    entries: BTreeMap<String, Supplement>,
}

impl SupplementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, supplement: Supplement) -> PricingResult<()> {
        if supplement.unit_price.is_negative() {
            return Err(PricingError::NegativeSupplementPrice {
                id: supplement.id,
                price: supplement.unit_price.amount().to_string(),
            });
        }
        if self.entries.contains_key(&supplement.id) {
            return Err(PricingError::DuplicateSupplement(supplement.id));
        }
        self.entries.insert(supplement.id.clone(), supplement);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Supplement> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Supplement> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves one `(id, quantity)` pick into a priced line.
    ///
    /// Fails with [`PricingError::Overflow`] if the line total cannot be
    /// represented.
    pub fn select(&self, id: &str, quantity: u32) -> PricingResult<SupplementLine> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| PricingError::UnknownSupplement(id.to_string()))?;
        if quantity == 0 {
            return Err(PricingError::ZeroQuantity(id.to_string()));
        }
        let line = SupplementLine {
            id: entry.id.clone(),
            kind: entry.kind,
            unit_price: entry.unit_price,
            quantity,
        };
        line.line_total()?;
        Ok(line)
    }

    /// Resolves every pick, failing on the first bad one.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::money::Money;
    /// use atelier_core::pricing::{Supplement, SupplementCatalog, SupplementKind};
    ///
    /// let mut catalog = SupplementCatalog::new();
    /// catalog.insert(Supplement {
    ///     id: "drawer".into(),
    ///     kind: SupplementKind::Drawer,
    ///     label: "Soft-close drawer".into(),
    ///     unit_price: Money::from_units(45),
    /// }).unwrap();
    ///
    /// let selection = catalog.selection([("drawer", 3)]).unwrap();
    /// assert_eq!(selection.total(), Ok(Money::from_units(135)));
    /// assert!(catalog.selection([("drawer", 0)]).is_err());
    /// ```
    pub fn selection<'a>(
        &self,
        picks: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> PricingResult<SupplementSelection> {
        picks
            .into_iter()
            .map(|(id, quantity)| self.select(id, quantity))
            .collect()
    }
}

// =============================================================================
// Quote
// =============================================================================

/// Which height a sloped (4-slot) preset is priced with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum HeightPolicy {
    /// Declared base height `d[2]`; the maximum height is ignored.
    #[default]
    DeclaredHeight,
    /// Mean of base and maximum height, `(d[2] + d[3]) / 2`.
    AverageWithMaximum,
}

impl fmt::Display for HeightPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightPolicy::DeclaredHeight => f.write_str("declared_height"),
            HeightPolicy::AverageWithMaximum => f.write_str("average_with_maximum"),
        }
    }
}

impl std::str::FromStr for HeightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "declared_height" | "declared" => Ok(HeightPolicy::DeclaredHeight),
            "average_with_maximum" | "average" => Ok(HeightPolicy::AverageWithMaximum),
            other => Err(format!("unknown height policy '{other}'")),
        }
    }
}

/// Result of pricing one specification. Derived, never persisted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    /// Exact volume in m³.
    #[ts(type = "string")]
    pub volume_cubic_meters: Decimal,

    /// `volume × tier price`, unrounded.
    #[ts(type = "string")]
    pub base_price: Money,

    #[ts(type = "string")]
    pub supplements_total: Money,

    /// Whole currency units, rounded half away from zero. Never negative.
    pub total_price: i64,

    /// Height rule used for the volume.
    pub height_policy: HeightPolicy,
}

/// Prices a specification with the default [`HeightPolicy::DeclaredHeight`].
pub fn price(
    spec: &ValidatedSpecification,
    tier: &PriceTier,
    supplements: &SupplementSelection,
) -> PricingResult<PriceQuote> {
    price_with_policy(spec, tier, supplements, HeightPolicy::default())
}

/// Prices a specification with an explicit height policy.
///
/// Three-slot presets are unaffected by the policy.
pub fn price_with_policy(
    spec: &ValidatedSpecification,
    tier: &PriceTier,
    supplements: &SupplementSelection,
    policy: HeightPolicy,
) -> PricingResult<PriceQuote> {
    let volume = volume_cubic_meters(spec.dimensions(), policy)?;
    let base_price = Money::from_decimal(volume)
        .checked_mul(tier.price_per_cubic_meter)
        .map(|m| Money::from_decimal(m.amount().normalize()))
        .ok_or_else(|| PricingError::Overflow(format!("base price at tier '{}'", tier.name)))?;
    let supplements_total = supplements.total()?;
    let total_price = base_price
        .checked_add(supplements_total)
        .and_then(|sum| sum.round_to_units())
        .ok_or_else(|| PricingError::Overflow("total price".to_string()))?
        .max(0);

    Ok(PriceQuote {
        volume_cubic_meters: volume,
        base_price,
        supplements_total,
        total_price,
        height_policy: policy,
    })
}

/// Exact volume in m³ from millimeter dimensions.
///
/// Integer mm³ with a decimal scale of 9, so 1500 × 730 × 500 is exactly
/// 0.5475. Only dimensions no registry allows can overflow.
pub fn volume_cubic_meters(dimensions: &[u32], policy: HeightPolicy) -> PricingResult<Decimal> {
    let dim = |i: usize| dimensions.get(i).copied().map_or(0, i128::from);
    let footprint = dim(0) * dim(1);

    // Averaging halves the sum: ×5 and one extra decimal place keeps it exact
    let (mantissa, scale) = match (policy, dimensions.get(3)) {
        (HeightPolicy::AverageWithMaximum, Some(&max_height)) => (
            footprint * (dim(2) + i128::from(max_height)) * 5,
            CUBIC_MM_SCALE + 1,
        ),
        _ => (footprint * dim(2), CUBIC_MM_SCALE),
    };

    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map(|v| v.normalize())
        .map_err(|_| PricingError::Overflow("volume".to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check;

    fn tier(units: i64) -> PriceTier {
        PriceTier::new("standard", "Melamine 19 mm", Decimal::from(units)).unwrap()
    }

    fn catalog() -> SupplementCatalog {
        let mut catalog = SupplementCatalog::new();
        for (id, kind, units) in [
            ("drawer", SupplementKind::Drawer, 45),
            ("rail", SupplementKind::WardrobeRail, 30),
            ("plinth", SupplementKind::Base, 0),
        ] {
            catalog
                .insert(Supplement {
                    id: id.to_string(),
                    kind,
                    label: id.to_string(),
                    unit_price: Money::from_units(units),
                })
                .unwrap();
        }
        catalog
    }

    #[test]
    fn test_volumetric_price() {
        let spec = check("M1(1500,730,500)b").unwrap();
        let quote = price(&spec, &tier(1500), &SupplementSelection::new()).unwrap();

        assert_eq!(quote.volume_cubic_meters, Decimal::new(5475, 4));
        assert_eq!(quote.base_price, Money::from_decimal(Decimal::new(82125, 2)));
        assert!(quote.supplements_total.is_zero());
        assert_eq!(quote.total_price, 821);
        assert_eq!(quote.height_policy, HeightPolicy::DeclaredHeight);
    }

    #[test]
    fn test_sloped_preset_uses_declared_height() {
        let spec = check("M2(2000,450,700,1200)E").unwrap();
        let quote = price(&spec, &tier(1000), &SupplementSelection::new()).unwrap();

        // 2.0 × 0.45 × 0.7 = 0.63 m³
        assert_eq!(quote.volume_cubic_meters, Decimal::new(63, 2));
        assert_eq!(quote.total_price, 630);
    }

    #[test]
    fn test_average_height_policy() {
        let spec = check("M2(2000,450,700,1200)E").unwrap();
        let quote = price_with_policy(
            &spec,
            &tier(1000),
            &SupplementSelection::new(),
            HeightPolicy::AverageWithMaximum,
        )
        .unwrap();

        // height (700 + 1200) / 2 = 950 → 0.855 m³
        assert_eq!(quote.volume_cubic_meters, Decimal::new(855, 3));
        assert_eq!(quote.total_price, 855);
        assert_eq!(quote.height_policy, HeightPolicy::AverageWithMaximum);
    }

    #[test]
    fn test_policy_ignored_for_three_slots() {
        let spec = check("M1(1500,730,500)b").unwrap();
        let declared = price(&spec, &tier(1500), &SupplementSelection::new()).unwrap();
        let average = price_with_policy(
            &spec,
            &tier(1500),
            &SupplementSelection::new(),
            HeightPolicy::AverageWithMaximum,
        )
        .unwrap();
        assert_eq!(declared.volume_cubic_meters, average.volume_cubic_meters);
        assert_eq!(declared.total_price, average.total_price);
    }

    #[test]
    fn test_supplements_are_added_before_rounding() {
        let spec = check("M1(1500,730,500)b").unwrap();
        let selection = catalog().selection([("drawer", 2), ("rail", 1)]).unwrap();
        let quote = price(&spec, &tier(1500), &selection).unwrap();

        assert_eq!(quote.supplements_total, Money::from_units(120));
        // 821.25 + 120 = 941.25
        assert_eq!(quote.total_price, 941);
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        // 1000 × 500 × 1000 mm = 0.5 m³ at 1 per m³ = 0.5
        let spec = check("M1(1000,500,1000)b").unwrap();
        let quote = price(&spec, &tier(1), &SupplementSelection::new()).unwrap();
        assert_eq!(quote.total_price, 1);
    }

    #[test]
    fn test_tier_rejects_non_positive_price() {
        assert!(matches!(
            PriceTier::new("free", "", Decimal::ZERO),
            Err(PricingError::NonPositiveTierPrice { .. })
        ));
        assert!(PriceTier::new("negative", "", Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_tier_catalog() {
        let mut tiers = TierCatalog::new();
        tiers.insert(tier(1500)).unwrap();
        assert_eq!(tiers.get("standard").unwrap().price_per_cubic_meter(), Decimal::from(1500));
        assert_eq!(
            tiers.get("oak").unwrap_err(),
            PricingError::UnknownTier("oak".to_string())
        );
        assert_eq!(
            tiers.insert(tier(2000)).unwrap_err(),
            PricingError::DuplicateTier("standard".to_string())
        );
    }

    #[test]
    fn test_catalog_rejects_bad_entries() {
        let mut catalog = catalog();
        let negative = Supplement {
            id: "refund".to_string(),
            kind: SupplementKind::Material,
            label: "Refund".to_string(),
            unit_price: Money::from_units(-10),
        };
        assert!(matches!(
            catalog.insert(negative),
            Err(PricingError::NegativeSupplementPrice { .. })
        ));

        let duplicate = catalog.get("drawer").unwrap().clone();
        assert_eq!(
            catalog.insert(duplicate).unwrap_err(),
            PricingError::DuplicateSupplement("drawer".to_string())
        );
    }

    #[test]
    fn test_selection_errors() {
        let catalog = catalog();
        assert_eq!(
            catalog.select("lamp", 1).unwrap_err(),
            PricingError::UnknownSupplement("lamp".to_string())
        );
        assert_eq!(
            catalog.select("drawer", 0).unwrap_err(),
            PricingError::ZeroQuantity("drawer".to_string())
        );
        // Free supplements are allowed
        assert!(catalog.select("plinth", 1).unwrap().line_total().unwrap().is_zero());
    }

    #[test]
    fn test_base_price_overflow_is_an_error() {
        // 4.0 × 0.8 × 2.5 = 8 m³ at a quarter of Decimal::MAX per m³
        let spec = check("M2(4000,800,2500,3000)").unwrap();
        let tier = PriceTier::new("huge", "", Decimal::MAX / Decimal::from(4)).unwrap();
        let selection = catalog().selection([("drawer", 1)]).unwrap();

        assert!(matches!(
            price(&spec, &tier, &selection),
            Err(PricingError::Overflow(_))
        ));
    }

    #[test]
    fn test_total_beyond_whole_units_is_an_error() {
        let spec = check("M1(1000,500,1000)b").unwrap();
        let tier = PriceTier::new("huge", "", Decimal::from(i64::MAX)).unwrap();

        // 0.5 m³ fits, but adding a large supplement leaves the i64 range
        let mut catalog = SupplementCatalog::new();
        catalog
            .insert(Supplement {
                id: "gold".to_string(),
                kind: SupplementKind::Material,
                label: "Gold leaf".to_string(),
                unit_price: Money::from_decimal(Decimal::from(i64::MAX)),
            })
            .unwrap();
        let selection = catalog.selection([("gold", 1)]).unwrap();

        assert!(price(&spec, &tier, &SupplementSelection::new()).is_ok());
        assert_eq!(
            price(&spec, &tier, &selection).unwrap_err(),
            PricingError::Overflow("total price".to_string())
        );
    }

    #[test]
    fn test_supplement_line_overflow_is_rejected_on_select() {
        let mut catalog = SupplementCatalog::new();
        catalog
            .insert(Supplement {
                id: "d".to_string(),
                kind: SupplementKind::Drawer,
                label: "d".to_string(),
                unit_price: Money::from_decimal(Decimal::MAX / Decimal::from(2)),
            })
            .unwrap();

        assert!(catalog.selection([("d", 1)]).is_ok());
        assert!(matches!(
            catalog.selection([("d", 3)]),
            Err(PricingError::Overflow(_))
        ));
    }

    #[test]
    fn test_supplements_total_overflow_is_an_error() {
        let half = Money::from_decimal(Decimal::MAX / Decimal::from(2));
        let line = SupplementLine {
            id: "d".to_string(),
            kind: SupplementKind::Drawer,
            unit_price: half,
            quantity: 1,
        };
        let selection: SupplementSelection = vec![line.clone(), line.clone(), line].into_iter().collect();

        assert_eq!(
            selection.total().unwrap_err(),
            PricingError::Overflow("supplements total".to_string())
        );
    }

    #[test]
    fn test_height_policy_from_str() {
        assert_eq!("average".parse::<HeightPolicy>().unwrap(), HeightPolicy::AverageWithMaximum);
        assert_eq!(
            "declared_height".parse::<HeightPolicy>().unwrap(),
            HeightPolicy::DeclaredHeight
        );
        assert!("tallest".parse::<HeightPolicy>().is_err());
    }

    #[test]
    fn test_quote_serializes_decimals_as_strings() {
        let spec = check("M1(1500,730,500)b").unwrap();
        let quote = price(&spec, &tier(1500), &SupplementSelection::new()).unwrap();
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["volume_cubic_meters"], "0.5475");
        assert_eq!(json["base_price"], "821.25");
        assert_eq!(json["total_price"], 821);
        assert_eq!(json["height_policy"], "declared_height");
    }
}
