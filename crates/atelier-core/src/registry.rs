//! # Preset Registry
//!
//! Static table of known preset families and their dimensional/flag schema.
//!
//! ## Registry Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lookup("M1") ──► Some(&PresetTemplate)                                 │
//! │  lookup("M9") ──► None  (validator reports UnknownPreset)              │
//! │                                                                         │
//! │  • Built once at process start, read-only afterwards                   │
//! │  • Adding a preset family is a table update, never a grammar change    │
//! │  • A corrupted table is the only condition allowed to abort            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flag Vocabulary
//! | flag | meaning                       |
//! |------|-------------------------------|
//! | `b`  | base board (socle)            |
//! | `E`  | shelves                       |
//! | `F`  | closed back panel             |
//! | `P`  | doors                         |
//! | `T`  | drawers                       |
//! | `S`  | wardrobe rail                 |

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use ts_rs::TS;

use crate::types::FlagSet;

/// The base-board token. Free-standing presets require it.
pub const BASE_BOARD_FLAG: char = 'b';

const BASE_SLOT_NAMES: [&str; 3] = ["width", "depth", "height"];
const SLOPED_SLOT_NAMES: [&str; 4] = ["width", "depth", "height", "max height"];

// =============================================================================
// Dimension Range
// =============================================================================

/// Inclusive millimeter range for one dimension slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DimensionRange {
    pub min: u32,
    pub max: u32,
}

impl DimensionRange {
    pub const fn new(min: u32, max: u32) -> Self {
        DimensionRange { min, max }
    }

    #[inline]
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

// =============================================================================
// Preset Template
// =============================================================================

/// Schema of one preset family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PresetTemplate {
    /// Preset id as written in codes, e.g. `M1`.
    pub id: String,

    /// Human label for catalogs.
    pub label: String,

    /// Name of each slot, used in error messages (`width`, `depth`, ...).
    pub slot_names: Vec<String>,

    /// Inclusive range per slot. Its length is the preset's arity.
    pub dimension_ranges: Vec<DimensionRange>,

    /// Flags this preset recognizes.
    pub allowed_flags: FlagSet,

    /// Flags every specification of this preset must carry.
    pub required_flags: FlagSet,
}

impl PresetTemplate {
    /// Number of dimensions a specification of this preset must have (3 or 4).
    ///
    /// A 4th slot is the maximum height of a sloped/progressive unit.
    pub fn dimension_arity(&self) -> usize {
        self.dimension_ranges.len()
    }

    /// True for presets carrying a 4th "maximum height" slot.
    pub fn is_sloped(&self) -> bool {
        self.dimension_arity() == 4
    }

    pub fn slot_name(&self, slot: usize) -> &str {
        self.slot_names.get(slot).map_or("dimension", String::as_str)
    }

    fn builtin(
        id: &str,
        label: &str,
        ranges: &[(u32, u32)],
        allowed: &str,
        required: &str,
    ) -> Self {
        let names: &[&str] = if ranges.len() == 4 {
            &SLOPED_SLOT_NAMES
        } else {
            &BASE_SLOT_NAMES
        };
        PresetTemplate {
            id: id.to_string(),
            label: label.to_string(),
            slot_names: names.iter().map(|n| n.to_string()).collect(),
            dimension_ranges: ranges
                .iter()
                .map(|&(min, max)| DimensionRange::new(min, max))
                .collect(),
            allowed_flags: allowed.chars().collect(),
            required_flags: required.chars().collect(),
        }
    }

    /// Checks the template is internally consistent.
    fn check(&self) -> Result<(), RegistryError> {
        let arity = self.dimension_arity();
        if !(3..=4).contains(&arity) {
            return Err(RegistryError::UnsupportedArity {
                preset: self.id.clone(),
                arity,
            });
        }
        if self.slot_names.len() != arity {
            return Err(RegistryError::SlotNameMismatch {
                preset: self.id.clone(),
            });
        }
        if let Some(slot) = self.dimension_ranges.iter().position(|r| r.min > r.max) {
            return Err(RegistryError::EmptyRange {
                preset: self.id.clone(),
                slot,
            });
        }
        if !self.required_flags.is_subset(&self.allowed_flags) {
            return Err(RegistryError::RequiredNotAllowed {
                preset: self.id.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Inconsistent preset table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("preset '{preset}' has unsupported arity {arity} (expected 3 or 4)")]
    UnsupportedArity { preset: String, arity: usize },

    #[error("preset '{preset}' has a slot name count different from its arity")]
    SlotNameMismatch { preset: String },

    #[error("preset '{preset}' slot {slot} has min greater than max")]
    EmptyRange { preset: String, slot: usize },

    #[error("preset '{preset}' requires a flag it does not allow")]
    RequiredNotAllowed { preset: String },

    #[error("preset '{0}' is registered twice")]
    Duplicate(String),
}

/// Read-only table of preset templates keyed by id.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    templates: BTreeMap<String, PresetTemplate>,
}

impl PresetRegistry {
    /// Builds a registry from templates, rejecting inconsistent ones.
    pub fn from_templates(
        templates: impl IntoIterator<Item = PresetTemplate>,
    ) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for template in templates {
            template.check()?;
            if map.contains_key(&template.id) {
                return Err(RegistryError::Duplicate(template.id));
            }
            map.insert(template.id.clone(), template);
        }
        Ok(PresetRegistry { templates: map })
    }

    /// The process-wide built-in registry.
    ///
    /// ## Panics
    /// If the built-in table is inconsistent. That is a corrupted build, not a
    /// user error.
    pub fn builtin() -> &'static PresetRegistry {
        static REGISTRY: OnceLock<PresetRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            PresetRegistry::from_templates(builtin_templates())
                .unwrap_or_else(|e| panic!("built-in preset registry is corrupted: {e}"))
        })
    }

    /// Looks up a preset by id.
    pub fn lookup(&self, preset_id: &str) -> Option<&PresetTemplate> {
        self.templates.get(preset_id)
    }

    /// All templates, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &PresetTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Looks up a preset in the built-in registry.
pub fn lookup(preset_id: &str) -> Option<&'static PresetTemplate> {
    PresetRegistry::builtin().lookup(preset_id)
}

fn builtin_templates() -> Vec<PresetTemplate> {
    vec![
        PresetTemplate::builtin(
            "M1",
            "Free-standing shelving",
            &[(300, 3000), (200, 800), (300, 2500)],
            "bEFPT",
            "b",
        ),
        PresetTemplate::builtin(
            "M2",
            "Sloped attic unit",
            &[(300, 4000), (200, 800), (300, 2500), (300, 3000)],
            "bEFPT",
            "",
        ),
        PresetTemplate::builtin(
            "M3",
            "Wardrobe",
            &[(400, 3000), (450, 700), (1000, 2600)],
            "bEFPTS",
            "bF",
        ),
        PresetTemplate::builtin(
            "M4",
            "Low sideboard",
            &[(400, 3000), (250, 600), (200, 1000)],
            "bEFPT",
            "b",
        ),
    ]
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let m1 = lookup("M1").unwrap();
        assert_eq!(m1.dimension_arity(), 3);
        assert!(m1.required_flags.contains(BASE_BOARD_FLAG));

        let m2 = lookup("M2").unwrap();
        assert_eq!(m2.dimension_arity(), 4);
        assert!(m2.is_sloped());
        assert_eq!(m2.slot_name(3), "max height");

        assert!(lookup("M9").is_none());
    }

    #[test]
    fn test_builtin_is_consistent() {
        let registry = PresetRegistry::builtin();
        assert_eq!(registry.len(), 4);
        assert!(!registry.is_empty());
        for template in registry.iter() {
            assert!(template.check().is_ok(), "{} is inconsistent", template.id);
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = PresetRegistry::from_templates(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.lookup("M1").is_none());
    }

    #[test]
    fn test_rejects_required_flag_not_allowed() {
        let bad = PresetTemplate::builtin("X1", "Broken", &[(1, 2), (1, 2), (1, 2)], "E", "b");
        assert_eq!(
            PresetRegistry::from_templates([bad]).unwrap_err(),
            RegistryError::RequiredNotAllowed {
                preset: "X1".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_bad_arity_and_duplicates() {
        let two_slots = PresetTemplate::builtin("X2", "Flat", &[(1, 2), (1, 2)], "", "");
        assert!(matches!(
            PresetRegistry::from_templates([two_slots]),
            Err(RegistryError::UnsupportedArity { arity: 2, .. })
        ));

        let a = PresetTemplate::builtin("X3", "A", &[(1, 2), (1, 2), (1, 2)], "", "");
        let b = a.clone();
        assert_eq!(
            PresetRegistry::from_templates([a, b]).unwrap_err(),
            RegistryError::Duplicate("X3".to_string())
        );
    }

    #[test]
    fn test_rejects_inverted_range() {
        let bad = PresetTemplate::builtin("X4", "Inverted", &[(1, 2), (5, 4), (1, 2)], "", "");
        assert_eq!(
            PresetRegistry::from_templates([bad]).unwrap_err(),
            RegistryError::EmptyRange {
                preset: "X4".to_string(),
                slot: 1
            }
        );
    }
}
