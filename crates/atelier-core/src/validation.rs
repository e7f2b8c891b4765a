//! # Validation Module
//!
//! Checks a [`ParsedSpecification`] against its preset schema.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Steps                                   │
//! │                                                                         │
//! │  1. Resolve preset ──── unknown? ──► [UnknownPreset]  (stop here)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. Arity             ──► ArityMismatch        ┐                       │
//! │  3. Every slot range  ──► OutOfRange (each)    │  accumulate,          │
//! │  4. Required flags    ──► MissingRequiredFlag  │  never stop at        │
//! │  5. Allowed flags     ──► UnknownFlag          ┘  the first one        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  6. No errors? ──► ValidatedSpecification                              │
//! │     Otherwise  ──► ValidationErrors (all of them, for the UI)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use atelier_core::{check, SpecificationError, SpecError};
//!
//! let spec = check("M1(1000,400,1000)bE").unwrap();
//! assert_eq!(spec.dimensions(), &[1000, 400, 1000]);
//!
//! // The base board is missing
//! let err = check("M1(1000,400,1000)E").unwrap_err();
//! match err {
//!     SpecificationError::Invalid(errors) => {
//!         assert_eq!(errors.first(), &SpecError::MissingRequiredFlag { flag: 'b' });
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use crate::error::{SpecError, SpecResult, ValidationErrors};
use crate::parser;
use crate::registry::PresetRegistry;
use crate::types::{ParsedSpecification, ValidatedSpecification};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// Validates against the built-in preset registry.
pub fn validate(parsed: ParsedSpecification) -> ValidationResult<ValidatedSpecification> {
    validate_with(PresetRegistry::builtin(), parsed)
}

/// Validates against an explicit registry.
pub fn validate_with(
    registry: &PresetRegistry,
    parsed: ParsedSpecification,
) -> ValidationResult<ValidatedSpecification> {
    let Some(template) = registry.lookup(&parsed.preset_id) else {
        return Err(unknown_preset(&parsed));
    };

    let mut errors = Vec::new();

    let expected = template.dimension_arity();
    let actual = parsed.dimensions.len();
    if actual != expected {
        errors.push(SpecError::ArityMismatch { expected, actual });
    }

    // Slots beyond either side have no range to check against
    for (slot, (&value, range)) in parsed
        .dimensions
        .iter()
        .zip(&template.dimension_ranges)
        .enumerate()
    {
        if !range.contains(value) {
            errors.push(SpecError::OutOfRange {
                slot,
                slot_name: template.slot_name(slot).to_string(),
                min: range.min,
                max: range.max,
                actual: value,
            });
        }
    }

    errors.extend(
        template
            .required_flags
            .difference(&parsed.flags)
            .map(|flag| SpecError::MissingRequiredFlag { flag }),
    );

    errors.extend(
        parsed
            .flags
            .difference(&template.allowed_flags)
            .map(|flag| SpecError::UnknownFlag { flag }),
    );

    match ValidationErrors::from_vec(errors) {
        Some(errors) => Err(errors),
        None => Ok(ValidatedSpecification::new_unchecked(parsed)),
    }
}

/// Parses then validates a code against the built-in registry.
pub fn check(code: &str) -> SpecResult<ValidatedSpecification> {
    check_with(PresetRegistry::builtin(), code)
}

/// Parses then validates a code against an explicit registry.
pub fn check_with(registry: &PresetRegistry, code: &str) -> SpecResult<ValidatedSpecification> {
    let parsed = parser::parse(code)?;
    Ok(validate_with(registry, parsed)?)
}

fn unknown_preset(parsed: &ParsedSpecification) -> ValidationErrors {
    ValidationErrors::single(SpecError::UnknownPreset {
        preset_id: parsed.preset_id.clone(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DimensionRange, PresetTemplate};
    use crate::SpecificationError;

    fn errors_of(code: &str) -> Vec<SpecError> {
        match check(code).unwrap_err() {
            SpecificationError::Invalid(errors) => errors.into_vec(),
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_specifications() {
        assert!(check("M1(1000,400,1000)b").is_ok());
        assert!(check("M1(1000,400,1000)bEFPT").is_ok());
        assert!(check("M2(2000,450,700,1200)E").is_ok());
        assert!(check("M3(2000,600,2200)bFS").is_ok());
        assert!(check("M4(1800,450,800)bPT").is_ok());
    }

    #[test]
    fn test_missing_base_board() {
        assert_eq!(
            errors_of("M1(1000,400,1000)E"),
            vec![SpecError::MissingRequiredFlag { flag: 'b' }]
        );
    }

    #[test]
    fn test_unknown_preset_short_circuits() {
        // Wrong arity and unknown flags would be reported for a known preset
        assert_eq!(
            errors_of("M9(100,100,100,100,100)xyz"),
            vec![SpecError::UnknownPreset {
                preset_id: "M9".to_string()
            }]
        );
    }

    #[test]
    fn test_arity_mismatch_with_in_range_values() {
        assert_eq!(
            errors_of("M1(1000,400)b"),
            vec![SpecError::ArityMismatch {
                expected: 3,
                actual: 2
            }]
        );
        assert_eq!(
            errors_of("M1(1000,400,1000,1000)b"),
            vec![SpecError::ArityMismatch {
                expected: 3,
                actual: 4
            }]
        );
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        assert!(check("M1(300,200,300)b").is_ok());
        assert!(check("M1(3000,800,2500)b").is_ok());
        assert_eq!(
            errors_of("M1(299,400,1000)b"),
            vec![SpecError::OutOfRange {
                slot: 0,
                slot_name: "width".to_string(),
                min: 300,
                max: 3000,
                actual: 299
            }]
        );
    }

    #[test]
    fn test_errors_accumulate() {
        let errors = errors_of("M1(10,10000,1000,5)EX");
        assert_eq!(
            errors,
            vec![
                SpecError::ArityMismatch {
                    expected: 3,
                    actual: 4
                },
                SpecError::OutOfRange {
                    slot: 0,
                    slot_name: "width".to_string(),
                    min: 300,
                    max: 3000,
                    actual: 10
                },
                SpecError::OutOfRange {
                    slot: 1,
                    slot_name: "depth".to_string(),
                    min: 200,
                    max: 800,
                    actual: 10000
                },
                SpecError::MissingRequiredFlag { flag: 'b' },
                SpecError::UnknownFlag { flag: 'X' },
            ]
        );
    }

    #[test]
    fn test_unknown_flag_blocks_validation() {
        assert_eq!(
            errors_of("M1(1000,400,1000)bS"),
            vec![SpecError::UnknownFlag { flag: 'S' }]
        );
    }

    #[test]
    fn test_wardrobe_requires_two_flags() {
        assert_eq!(
            errors_of("M3(2000,600,2200)E"),
            vec![
                SpecError::MissingRequiredFlag { flag: 'F' },
                SpecError::MissingRequiredFlag { flag: 'b' },
            ]
        );
    }

    #[test]
    fn test_sloped_max_height_is_range_checked() {
        let errors = errors_of("M2(2000,450,700,9000)E");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SpecError::OutOfRange { slot: 3, slot_name, .. } if slot_name == "max height"
        ));
    }

    #[test]
    fn test_syntax_errors_pass_through_check() {
        assert!(matches!(
            check("M1(1000,400,1000"),
            Err(SpecificationError::Syntax(_))
        ));
    }

    #[test]
    fn test_custom_registry() {
        let template = PresetTemplate {
            id: "K1".to_string(),
            label: "Kitchen block".to_string(),
            slot_names: vec!["width".into(), "depth".into(), "height".into()],
            dimension_ranges: vec![
                DimensionRange::new(600, 600),
                DimensionRange::new(600, 600),
                DimensionRange::new(900, 900),
            ],
            allowed_flags: "P".chars().collect(),
            required_flags: "P".chars().collect(),
        };
        let registry = PresetRegistry::from_templates([template]).unwrap();

        assert!(check_with(&registry, "K1(600,600,900)P").is_ok());
        assert!(check_with(&registry, "K1(600,600,900)").is_err());
        // Built-in presets are not visible through a custom registry
        assert!(check_with(&registry, "M1(1000,400,1000)b").is_err());
    }
}
