//! # Specification Parser
//!
//! Turns a code string into a [`ParsedSpecification`]. Purely syntactic: arity,
//! ranges and required flags are the validator's job, so the same parser serves
//! every preset family.
//!
//! ## Grammar
//! ```text
//! spec           := preset_id "(" dimension_list ")" flags
//! preset_id      := letter digit+            ; "M1", "M12"
//! dimension_list := dimension ("," dimension)*
//! dimension      := digit+                   ; millimeters, no leading zero beyond "0"
//! flags          := letter*                  ; single-character feature tokens
//! ```
//!
//! ## Failure Positions
//! ```text
//! M1(1000,,1000)b      EmptyDimension        at 8
//! M1(1000,04,1000)b    LeadingZero           at 8
//! M1(1000,400,1000     UnclosedParenthesis   at 16
//! M1(1000,400,1000)b!  InvalidFlag('!')      at 18
//! M1 (1000,400,1000)b  Whitespace            at 2
//! ```
//! Positions are character offsets. Whitespace is never trimmed: the parser
//! fails closed so that serialization stays byte-exact.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::types::{FlagSet, ParsedSpecification};

/// Parses a specification code.
///
/// ## Example
/// ```rust
/// use atelier_core::parser::parse;
///
/// let spec = parse("M2(2000,450,700,1200)E").unwrap();
/// assert_eq!(spec.preset_id, "M2");
/// assert_eq!(spec.dimensions, vec![2000, 450, 700, 1200]);
/// assert!(spec.flags.contains('E'));
///
/// assert!(parse("M2(2000,450,,1200)E").is_err());
/// ```
pub fn parse(code: &str) -> Result<ParsedSpecification, SyntaxError> {
    if code.is_empty() {
        return Err(SyntaxError::new(0, SyntaxErrorKind::Empty));
    }

    if let Some(position) = code.chars().position(char::is_whitespace) {
        return Err(SyntaxError::new(position, SyntaxErrorKind::Whitespace));
    }

    let mut cursor = Cursor::new(code);
    let preset_id = cursor.preset_id()?;
    cursor.open_paren()?;
    let dimensions = cursor.dimension_list()?;
    let flags = cursor.flags()?;

    Ok(ParsedSpecification::new(preset_id, dimensions, flags))
}

/// Writes the canonical code for a parsed specification.
///
/// `parse(&serialize(&spec)) == Ok(spec)` for every `spec` the parser can
/// produce.
pub fn serialize(spec: &ParsedSpecification) -> String {
    spec.to_string()
}

// =============================================================================
// Cursor
// =============================================================================

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(code: &'a str) -> Self {
        Cursor {
            chars: code.chars().peekable(),
            pos: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, reason: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(self.pos, reason)
    }

    fn preset_id(&mut self) -> Result<String, SyntaxError> {
        let mut id = String::new();

        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                id.push(c);
                self.bump();
            }
            _ => return Err(self.error(SyntaxErrorKind::InvalidPresetId)),
        }

        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            id.push(c);
            self.bump();
        }

        if id.len() == 1 {
            return Err(self.error(SyntaxErrorKind::InvalidPresetId));
        }

        // "M1X(" has a malformed id rather than a missing parenthesis
        if self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return Err(self.error(SyntaxErrorKind::InvalidPresetId));
        }

        Ok(id)
    }

    fn open_paren(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            Some('(') => {
                self.bump();
                Ok(())
            }
            _ => Err(self.error(SyntaxErrorKind::ExpectedOpenParen)),
        }
    }

    fn dimension_list(&mut self) -> Result<Vec<u32>, SyntaxError> {
        let mut dimensions = Vec::new();

        loop {
            dimensions.push(self.dimension()?);

            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {
                    self.bump();
                    return Ok(dimensions);
                }
                None => return Err(self.error(SyntaxErrorKind::UnclosedParenthesis)),
                Some(c) => return Err(self.error(SyntaxErrorKind::InvalidDimension(c))),
            }
        }
    }

    fn dimension(&mut self) -> Result<u32, SyntaxError> {
        let start = self.pos;
        let mut digits = 0usize;
        let mut leading_zero = false;
        let mut value: Option<u32> = Some(0);

        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            if digits == 0 && c == '0' {
                leading_zero = true;
            }
            let digit = c as u32 - '0' as u32;
            value = value
                .and_then(|v| v.checked_mul(10))
                .and_then(|v| v.checked_add(digit));
            digits += 1;
            self.bump();
        }

        if digits == 0 {
            return Err(match self.peek() {
                Some(',') | Some(')') => self.error(SyntaxErrorKind::EmptyDimension),
                None => self.error(SyntaxErrorKind::UnclosedParenthesis),
                Some(c) => self.error(SyntaxErrorKind::InvalidDimension(c)),
            });
        }

        if leading_zero && digits > 1 {
            return Err(SyntaxError::new(start, SyntaxErrorKind::LeadingZero));
        }

        value.ok_or(SyntaxError::new(start, SyntaxErrorKind::DimensionOverflow))
    }

    fn flags(&mut self) -> Result<FlagSet, SyntaxError> {
        let mut flags = FlagSet::new();

        while let Some(c) = self.peek() {
            if !c.is_ascii_alphabetic() {
                return Err(self.error(SyntaxErrorKind::InvalidFlag(c)));
            }
            if !flags.insert(c) {
                return Err(self.error(SyntaxErrorKind::DuplicateFlag(c)));
            }
            self.bump();
        }

        Ok(flags)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn err(code: &str) -> (usize, SyntaxErrorKind) {
        let e = parse(code).unwrap_err();
        (e.position, e.reason)
    }

    #[test]
    fn test_parse_three_dimensions() {
        let spec = parse("M1(1000,400,1000)E").unwrap();
        assert_eq!(spec.preset_id, "M1");
        assert_eq!(spec.dimensions, vec![1000, 400, 1000]);
        assert_eq!(spec.flags.iter().collect::<Vec<_>>(), vec!['E']);
    }

    #[test]
    fn test_parse_without_flags() {
        let spec = parse("M12(5,0,7)").unwrap();
        assert_eq!(spec.preset_id, "M12");
        assert_eq!(spec.dimensions, vec![5, 0, 7]);
        assert!(spec.flags.is_empty());
    }

    #[test]
    fn test_parser_is_schema_agnostic() {
        // Unknown preset and wrong arity are the validator's business
        let spec = parse("Z9(1)bXq").unwrap();
        assert_eq!(spec.preset_id, "Z9");
        assert_eq!(spec.dimensions, vec![1]);
        assert_eq!(spec.flags.len(), 3);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(err(""), (0, SyntaxErrorKind::Empty));
        assert_eq!(err(" M1(1,2,3)b"), (0, SyntaxErrorKind::Whitespace));
        assert_eq!(err("M1(1000, 400,1000)b"), (8, SyntaxErrorKind::Whitespace));
        assert_eq!(err("M1(1,2,3)b\n"), (10, SyntaxErrorKind::Whitespace));
    }

    #[test]
    fn test_invalid_preset_id() {
        assert_eq!(err("(1,2,3)"), (0, SyntaxErrorKind::InvalidPresetId));
        assert_eq!(err("1M(1,2,3)"), (0, SyntaxErrorKind::InvalidPresetId));
        assert_eq!(err("M(1,2,3)"), (1, SyntaxErrorKind::InvalidPresetId));
        assert_eq!(err("MX1(1,2,3)"), (1, SyntaxErrorKind::InvalidPresetId));
        assert_eq!(err("M1X(1,2,3)"), (2, SyntaxErrorKind::InvalidPresetId));
    }

    #[test]
    fn test_malformed_parentheses() {
        assert_eq!(err("M1"), (2, SyntaxErrorKind::ExpectedOpenParen));
        assert_eq!(err("M1[1,2,3]"), (2, SyntaxErrorKind::ExpectedOpenParen));
        assert_eq!(err("M1(1,2,3"), (8, SyntaxErrorKind::UnclosedParenthesis));
        assert_eq!(err("M1(1,2,"), (7, SyntaxErrorKind::UnclosedParenthesis));
        assert_eq!(err("M1(1,2,3))"), (9, SyntaxErrorKind::InvalidFlag(')')));
    }

    #[test]
    fn test_bad_dimensions() {
        assert_eq!(err("M1()b"), (3, SyntaxErrorKind::EmptyDimension));
        assert_eq!(err("M1(1000,,1000)b"), (8, SyntaxErrorKind::EmptyDimension));
        assert_eq!(err("M1(1000,400,)b"), (12, SyntaxErrorKind::EmptyDimension));
        assert_eq!(err("M1(1000,4a0,1000)b"), (9, SyntaxErrorKind::InvalidDimension('a')));
        assert_eq!(err("M1(-1,2,3)"), (3, SyntaxErrorKind::InvalidDimension('-')));
        assert_eq!(err("M1(1.5,2,3)"), (4, SyntaxErrorKind::InvalidDimension('.')));
        assert_eq!(err("M1(1000,04,1000)b"), (8, SyntaxErrorKind::LeadingZero));
        assert_eq!(err("M1(99999999999,1,1)"), (3, SyntaxErrorKind::DimensionOverflow));
    }

    #[test]
    fn test_zero_is_a_valid_token() {
        assert_eq!(parse("M1(0,0,0)").unwrap().dimensions, vec![0, 0, 0]);
    }

    #[test]
    fn test_u32_max_fits() {
        let spec = parse("M1(4294967295,1,1)").unwrap();
        assert_eq!(spec.dimensions[0], u32::MAX);
        assert_eq!(err("M1(4294967296,1,1)"), (3, SyntaxErrorKind::DimensionOverflow));
    }

    #[test]
    fn test_bad_flags() {
        assert_eq!(err("M1(1,2,3)b1"), (10, SyntaxErrorKind::InvalidFlag('1')));
        assert_eq!(err("M1(1,2,3)b-"), (10, SyntaxErrorKind::InvalidFlag('-')));
        assert_eq!(err("M1(1,2,3)bEb"), (11, SyntaxErrorKind::DuplicateFlag('b')));
        assert_eq!(err("M1(1,2,3)é"), (9, SyntaxErrorKind::InvalidFlag('é')));
    }

    #[test]
    fn test_serialize_is_canonical() {
        let spec = parse("M1(1000,400,1000)bE").unwrap();
        assert_eq!(serialize(&spec), "M1(1000,400,1000)Eb");
        assert_eq!(parse(&serialize(&spec)).unwrap(), spec);
    }

    #[test]
    fn test_canonical_input_round_trips_byte_exact() {
        let code = "M2(2000,450,700,1200)EFb";
        assert_eq!(serialize(&parse(code).unwrap()), code);
    }
}
