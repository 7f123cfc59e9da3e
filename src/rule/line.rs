//! Per-line checks for normalized bounding-box annotations.
//!
//! A record is `class_id center_x center_y width height`. Checks run in a
//! fixed order and stop at the first failure, so every invalid line maps to
//! exactly one [`Reason`]:
//!
//! 1. exactly 5 whitespace-separated tokens
//! 2. `class_id` is a non-negative integer
//! 3. the four coordinates parse as numbers
//! 4. no coordinate is NaN or infinite
//! 5. `width > 0` and `height > 0`
//! 6. `center_x` and `center_y` lie in `[0, 1]`
//! 7. derived edges lie in `[0, 1]`, checked as x_min, x_max, y_min, y_max

use crate::types::Finding;
use std::fmt;
use thiserror::Error;

/// Number of tokens in a record
pub const RECORD_TOKENS: usize = 5;

/// Coordinate fields of a record, in token order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CenterX,
    CenterY,
    Width,
    Height,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::CenterX, Field::CenterY, Field::Width, Field::Height];

    pub fn name(self) -> &'static str {
        match self {
            Field::CenterX => "center_x",
            Field::CenterY => "center_y",
            Field::Width => "width",
            Field::Height => "height",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Box edges in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub fn side(self) -> &'static str {
        match self {
            Edge::Left => "left",
            Edge::Right => "right",
            Edge::Top => "top",
            Edge::Bottom => "bottom",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Edge::Left => "x_min",
            Edge::Right => "x_max",
            Edge::Top => "y_min",
            Edge::Bottom => "y_max",
        }
    }

    /// Comparison shown in messages (`< 0` or `> 1`)
    pub fn bound(self) -> &'static str {
        match self {
            Edge::Left | Edge::Top => "< 0",
            Edge::Right | Edge::Bottom => "> 1",
        }
    }
}

/// Why a line was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Reason {
    #[error("Expected exactly 5 values, found {found}")]
    TokenCount { found: usize },

    #[error("class_id must be integer, found: '{token}'")]
    ClassIdNotInteger { token: String },

    #[error("class_id must be non-negative integer, found: {token}")]
    ClassIdNegative { token: String },

    #[error("class_id is too large, found: {token}")]
    ClassIdTooLarge { token: String },

    #[error("Invalid numeric value for {field}: '{token}'")]
    InvalidNumber { field: Field, token: String },

    #[error("{field} is NaN")]
    NotANumber { field: Field },

    #[error("{field} is Infinity")]
    Infinite { field: Field },

    #[error("{field} must be > 0, found: {value:?}")]
    NonPositiveSize { field: Field, value: f64 },

    #[error("{field} must be in [0, 1], found: {value:?}")]
    CenterOutOfRange { field: Field, value: f64 },

    #[error(
        "Bounding box exceeds {side} edge: {name}={value:.6} {bound}",
        side = .edge.side(),
        name = .edge.name(),
        bound = .edge.bound()
    )]
    EdgeOutOfBounds { edge: Edge, value: f64 },
}

/// A record that passed every check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub class_id: u64,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Derived edges in check order
    pub fn edges(&self) -> [(Edge, f64); 4] {
        [
            (Edge::Left, self.center_x - self.width / 2.0),
            (Edge::Right, self.center_x + self.width / 2.0),
            (Edge::Top, self.center_y - self.height / 2.0),
            (Edge::Bottom, self.center_y + self.height / 2.0),
        ]
    }
}

/// Stateless line checker. `tolerance` widens the unit interval used for
/// centers and edges to `[-tolerance, 1 + tolerance]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineValidator {
    pub tolerance: f64,
}

impl LineValidator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Validate one line.
    ///
    /// Returns `Ok(None)` for blank lines, `Ok(Some(_))` for a valid record
    /// and `Err` with the first violated check otherwise.
    pub fn validate(&self, line: &str) -> Result<Option<BoundingBox>, Reason> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(None);
        }
        if tokens.len() != RECORD_TOKENS {
            return Err(Reason::TokenCount {
                found: tokens.len(),
            });
        }

        let class_id = parse_class_id(tokens[0])?;

        let mut values = [0.0; 4];
        for (slot, (field, token)) in values.iter_mut().zip(Field::ALL.iter().zip(&tokens[1..])) {
            *slot = token.parse::<f64>().map_err(|_| Reason::InvalidNumber {
                field: *field,
                token: token.to_string(),
            })?;
        }

        for (field, value) in Field::ALL.iter().zip(values) {
            if value.is_nan() {
                return Err(Reason::NotANumber { field: *field });
            }
            if value.is_infinite() {
                return Err(Reason::Infinite { field: *field });
            }
        }

        let [center_x, center_y, width, height] = values;

        for (field, value) in [(Field::Width, width), (Field::Height, height)] {
            if value <= 0.0 {
                return Err(Reason::NonPositiveSize { field, value });
            }
        }

        for (field, value) in [(Field::CenterX, center_x), (Field::CenterY, center_y)] {
            if value < self.lower() || value > self.upper() {
                return Err(Reason::CenterOutOfRange { field, value });
            }
        }

        let bbox = BoundingBox {
            class_id,
            center_x,
            center_y,
            width,
            height,
        };
        for (edge, value) in bbox.edges() {
            let outside = match edge {
                Edge::Left | Edge::Top => value < self.lower(),
                Edge::Right | Edge::Bottom => value > self.upper(),
            };
            if outside {
                return Err(Reason::EdgeOutOfBounds { edge, value });
            }
        }

        Ok(Some(bbox))
    }

    /// Validate one line of `file` at 1-indexed `line_number`, turning the
    /// first violation into a finding
    pub fn check(
        &self,
        file: &str,
        line_number: usize,
        line: &str,
    ) -> Result<Option<BoundingBox>, Finding> {
        self.validate(line)
            .map_err(|reason| Finding::at_line(file, line_number, line, reason))
    }

    fn lower(&self) -> f64 {
        -self.tolerance
    }

    fn upper(&self) -> f64 {
        1.0 + self.tolerance
    }
}

fn parse_class_id(token: &str) -> Result<u64, Reason> {
    if let Ok(id) = token.parse::<u64>() {
        return Ok(id);
    }

    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Reason::ClassIdNotInteger {
            token: token.to_string(),
        });
    }
    // "-0" is zero
    if digits.bytes().all(|b| b == b'0') {
        return Ok(0);
    }
    if token.starts_with('-') {
        Err(Reason::ClassIdNegative {
            token: token.to_string(),
        })
    } else {
        Err(Reason::ClassIdTooLarge {
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(line: &str) -> Result<Option<BoundingBox>, Reason> {
        LineValidator::default().validate(line)
    }

    fn reason(line: &str) -> String {
        validate(line).expect_err("line should be rejected").to_string()
    }

    #[test]
    fn test_valid_line() {
        let bbox = validate("0 0.5 0.5 0.2 0.2").unwrap().unwrap();
        assert_eq!(bbox.class_id, 0);
        let edges: Vec<f64> = bbox.edges().iter().map(|(_, v)| *v).collect();
        assert!((edges[0] - 0.4).abs() < 1e-12);
        assert!((edges[1] - 0.6).abs() < 1e-12);
        assert!((edges[2] - 0.4).abs() < 1e-12);
        assert!((edges[3] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_valid_line_variants() {
        for line in [
            "3 0.5 0.5 1 1",
            "0 0 0 0 0.0001",
            "12 1e-1 0.8 0.2 0.2",
            "  7\t0.25   0.75 0.5 0.5  ",
            "+2 0.5 0.5 0.2 0.2",
            "-0 0.5 0.5 0.2 0.2",
            "0 0.5 0.5 0.2 0.2\r",
        ] {
            let result = validate(line);
            if line.starts_with("0 0 0") {
                // zero width fails before anything else is checked
                assert!(matches!(
                    result,
                    Err(Reason::NonPositiveSize {
                        field: Field::Width,
                        ..
                    })
                ));
            } else {
                assert!(matches!(result, Ok(Some(_))), "{line:?}: {result:?}");
            }
        }
    }

    #[test]
    fn test_box_touching_bounds_is_valid() {
        assert!(validate("0 0.5 0.5 1.0 1.0").unwrap().is_some());
        assert!(validate("0 0.125 0.875 0.25 0.25").unwrap().is_some());
    }

    #[test]
    fn test_blank_lines() {
        for line in ["", "   ", "\t", "\r", " \t \r"] {
            assert_eq!(validate(line), Ok(None));
            assert_eq!(LineValidator::default().check("a.txt", 9, line), Ok(None));
        }
    }

    #[test]
    fn test_wide_box_reports_left_edge_first() {
        // x_min = -0.1 and x_max = 1.1; x_min is checked first
        let err = validate("0 0.5 0.5 1.2 0.2").unwrap_err();
        assert!(matches!(
            err,
            Reason::EdgeOutOfBounds {
                edge: Edge::Left,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Bounding box exceeds left edge: x_min=-0.100000 < 0"
        );
    }

    #[test]
    fn test_right_edge_exceeded() {
        let err = validate("0 0.7 0.5 0.8 0.2").unwrap_err();
        assert!(matches!(
            err,
            Reason::EdgeOutOfBounds {
                edge: Edge::Right,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Bounding box exceeds right edge: x_max=1.100000 > 1"
        );
    }

    #[test]
    fn test_edge_check_order() {
        // both x edges are out; left wins
        assert_eq!(
            reason("0 0.5 0.5 1.4 1.4"),
            "Bounding box exceeds left edge: x_min=-0.200000 < 0"
        );
        assert_eq!(
            reason("0 0.5 0.1 0.2 0.4"),
            "Bounding box exceeds top edge: y_min=-0.100000 < 0"
        );
        assert_eq!(
            reason("0 0.5 0.9 0.2 0.4"),
            "Bounding box exceeds bottom edge: y_max=1.100000 > 1"
        );
    }

    #[test]
    fn test_negative_class_id() {
        assert_eq!(
            validate("-1 0.5 0.5 0.2 0.2"),
            Err(Reason::ClassIdNegative { token: "-1".into() })
        );
        assert_eq!(
            reason("-1 0.5 0.5 0.2 0.2"),
            "class_id must be non-negative integer, found: -1"
        );
    }

    #[test]
    fn test_class_id_not_integer() {
        for token in ["a", "1.0", "-", "0x1"] {
            let line = format!("{token} 0.5 0.5 0.2 0.2");
            assert_eq!(
                validate(&line),
                Err(Reason::ClassIdNotInteger {
                    token: token.into()
                })
            );
        }
    }

    #[test]
    fn test_class_id_too_large() {
        assert!(matches!(
            validate("99999999999999999999999 0.5 0.5 0.2 0.2"),
            Err(Reason::ClassIdTooLarge { .. })
        ));
    }

    #[test]
    fn test_zero_width() {
        assert_eq!(
            validate("0 0.5 0.5 0 0.2"),
            Err(Reason::NonPositiveSize {
                field: Field::Width,
                value: 0.0
            })
        );
        assert_eq!(reason("0 0.5 0.5 0 0.2"), "width must be > 0, found: 0.0");
    }

    #[test]
    fn test_negative_height() {
        assert_eq!(
            reason("0 0.5 0.5 0.2 -0.1"),
            "height must be > 0, found: -0.1"
        );
    }

    #[test]
    fn test_wrong_token_count() {
        assert_eq!(validate("0 0.5 0.5 0.2"), Err(Reason::TokenCount { found: 4 }));
        assert_eq!(
            reason("0 0.5 0.5 0.2 0.2 0.1"),
            "Expected exactly 5 values, found 6"
        );
    }

    #[test]
    fn test_nan_and_infinity() {
        assert_eq!(
            validate("0 nan 0.5 0.2 0.2"),
            Err(Reason::NotANumber {
                field: Field::CenterX
            })
        );
        assert_eq!(reason("0 nan 0.5 0.2 0.2"), "center_x is NaN");
        assert_eq!(
            validate("0 0.5 0.5 inf 0.2"),
            Err(Reason::Infinite {
                field: Field::Width
            })
        );
        assert_eq!(reason("0 0.5 0.5 0.2 -inf"), "height is Infinity");
    }

    #[test]
    fn test_unparsable_coordinate() {
        assert_eq!(
            validate("0 0.5 abc 0.2 0.2"),
            Err(Reason::InvalidNumber {
                field: Field::CenterY,
                token: "abc".into()
            })
        );
        assert_eq!(
            reason("0 0.5 abc 0.2 0.2"),
            "Invalid numeric value for center_y: 'abc'"
        );
    }

    #[test]
    fn test_parse_errors_precede_nan_checks() {
        // the NaN in center_x is only reported once every token parses
        assert!(matches!(
            validate("0 nan 0.5 0.2 x"),
            Err(Reason::InvalidNumber {
                field: Field::Height,
                ..
            })
        ));
    }

    #[test]
    fn test_center_out_of_range() {
        assert_eq!(
            reason("0 1.5 0.5 0.2 0.2"),
            "center_x must be in [0, 1], found: 1.5"
        );
        assert_eq!(
            validate("0 0.5 -0.1 0.2 0.2"),
            Err(Reason::CenterOutOfRange {
                field: Field::CenterY,
                value: -0.1
            })
        );
    }

    #[test]
    fn test_first_violation_wins() {
        // wrong class id, zero width and bad center all present
        assert!(matches!(
            validate("-3 2.0 0.5 0 0.2"),
            Err(Reason::ClassIdNegative { .. })
        ));
        // zero width beats out-of-range center
        assert!(matches!(
            validate("0 2.0 0.5 0 0.2"),
            Err(Reason::NonPositiveSize { .. })
        ));
    }

    #[test]
    fn test_tolerance_widens_interval() {
        let strict = LineValidator::default();
        let lenient = LineValidator::new(1e-6);
        let line = "0 0.5 0.5 1.0000005 0.2";
        assert!(strict.validate(line).is_err());
        assert!(lenient.validate(line).unwrap().is_some());
        // tolerance never admits zero-area boxes
        assert!(lenient.validate("0 0.5 0.5 0 0.2").is_err());
    }

    #[test]
    fn test_check_builds_finding() {
        let finding = LineValidator::default()
            .check("train/a.txt", 4, " 0 0.5 0.5 0.2 \n")
            .unwrap_err();
        assert_eq!(finding.file, "train/a.txt");
        assert_eq!(finding.line, 4);
        assert_eq!(finding.text, "0 0.5 0.5 0.2");
        assert_eq!(finding.reason, "Expected exactly 5 values, found 4");
    }

    #[test]
    fn test_validator_is_pure() {
        let validator = LineValidator::default();
        let lines = ["0 0.5 0.5 1.2 0.2", "0 0.5 0.5 0.2 0.2", "x"];
        let first: Vec<_> = lines.iter().map(|l| validator.validate(l)).collect();
        let second: Vec<_> = lines.iter().rev().map(|l| validator.validate(l)).collect();
        assert_eq!(first, second.into_iter().rev().collect::<Vec<_>>());
    }
}
