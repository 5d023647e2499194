//! Coordinate and parameter declarations.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use curvature_algebra::Symbol;
use regex::Regex;

use crate::error::InputError;

const IDENTIFIER: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Names that the metric-definition language claims for itself.
pub const RESERVED_NAMES: &[&str] = &[
    "metric", "pi", "func", "sin", "cos", "tan", "exp", "log", "ln", "diff", "diag", "matrix",
];

fn is_identifier(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(IDENTIFIER).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

fn parse_names(raw: &str, role: &'static str) -> Result<Vec<Symbol>, InputError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let trimmed = raw.trim();
    let list = trimmed.strip_suffix(',').unwrap_or(trimmed);
    if list.trim().is_empty() {
        return Ok(out);
    }
    for name in list.split(',').map(str::trim) {
        if name.is_empty() {
            return Err(InputError::EmptyName { role });
        }
        if !is_identifier(name) {
            return Err(InputError::InvalidName {
                role,
                name: name.to_string(),
            });
        }
        if is_reserved(name) {
            return Err(InputError::ReservedName {
                name: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(InputError::Duplicate {
                role,
                name: name.to_string(),
            });
        }
        out.push(Symbol::new(name));
    }
    Ok(out)
}

fn join(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(Symbol::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered coordinate symbols; declaration order is tensor index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateFrame {
    symbols: Vec<Symbol>,
}

impl CoordinateFrame {
    /// Parses a comma-separated coordinate list such as `"t, r, theta, phi"`.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let symbols = parse_names(raw, "coordinate")?;
        if symbols.is_empty() {
            return Err(InputError::NoCoordinates);
        }
        Ok(Self { symbols })
    }

    /// Dimension of the manifold.
    pub fn dim(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

impl fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.symbols))
    }
}

/// Real-valued symbolic constants, disjoint from the coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    symbols: Vec<Symbol>,
}

impl ParameterSet {
    pub fn parse(raw: &str, frame: &CoordinateFrame) -> Result<Self, InputError> {
        let symbols = parse_names(raw, "parameter")?;
        if let Some(clash) = symbols.iter().find(|s| frame.contains(s.name())) {
            return Err(InputError::Collision {
                name: clash.name().to_string(),
            });
        }
        Ok(Self { symbols })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbols.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&join(&self.symbols))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order_and_trims() {
        let frame = CoordinateFrame::parse(" t, r ,theta,phi ").unwrap();
        assert_eq!(frame.dim(), 4);
        assert_eq!(frame.index_of("theta"), Some(2));
        assert_eq!(frame.to_string(), "t, r, theta, phi");
    }

    #[test]
    fn test_trailing_comma_is_accepted() {
        let frame = CoordinateFrame::parse("x, y, ").unwrap();
        assert_eq!(frame.dim(), 2);
    }

    #[test]
    fn test_empty_items_are_rejected() {
        for raw in ["t,,r", ", t", "t, , r,"] {
            assert_eq!(
                CoordinateFrame::parse(raw),
                Err(InputError::EmptyName { role: "coordinate" }),
                "{raw}"
            );
        }
        let frame = CoordinateFrame::parse("t, r").unwrap();
        assert_eq!(
            ParameterSet::parse("M,,a", &frame),
            Err(InputError::EmptyName { role: "parameter" })
        );
        assert!(ParameterSet::parse("  ", &frame).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_coordinate_rejected() {
        assert_eq!(
            CoordinateFrame::parse("t, t"),
            Err(InputError::Duplicate {
                role: "coordinate",
                name: "t".to_string()
            })
        );
    }

    #[test]
    fn test_empty_frame_rejected() {
        assert_eq!(CoordinateFrame::parse(" , "), Err(InputError::NoCoordinates));
    }

    #[test]
    fn test_invalid_and_reserved_names() {
        assert!(matches!(
            CoordinateFrame::parse("1x"),
            Err(InputError::InvalidName { .. })
        ));
        assert!(matches!(
            CoordinateFrame::parse("r, sin"),
            Err(InputError::ReservedName { .. })
        ));
    }

    #[test]
    fn test_parameters_disjoint_from_coordinates() {
        let frame = CoordinateFrame::parse("t, r").unwrap();
        assert_eq!(
            ParameterSet::parse("M, r", &frame),
            Err(InputError::Collision {
                name: "r".to_string()
            })
        );
        let params = ParameterSet::parse("", &frame).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.to_string(), "(none)");
    }
}
