//! Named steps of a run, in dependency order.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Metric,
    Inverse,
    Christoffel,
    Ricci,
    RicciScalar,
    Einstein,
    MixedEinstein,
    Divergence,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 9] = [
        Stage::Input,
        Stage::Metric,
        Stage::Inverse,
        Stage::Christoffel,
        Stage::Ricci,
        Stage::RicciScalar,
        Stage::Einstein,
        Stage::MixedEinstein,
        Stage::Divergence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Metric => "metric",
            Stage::Inverse => "inverse",
            Stage::Christoffel => "christoffel",
            Stage::Ricci => "ricci",
            Stage::RicciScalar => "ricci_scalar",
            Stage::Einstein => "einstein",
            Stage::MixedEinstein => "mixed_einstein",
            Stage::Divergence => "divergence",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_follows_dependencies() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert_eq!(Stage::MixedEinstein.to_string(), "mixed_einstein");
    }

    #[test]
    fn test_stage_serde_snake_case() {
        let json = serde_json::to_string(&Stage::RicciScalar).unwrap();
        assert_eq!(json, "\"ricci_scalar\"");
    }
}
