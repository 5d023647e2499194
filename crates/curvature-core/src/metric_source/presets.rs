//! Built-in metric sources.

use std::fmt;
use std::str::FromStr;

const SCHWARZSCHILD: &str = "\
# Schwarzschild exterior solution
f = 1 - 2*M/r
metric = diag(-f, 1/f, r^2, r^2*sin(theta)^2)
";

const KERR: &str = "\
# Kerr metric in Boyer-Lindquist coordinates
rho2 = r^2 + a^2*cos(theta)^2
Delta = r^2 - 2*M*r + a^2

metric = [
  [-(1 - 2*M*r/rho2), 0, 0, -(2*M*a*r*sin(theta)^2)/rho2],
  [0, rho2/Delta, 0, 0],
  [0, 0, rho2, 0],
  [-(2*M*a*r*sin(theta)^2)/rho2, 0, 0, ((r^2 + a^2)^2 - a^2*Delta*sin(theta)^2)*sin(theta)^2/rho2]
]
";

const TONO: &str = "\
# Rotating exponential metric with an undefined angular velocity omega(r)
func omega(r)
domega = diff(omega, r)
s2 = sin(theta)^2
E = exp(2*k/r)

metric = [
  [-exp(-2*k/r) + omega^2*r^2*E*s2, domega*t*omega*r^2*E*s2, 0, -omega*r^2*E*s2],
  [domega*t*omega*r^2*E*s2, -E*(1 + domega^2*t^2*r^2*s2), 0, -domega*t*r^2*E*s2],
  [0, 0, r^2*E, 0],
  [-omega*r^2*E*s2, -domega*t*r^2*E*s2, 0, r^2*E*s2]
]
";

const FLAT_2D: &str = "\
# Euclidean plane
metric = diag(1, 1)
";

/// Ready-made metric definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricPreset {
    Schwarzschild,
    Kerr,
    Tono,
    Flat2d,
}

impl MetricPreset {
    pub const ALL: [MetricPreset; 4] = [
        MetricPreset::Schwarzschild,
        MetricPreset::Kerr,
        MetricPreset::Tono,
        MetricPreset::Flat2d,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricPreset::Schwarzschild => "schwarzschild",
            MetricPreset::Kerr => "kerr",
            MetricPreset::Tono => "tono",
            MetricPreset::Flat2d => "flat2d",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MetricPreset::Schwarzschild => "static spherically symmetric vacuum (mass M)",
            MetricPreset::Kerr => "rotating vacuum in Boyer-Lindquist form (mass M, spin a)",
            MetricPreset::Tono => {
                "rotating exponential metric with undefined omega(r); non-vacuum, \
                 the curvature and divergence stages run for minutes"
            }
            MetricPreset::Flat2d => "Euclidean plane",
        }
    }

    pub fn coords(&self) -> &'static str {
        match self {
            MetricPreset::Flat2d => "x, y",
            _ => "t, r, theta, phi",
        }
    }

    pub fn params(&self) -> &'static str {
        match self {
            MetricPreset::Schwarzschild => "M",
            MetricPreset::Kerr => "M, a",
            MetricPreset::Tono => "k",
            MetricPreset::Flat2d => "",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            MetricPreset::Schwarzschild => SCHWARZSCHILD,
            MetricPreset::Kerr => KERR,
            MetricPreset::Tono => TONO,
            MetricPreset::Flat2d => FLAT_2D,
        }
    }
}

impl fmt::Display for MetricPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| format!("unknown preset: {s}"))
    }
}
