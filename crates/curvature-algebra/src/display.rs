//! Plain-text rendering.
//!
//! The output is deterministic and, for expressions without derivatives of
//! undefined functions, readable back by the metric-definition language.

use std::fmt;

use num_traits::{One, Signed};

use crate::atom::{Applied, Atom, Func};
use crate::expr::Expr;
use crate::monomial::Monomial;
use crate::poly::Poly;
use crate::Rational;

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Symbol(s) => write!(f, "{s}"),
            Atom::Func(func, arg) => write!(f, "{}({})", func.name(), arg),
            Atom::Applied(applied) => fmt_applied(applied, f),
        }
    }
}

fn fmt_applied(applied: &Applied, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let args = applied
        .args
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = format!("{}({})", applied.name, args);
    for (slot, count) in applied.derivs.iter().enumerate() {
        for _ in 0..*count {
            out = match applied.args[slot].as_symbol_name() {
                Some(var) => format!("diff({out}, {var})"),
                None => format!("diff{slot}({out})"),
            };
        }
    }
    f.write_str(&out)
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return f.write_str("1");
        }
        let parts: Vec<String> = self
            .iter()
            .map(|(atom, e)| match (atom, e) {
                (Atom::Func(Func::Exp, arg), _) => format!("exp({arg})"),
                (_, 1) => atom.to_string(),
                (_, e) => format!("{atom}^{e}"),
            })
            .collect();
        f.write_str(&parts.join("*"))
    }
}

pub(crate) fn fmt_rational(c: &Rational) -> String {
    if c.is_integer() {
        c.numer().to_string()
    } else {
        format!("{}/{}", c.numer(), c.denom())
    }
}

fn fmt_term(m: &Monomial, c: &Rational) -> String {
    let magnitude = c.abs();
    if m.is_one() {
        fmt_rational(&magnitude)
    } else if magnitude.is_one() {
        m.to_string()
    } else {
        format!("{}*{}", fmt_rational(&magnitude), m)
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        for (i, (m, c)) in self.sorted_terms().into_iter().enumerate() {
            let term = fmt_term(m, c);
            match (i, c.is_negative()) {
                (0, true) => write!(f, "-{term}")?,
                (0, false) => write!(f, "{term}")?,
                (_, true) => write!(f, " - {term}")?,
                (_, false) => write!(f, " + {term}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = self.numerator();
        let den = self.denominator();
        if den.is_empty() {
            return write!(f, "{num}");
        }
        let mut factors = Vec::new();
        for (factor, k) in den {
            let base = match factor.as_atom() {
                Some(atom) => atom.to_string(),
                None => format!("({factor})"),
            };
            factors.push(if *k == 1 { base } else { format!("{base}^{k}") });
        }
        let numerator = if num.len() > 1 {
            format!("({num})")
        } else {
            num.to_string()
        };
        if factors.len() == 1 && !factors[0].contains('^') {
            write!(f, "{}/{}", numerator, factors[0])
        } else {
            write!(f, "{}/({})", numerator, factors.join("*"))
        }
    }
}

impl Expr {
    /// Name of the symbol when the expression is exactly one symbol.
    pub fn as_symbol_name(&self) -> Option<&str> {
        if !self.denominator().is_empty() {
            return None;
        }
        match self.numerator().as_atom()? {
            Atom::Symbol(s) => Some(s.name()),
            _ => None,
        }
    }
}
