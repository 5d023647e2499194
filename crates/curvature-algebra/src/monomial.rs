//! Products of atoms with positive exponents.
//!
//! A monomial holds at most one `exp` atom, always with exponent one:
//! `exp(a)·exp(b)` is stored as `exp(a + b)` and `exp(0)` disappears.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::atom::{Atom, Func};
use crate::expr::Expr;
use crate::symbol::Symbol;
use crate::Rational;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Monomial {
    atoms: BTreeMap<Atom, u32>,
}

impl Monomial {
    pub fn one() -> Self {
        Self::default()
    }

    pub fn is_one(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn from_atom(atom: Atom, exponent: u32) -> Self {
        let mut m = Self::one();
        m.push(atom, exponent);
        m
    }

    /// `exp(arg)` as a monomial (the unit monomial when `arg` is zero).
    pub fn exp(arg: Expr) -> Self {
        Self::from_atom(Atom::Func(Func::Exp, Box::new(arg)), 1)
    }

    fn push(&mut self, atom: Atom, exponent: u32) {
        if exponent == 0 {
            return;
        }
        match atom {
            Atom::Func(Func::Exp, arg) => {
                let scaled = if exponent == 1 {
                    *arg
                } else {
                    arg.scale(&Rational::from_integer(BigInt::from(exponent)))
                };
                let merged = match self.take_exp() {
                    Some(previous) => previous.add(&scaled),
                    None => scaled,
                };
                if !merged.is_zero() {
                    self.atoms.insert(Atom::Func(Func::Exp, Box::new(merged)), 1);
                }
            }
            other => *self.atoms.entry(other).or_insert(0) += exponent,
        }
    }

    fn take_exp(&mut self) -> Option<Expr> {
        let key = self.atoms.keys().find(|a| a.is_exp()).cloned()?;
        self.atoms.remove(&key);
        match key {
            Atom::Func(Func::Exp, arg) => Some(*arg),
            _ => None,
        }
    }

    /// Argument of the exp part, if any.
    pub fn exp_arg(&self) -> Option<&Expr> {
        self.atoms.keys().find_map(|a| match a {
            Atom::Func(Func::Exp, arg) => Some(arg.as_ref()),
            _ => None,
        })
    }

    pub fn without_exp(&self) -> Monomial {
        Monomial {
            atoms: self
                .atoms
                .iter()
                .filter(|(a, _)| !a.is_exp())
                .map(|(a, e)| (a.clone(), *e))
                .collect(),
        }
    }

    pub fn mul(&self, other: &Monomial) -> Monomial {
        let mut out = self.clone();
        for (atom, e) in &other.atoms {
            out.push(atom.clone(), *e);
        }
        out
    }

    /// `self / divisor` when every non-exp exponent of the divisor fits.
    /// Exp parts always divide.
    pub fn div(&self, divisor: &Monomial) -> Option<Monomial> {
        let mut out = self.clone();
        for (atom, e) in &divisor.atoms {
            if let Atom::Func(Func::Exp, arg) = atom {
                out.push(Atom::Func(Func::Exp, Box::new(arg.neg())), 1);
                continue;
            }
            let have = out.exponent(atom);
            match have.cmp(e) {
                Ordering::Less => return None,
                Ordering::Equal => {
                    out.atoms.remove(atom);
                }
                Ordering::Greater => {
                    out.atoms.insert(atom.clone(), have - e);
                }
            }
        }
        Some(out)
    }

    /// Largest monomial dividing both. The exp part survives only when equal.
    pub fn gcd(&self, other: &Monomial) -> Monomial {
        let mut out = Monomial::one();
        for (atom, e) in &self.atoms {
            if atom.is_exp() {
                if other.atoms.contains_key(atom) {
                    out.atoms.insert(atom.clone(), 1);
                }
                continue;
            }
            let shared = (*e).min(other.exponent(atom));
            if shared > 0 {
                out.atoms.insert(atom.clone(), shared);
            }
        }
        out
    }

    /// Copy of the monomial with `atom` raised to exactly `exponent` (0 removes it).
    pub fn with_exponent(&self, atom: &Atom, exponent: u32) -> Monomial {
        let mut out = self.clone();
        if exponent == 0 {
            out.atoms.remove(atom);
        } else {
            out.atoms.insert(atom.clone(), exponent);
        }
        out
    }

    pub fn exponent(&self, atom: &Atom) -> u32 {
        self.atoms.get(atom).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Atom, u32)> {
        self.atoms.iter().map(|(a, e)| (a, *e))
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Total degree of the non-exp part.
    pub fn degree(&self) -> u32 {
        self.atoms
            .iter()
            .filter(|(a, _)| !a.is_exp())
            .map(|(_, e)| *e)
            .sum()
    }

    pub fn depends_on(&self, symbol: &Symbol) -> bool {
        self.atoms.keys().any(|a| a.depends_on(symbol))
    }

    /// First `cos` atom whose exponent can be lowered by the Pythagorean rule.
    pub fn reducible_cos(&self) -> Option<&Atom> {
        self.atoms
            .iter()
            .find(|(a, e)| a.is_cos() && **e >= 2)
            .map(|(a, _)| a)
    }

    /// The single atom of a monomial like `r` (not `r^2`, not `r*s`).
    pub fn as_single_atom(&self) -> Option<&Atom> {
        match self.atoms.iter().next() {
            Some((atom, 1)) if self.atoms.len() == 1 => Some(atom),
            _ => None,
        }
    }
}

/// Graded-lex term order on the non-exp part.
///
/// Smaller atoms are more significant in the lex tie-break. The exp part is
/// ignored, so callers only compare monomials sharing the same exp part.
pub fn term_cmp(a: &Monomial, b: &Monomial) -> Ordering {
    a.degree().cmp(&b.degree()).then_with(|| lex_cmp(a, b))
}

fn lex_cmp(a: &Monomial, b: &Monomial) -> Ordering {
    let mut left = a.atoms.iter().filter(|(k, _)| !k.is_exp()).peekable();
    let mut right = b.atoms.iter().filter(|(k, _)| !k.is_exp()).peekable();
    loop {
        match (left.peek(), right.peek()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some((ka, ea)), Some((kb, eb))) => match ka.cmp(kb) {
                Ordering::Less => return Ordering::Greater,
                Ordering::Greater => return Ordering::Less,
                Ordering::Equal => {
                    if ea != eb {
                        return ea.cmp(eb);
                    }
                    left.next();
                    right.next();
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Atom {
        Atom::Symbol(Symbol::new(name))
    }

    #[test]
    fn test_exp_parts_merge() {
        let x = Expr::symbol(&Symbol::new("x"));
        let a = Monomial::exp(x.clone());
        let b = Monomial::exp(x.neg());
        assert!(a.mul(&b).is_one());

        let squared = a.mul(&a);
        assert_eq!(squared.exp_arg(), Some(&x.scale(&Rational::from_integer(2.into()))));
    }

    #[test]
    fn test_div_requires_exponents() {
        let r2 = Monomial::from_atom(sym("r"), 2);
        let r = Monomial::from_atom(sym("r"), 1);
        assert_eq!(r2.div(&r), Some(r.clone()));
        assert_eq!(r.div(&r2), None);
    }

    #[test]
    fn test_gcd_takes_minimum_exponent() {
        let a = Monomial::from_atom(sym("r"), 3).mul(&Monomial::from_atom(sym("M"), 1));
        let b = Monomial::from_atom(sym("r"), 2);
        assert_eq!(a.gcd(&b), b);
    }

    #[test]
    fn test_term_order_is_multiplicative() {
        let x = Monomial::from_atom(sym("x"), 1);
        let y = Monomial::from_atom(sym("y"), 1);
        // x is the more significant variable
        assert_eq!(term_cmp(&x, &y), Ordering::Greater);
        assert_eq!(term_cmp(&x.mul(&x), &x.mul(&y)), Ordering::Greater);
        assert_eq!(term_cmp(&x.mul(&y), &y.mul(&y)), Ordering::Greater);
        // degree dominates
        assert_eq!(term_cmp(&y.mul(&y), &x), Ordering::Greater);
    }
}
