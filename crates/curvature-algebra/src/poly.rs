//! Sparse multivariate polynomials over exact rationals.
//!
//! Polynomials are the numerators and denominator factors of [`Expr`].
//! Arithmetic here is plain ring arithmetic; [`Poly::reduce`] applies the
//! Pythagorean rewrite `cos(u)^2 -> 1 - sin(u)^2` so that every reduced
//! polynomial has a unique representation.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::atom::Atom;
use crate::error::AlgebraResult;
use crate::expr::Expr;
use crate::monomial::{term_cmp, Monomial};
use crate::symbol::Symbol;
use crate::Rational;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Poly {
    terms: BTreeMap<Monomial, Rational>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(Rational::one())
    }

    pub fn constant(c: Rational) -> Self {
        Self::monomial(Monomial::one(), c)
    }

    pub fn monomial(m: Monomial, c: Rational) -> Self {
        let mut p = Self::zero();
        p.add_term(m, c);
        p
    }

    pub fn from_atom(atom: Atom) -> Self {
        Self::monomial(Monomial::from_atom(atom, 1), Rational::one())
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &Rational)> {
        self.terms.iter()
    }

    /// The value of a constant polynomial.
    pub fn as_constant(&self) -> Option<Rational> {
        match self.terms.len() {
            0 => Some(Rational::zero()),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(m, _)| m.is_one())
                .map(|(_, c)| c.clone()),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    /// The atom of a polynomial that is exactly one atom with coefficient one.
    pub fn as_atom(&self) -> Option<&Atom> {
        if self.terms.len() != 1 {
            return None;
        }
        let (m, c) = self.terms.iter().next()?;
        if !c.is_one() {
            return None;
        }
        m.as_single_atom()
    }

    pub(crate) fn add_term(&mut self, m: Monomial, c: Rational) {
        if c.is_zero() {
            return;
        }
        match self.terms.entry(m) {
            Entry::Occupied(mut slot) => {
                *slot.get_mut() += c;
                if slot.get().is_zero() {
                    slot.remove();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(c);
            }
        }
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), c.clone());
        }
        out
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), -c.clone());
        }
        out
    }

    pub fn neg(&self) -> Poly {
        Poly {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), -c.clone()))
                .collect(),
        }
    }

    pub fn scale(&self, k: &Rational) -> Poly {
        if k.is_zero() {
            return Poly::zero();
        }
        Poly {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), c * k))
                .collect(),
        }
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                out.add_term(ma.mul(mb), ca * cb);
            }
        }
        out
    }

    pub fn mul_monomial(&self, m: &Monomial, c: &Rational) -> Poly {
        let mut out = Poly::zero();
        for (tm, tc) in &self.terms {
            out.add_term(tm.mul(m), tc * c);
        }
        out
    }

    pub fn pow(&self, exponent: u32) -> Poly {
        let mut result = Poly::one();
        let mut base = self.clone();
        let mut e = exponent;
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&base);
            }
            e >>= 1;
            if e > 0 {
                base = base.mul(&base);
            }
        }
        result
    }

    /// Rewrites every `cos(u)^k` with `k >= 2` as `cos(u)^(k-2) * (1 - sin(u)^2)`.
    pub fn reduce(self) -> Poly {
        if !self.terms.keys().any(|m| m.reducible_cos().is_some()) {
            return self;
        }
        let mut out = Poly::zero();
        let mut work: Vec<(Monomial, Rational)> = self.terms.into_iter().collect();
        while let Some((m, c)) = work.pop() {
            let Some(cos) = m.reducible_cos().cloned() else {
                out.add_term(m, c);
                continue;
            };
            let Some(sin) = cos.sin_partner() else {
                out.add_term(m, c);
                continue;
            };
            let base = m.with_exponent(&cos, m.exponent(&cos) - 2);
            let shifted = base.mul(&Monomial::from_atom(sin, 2));
            work.push((shifted, -c.clone()));
            work.push((base, c));
        }
        out
    }

    /// Leading term under [`term_cmp`], ties broken by the structural order.
    pub fn lead(&self) -> Option<(&Monomial, &Rational)> {
        self.terms
            .iter()
            .max_by(|(a, _), (b, _)| term_cmp(a, b).then_with(|| a.cmp(b)))
    }

    /// Largest monomial dividing every term.
    pub fn content_monomial(&self) -> Monomial {
        let mut iter = self.terms.keys();
        let Some(first) = iter.next() else {
            return Monomial::one();
        };
        let mut content = first.clone();
        for m in iter {
            if content.is_one() {
                break;
            }
            content = content.gcd(m);
        }
        content
    }

    /// Divides every term by `m`, failing if some term is not divisible.
    pub fn div_monomial(&self, m: &Monomial) -> Option<Poly> {
        let mut out = Poly::zero();
        for (tm, tc) in &self.terms {
            out.add_term(tm.div(m)?, tc.clone());
        }
        Some(out)
    }

    /// Splits `self = content * primitive` where the primitive part has
    /// coprime integer coefficients and a positive leading coefficient.
    pub fn primitive(&self) -> (Rational, Poly) {
        if self.is_zero() {
            return (Rational::one(), Poly::zero());
        }
        let mut numer_gcd = BigInt::zero();
        let mut denom_lcm = BigInt::one();
        for c in self.terms.values() {
            numer_gcd = numer_gcd.gcd(c.numer());
            denom_lcm = denom_lcm.lcm(c.denom());
        }
        let mut content = Rational::new(numer_gcd, denom_lcm);
        if let Some((_, lead)) = self.lead() {
            if lead.is_negative() {
                content = -content;
            }
        }
        let primitive = self.scale(&content.recip());
        (content, primitive)
    }

    pub fn has_exp(&self) -> bool {
        self.terms.keys().any(|m| m.exp_arg().is_some())
    }

    pub fn depends_on(&self, symbol: &Symbol) -> bool {
        self.terms.keys().any(|m| m.depends_on(symbol))
    }

    /// Exact quotient `self / divisor` in the free polynomial ring, if it exists.
    pub fn div_exact(&self, divisor: &Poly) -> Option<Poly> {
        if divisor.is_zero() {
            return None;
        }
        if let Some(c) = divisor.as_constant() {
            return Some(self.scale(&c.recip()));
        }
        if self.is_zero() {
            return Some(Poly::zero());
        }
        if divisor.terms.len() == 1 {
            let (m, c) = divisor.terms.iter().next()?;
            let inverse = c.recip();
            let mut out = Poly::zero();
            for (tm, tc) in &self.terms {
                out.add_term(tm.div(m)?, tc * &inverse);
            }
            return Some(out);
        }
        if divisor.has_exp() {
            return divide_exp_classes(self, divisor);
        }

        // Terms with different exp parts are linearly independent, so each
        // class must be divisible on its own.
        let mut quotient = Poly::zero();
        for (exp, class) in self.exp_classes() {
            let q = divide_exp_free(class, divisor)?;
            let shift = exp.map(Monomial::exp).unwrap_or_default();
            for (m, c) in q.terms {
                quotient.add_term(m.mul(&shift), c);
            }
        }
        Some(quotient)
    }

    /// Groups terms by exp argument, stripping the exp part.
    fn exp_classes(&self) -> BTreeMap<Option<Expr>, Poly> {
        let mut classes: BTreeMap<Option<Expr>, Poly> = BTreeMap::new();
        for (m, c) in &self.terms {
            classes
                .entry(m.exp_arg().cloned())
                .or_default()
                .add_term(m.without_exp(), c.clone());
        }
        classes
    }

    /// Partial derivative with respect to `symbol`.
    pub fn diff(&self, symbol: &Symbol) -> AlgebraResult<Expr> {
        let mut acc = Expr::zero();
        for (m, c) in &self.terms {
            for (atom, e) in m.iter() {
                if !atom.depends_on(symbol) {
                    continue;
                }
                let rest = m.with_exponent(atom, e - 1);
                let coefficient = c * Rational::from_integer(BigInt::from(e));
                let outer = Expr::from_poly(Poly::monomial(rest, coefficient));
                acc = acc.add(&outer.mul(&atom.diff(symbol)?));
            }
        }
        Ok(acc)
    }

    /// Terms sorted for display: leading term first.
    pub fn sorted_terms(&self) -> Vec<(&Monomial, &Rational)> {
        let mut terms: Vec<_> = self.terms.iter().collect();
        terms.sort_by(|(a, _), (b, _)| match term_cmp(b, a) {
            Ordering::Equal => b.cmp(a),
            other => other,
        });
        terms
    }
}

fn divide_exp_free(mut remainder: Poly, divisor: &Poly) -> Option<Poly> {
    let (lead_m, lead_c) = divisor.lead().map(|(m, c)| (m.clone(), c.clone()))?;
    let mut quotient = Poly::zero();
    while let Some((m, c)) = remainder.lead().map(|(m, c)| (m.clone(), c.clone())) {
        let t = m.div(&lead_m)?;
        let k = c / &lead_c;
        remainder = remainder.sub(&divisor.mul_monomial(&t, &k));
        quotient.add_term(t, k);
    }
    Some(quotient)
}

/// Upper bound on long-division steps across exp classes.
const MAX_CLASS_STEPS: usize = 4096;

/// Exact division by a divisor whose terms carry different exp parts.
///
/// Applies when every exp argument on both sides is a rational multiple
/// `w * base` of one argument of the divisor. Classes are then ordered by
/// `w` and divided top-down like a Laurent polynomial in `exp(base)`. The
/// quotient is accepted only if multiplying back reproduces the dividend.
fn divide_exp_classes(dividend: &Poly, divisor: &Poly) -> Option<Poly> {
    let classes = divisor.exp_classes();
    let base = classes.keys().flatten().next()?.clone();
    let weigh = |poly: &Poly| -> Option<BTreeMap<Rational, Poly>> {
        let mut out = BTreeMap::new();
        for (arg, part) in poly.exp_classes() {
            let weight = match arg {
                None => Rational::zero(),
                Some(arg) => arg.div(&base).ok()?.as_rational()?,
            };
            out.insert(weight, part);
        }
        Some(out)
    };
    let d = weigh(divisor)?;
    let mut r = weigh(dividend)?;
    let (d_top, d_lead) = d.last_key_value().map(|(w, p)| (w.clone(), p.clone()))?;
    let d_low = d.first_key_value()?.0.clone();
    let floor = r.first_key_value()?.0 - &d_low;

    let mut q: BTreeMap<Rational, Poly> = BTreeMap::new();
    for _ in 0..MAX_CLASS_STEPS {
        let Some((r_top, r_lead)) = r.last_key_value().map(|(w, p)| (w.clone(), p.clone())) else {
            break;
        };
        let shift = &r_top - &d_top;
        if shift < floor {
            return None;
        }
        let coeff = divide_exp_free(r_lead, &d_lead)?;
        for (w, part) in &d {
            let key = w + &shift;
            let updated = r.get(&key).cloned().unwrap_or_default().sub(&part.mul(&coeff));
            if updated.is_zero() {
                r.remove(&key);
            } else {
                r.insert(key, updated);
            }
        }
        let slot = q.entry(shift).or_default();
        *slot = slot.add(&coeff);
    }
    if !r.is_empty() {
        return None;
    }

    let mut quotient = Poly::zero();
    for (w, part) in q {
        let shift = Monomial::exp(base.scale(&w));
        for (m, c) in part.terms {
            quotient.add_term(m.mul(&shift), c);
        }
    }
    (quotient.mul(divisor) == *dividend).then_some(quotient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Func;

    fn var(name: &str) -> Poly {
        Poly::from_atom(Atom::Symbol(Symbol::new(name)))
    }

    fn int(n: i64) -> Rational {
        Rational::from_integer(BigInt::from(n))
    }

    #[test]
    fn test_add_cancels_terms() {
        let x = var("x");
        assert!(x.sub(&x).is_zero());
        assert_eq!(x.add(&x), x.scale(&int(2)));
    }

    #[test]
    fn test_exact_division() {
        // (x^2 - y^2) / (x - y) = x + y
        let x = var("x");
        let y = var("y");
        let num = x.mul(&x).sub(&y.mul(&y));
        let q = num.div_exact(&x.sub(&y)).expect("divisible");
        assert_eq!(q, x.add(&y));
    }

    #[test]
    fn test_exact_division_rejects_remainder() {
        let x = var("x");
        let y = var("y");
        let num = x.mul(&x).add(&y);
        assert!(num.div_exact(&x.sub(&y)).is_none());
    }

    fn exp_of(arg: Expr) -> Poly {
        Poly::monomial(Monomial::exp(arg), Rational::one())
    }

    #[test]
    fn test_exact_division_across_exp_classes() {
        // (w^2 e^(4k/r) - 1) / (w e^(2k/r) - 1) = w e^(2k/r) + 1
        let k_over_r = Expr::symbol(&Symbol::new("k"))
            .div(&Expr::symbol(&Symbol::new("r")))
            .unwrap();
        let w = var("w");
        let e2 = exp_of(k_over_r.scale(&int(2)));
        let e4 = exp_of(k_over_r.scale(&int(4)));
        let divisor = w.mul(&e2).sub(&Poly::one());
        let dividend = w.mul(&w).mul(&e4).sub(&Poly::one());
        let q = dividend.div_exact(&divisor).expect("divisible");
        assert_eq!(q, w.mul(&e2).add(&Poly::one()));
        assert_eq!(q.mul(&divisor), dividend);
    }

    #[test]
    fn test_exp_class_division_with_negative_shift() {
        // (e^(-2k/r) - w^2 e^(2k/r)) / (1 - w e^(2k/r))
        let k_over_r = Expr::symbol(&Symbol::new("k"))
            .div(&Expr::symbol(&Symbol::new("r")))
            .unwrap();
        let w = var("w");
        let e2 = exp_of(k_over_r.scale(&int(2)));
        let em2 = exp_of(k_over_r.scale(&int(-2)));
        let divisor = Poly::one().sub(&w.mul(&e2));
        let quotient = em2.add(&w);
        let dividend = quotient.mul(&divisor);
        assert_eq!(dividend.div_exact(&divisor), Some(quotient));
        assert!(dividend.add(&Poly::one()).div_exact(&divisor).is_none());
    }

    #[test]
    fn test_exp_class_division_needs_commensurable_arguments() {
        let x = Expr::symbol(&Symbol::new("x"));
        let y = Expr::symbol(&Symbol::new("y"));
        let divisor = exp_of(x.clone()).sub(&Poly::one());
        let dividend = exp_of(y).mul(&divisor);
        assert!(dividend.div_exact(&divisor).is_none());
        let same = exp_of(x.scale(&int(2))).sub(&Poly::one());
        assert_eq!(
            same.div_exact(&divisor),
            Some(exp_of(x).add(&Poly::one()))
        );
    }

    #[test]
    fn test_pythagorean_reduction() {
        let theta = Expr::symbol(&Symbol::new("theta"));
        let sin = Poly::from_atom(Atom::Func(Func::Sin, Box::new(theta.clone())));
        let cos = Poly::from_atom(Atom::Func(Func::Cos, Box::new(theta)));
        let identity = sin.pow(2).add(&cos.pow(2)).reduce();
        assert_eq!(identity, Poly::one());

        let cos4 = cos.pow(4).reduce();
        let expected = Poly::one()
            .sub(&sin.pow(2).scale(&int(2)))
            .add(&sin.pow(4));
        assert_eq!(cos4, expected);
    }

    #[test]
    fn test_primitive_part_normalises_sign_and_content() {
        // -4M + 2r  ->  content -2, primitive 2M - r
        let p = var("M").scale(&int(-4)).add(&var("r").scale(&int(2)));
        let (content, primitive) = p.primitive();
        assert_eq!(content, int(-2));
        assert_eq!(primitive, var("M").scale(&int(2)).sub(&var("r")));
    }

    #[test]
    fn test_content_monomial() {
        let r = var("r");
        let p = r.pow(3).add(&r.pow(2).mul(&var("M")));
        let content = p.content_monomial();
        assert_eq!(Poly::monomial(content, Rational::one()), r.pow(2));
    }
}
