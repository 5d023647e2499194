//! Symbolic expressions as normalised rational functions.
//!
//! An [`Expr`] is `num / (f1^k1 * f2^k2 * ...)`. Every denominator factor is
//! either a single atom or a primitive polynomial without monomial content,
//! and `exp` atoms never appear in a denominator. The numerator is kept
//! Pythagorean-reduced, which makes [`Expr::is_zero`] an exact test.
//!
//! Normalisation runs on every construction and cancels each denominator
//! factor against the numerator by exact division ("cancel" policy).
//! [`Expr::simplify`] additionally cancels `cos(u)` factors modulo
//! `sin(u)^2 + cos(u)^2 = 1`.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

use crate::atom::{Applied, Atom, Func};
use crate::error::{AlgebraError, AlgebraResult};
use crate::monomial::Monomial;
use crate::poly::Poly;
use crate::symbol::Symbol;
use crate::Rational;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expr {
    num: Poly,
    den: BTreeMap<Poly, u32>,
}

impl Default for Expr {
    fn default() -> Self {
        Self::zero()
    }
}

impl Expr {
    pub fn zero() -> Self {
        Self {
            num: Poly::zero(),
            den: BTreeMap::new(),
        }
    }

    pub fn one() -> Self {
        Self::rational(Rational::one())
    }

    pub fn integer(n: i64) -> Self {
        Self::rational(Rational::from_integer(BigInt::from(n)))
    }

    pub fn rational(value: Rational) -> Self {
        Self {
            num: Poly::constant(value),
            den: BTreeMap::new(),
        }
    }

    /// The exact constant one half.
    pub fn half() -> Self {
        Self::rational(Rational::new(BigInt::from(1), BigInt::from(2)))
    }

    pub fn symbol(symbol: &Symbol) -> Self {
        Self::from_atom(Atom::Symbol(symbol.clone()))
    }

    pub fn from_atom(atom: Atom) -> Self {
        Self::from_poly(Poly::monomial(Monomial::from_atom(atom, 1), Rational::one()))
    }

    pub fn from_poly(num: Poly) -> Self {
        Self::normalized(num, BTreeMap::new())
    }

    pub fn sin(arg: &Expr) -> Self {
        if arg.is_zero() {
            return Self::zero();
        }
        Self::from_atom(Atom::Func(Func::Sin, Box::new(arg.clone())))
    }

    pub fn cos(arg: &Expr) -> Self {
        if arg.is_zero() {
            return Self::one();
        }
        Self::from_atom(Atom::Func(Func::Cos, Box::new(arg.clone())))
    }

    pub fn tan(arg: &Expr) -> AlgebraResult<Self> {
        Self::sin(arg).div(&Self::cos(arg))
    }

    pub fn exp(arg: &Expr) -> Self {
        Self::from_poly(Poly::monomial(Monomial::exp(arg.clone()), Rational::one()))
    }

    pub fn log(arg: &Expr) -> AlgebraResult<Self> {
        if arg.is_zero() {
            return Err(AlgebraError::Domain {
                function: "log".to_string(),
                argument: "0".to_string(),
            });
        }
        if arg.is_one() {
            return Ok(Self::zero());
        }
        Ok(Self::from_atom(Atom::Func(Func::Log, Box::new(arg.clone()))))
    }

    /// An undefined function applied to `args`, e.g. `omega(r)`.
    pub fn applied(name: &Symbol, args: Vec<Expr>) -> Self {
        Self::from_atom(Atom::Applied(Applied::new(name.clone(), args)))
    }

    pub fn numerator(&self) -> &Poly {
        &self.num
    }

    pub fn denominator(&self) -> &BTreeMap<Poly, u32> {
        &self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.den.is_empty() && self.num.as_constant().is_some_and(|c| c.is_one())
    }

    pub fn as_rational(&self) -> Option<Rational> {
        if self.den.is_empty() {
            self.num.as_constant()
        } else {
            None
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.as_rational()
            .filter(|r| r.is_integer())
            .and_then(|r| r.to_integer().to_i64())
    }

    pub fn is_constant(&self) -> bool {
        self.as_rational().is_some()
    }

    pub fn depends_on(&self, symbol: &Symbol) -> bool {
        self.num.depends_on(symbol) || self.den.keys().any(|f| f.depends_on(symbol))
    }

    /// Semantic equality: the difference normalises to zero.
    pub fn equivalent(&self, other: &Expr) -> bool {
        self == other || self.sub(other).is_zero()
    }

    pub fn neg(&self) -> Expr {
        Expr {
            num: self.num.neg(),
            den: self.den.clone(),
        }
    }

    pub fn scale(&self, k: &Rational) -> Expr {
        if k.is_zero() {
            return Expr::zero();
        }
        Expr {
            num: self.num.scale(k),
            den: self.den.clone(),
        }
    }

    pub fn add(&self, other: &Expr) -> Expr {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        if self.den == other.den {
            return Self::normalized(self.num.add(&other.num), self.den.clone());
        }
        let mut lcm = self.den.clone();
        for (factor, k) in &other.den {
            let slot = lcm.entry(factor.clone()).or_insert(0);
            *slot = (*slot).max(*k);
        }
        let lhs = self.num.mul(&cofactor(&lcm, &self.den));
        let rhs = other.num.mul(&cofactor(&lcm, &other.den));
        Self::normalized(lhs.add(&rhs), lcm)
    }

    pub fn sub(&self, other: &Expr) -> Expr {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Expr) -> Expr {
        if self.is_zero() || other.is_zero() {
            return Expr::zero();
        }
        let mut den = self.den.clone();
        for (factor, k) in &other.den {
            *den.entry(factor.clone()).or_insert(0) += k;
        }
        Self::normalized(self.num.mul(&other.num), den)
    }

    pub fn inv(&self) -> AlgebraResult<Expr> {
        if self.is_zero() {
            return Err(AlgebraError::DivisionByZero);
        }
        let mut num = Poly::one();
        for (factor, k) in &self.den {
            num = num.mul(&factor.pow(*k));
        }
        Self::over(num, self.num.clone())
    }

    pub fn div(&self, other: &Expr) -> AlgebraResult<Expr> {
        Ok(self.mul(&other.inv()?))
    }

    pub fn pow(&self, exponent: i64) -> AlgebraResult<Expr> {
        let base = if exponent < 0 { self.inv()? } else { self.clone() };
        let mut e = exponent.unsigned_abs();
        let mut result = Expr::one();
        let mut square = base;
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&square);
            }
            e >>= 1;
            if e > 0 {
                square = square.mul(&square);
            }
        }
        Ok(result)
    }

    /// Partial derivative with respect to `symbol`.
    pub fn diff(&self, symbol: &Symbol) -> AlgebraResult<Expr> {
        if !self.depends_on(symbol) {
            return Ok(Expr::zero());
        }
        let reciprocal = Expr {
            num: Poly::one(),
            den: self.den.clone(),
        };
        let mut out = self.num.diff(symbol)?.mul(&reciprocal);
        for (factor, k) in &self.den {
            if !factor.depends_on(symbol) {
                continue;
            }
            let mut single = BTreeMap::new();
            single.insert(factor.clone(), 1);
            let log_derivative = factor
                .diff(symbol)?
                .mul(&Expr {
                    num: Poly::one(),
                    den: single,
                })
                .scale(&Rational::from_integer(BigInt::from(*k)));
            out = out.sub(&self.mul(&log_derivative));
        }
        Ok(out)
    }

    /// Full simplification: normalisation plus cancellation of `cos(u)`
    /// denominator factors modulo the Pythagorean identity.
    pub fn simplify(&self) -> Expr {
        let mut num = self.num.clone();
        let mut den = self.den.clone();
        loop {
            let mut cancelled = None;
            for (factor, k) in &den {
                if *k == 0 {
                    continue;
                }
                let Some(cos) = factor.as_atom().filter(|a| a.is_cos()) else {
                    continue;
                };
                if let Some(q) = cancel_cos(&num, cos) {
                    cancelled = Some((factor.clone(), q));
                    break;
                }
            }
            match cancelled {
                Some((factor, quotient)) => {
                    num = quotient;
                    if let Some(k) = den.get_mut(&factor) {
                        *k -= 1;
                    }
                    den.retain(|_, k| *k > 0);
                }
                None => break,
            }
        }
        Self::normalized(num, den)
    }

    /// `num / den` for an arbitrary polynomial denominator.
    pub(crate) fn over(num: Poly, den: Poly) -> AlgebraResult<Expr> {
        let den = den.reduce();
        if den.is_zero() {
            return Err(AlgebraError::DivisionByZero);
        }
        let mut num = num;
        let mut factors = BTreeMap::new();
        absorb_factor(&mut num, &mut factors, den, 1);
        Ok(Self::normalized(num, factors))
    }

    /// Reduces the numerator and cancels canonical denominator factors.
    fn normalized(num: Poly, mut den: BTreeMap<Poly, u32>) -> Expr {
        let mut num = num.reduce();
        if num.is_zero() {
            return Expr::zero();
        }
        for (factor, k) in den.iter_mut() {
            while *k > 0 {
                match num.div_exact(factor) {
                    Some(q) => {
                        num = q;
                        *k -= 1;
                    }
                    None => break,
                }
            }
        }
        den.retain(|_, k| *k > 0);
        Expr { num, den }
    }
}

/// Product of `f^(lcm[f] - den[f])` over the factors of `lcm`.
fn cofactor(lcm: &BTreeMap<Poly, u32>, den: &BTreeMap<Poly, u32>) -> Poly {
    let mut out = Poly::one();
    for (factor, k) in lcm {
        let missing = k - den.get(factor).copied().unwrap_or(0);
        if missing > 0 {
            out = out.mul(&factor.pow(missing));
        }
    }
    out
}

/// Splits `poly^mult` into canonical denominator factors, moving numeric
/// content and exp parts into the numerator.
fn absorb_factor(num: &mut Poly, factors: &mut BTreeMap<Poly, u32>, poly: Poly, mult: u32) {
    let content = poly.content_monomial();
    let rest = poly.div_monomial(&content).unwrap_or(poly);
    for (atom, e) in content.iter() {
        match atom {
            Atom::Func(Func::Exp, arg) => {
                let shift = arg.neg().scale(&Rational::from_integer(BigInt::from(mult)));
                *num = num.mul_monomial(&Monomial::exp(shift), &Rational::one());
            }
            other => {
                *factors.entry(Poly::from_atom(other.clone())).or_insert(0) += e * mult;
            }
        }
    }
    let (content, primitive) = rest.primitive();
    let scale = content.recip();
    let mut factor = Rational::one();
    for _ in 0..mult {
        factor *= &scale;
    }
    *num = num.scale(&factor);
    if !primitive.is_constant() {
        *factors.entry(primitive).or_insert(0) += mult;
    }
}

/// `num / cos(u)` in the ring where `cos(u)^2 = 1 - sin(u)^2`, if it exists.
///
/// Writing `num = A + B cos(u)`, the quotient is `B + (A / (1 - sin(u)^2)) cos(u)`.
fn cancel_cos(num: &Poly, cos: &Atom) -> Option<Poly> {
    let sin = cos.sin_partner()?;
    let mut a = Poly::zero();
    let mut b = Poly::zero();
    for (m, c) in num.terms() {
        match m.exponent(cos) {
            0 => a.add_term(m.clone(), c.clone()),
            _ => b.add_term(m.with_exponent(cos, 0), c.clone()),
        }
    }
    let one_minus_sin2 =
        Poly::one().sub(&Poly::monomial(Monomial::from_atom(sin, 2), Rational::one()));
    let q = a.div_exact(&one_minus_sin2)?;
    let cos_monomial = Monomial::from_atom(cos.clone(), 1);
    Some(b.add(&q.mul_monomial(&cos_monomial, &Rational::one())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::symbol(&Symbol::new(name))
    }

    #[test]
    fn test_zero_and_one() {
        assert!(Expr::zero().is_zero());
        assert!(Expr::one().is_one());
        assert_eq!(Expr::integer(3).as_integer(), Some(3));
        assert_eq!(Expr::half().as_integer(), None);
    }

    #[test]
    fn test_fraction_cancels() {
        // (x^2 - 1) / (x - 1) = x + 1
        let x = var("x");
        let num = x.mul(&x).sub(&Expr::one());
        let den = x.sub(&Expr::one());
        let q = num.div(&den).expect("div");
        assert_eq!(q, x.add(&Expr::one()));
    }

    #[test]
    fn test_common_denominators() {
        // 1/x + 1/y - (x + y)/(x y) = 0
        let x = var("x");
        let y = var("y");
        let lhs = x.inv().unwrap().add(&y.inv().unwrap());
        let rhs = x.add(&y).div(&x.mul(&y)).unwrap();
        assert!(lhs.equivalent(&rhs));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(Expr::zero().inv(), Err(AlgebraError::DivisionByZero));
        let x = var("x");
        assert_eq!(x.div(&x.sub(&x)), Err(AlgebraError::DivisionByZero));
    }

    #[test]
    fn test_pythagorean_identity_is_exact() {
        let theta = var("theta");
        let s = Expr::sin(&theta);
        let c = Expr::cos(&theta);
        assert!(s.mul(&s).add(&c.mul(&c)).is_one());
    }

    #[test]
    fn test_exp_products_merge() {
        let x = var("x");
        let e = Expr::exp(&x).mul(&Expr::exp(&x.neg()));
        assert!(e.is_one());
        let inv = Expr::exp(&x).inv().unwrap();
        assert_eq!(inv, Expr::exp(&x.neg()));
    }

    #[test]
    fn test_log_domain() {
        assert!(Expr::log(&Expr::zero()).is_err());
        assert!(Expr::log(&Expr::one()).unwrap().is_zero());
    }

    #[test]
    fn test_pow_negative() {
        let r = var("r");
        let p = r.pow(-2).unwrap();
        assert!(p.mul(&r).mul(&r).is_one());
    }

    #[test]
    fn test_derivative_rules() {
        let x = var("x");
        let sx = Symbol::new("x");
        assert_eq!(Expr::sin(&x).diff(&sx).unwrap(), Expr::cos(&x));
        assert_eq!(Expr::cos(&x).diff(&sx).unwrap(), Expr::sin(&x).neg());
        let inverse = x.inv().unwrap().diff(&sx).unwrap();
        assert!(inverse.equivalent(&x.pow(-2).unwrap().neg()));
        let log = Expr::log(&x).unwrap().diff(&sx).unwrap();
        assert!(log.equivalent(&x.inv().unwrap()));
        let e = Expr::exp(&x.mul(&x)).diff(&sx).unwrap();
        assert!(e.equivalent(&Expr::exp(&x.mul(&x)).mul(&x).scale(&Rational::from_integer(2.into()))));
    }

    #[test]
    fn test_quotient_rule_on_schwarzschild_factor() {
        // d/dr 1/(1 - 2M/r) = -2M / (r - 2M)^2
        let r = var("r");
        let m = var("M");
        let two_m = m.scale(&Rational::from_integer(2.into()));
        let f = Expr::one().sub(&two_m.div(&r).unwrap()).inv().unwrap();
        let d = f.diff(&Symbol::new("r")).unwrap();
        let expected = two_m.neg().div(&r.sub(&two_m).pow(2).unwrap()).unwrap();
        assert!(d.equivalent(&expected));
    }

    #[test]
    fn test_simplify_cancels_cos() {
        let x = var("x");
        let s = Expr::sin(&x);
        let c = Expr::cos(&x);
        let e = Expr::one().sub(&s.mul(&s)).div(&c).unwrap();
        assert_ne!(e, c);
        assert_eq!(e.simplify(), c);
    }

    #[test]
    fn test_does_not_depend_on_other_symbols() {
        let r = var("r");
        assert!(r.diff(&Symbol::new("t")).unwrap().is_zero());
    }

    #[test]
    fn test_exp_factor_cancels() {
        // (w^2 e^(4k/r) - 1) / (w e^(2k/r) - 1) = w e^(2k/r) + 1
        let w = var("w");
        let u = var("k").div(&var("r")).unwrap();
        let e2 = Expr::exp(&u.scale(&Rational::from_integer(2.into())));
        let e4 = Expr::exp(&u.scale(&Rational::from_integer(4.into())));
        let num = w.mul(&w).mul(&e4).sub(&Expr::one());
        let den = w.mul(&e2).sub(&Expr::one());
        let q = num.div(&den).unwrap();
        assert!(q.denominator().is_empty(), "{q}");
        assert_eq!(q, w.mul(&e2).add(&Expr::one()));
    }
}
