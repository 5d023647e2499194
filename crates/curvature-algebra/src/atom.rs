//! Indivisible factors of a monomial.

use crate::error::AlgebraResult;
use crate::expr::Expr;
use crate::symbol::Symbol;

/// Elementary functions understood by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Func {
    Sin,
    Cos,
    Exp,
    Log,
}

impl Func {
    pub fn name(&self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Exp => "exp",
            Func::Log => "log",
        }
    }
}

/// An undefined function applied to arguments, e.g. `omega(r)`.
///
/// `derivs[i]` counts how many times the function has been differentiated
/// with respect to its `i`-th argument slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Applied {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub derivs: Vec<u32>,
}

impl Applied {
    pub fn new(name: Symbol, args: Vec<Expr>) -> Self {
        let derivs = vec![0; args.len()];
        Self { name, args, derivs }
    }

    /// Whether the function has been differentiated at all.
    pub fn is_derivative(&self) -> bool {
        self.derivs.iter().any(|d| *d > 0)
    }
}

/// A factor that the polynomial layer treats as an independent variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Atom {
    Symbol(Symbol),
    Func(Func, Box<Expr>),
    Applied(Applied),
}

impl Atom {
    pub fn is_exp(&self) -> bool {
        matches!(self, Atom::Func(Func::Exp, _))
    }

    pub fn is_cos(&self) -> bool {
        matches!(self, Atom::Func(Func::Cos, _))
    }

    /// `sin(u)` for a `cos(u)` atom.
    pub fn sin_partner(&self) -> Option<Atom> {
        match self {
            Atom::Func(Func::Cos, arg) => Some(Atom::Func(Func::Sin, arg.clone())),
            _ => None,
        }
    }

    pub fn depends_on(&self, symbol: &Symbol) -> bool {
        match self {
            Atom::Symbol(s) => s == symbol,
            Atom::Func(_, arg) => arg.depends_on(symbol),
            Atom::Applied(applied) => applied.args.iter().any(|a| a.depends_on(symbol)),
        }
    }

    /// Derivative of the atom itself with respect to `symbol` (chain rule applied).
    pub fn diff(&self, symbol: &Symbol) -> AlgebraResult<Expr> {
        if !self.depends_on(symbol) {
            return Ok(Expr::zero());
        }
        match self {
            Atom::Symbol(_) => Ok(Expr::one()),
            Atom::Func(func, arg) => {
                let inner = arg.diff(symbol)?;
                let outer = match func {
                    Func::Sin => Expr::cos(arg),
                    Func::Cos => Expr::sin(arg).neg(),
                    Func::Exp => Expr::exp(arg),
                    Func::Log => arg.inv()?,
                };
                Ok(outer.mul(&inner))
            }
            Atom::Applied(applied) => {
                let mut total = Expr::zero();
                for (slot, arg) in applied.args.iter().enumerate() {
                    let inner = arg.diff(symbol)?;
                    if inner.is_zero() {
                        continue;
                    }
                    let mut derived = applied.clone();
                    derived.derivs[slot] += 1;
                    total = total.add(&Expr::from_atom(Atom::Applied(derived)).mul(&inner));
                }
                Ok(total)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_dependency() {
        let r = Symbol::new("r");
        let theta = Symbol::new("theta");
        let atom = Atom::Func(Func::Sin, Box::new(Expr::symbol(&theta)));
        assert!(atom.depends_on(&theta));
        assert!(!atom.depends_on(&r));
    }

    #[test]
    fn test_sin_partner_only_for_cos() {
        let x = Expr::symbol(&Symbol::new("x"));
        let cos = Atom::Func(Func::Cos, Box::new(x.clone()));
        assert_eq!(cos.sin_partner(), Some(Atom::Func(Func::Sin, Box::new(x))));
        assert_eq!(Atom::Symbol(Symbol::new("x")).sin_partner(), None);
    }

    #[test]
    fn test_applied_derivative_bumps_slot() {
        let r = Symbol::new("r");
        let omega = Atom::Applied(Applied::new(Symbol::new("omega"), vec![Expr::symbol(&r)]));
        let d = omega.diff(&r).expect("diff");
        let mut expected = Applied::new(Symbol::new("omega"), vec![Expr::symbol(&r)]);
        expected.derivs[0] = 1;
        assert_eq!(d, Expr::from_atom(Atom::Applied(expected)));
    }
}
