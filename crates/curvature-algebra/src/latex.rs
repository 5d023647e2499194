//! LaTeX rendering of expressions and matrices.

use num_traits::{One, Signed};

use crate::atom::{Applied, Atom, Func};
use crate::expr::Expr;
use crate::matrix::Matrix;
use crate::monomial::Monomial;
use crate::poly::Poly;
use crate::Rational;

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi",
    "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi", "Pi", "Sigma", "Upsilon", "Phi", "Psi",
    "Omega",
];

/// LaTeX for a symbol or function name: Greek letters become commands and
/// a trailing `_suffix` becomes a subscript.
pub fn name(raw: &str) -> String {
    let (head, tail) = match raw.split_once('_') {
        Some((h, t)) if !h.is_empty() && !t.is_empty() => (h, Some(t)),
        _ => (raw, None),
    };
    let head = if GREEK.contains(&head) {
        format!("\\{head}")
    } else {
        head.to_string()
    };
    match tail {
        Some(t) => format!("{head}_{{{}}}", name(t)),
        None => head,
    }
}

pub fn render(expr: &Expr) -> String {
    let num = expr.numerator();
    let den = expr.denominator();
    if den.is_empty() {
        return poly(num);
    }
    let mut factors = Vec::new();
    for (factor, k) in den {
        let base = match factor.as_atom() {
            Some(atom) => atom_power(atom, *k),
            None if *k == 1 => format!("\\left({}\\right)", poly(factor)),
            None => format!("\\left({}\\right)^{{{}}}", poly(factor), k),
        };
        factors.push(base);
    }
    let denominator = factors.join(" ");
    // Pull a leading minus sign out of the fraction.
    let negative = num.sorted_terms().first().is_some_and(|(_, c)| c.is_negative());
    if negative {
        format!("- \\frac{{{}}}{{{}}}", poly(&num.neg()), denominator)
    } else {
        format!("\\frac{{{}}}{{{}}}", poly(num), denominator)
    }
}

pub fn render_matrix(matrix: &Matrix) -> String {
    let rows: Vec<String> = (0..matrix.rows())
        .map(|i| {
            (0..matrix.cols())
                .map(|j| render(matrix.get(i, j)))
                .collect::<Vec<_>>()
                .join(" & ")
        })
        .collect();
    format!("\\begin{{bmatrix}}{}\\end{{bmatrix}}", rows.join(" \\\\ "))
}

fn rational(c: &Rational) -> String {
    if c.is_integer() {
        c.numer().to_string()
    } else {
        format!("\\frac{{{}}}{{{}}}", c.numer(), c.denom())
    }
}

fn poly(p: &Poly) -> String {
    if p.is_zero() {
        return "0".to_string();
    }
    let mut out = String::new();
    for (i, (m, c)) in p.sorted_terms().into_iter().enumerate() {
        let magnitude = c.abs();
        let term = if m.is_one() {
            rational(&magnitude)
        } else if magnitude.is_one() {
            monomial(m)
        } else {
            format!("{} {}", rational(&magnitude), monomial(m))
        };
        match (i, c.is_negative()) {
            (0, true) => out.push_str(&format!("- {term}")),
            (0, false) => out.push_str(&term),
            (_, true) => out.push_str(&format!(" - {term}")),
            (_, false) => out.push_str(&format!(" + {term}")),
        }
    }
    out
}

fn monomial(m: &Monomial) -> String {
    m.iter()
        .map(|(atom, e)| atom_power(atom, e))
        .collect::<Vec<_>>()
        .join(" ")
}

fn atom_power(atom: &Atom, exponent: u32) -> String {
    match atom {
        Atom::Symbol(s) if exponent == 1 => name(s.name()),
        Atom::Symbol(s) => format!("{}^{{{}}}", name(s.name()), exponent),
        Atom::Func(Func::Exp, arg) => format!("e^{{{}}}", render(arg)),
        Atom::Func(func, arg) if exponent == 1 => {
            format!("\\{}{{\\left({} \\right)}}", func.name(), render(arg))
        }
        Atom::Func(func, arg) => format!(
            "\\{}^{{{}}}{{\\left({} \\right)}}",
            func.name(),
            exponent,
            render(arg)
        ),
        Atom::Applied(applied) if exponent == 1 => applied_fn(applied),
        Atom::Applied(applied) => format!("\\left({}\\right)^{{{}}}", applied_fn(applied), exponent),
    }
}

fn applied_fn(applied: &Applied) -> String {
    let args = applied
        .args
        .iter()
        .map(render)
        .collect::<Vec<_>>()
        .join(", ");
    let call = format!("{}{{\\left({} \\right)}}", name(applied.name.name()), args);
    let mut prefix = String::new();
    for (slot, count) in applied.derivs.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let var = applied.args[slot]
            .as_symbol_name()
            .map(name)
            .unwrap_or_else(|| format!("x_{{{}}}", slot + 1));
        if *count == 1 {
            prefix.push_str(&format!("\\partial_{{{var}}} "));
        } else {
            prefix.push_str(&format!("\\partial_{{{var}}}^{{{count}}} "));
        }
    }
    format!("{prefix}{call}")
}
