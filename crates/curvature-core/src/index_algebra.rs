//! Tensor formulas as explicit finite index sums.
//!
//! Every function here produces a single component so that callers can
//! interleave cancellation checks between components. The formulas are
//! generic over [`Symbolic`]; sign and index order follow the usual
//! conventions:
//!
//! - Christoffel: `Γ^ρ_{μν} = ½ Σ_λ g^{ρλ} (∂_ν g_{λμ} + ∂_μ g_{λν} − ∂_λ g_{μν})`
//! - Ricci: `R_{μν} = ∂_ρ Γ^ρ_{μν} − ∂_ν Γ^ρ_{μρ} + Γ^ρ_{μν} Γ^σ_{ρσ} − Γ^σ_{μρ} Γ^ρ_{νσ}`
//! - Scalar: `R = g^{ij} R_{ij}`
//! - Einstein: `G_{μν} = R_{μν} − ½ R g_{μν}`
//! - Mixed: `G^μ_ν = g^{μρ} G_{ρν}`
//! - Divergence: `∂_ν G^{μν} + Γ^μ_{λν} G^{λν} + Γ^ν_{λν} G^{μλ}`

use curvature_algebra::{AlgebraResult, Expr, Matrix, Rational, Symbol};

/// Operations the index formulas need from a symbolic value.
pub trait Symbolic: Clone {
    fn zero() -> Self;
    fn is_zero(&self) -> bool;
    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn mul(&self, other: &Self) -> Self;
    fn scale_half(&self) -> Self;
    fn diff(&self, coord: &Symbol) -> AlgebraResult<Self>;
    /// Full reduction to the canonical form.
    fn simplify(&self) -> Self;
}

impl Symbolic for Expr {
    fn zero() -> Self {
        Expr::zero()
    }

    fn is_zero(&self) -> bool {
        Expr::is_zero(self)
    }

    fn add(&self, other: &Self) -> Self {
        Expr::add(self, other)
    }

    fn sub(&self, other: &Self) -> Self {
        Expr::sub(self, other)
    }

    fn mul(&self, other: &Self) -> Self {
        Expr::mul(self, other)
    }

    fn scale_half(&self) -> Self {
        Expr::scale(self, &Rational::new(1.into(), 2.into()))
    }

    fn diff(&self, coord: &Symbol) -> AlgebraResult<Self> {
        Expr::diff(self, coord)
    }

    fn simplify(&self) -> Self {
        Expr::simplify(self)
    }
}

/// Length-n vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rank1<S> {
    data: Vec<S>,
}

impl<S> Rank1<S> {
    pub fn from_vec(data: Vec<S>) -> Self {
        Self { data }
    }

    pub fn dim(&self) -> usize {
        self.data.len()
    }

    pub fn get(&self, i: usize) -> &S {
        &self.data[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.data.iter()
    }
}

/// n x n array, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rank2<S> {
    n: usize,
    data: Vec<S>,
}

impl<S> Rank2<S> {
    /// `data` must hold exactly `n * n` entries in row-major order.
    pub fn from_vec(n: usize, data: Vec<S>) -> Self {
        debug_assert_eq!(data.len(), n * n);
        Self { n, data }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> &S {
        &self.data[i * self.n + j]
    }

    /// Components with their indices in row-major order.
    pub fn indexed(&self) -> impl Iterator<Item = ([usize; 2], &S)> {
        let n = self.n;
        self.data
            .iter()
            .enumerate()
            .map(move |(k, s)| ([k / n, k % n], s))
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.data.iter()
    }

    pub fn map<T>(&self, f: impl Fn(&S) -> T) -> Rank2<T> {
        Rank2 {
            n: self.n,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> S
    where
        S: Symbolic,
    {
        (0..self.n).fold(S::zero(), |acc, i| acc.add(self.get(i, i)))
    }
}

impl Rank2<Expr> {
    /// Copies a square matrix; callers check squareness first.
    pub fn from_matrix(m: &Matrix) -> Self {
        Self::from_vec(m.rows(), m.entries().to_vec())
    }

    pub fn to_matrix(&self) -> Matrix {
        Matrix::from_fn(self.n, self.n, |i, j| self.get(i, j).clone())
    }
}

/// n x n x n array stored flat at `ρ·n² + μ·n + ν`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rank3<S> {
    n: usize,
    data: Vec<S>,
}

impl<S> Rank3<S> {
    pub fn from_vec(n: usize, data: Vec<S>) -> Self {
        debug_assert_eq!(data.len(), n * n * n);
        Self { n, data }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn get(&self, rho: usize, mu: usize, nu: usize) -> &S {
        &self.data[(rho * self.n + mu) * self.n + nu]
    }

    pub fn indexed(&self) -> impl Iterator<Item = ([usize; 3], &S)> {
        let n = self.n;
        self.data
            .iter()
            .enumerate()
            .map(move |(k, s)| ([k / (n * n), (k / n) % n, k % n], s))
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.data.iter()
    }
}

fn sum<S: Symbolic>(terms: impl Iterator<Item = S>) -> S {
    terms.fold(S::zero(), |acc, t| if t.is_zero() { acc } else { acc.add(&t) })
}

fn product<S: Symbolic>(a: &S, b: &S) -> S {
    if a.is_zero() || b.is_zero() {
        S::zero()
    } else {
        a.mul(b)
    }
}

/// All first partial derivatives of the metric: `dg[k][i][j] = ∂_k g_{ij}`.
pub fn metric_derivatives<S: Symbolic>(g: &Rank2<S>, coords: &[Symbol]) -> AlgebraResult<Rank3<S>> {
    let n = g.dim();
    let mut data = Vec::with_capacity(n * n * n);
    for coord in coords.iter().take(n) {
        for i in 0..n {
            for j in 0..n {
                data.push(g.get(i, j).diff(coord)?);
            }
        }
    }
    Ok(Rank3::from_vec(n, data))
}

/// `Γ^ρ_{μν}` from the inverse metric and the metric derivatives.
pub fn christoffel_component<S: Symbolic>(
    g_inv: &Rank2<S>,
    dg: &Rank3<S>,
    rho: usize,
    mu: usize,
    nu: usize,
) -> S {
    let n = g_inv.dim();
    let total = sum((0..n).map(|lambda| {
        let upper = g_inv.get(rho, lambda);
        if upper.is_zero() {
            return S::zero();
        }
        let bracket = dg
            .get(nu, lambda, mu)
            .add(dg.get(mu, lambda, nu))
            .sub(dg.get(lambda, mu, nu));
        product(upper, &bracket)
    }));
    total.scale_half()
}

/// `R_{μν}`.
pub fn ricci_component<S: Symbolic>(
    gamma: &Rank3<S>,
    coords: &[Symbol],
    mu: usize,
    nu: usize,
) -> AlgebraResult<S> {
    let n = gamma.dim();
    let mut first = S::zero();
    let mut second = S::zero();
    for rho in 0..n {
        first = first.add(&gamma.get(rho, mu, nu).diff(&coords[rho])?);
        second = second.add(&gamma.get(rho, mu, rho).diff(&coords[nu])?);
    }
    let third = sum((0..n).flat_map(|rho| {
        (0..n).map(move |sigma| product(gamma.get(rho, mu, nu), gamma.get(sigma, rho, sigma)))
    }));
    let fourth = sum((0..n).flat_map(|rho| {
        (0..n).map(move |sigma| product(gamma.get(sigma, mu, rho), gamma.get(rho, nu, sigma)))
    }));
    Ok(first.sub(&second).add(&third).sub(&fourth))
}

/// `R = Σ g^{ij} R_{ij}`.
pub fn ricci_scalar<S: Symbolic>(g_inv: &Rank2<S>, ricci: &Rank2<S>) -> S {
    let n = g_inv.dim();
    sum((0..n).flat_map(|i| (0..n).map(move |j| product(g_inv.get(i, j), ricci.get(i, j)))))
}

/// `G_{μν} = R_{μν} − ½ R g_{μν}`.
pub fn einstein_component<S: Symbolic>(
    ricci: &Rank2<S>,
    scalar: &S,
    g: &Rank2<S>,
    mu: usize,
    nu: usize,
) -> S {
    ricci
        .get(mu, nu)
        .sub(&product(scalar, g.get(mu, nu)).scale_half())
}

/// `G^μ_ν = Σ_ρ g^{μρ} G_{ρν}`, one entry of the product `g⁻¹ · G`.
pub fn mixed_component<S: Symbolic>(g_inv: &Rank2<S>, einstein: &Rank2<S>, mu: usize, nu: usize) -> S {
    let n = g_inv.dim();
    sum((0..n).map(|rho| product(g_inv.get(mu, rho), einstein.get(rho, nu))))
}

/// Component `μ` of the covariant divergence, contracted against `g_up`.
pub fn divergence_component<S: Symbolic>(
    gamma: &Rank3<S>,
    g_up: &Rank2<S>,
    coords: &[Symbol],
    mu: usize,
) -> AlgebraResult<S> {
    let n = gamma.dim();
    let mut partial = S::zero();
    for nu in 0..n {
        partial = partial.add(&g_up.get(mu, nu).diff(&coords[nu])?);
    }
    let connection = sum((0..n).flat_map(|nu| {
        (0..n).map(move |lambda| product(gamma.get(mu, lambda, nu), g_up.get(lambda, nu)))
    }));
    let trace = sum((0..n).flat_map(|nu| {
        (0..n).map(move |lambda| product(gamma.get(nu, lambda, nu), g_up.get(mu, lambda)))
    }));
    Ok(partial.add(&connection).add(&trace))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::symbol(&Symbol::new(name))
    }

    fn polar() -> (Rank2<Expr>, Rank2<Expr>, Vec<Symbol>) {
        let r = var("r");
        let g = Rank2::from_vec(2, vec![Expr::one(), Expr::zero(), Expr::zero(), r.mul(&r)]);
        let g_inv = Rank2::from_vec(
            2,
            vec![
                Expr::one(),
                Expr::zero(),
                Expr::zero(),
                r.mul(&r).inv().unwrap(),
            ],
        );
        (g, g_inv, vec![Symbol::new("r"), Symbol::new("theta")])
    }

    #[test]
    fn test_rank3_flat_layout() {
        let t = Rank3::from_vec(2, (0..8).collect::<Vec<_>>());
        assert_eq!(*t.get(1, 0, 1), 5);
        let (idx, v) = t.indexed().nth(6).unwrap();
        assert_eq!(idx, [1, 1, 0]);
        assert_eq!(*v, 6);
    }

    #[test]
    fn test_polar_christoffel() {
        let (g, g_inv, coords) = polar();
        let dg = metric_derivatives(&g, &coords).unwrap();
        let r = var("r");
        // Γ^r_{θθ} = -r, Γ^θ_{rθ} = 1/r
        assert!(christoffel_component(&g_inv, &dg, 0, 1, 1).equivalent(&r.neg()));
        assert!(christoffel_component(&g_inv, &dg, 1, 0, 1).equivalent(&r.inv().unwrap()));
        assert!(christoffel_component(&g_inv, &dg, 1, 1, 0).equivalent(&r.inv().unwrap()));
        assert!(christoffel_component(&g_inv, &dg, 0, 0, 0).is_zero());
    }

    #[test]
    fn test_flat_polar_ricci_vanishes() {
        let (g, g_inv, coords) = polar();
        let dg = metric_derivatives(&g, &coords).unwrap();
        let mut gamma = Vec::new();
        for rho in 0..2 {
            for mu in 0..2 {
                for nu in 0..2 {
                    gamma.push(christoffel_component(&g_inv, &dg, rho, mu, nu));
                }
            }
        }
        let gamma = Rank3::from_vec(2, gamma);
        for mu in 0..2 {
            for nu in 0..2 {
                assert!(ricci_component(&gamma, &coords, mu, nu).unwrap().simplify().is_zero());
            }
        }
    }

    #[test]
    fn test_scalar_and_einstein_algebra() {
        let (g, g_inv, _) = polar();
        let ricci = g.map(|e| e.scale(&Rational::from_integer(3.into())));
        // R = g^{ij} 3 g_{ij} = 3n
        let scalar = ricci_scalar(&g_inv, &ricci);
        assert!(scalar.equivalent(&Expr::integer(6)));
        // G = 3g - 3g = 0
        let g00 = einstein_component(&ricci, &scalar, &g, 0, 0);
        assert!(g00.is_zero());
        assert!(ricci.trace().equivalent(&var("r").mul(&var("r")).scale(&Rational::from_integer(3.into())).add(&Expr::integer(3))));
    }

    #[test]
    fn test_mixed_component_is_matrix_product() {
        let (g, g_inv, _) = polar();
        for mu in 0..2 {
            for nu in 0..2 {
                let expected = if mu == nu { Expr::one() } else { Expr::zero() };
                assert!(mixed_component(&g_inv, &g, mu, nu).equivalent(&expected));
            }
        }
    }
}
