//! End-to-end engine scenarios on known geometries.

use curvature_algebra::{Expr, Rational, Symbol};
use curvature_core::{
    CoordinateFrame, DerivedEntities, MetricLoader, MetricPreset, ParameterSet,
    SourceMetricLoader, StageContext, TensorEngine,
};

fn compute(coords: &str, params: &str, source: &str) -> DerivedEntities {
    let frame = CoordinateFrame::parse(coords).expect("coords");
    let params = ParameterSet::parse(params, &frame).expect("params");
    let metric = SourceMetricLoader
        .load(&frame, &params, source)
        .expect("metric source");
    TensorEngine::new(frame)
        .compute(params, metric, &mut StageContext::unobserved())
        .expect("computation")
}

fn assert_all_zero(entities: &DerivedEntities) {
    assert!(entities.ricci.indexed().all(|(_, e)| e.is_zero()));
    assert!(entities.ricci_scalar.is_zero());
    assert!(entities.einstein.indexed().all(|(_, e)| e.is_zero()));
    assert!(entities.mixed_einstein.indexed().all(|(_, e)| e.is_zero()));
    assert!(entities.divergence.iter().all(Expr::is_zero));
}

#[test]
fn test_flat_plane() {
    let out = compute("x, y", "", "metric = diag(1, 1)");
    assert_eq!(out.inverse_metric, curvature_algebra::Matrix::identity(2));
    assert!(out.christoffel.indexed().all(|(_, e)| e.is_zero()));
    assert_all_zero(&out);
    assert_eq!(out.divergence.dim(), 2);
}

#[test]
fn test_schwarzschild_is_vacuum() {
    let preset = MetricPreset::Schwarzschild;
    let out = compute(preset.coords(), preset.params(), preset.source());
    assert_all_zero(&out);

    // Γ^t_{tr} = M / (r (r - 2M))
    let r = Expr::symbol(&Symbol::new("r"));
    let m = Expr::symbol(&Symbol::new("M"));
    let two_m = m.scale(&Rational::from_integer(2.into()));
    let expected = m.div(&r.mul(&r.sub(&two_m))).unwrap();
    assert!(out.christoffel.get(0, 0, 1).equivalent(&expected));
    assert!(out.christoffel.get(0, 1, 0).equivalent(&expected));
}

#[test]
fn test_two_sphere_curvature() {
    let out = compute("theta, phi", "a", "metric = diag(a^2, a^2*sin(theta)^2)");
    let a = Expr::symbol(&Symbol::new("a"));
    let expected = Expr::integer(2).div(&a.mul(&a)).unwrap();
    assert!(
        out.ricci_scalar.equivalent(&expected),
        "R = {}",
        out.ricci_scalar
    );
    assert!(out.ricci.get(0, 0).equivalent(&Expr::one()));
    // n = 2: the Einstein tensor vanishes identically.
    assert!(out.einstein.indexed().all(|(_, e)| e.is_zero()));
}

#[test]
fn test_frw_trace_identity() {
    let out = compute(
        "t, x, y, z",
        "",
        "func a(t)\nmetric = diag(-1, a^2, a^2, a^2)",
    );
    assert!(!out.ricci_scalar.is_zero());
    // trace(G^mu_nu) = (1 - n/2) R = -R for n = 4
    let trace = out.mixed_einstein.trace();
    assert!(
        trace.equivalent(&out.ricci_scalar.neg()),
        "trace = {trace}, R = {}",
        out.ricci_scalar
    );
}

#[test]
fn test_scalar_is_trace_of_inverse_times_ricci() {
    let out = compute("t, x, y, z", "", "func a(t)\nmetric = diag(-1, a^2, a^2, a^2)");
    let product = out
        .inverse_metric
        .mul(&out.ricci.to_matrix())
        .expect("square");
    let trace = (0..4).fold(Expr::zero(), |acc, i| acc.add(product.get(i, i)));
    assert!(trace.equivalent(&out.ricci_scalar));
}

#[test]
fn test_ricci_and_einstein_symmetry() {
    let out = compute(
        "t, r, theta, phi",
        "",
        "func A(r)\nfunc B(r)\nmetric = diag(-A, B, r^2, r^2*sin(theta)^2)",
    );
    for i in 0..4 {
        for j in 0..4 {
            assert!(out.ricci.get(i, j).equivalent(out.ricci.get(j, i)));
            assert!(out.einstein.get(i, j).equivalent(out.einstein.get(j, i)));
        }
    }
}

#[test]
fn test_shapes_follow_dimension() {
    let out = compute("u, v, w", "", "metric = diag(1, u^2, v^2)");
    assert_eq!(out.inverse_metric.shape(), (3, 3));
    assert_eq!(out.christoffel.dim(), 3);
    assert_eq!(out.ricci.dim(), 3);
    assert_eq!(out.einstein.dim(), 3);
    assert_eq!(out.mixed_einstein.dim(), 3);
    assert_eq!(out.divergence.dim(), 3);
}

#[test]
fn test_determinism() {
    let preset = MetricPreset::Schwarzschild;
    let a = compute(preset.coords(), preset.params(), preset.source());
    let b = compute(preset.coords(), preset.params(), preset.source());
    assert_eq!(a, b);
}

#[test]
fn test_kerr_is_vacuum() {
    let preset = MetricPreset::Kerr;
    let out = compute(preset.coords(), preset.params(), preset.source());
    assert_all_zero(&out);
    assert!(!out.christoffel.indexed().all(|(_, e)| e.is_zero()));
}

fn tono_metric() -> (TensorEngine, curvature_algebra::Matrix) {
    let preset = MetricPreset::Tono;
    let frame = CoordinateFrame::parse(preset.coords()).expect("coords");
    let params = ParameterSet::parse(preset.params(), &frame).expect("params");
    let metric = SourceMetricLoader
        .load(&frame, &params, preset.source())
        .expect("metric source");
    (TensorEngine::new(frame), metric)
}

#[test]
fn test_tono_connection() {
    let (engine, metric) = tono_metric();
    let mut ctx = StageContext::unobserved();
    let inverse = engine.invert_metric(&metric, &mut ctx).expect("invertible");
    let gamma = engine
        .christoffel(&metric, &inverse, &mut ctx)
        .expect("christoffel");

    let r = Expr::symbol(&Symbol::new("r"));
    let k = Expr::symbol(&Symbol::new("k"));
    let theta = Expr::symbol(&Symbol::new("theta"));

    // g^{θθ} = exp(-2k/r) / r^2
    let e = Expr::exp(&k.scale(&Rational::from_integer(2.into())).div(&r).unwrap());
    let g_theta = r.mul(&r).mul(&e);
    assert!(inverse.get(2, 2).mul(&g_theta).equivalent(&Expr::one()));

    // Γ^θ_{θr} = (r - k) / r^2
    let expected = r.sub(&k).div(&r.mul(&r)).unwrap();
    assert!(gamma.get(2, 2, 1).equivalent(&expected), "{}", gamma.get(2, 2, 1));
    assert!(gamma.get(2, 1, 2).equivalent(&expected));

    // Γ^θ_{φφ} = -sin(θ) cos(θ)
    let expected = Expr::sin(&theta).mul(&Expr::cos(&theta)).neg();
    assert!(gamma.get(2, 3, 3).equivalent(&expected), "{}", gamma.get(2, 3, 3));

    for rho in 0..4 {
        for mu in 0..4 {
            for nu in 0..4 {
                assert!(gamma.get(rho, mu, nu).equivalent(gamma.get(rho, nu, mu)));
            }
        }
    }
}

#[test]
#[ignore = "full Tono chain takes minutes; run with --ignored"]
fn test_tono_full_chain() {
    let preset = MetricPreset::Tono;
    let out = compute(preset.coords(), preset.params(), preset.source());
    assert!(!out.ricci_scalar.is_zero());
    for i in 0..4 {
        for j in 0..4 {
            assert!(out.ricci.get(i, j).equivalent(out.ricci.get(j, i)));
        }
    }
    assert_eq!(out.divergence.dim(), 4);
}
