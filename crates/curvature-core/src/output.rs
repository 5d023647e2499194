//! Output emission protocol.
//!
//! A run produces an ordered, append-only stream of [`OutputRecord`]s.
//! Rank-2 tensors are emitted row-major, Christoffel symbols in
//! `(ρ, μ, ν)` order, vectors in index order and scalars as one record.
//! Identical input always yields an identical stream.

use std::fmt;

use curvature_algebra::{latex, Expr, Matrix};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::index_algebra::{Rank1, Rank2, Rank3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorKind {
    Metric,
    InverseMetric,
    Christoffel,
    Ricci,
    RicciScalar,
    Einstein,
    MixedEinstein,
    Divergence,
}

impl TensorKind {
    /// Section header text.
    pub fn title(&self) -> &'static str {
        match self {
            TensorKind::Metric => "Metric Tensor",
            TensorKind::InverseMetric => "Inverse Metric",
            TensorKind::Christoffel => "Christoffel Symbols",
            TensorKind::Ricci => "Ricci Tensor",
            TensorKind::RicciScalar => "Ricci Scalar",
            TensorKind::Einstein => "Einstein Tensor",
            TensorKind::MixedEinstein => "Mixed Einstein Tensor",
            TensorKind::Divergence => "Covariant Divergence",
        }
    }

    /// Plain-text component label, e.g. `Gamma^0_11`.
    ///
    /// Indices are comma-separated once any index has two digits
    /// (`R_1,10`), so labels stay unambiguous for `n > 10`.
    pub fn label(&self, indices: &[usize]) -> String {
        let idx = |range: std::ops::Range<usize>| join_indices(indices, range);
        match self {
            TensorKind::Metric => format!("g_{}", idx(0..2)),
            TensorKind::InverseMetric => format!("g^{}", idx(0..2)),
            TensorKind::Christoffel => format!("Gamma^{}_{}", idx(0..1), idx(1..3)),
            TensorKind::Ricci => format!("R_{}", idx(0..2)),
            TensorKind::RicciScalar => "R".to_string(),
            TensorKind::Einstein => format!("G_{}", idx(0..2)),
            TensorKind::MixedEinstein => format!("G^{}_{}", idx(0..1), idx(1..2)),
            TensorKind::Divergence => format!("nabla_nu G^{}nu", idx(0..1)),
        }
    }

    /// LaTeX component label, e.g. `\Gamma^{0}_{11}`.
    pub fn latex_label(&self, indices: &[usize]) -> String {
        let idx = |range: std::ops::Range<usize>| join_indices(indices, range);
        match self {
            TensorKind::Metric => format!("g_{{{}}}", idx(0..2)),
            TensorKind::InverseMetric => format!("g^{{{}}}", idx(0..2)),
            TensorKind::Christoffel => format!("\\Gamma^{{{}}}_{{{}}}", idx(0..1), idx(1..3)),
            TensorKind::Ricci => format!("R_{{{}}}", idx(0..2)),
            TensorKind::RicciScalar => "R".to_string(),
            TensorKind::Einstein => format!("G_{{{}}}", idx(0..2)),
            TensorKind::MixedEinstein => format!("G^{{{}}}_{{{}}}", idx(0..1), idx(1..2)),
            TensorKind::Divergence => format!("\\nabla_\\nu G^{{{}\\nu}}", idx(0..1)),
        }
    }
}

fn join_indices(indices: &[usize], range: std::ops::Range<usize>) -> String {
    let separator = if indices.iter().any(|&i| i > 9) { "," } else { "" };
    indices
        .get(range)
        .unwrap_or_default()
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// One entry of the output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRecord {
    SectionHeader {
        text: String,
    },
    Diagnostic {
        text: String,
    },
    Component {
        tensor: TensorKind,
        indices: Vec<usize>,
        expression: String,
    },
}

impl OutputRecord {
    pub fn header(kind: TensorKind) -> Self {
        OutputRecord::SectionHeader {
            text: kind.title().to_string(),
        }
    }

    pub fn diagnostic(text: impl Into<String>) -> Self {
        OutputRecord::Diagnostic { text: text.into() }
    }

    pub fn is_component_of(&self, kind: TensorKind) -> bool {
        matches!(self, OutputRecord::Component { tensor, .. } if *tensor == kind)
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputRecord::SectionHeader { text } => write!(f, "===== {text} ====="),
            OutputRecord::Diagnostic { text } => write!(f, "# {text}"),
            OutputRecord::Component {
                tensor,
                indices,
                expression,
            } => write!(f, "{} = {}", tensor.label(indices), expression),
        }
    }
}

/// Turns an expression into display text.
pub trait Renderer: Send + Sync {
    fn render(&self, expr: &Expr) -> String;
    fn render_matrix(&self, matrix: &Matrix) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(&self, expr: &Expr) -> String {
        expr.to_string()
    }

    fn render_matrix(&self, matrix: &Matrix) -> String {
        let rows: Vec<String> = (0..matrix.rows())
            .map(|i| {
                let row: Vec<String> = (0..matrix.cols())
                    .map(|j| matrix.get(i, j).to_string())
                    .collect();
                format!("[{}]", row.join(", "))
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LatexRenderer;

impl Renderer for LatexRenderer {
    fn render(&self, expr: &Expr) -> String {
        latex::render(expr)
    }

    fn render_matrix(&self, matrix: &Matrix) -> String {
        latex::render_matrix(matrix)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
    #[default]
    Plain,
    Latex,
}

impl RenderStyle {
    pub fn renderer(&self) -> Box<dyn Renderer> {
        match self {
            RenderStyle::Plain => Box::new(PlainRenderer),
            RenderStyle::Latex => Box::new(LatexRenderer),
        }
    }
}

fn component(kind: TensorKind, indices: Vec<usize>, expr: &Expr, renderer: &dyn Renderer) -> OutputRecord {
    OutputRecord::Component {
        tensor: kind,
        indices,
        expression: renderer.render(expr),
    }
}

/// Header plus one record per entry of a square matrix.
pub fn matrix_records(kind: TensorKind, m: &Matrix, renderer: &dyn Renderer) -> Vec<OutputRecord> {
    let mut out = vec![OutputRecord::header(kind)];
    for i in 0..m.rows() {
        for j in 0..m.cols() {
            out.push(component(kind, vec![i, j], m.get(i, j), renderer));
        }
    }
    out
}

pub fn rank2_records(kind: TensorKind, t: &Rank2<Expr>, renderer: &dyn Renderer) -> Vec<OutputRecord> {
    std::iter::once(OutputRecord::header(kind))
        .chain(t.indexed().map(|(idx, e)| component(kind, idx.to_vec(), e, renderer)))
        .collect()
}

pub fn rank3_records(kind: TensorKind, t: &Rank3<Expr>, renderer: &dyn Renderer) -> Vec<OutputRecord> {
    std::iter::once(OutputRecord::header(kind))
        .chain(t.indexed().map(|(idx, e)| component(kind, idx.to_vec(), e, renderer)))
        .collect()
}

pub fn rank1_records(kind: TensorKind, t: &Rank1<Expr>, renderer: &dyn Renderer) -> Vec<OutputRecord> {
    std::iter::once(OutputRecord::header(kind))
        .chain(
            t.iter()
                .enumerate()
                .map(|(i, e)| component(kind, vec![i], e, renderer)),
        )
        .collect()
}

pub fn scalar_records(kind: TensorKind, e: &Expr, renderer: &dyn Renderer) -> Vec<OutputRecord> {
    vec![
        OutputRecord::header(kind),
        component(kind, Vec::new(), e, renderer),
    ]
}

/// Append-only record log with a content digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLog {
    records: Vec<OutputRecord>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: OutputRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// SHA-256 over the newline-delimited JSON form of every record.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for record in &self.records {
            if let Ok(line) = serde_json::to_vec(record) {
                hasher.update(&line);
            }
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// SHA-256 identifying a run's input triple.
pub fn input_digest(coords: &str, params: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [coords, params, source] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvature_algebra::Symbol;

    #[test]
    fn test_record_json_is_tagged() {
        let record = OutputRecord::Component {
            tensor: TensorKind::MixedEinstein,
            indices: vec![0, 1],
            expression: "0".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "component");
        assert_eq!(json["tensor"], "mixed_einstein");
        let back: OutputRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_matrix_records_row_major() {
        let m = Matrix::identity(2);
        let records = matrix_records(TensorKind::Metric, &m, &PlainRenderer);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0], OutputRecord::header(TensorKind::Metric));
        assert_eq!(records[2].to_string(), "g_01 = 0");
        assert_eq!(records[4].to_string(), "g_11 = 1");
    }

    #[test]
    fn test_labels() {
        assert_eq!(TensorKind::Christoffel.label(&[1, 0, 2]), "Gamma^1_02");
        assert_eq!(
            TensorKind::Christoffel.latex_label(&[1, 0, 2]),
            "\\Gamma^{1}_{02}"
        );
        assert_eq!(TensorKind::RicciScalar.label(&[]), "R");
    }

    #[test]
    fn test_two_digit_indices_are_separated() {
        assert_eq!(TensorKind::Ricci.label(&[1, 10]), "R_1,10");
        assert_eq!(TensorKind::Ricci.label(&[11, 0]), "R_11,0");
        assert_ne!(
            TensorKind::Ricci.label(&[1, 10]),
            TensorKind::Ricci.label(&[11, 0])
        );
        assert_eq!(TensorKind::Christoffel.label(&[10, 2, 3]), "Gamma^10_2,3");
        assert_eq!(
            TensorKind::MixedEinstein.latex_label(&[0, 12]),
            "G^{0}_{12}"
        );
        assert_eq!(
            TensorKind::Einstein.latex_label(&[3, 12]),
            "G_{3,12}"
        );
        assert_eq!(TensorKind::Ricci.label(&[1, 1]), "R_11");
    }

    #[test]
    fn test_latex_renderer() {
        let theta = Expr::symbol(&Symbol::new("theta"));
        assert_eq!(LatexRenderer.render(&Expr::sin(&theta)), "\\sin{\\left(\\theta \\right)}");
        assert_eq!(RenderStyle::Latex.renderer().render(&Expr::one()), "1");
    }

    #[test]
    fn test_log_digest_is_order_sensitive() {
        let mut a = OutputLog::new();
        a.push(OutputRecord::diagnostic("one"));
        a.push(OutputRecord::diagnostic("two"));
        let mut b = OutputLog::new();
        b.push(OutputRecord::diagnostic("two"));
        b.push(OutputRecord::diagnostic("one"));
        assert_eq!(a.digest().len(), 64);
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), a.clone().digest());
    }

    #[test]
    fn test_input_digest_separates_fields() {
        assert_ne!(input_digest("ab", "c", ""), input_digest("a", "bc", ""));
    }
}
