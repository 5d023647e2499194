//! Evaluation of parsed statements into a metric matrix.

use std::collections::HashMap;

use curvature_algebra::{AlgebraError, Expr, Matrix, Rational, Symbol};
use num_bigint::BigInt;
use num_traits::Pow;

use super::lexer::tokenize;
use super::parser::{parse, BinaryOp, Node, Statement};
use super::{MetricSourceError, RESULT_BINDING};
use crate::frame::{is_reserved, CoordinateFrame, ParameterSet};

const MAX_EXPONENT: i64 = 64;
const MAX_DECIMAL_SCALE: u64 = 308;

type EvalResult<T> = Result<T, MetricSourceError>;

#[derive(Debug, Clone)]
enum Value {
    Scalar(Expr),
    List(Vec<Expr>),
    Matrix(Matrix),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::List(_) => "list",
            Value::Matrix(_) => "matrix",
        }
    }
}

/// Evaluates `source` and returns the matrix bound to `metric`.
pub fn evaluate(
    frame: &CoordinateFrame,
    params: &ParameterSet,
    source: &str,
) -> Result<Matrix, MetricSourceError> {
    let statements = parse(&tokenize(source)?)?;
    let mut evaluator = Evaluator {
        frame,
        params,
        bindings: HashMap::new(),
        functions: HashMap::new(),
    };
    for statement in &statements {
        evaluator.statement(statement)?;
    }
    match evaluator.bindings.remove(RESULT_BINDING) {
        Some(Value::Matrix(m)) => Ok(m),
        Some(other) => Err(MetricSourceError::NotAMatrix {
            found: other.type_name(),
        }),
        None => Err(MetricSourceError::MissingResult),
    }
}

struct Evaluator<'a> {
    frame: &'a CoordinateFrame,
    params: &'a ParameterSet,
    bindings: HashMap<String, Value>,
    functions: HashMap<String, usize>,
}

fn algebra(line: usize) -> impl Fn(AlgebraError) -> MetricSourceError {
    move |source| MetricSourceError::Algebra { line, source }
}

fn mismatch(line: usize, message: impl Into<String>) -> MetricSourceError {
    MetricSourceError::TypeMismatch {
        message: message.into(),
        line,
    }
}

impl<'a> Evaluator<'a> {
    fn check_bindable(&self, name: &str, line: usize) -> EvalResult<()> {
        let reserved = (is_reserved(name) && name != RESULT_BINDING)
            || self.frame.contains(name)
            || self.params.contains(name)
            || self.functions.contains_key(name);
        if reserved {
            return Err(MetricSourceError::ReservedName {
                name: name.to_string(),
                line,
            });
        }
        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> EvalResult<()> {
        match statement {
            Statement::Assign { name, value, line } => {
                self.check_bindable(name, *line)?;
                let value = self.eval(value)?;
                self.bindings.insert(name.clone(), value);
            }
            Statement::Func { name, params, line } => {
                if name == RESULT_BINDING || self.bindings.contains_key(name) {
                    return Err(MetricSourceError::ReservedName {
                        name: name.clone(),
                        line: *line,
                    });
                }
                self.check_bindable(name, *line)?;
                let args = params
                    .iter()
                    .map(|p| self.lookup(p, *line))
                    .collect::<EvalResult<Vec<_>>>()?;
                let applied = Expr::applied(&Symbol::new(name), args);
                self.functions.insert(name.clone(), params.len());
                self.bindings.insert(name.clone(), Value::Scalar(applied));
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str, line: usize) -> EvalResult<Expr> {
        match self.resolve(name, line)? {
            Value::Scalar(e) => Ok(e),
            other => Err(mismatch(
                line,
                format!("{name} is a {}, expected a scalar", other.type_name()),
            )),
        }
    }

    fn resolve(&self, name: &str, line: usize) -> EvalResult<Value> {
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        if let Some(index) = self.frame.index_of(name) {
            if let Some(symbol) = self.frame.get(index) {
                return Ok(Value::Scalar(Expr::symbol(symbol)));
            }
        }
        if let Some(symbol) = self.params.get(name) {
            return Ok(Value::Scalar(Expr::symbol(symbol)));
        }
        if name == "pi" {
            return Ok(Value::Scalar(Expr::symbol(&Symbol::new("pi"))));
        }
        Err(MetricSourceError::UnknownIdentifier {
            name: name.to_string(),
            line,
        })
    }

    fn eval(&self, node: &Node) -> EvalResult<Value> {
        match node {
            Node::Number(text) => Ok(Value::Scalar(Expr::rational(parse_number(text)?))),
            Node::Ident { name, line } => self.resolve(name, *line),
            Node::Neg(inner) => match self.eval(inner)? {
                Value::Scalar(e) => Ok(Value::Scalar(e.neg())),
                Value::Matrix(m) => Ok(Value::Matrix(m.map(Expr::neg))),
                Value::List(items) => Ok(Value::List(items.iter().map(Expr::neg).collect())),
            },
            Node::Binary { op, lhs, rhs, line } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs, *line)
            }
            Node::List { items, line } => self.list(items, *line),
            Node::Call { name, args, line } => self.call(name, args, *line),
        }
    }

    fn scalar(&self, node: &Node, line: usize) -> EvalResult<Expr> {
        match self.eval(node)? {
            Value::Scalar(e) => Ok(e),
            other => Err(mismatch(
                line,
                format!("expected a scalar, found a {}", other.type_name()),
            )),
        }
    }

    fn list(&self, items: &[Node], line: usize) -> EvalResult<Value> {
        let values = items
            .iter()
            .map(|n| self.eval(n))
            .collect::<EvalResult<Vec<_>>>()?;
        if values.is_empty() {
            return Err(mismatch(line, "empty list literal"));
        }
        if values.iter().all(|v| matches!(v, Value::Scalar(_))) {
            let row = values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Scalar(e) => Some(e),
                    _ => None,
                })
                .collect();
            return Ok(Value::List(row));
        }
        rows_to_matrix(values, line)
    }

    fn call(&self, name: &str, args: &[Node], line: usize) -> EvalResult<Value> {
        let arity = |expected: &str| MetricSourceError::Arity {
            function: name.to_string(),
            expected: expected.to_string(),
            found: args.len(),
            line,
        };
        let unary = |f: &dyn Fn(&Expr) -> Result<Expr, AlgebraError>| -> EvalResult<Value> {
            let [arg] = args else {
                return Err(arity("1"));
            };
            let arg = self.scalar(arg, line)?;
            f(&arg).map(Value::Scalar).map_err(algebra(line))
        };

        match name {
            "sin" => unary(&|e| Ok(Expr::sin(e))),
            "cos" => unary(&|e| Ok(Expr::cos(e))),
            "tan" => unary(&Expr::tan),
            "exp" => unary(&|e| Ok(Expr::exp(e))),
            "log" | "ln" => unary(&Expr::log),
            "diff" => {
                let [expr, var] = args else {
                    return Err(arity("2"));
                };
                let expr = self.scalar(expr, line)?;
                let var = self.scalar(var, line)?;
                let symbol = var
                    .as_symbol_name()
                    .map(Symbol::new)
                    .ok_or_else(|| mismatch(line, "diff expects a symbol as second argument"))?;
                expr.diff(&symbol)
                    .map(Value::Scalar)
                    .map_err(algebra(line))
            }
            "diag" => {
                if args.is_empty() {
                    return Err(arity("at least 1"));
                }
                let entries = args
                    .iter()
                    .map(|a| self.scalar(a, line))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Matrix(Matrix::diag(entries)))
            }
            "matrix" => {
                if args.is_empty() {
                    return Err(arity("at least 1"));
                }
                let rows = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<EvalResult<Vec<_>>>()?;
                rows_to_matrix(rows, line)
            }
            _ => match self.functions.get(name) {
                Some(&expected) => {
                    if args.len() != expected {
                        return Err(arity(&expected.to_string()));
                    }
                    let args = args
                        .iter()
                        .map(|a| self.scalar(a, line))
                        .collect::<EvalResult<Vec<_>>>()?;
                    Ok(Value::Scalar(Expr::applied(&Symbol::new(name), args)))
                }
                None => Err(MetricSourceError::UnknownFunction {
                    name: name.to_string(),
                    line,
                }),
            },
        }
    }
}

fn rows_to_matrix(rows: Vec<Value>, line: usize) -> EvalResult<Value> {
    let rows = rows
        .into_iter()
        .map(|v| match v {
            Value::List(row) => Ok(row),
            other => Err(mismatch(
                line,
                format!("matrix rows must be lists, found a {}", other.type_name()),
            )),
        })
        .collect::<EvalResult<Vec<_>>>()?;
    match Matrix::from_rows(rows) {
        Ok(m) => Ok(Value::Matrix(m)),
        Err(AlgebraError::RaggedRows {
            row,
            expected,
            found,
        }) => Err(MetricSourceError::RaggedMatrix {
            row,
            expected,
            found,
        }),
        Err(other) => Err(algebra(line)(other)),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value, line: usize) -> EvalResult<Value> {
    use Value::{Matrix as M, Scalar as S};

    let unsupported = |lhs: &Value, rhs: &Value| {
        mismatch(
            line,
            format!(
                "unsupported operands for {op:?}: {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ),
        )
    };

    match (op, &lhs, &rhs) {
        (BinaryOp::Add, S(a), S(b)) => Ok(S(a.add(b))),
        (BinaryOp::Sub, S(a), S(b)) => Ok(S(a.sub(b))),
        (BinaryOp::Mul, S(a), S(b)) => Ok(S(a.mul(b))),
        (BinaryOp::Div, S(a), S(b)) => a.div(b).map(S).map_err(algebra(line)),
        (BinaryOp::Pow, S(base), S(exponent)) => {
            let k = exponent
                .as_integer()
                .filter(|k| k.abs() <= MAX_EXPONENT)
                .ok_or(MetricSourceError::UnsupportedPower {
                    line,
                    max: MAX_EXPONENT,
                })?;
            base.pow(k).map(S).map_err(algebra(line))
        }
        (BinaryOp::Add | BinaryOp::Sub, M(a), M(b)) => {
            if a.shape() != b.shape() {
                return Err(mismatch(
                    line,
                    format!("matrix shapes differ: {:?} and {:?}", a.shape(), b.shape()),
                ));
            }
            let (rows, cols) = a.shape();
            Ok(M(Matrix::from_fn(rows, cols, |i, j| {
                if op == BinaryOp::Add {
                    a.get(i, j).add(b.get(i, j))
                } else {
                    a.get(i, j).sub(b.get(i, j))
                }
            })))
        }
        (BinaryOp::Mul, S(k), M(m)) | (BinaryOp::Mul, M(m), S(k)) => Ok(M(m.map(|e| e.mul(k)))),
        (BinaryOp::Mul, M(a), M(b)) => a.mul(b).map(M).map_err(algebra(line)),
        (BinaryOp::Div, M(m), S(k)) => {
            let inv = k.inv().map_err(algebra(line))?;
            Ok(M(m.map(|e| e.mul(&inv))))
        }
        _ => Err(unsupported(&lhs, &rhs)),
    }
}

/// Converts a decimal literal to an exact rational: `0.25` is `1/4`.
///
/// The power of ten a literal scales by is capped at [`MAX_DECIMAL_SCALE`].
fn parse_number(text: &str) -> EvalResult<Rational> {
    let invalid = || MetricSourceError::InvalidNumber {
        text: text.to_string(),
    };
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(at) => (
            &text[..at],
            text[at + 1..].parse::<i64>().map_err(|_| invalid())?,
        ),
        None => (text, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{whole}{fraction}");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let scale = i64::try_from(fraction.len())
        .ok()
        .and_then(|places| exponent.checked_sub(places))
        .filter(|scale| scale.unsigned_abs() <= MAX_DECIMAL_SCALE)
        .ok_or_else(invalid)?;
    let numer = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
    let power = Pow::pow(&BigInt::from(10), scale.unsigned_abs());
    let value = if scale >= 0 {
        Rational::from_integer(numer * power)
    } else {
        Rational::new(numer, power)
    };
    Ok(value)
}
