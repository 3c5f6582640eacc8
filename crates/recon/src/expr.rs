//! Formula nodes and their row-wise evaluation.
//!
//! Every vendor formula is built from five primitives: arithmetic
//! (including percentage), `max`/`min`, tiered threshold lookup,
//! conditional select, and (inside aggregation only) filtered sums.
//! Evaluation reads the row's raw stored values through [`resolve`];
//! nothing computed by one rule is visible to another.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::RowError;
use crate::model::{Expected, Row};
use crate::parse;
use crate::value::{resolve, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Eq => left == right,
            Self::Ne => left != right,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
            Self::Ne => "<>",
        }
    }
}

/// One price band. `upto = None` is unbounded and must come last.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Band {
    #[serde(default)]
    pub upto: Option<f64>,
    pub value: f64,
}

/// Category + threshold price selection. The first band whose bound is
/// `>=` the threshold wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TieredLookup {
    /// Column holding the categorical key (e.g. meal type).
    pub key: String,
    pub threshold: Box<Expr>,
    pub categories: BTreeMap<String, Vec<Band>>,
}

impl TieredLookup {
    pub fn lookup(&self, row: &Row) -> Result<Expected, RowError> {
        let Some(category) = row.raw(&self.key).category_key() else {
            return Ok(Expected::Undefined);
        };
        let Some(bands) = self.categories.get(&category) else {
            return Ok(Expected::Undefined);
        };
        let threshold = self.threshold.number(row)?;
        Ok(bands
            .iter()
            .find(|band| band.upto.map_or(true, |upto| threshold <= upto))
            .map(|band| Expected::Value(band.value))
            .unwrap_or(Expected::Undefined))
    }

    /// Lower-case category keys and check band ordering.
    pub(crate) fn normalize(&mut self) -> Result<(), String> {
        let categories = std::mem::take(&mut self.categories);
        for (key, bands) in categories {
            if bands.is_empty() {
                return Err(format!("category '{key}' has no bands"));
            }
            let mut previous: Option<f64> = None;
            for (i, band) in bands.iter().enumerate() {
                match band.upto {
                    None if i + 1 != bands.len() => {
                        return Err(format!("category '{key}': unbounded band must be last"));
                    }
                    Some(upto) if previous.is_some_and(|p| upto <= p) => {
                        return Err(format!("category '{key}': band bounds must increase"));
                    }
                    _ => {}
                }
                previous = band.upto.or(previous);
            }
            let normalized = key.trim().to_lowercase();
            if self.categories.insert(normalized.clone(), bands).is_some() {
                return Err(format!("category '{normalized}' declared twice"));
            }
        }
        Ok(())
    }
}

/// Formula node. Deserializes from a formula string (see [`parse::parse`]).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum Expr {
    Number(f64),
    Column(String),
    Neg(Box<Expr>),
    /// `x%`, i.e. `x / 100`.
    Percent(Box<Expr>),
    Binary {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Extremum {
        kind: Extremum,
        args: Vec<Expr>,
    },
    /// `if(left cmp right, then, otherwise)`.
    Select {
        left: Box<Expr>,
        cmp: Comparison,
        right: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Tiered(TieredLookup),
}

impl TryFrom<String> for Expr {
    type Error = String;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        parse::parse(&source)
    }
}

impl Expr {
    pub fn column(name: &str) -> Self {
        Expr::Column(name.to_string())
    }

    pub fn binary(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate against one row. Only tiered lookups (directly or through a
    /// select branch) can produce `Expected::Undefined`.
    pub fn evaluate(&self, row: &Row) -> Result<Expected, RowError> {
        match self {
            Expr::Tiered(tiered) => tiered.lookup(row),
            Expr::Select { left, cmp, right, then, otherwise } => {
                if cmp.apply(left.number(row)?, right.number(row)?) {
                    then.evaluate(row)
                } else {
                    otherwise.evaluate(row)
                }
            }
            _ => self.number(row).map(Expected::Value),
        }
    }

    fn number(&self, row: &Row) -> Result<f64, RowError> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Column(name) => match resolve(row, name) {
                Scalar::Number(n) => n,
                Scalar::Text(text) => {
                    return Err(RowError::NotNumeric {
                        column: name.clone(),
                        value: text,
                    })
                }
                Scalar::Missing => 0.0,
            },
            Expr::Neg(inner) => -inner.number(row)?,
            Expr::Percent(inner) => inner.number(row)? / 100.0,
            Expr::Binary { op, left, right } => {
                let l = left.number(row)?;
                let r = right.number(row)?;
                match op {
                    ArithOp::Add => l + r,
                    ArithOp::Sub => l - r,
                    ArithOp::Mul => l * r,
                    ArithOp::Div => {
                        if r == 0.0 {
                            return Err(RowError::DivisionByZero { expr: self.to_string() });
                        }
                        l / r
                    }
                }
            }
            Expr::Extremum { kind, args } => {
                let mut best: Option<f64> = None;
                for arg in args {
                    let v = arg.number(row)?;
                    best = Some(match (best, kind) {
                        (None, _) => v,
                        (Some(b), Extremum::Max) => b.max(v),
                        (Some(b), Extremum::Min) => b.min(v),
                    });
                }
                best.unwrap_or(0.0)
            }
            Expr::Select { left, cmp, right, then, otherwise } => {
                if cmp.apply(left.number(row)?, right.number(row)?) {
                    then.number(row)?
                } else {
                    otherwise.number(row)?
                }
            }
            Expr::Tiered(tiered) => match tiered.lookup(row)? {
                Expected::Value(v) => v,
                Expected::Undefined => {
                    return Err(RowError::UndefinedOperand { expr: self.to_string() })
                }
            },
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(RowError::NonFinite { expr: self.to_string() })
        }
    }

    /// Columns this formula reads, in first-reference order.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Neg(inner) | Expr::Percent(inner) => inner.collect_columns(out),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Extremum { args, .. } => args.iter().for_each(|a| a.collect_columns(out)),
            Expr::Select { left, right, then, otherwise, .. } => {
                for e in [left, right, then, otherwise] {
                    e.collect_columns(out);
                }
            }
            Expr::Tiered(tiered) => {
                if !out.contains(&tiered.key.as_str()) {
                    out.push(&tiered.key);
                }
                tiered.threshold.collect_columns(out);
            }
        }
    }

    fn write_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", Scalar::Number(*n)),
            Expr::Column(name) => write!(f, "[{name}]"),
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.write_prec(f, 3)
            }
            Expr::Percent(inner) => {
                inner.write_prec(f, 4)?;
                write!(f, "%")
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                if prec < parent {
                    write!(f, "(")?;
                }
                left.write_prec(f, prec)?;
                write!(f, " {} ", op.symbol())?;
                // Right operand of - and / binds tighter to keep a - (b - c) intact.
                right.write_prec(f, prec + 1)?;
                if prec < parent {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Extremum { kind, args } => {
                write!(f, "{}(", if *kind == Extremum::Max { "max" } else { "min" })?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.write_prec(f, 0)?;
                }
                write!(f, ")")
            }
            Expr::Select { left, cmp, right, then, otherwise } => {
                write!(f, "if({left} {} {right}, {then}, {otherwise})", cmp.symbol())
            }
            Expr::Tiered(tiered) => write!(f, "tiered([{}], {})", tiered.key, tiered.threshold),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_prec(f, 0)
    }
}
