use crate::model::{Expected, Mismatch, Row};
use crate::value::{resolve, Scalar};

/// Compare a recomputed value with the value the sheet reports for `target`.
///
/// Equality is exact unless `tolerance` is set, in which case numbers within
/// the absolute tolerance agree. `Expected::Undefined` and text reported
/// values always mismatch.
pub fn check(
    row: &Row,
    row_number: usize,
    date_column: &str,
    target: &str,
    expected: Expected,
    tolerance: Option<f64>,
) -> Option<Mismatch> {
    let actual = resolve(row, target);
    let agrees = match (&actual, expected) {
        (Scalar::Number(a), Expected::Value(e)) => match tolerance {
            Some(tol) => (a - e).abs() <= tol,
            None => *a == e,
        },
        _ => false,
    };
    if agrees {
        return None;
    }
    Some(Mismatch {
        row_number,
        date: row.raw(date_column),
        column: target.to_string(),
        expected,
        actual,
    })
}
