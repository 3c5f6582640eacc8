//! Human-readable report rendering (plain text tables).

use std::fmt::Write;

use mischeck_recon::model::{AggregateValue, PivotTable};
use mischeck_recon::{Expected, ReconReport, Scalar};

/// Numbers shown to one decimal, like the review workbook.
fn num(n: f64) -> String {
    format!("{n:.1}")
}

fn scalar(value: &Scalar) -> String {
    match value {
        Scalar::Number(n) => num(*n),
        Scalar::Text(s) => s.clone(),
        Scalar::Missing => "-".to_string(),
    }
}

fn expected(value: &Expected) -> String {
    match value {
        Expected::Value(n) => num(*n),
        Expected::Undefined => "undefined".to_string(),
    }
}

/// Left-aligned columns padded to the widest cell.
fn table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<width$}", width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let _ = writeln!(out, "{}", line(headers));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", line(rule.as_slice()));
    for row in rows {
        let _ = writeln!(out, "{}", line(row.as_slice()));
    }
    out
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn render_report(report: &ReconReport, period: Option<&str>) -> String {
    let mut out = String::new();
    let sheet = report.meta.sheet.as_deref().unwrap_or(&report.meta.ruleset);
    let _ = write!(out, "{sheet} (ruleset {} v{})", report.meta.ruleset, report.meta.ruleset_version);
    if let Some(period) = period {
        let _ = write!(out, ", period {period}");
    }
    out.push_str("\n\n");

    if report.mismatches.is_empty() {
        out.push_str("No mismatches.\n");
    } else {
        out.push_str("Mismatches\n");
        let rows: Vec<Vec<String>> = report
            .mismatches
            .iter()
            .map(|m| {
                vec![
                    m.row_number.to_string(),
                    scalar(&m.date),
                    m.column.clone(),
                    expected(&m.expected),
                    scalar(&m.actual),
                ]
            })
            .collect();
        out.push_str(&table(&headers(&["Row", "Date", "Column", "Expected", "Actual"]), &rows));
    }

    if !report.failures.is_empty() {
        out.push_str("\nSkipped rows\n");
        let rows: Vec<Vec<String>> = report
            .failures
            .iter()
            .map(|f| vec![f.row_number.to_string(), f.column.clone(), f.message.clone()])
            .collect();
        out.push_str(&table(&headers(&["Row", "Column", "Error"]), &rows));
    }

    if !report.aggregates.is_empty() {
        out.push_str("\nTotals\n");
        let rows: Vec<Vec<String>> = report
            .aggregates
            .iter()
            .map(|a| {
                let value = match a.value {
                    AggregateValue::Count(n) => n.to_string(),
                    AggregateValue::Sum(s) => num(s),
                };
                vec![a.label.clone(), value]
            })
            .collect();
        out.push_str(&table(&headers(&["Metric", "Value"]), &rows));
    }

    if !report.ledger.is_empty() {
        out.push_str("\nLedger\n");
        for entry in &report.ledger {
            let fields: Vec<String> = entry
                .fields
                .iter()
                .map(|f| format!("{} = {}", f.column, scalar(&f.value)))
                .collect();
            let _ = writeln!(out, "  row {} ({}): {}", entry.row_number, scalar(&entry.date), fields.join(", "));
        }
    }

    if let Some(pivot) = &report.pivot {
        out.push_str("\nBreakdown\n");
        out.push_str(&render_pivot(pivot));
    }

    if !report.checks.is_empty() {
        out.push_str("\nFindings\n");
        for finding in &report.checks {
            let fields: Vec<String> = finding
                .fields
                .iter()
                .map(|f| format!("{} = {}", f.column, scalar(&f.value)))
                .collect();
            let _ = writeln!(
                out,
                "  {}: row {} ({}): {}",
                finding.check,
                finding.row_number,
                scalar(&finding.date),
                fields.join(", ")
            );
        }
    }

    out
}

fn render_pivot(pivot: &PivotTable) -> String {
    let mut head = pivot.group_by.clone();
    head.push(pivot.count_label.clone());
    head.extend(pivot.mean_labels.iter().cloned());

    let rows: Vec<Vec<String>> = pivot
        .rows
        .iter()
        .map(|r| {
            let mut cells = r.keys.clone();
            cells.push(r.count.to_string());
            cells.extend(r.means.iter().map(|m| m.map(num).unwrap_or_else(|| "-".to_string())));
            cells
        })
        .collect();
    table(&head, &rows)
}
