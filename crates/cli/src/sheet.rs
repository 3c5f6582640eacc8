//! CSV sheet ingestion: header detection, normalization, period selection.

use std::path::Path;

use mischeck_recon::{Dataset, Row, Scalar};

use crate::exit_codes::{EXIT_PARSE, EXIT_PERIOD};
use crate::CliError;

#[derive(Debug, Clone)]
pub struct SheetOptions {
    pub header_row: usize,
    pub period_column: String,
    pub date_column: String,
}

/// A whole exported sheet, before period filtering.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// 1-based sheet line of the header.
    pub header_line: usize,
    period_column: String,
}

/// Result of narrowing a sheet to one reporting period.
#[derive(Debug)]
pub enum PeriodSelection {
    Selected { period: String, dataset: Dataset },
    /// The sheet has no period column; nothing to review.
    NoPeriodColumn,
}

pub fn read_sheet(path: &Path, opts: &SheetOptions) -> Result<Sheet, CliError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    parse_sheet(&data, opts).map_err(|mut e| {
        e.message = format!("{}: {}", path.display(), e.message);
        e
    })
}

pub fn parse_sheet(data: &str, opts: &SheetOptions) -> Result<Sheet, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut records = reader.records();
    for skipped in 0..opts.header_row {
        match records.next() {
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(CliError::parse(format!("line {}: {e}", skipped + 1))),
            None => {
                return Err(CliError::parse(format!(
                    "header row {} is past the end of the sheet",
                    opts.header_row
                )))
            }
        }
    }

    let header = match records.next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(CliError::parse(format!("header: {e}"))),
        None => {
            return Err(CliError::parse(format!(
                "header row {} is past the end of the sheet",
                opts.header_row
            )))
        }
    };
    let columns: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
    // The reader drops empty lines, so positions come from the record itself.
    let header_line = header.position().map_or(opts.header_row as u64 + 1, |p| p.line());
    let mut last_line = header_line;

    let keep_case = |column: &str| column == opts.date_column || column == opts.period_column;

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| CliError::parse(format!("after line {last_line}: {e}")))?;
        last_line = record.position().map_or(last_line + 1, |p| p.line());
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let values = columns
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, cell)| {
                let value = match Scalar::from_cell(cell) {
                    Scalar::Text(text) if !keep_case(name.as_str()) => Scalar::Text(text.to_lowercase()),
                    other => other,
                };
                (name.clone(), value)
            });
        rows.push(Row::new((last_line - header_line) as usize, values));
    }

    Ok(Sheet {
        columns,
        rows,
        header_line: header_line as usize,
        period_column: opts.period_column.clone(),
    })
}

impl Sheet {
    /// Row numbers in reports count sheet lines, 1-based.
    pub fn row_offset(&self) -> usize {
        self.header_line
    }

    /// Distinct periods in first-seen order, `None` without a period column.
    pub fn periods(&self) -> Option<Vec<String>> {
        if !self.columns.iter().any(|c| c == &self.period_column) {
            return None;
        }
        let mut seen: Vec<String> = Vec::new();
        for row in &self.rows {
            let value = row.raw(&self.period_column);
            if value.is_missing() {
                continue;
            }
            let label = value.to_string();
            if !seen.iter().any(|p| p.eq_ignore_ascii_case(&label)) {
                seen.push(label);
            }
        }
        Some(seen)
    }

    /// Keep the rows of one period. Without a requested period the sheet must
    /// hold exactly one.
    pub fn select_period(self, requested: Option<&str>) -> Result<PeriodSelection, CliError> {
        let Some(periods) = self.periods() else {
            return Ok(PeriodSelection::NoPeriodColumn);
        };

        let period = match requested {
            Some(want) => periods
                .iter()
                .find(|p| p.eq_ignore_ascii_case(want.trim()))
                .cloned()
                .ok_or_else(|| CliError {
                    code: EXIT_PERIOD,
                    message: format!("period '{want}' not found in column '{}'", self.period_column),
                    hint: Some(format!("available: {}", periods.join(", "))),
                })?,
            None => match periods.as_slice() {
                [only] => only.clone(),
                [] => {
                    return Err(CliError {
                        code: EXIT_PERIOD,
                        message: format!("column '{}' holds no periods", self.period_column),
                        hint: None,
                    })
                }
                _ => {
                    return Err(CliError {
                        code: EXIT_PERIOD,
                        message: format!("sheet holds {} periods; choose one", periods.len()),
                        hint: Some(format!("use --period with one of: {}", periods.join(", "))),
                    })
                }
            },
        };

        let row_offset = self.row_offset();
        let period_column = self.period_column;
        let rows = self
            .rows
            .into_iter()
            .filter(|row| row.raw(&period_column).to_string().eq_ignore_ascii_case(&period))
            .collect();
        log::debug!("period '{period}' selected");

        Ok(PeriodSelection::Selected {
            period,
            dataset: Dataset::new(self.columns, rows).with_row_offset(row_offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SheetOptions {
        SheetOptions {
            header_row: 1,
            period_column: "month".into(),
            date_column: "date".into(),
        }
    }

    const SHEET: &str = "\
Waters Tuck Shop MIS,,,,
 Date , Month ,Order Type,Wallet,Total Sale AI
01-Mar-2024,Mar-24,Regular,100,100
,,,,
02-Mar-2024,Mar-24,REGULAR ,nan,120
01-Apr-2024,Apr-24,event,50,
";

    #[test]
    fn normalizes_headers_and_text() {
        let sheet = parse_sheet(SHEET, &opts()).unwrap();
        assert_eq!(sheet.columns, vec!["date", "month", "order type", "wallet", "total sale ai"]);
        assert_eq!(sheet.rows.len(), 3);
        let first = &sheet.rows[0];
        assert_eq!(first.position, 1);
        assert_eq!(first.raw("date"), Scalar::from("01-Mar-2024"));
        assert_eq!(first.raw("month"), Scalar::from("Mar-24"));
        assert_eq!(first.raw("order type"), Scalar::from("regular"));
        assert_eq!(first.raw("wallet"), Scalar::Number(100.0));

        let second = &sheet.rows[1];
        assert_eq!(second.position, 3);
        assert_eq!(second.raw("order type"), Scalar::from("regular"));
        assert_eq!(second.raw("wallet"), Scalar::Missing);
    }

    #[test]
    fn lists_periods_in_order() {
        let sheet = parse_sheet(SHEET, &opts()).unwrap();
        assert_eq!(sheet.periods(), Some(vec!["Mar-24".to_string(), "Apr-24".to_string()]));
    }

    #[test]
    fn selects_requested_period() {
        let sheet = parse_sheet(SHEET, &opts()).unwrap();
        let PeriodSelection::Selected { period, dataset } = sheet.select_period(Some("mar-24")).unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(period, "Mar-24");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.row_offset, 2);
        assert_eq!(dataset.row_number(&dataset.rows[1]), 5);
    }

    #[test]
    fn several_periods_need_a_choice() {
        let sheet = parse_sheet(SHEET, &opts()).unwrap();
        let err = sheet.select_period(None).unwrap_err();
        assert_eq!(err.code, EXIT_PERIOD);
        assert!(err.hint.unwrap().contains("Apr-24"));
    }

    #[test]
    fn unknown_period_is_error() {
        let sheet = parse_sheet(SHEET, &opts()).unwrap();
        assert_eq!(sheet.select_period(Some("May-24")).unwrap_err().code, EXIT_PERIOD);
    }

    #[test]
    fn missing_period_column() {
        let data = "title\ndate,wallet\n01-03,5\n";
        let sheet = parse_sheet(data, &opts()).unwrap();
        assert!(sheet.periods().is_none());
        assert!(matches!(sheet.select_period(None).unwrap(), PeriodSelection::NoPeriodColumn));
    }

    #[test]
    fn empty_lines_keep_sheet_line_numbers() {
        let data = "\
Waters Tuck Shop MIS

Date,Month,Wallet
01-Mar-2024,Mar-24,100

02-Mar-2024,Mar-24,120
";
        let sheet = parse_sheet(data, &opts()).unwrap();
        assert_eq!(sheet.header_line, 3);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].raw("wallet"), Scalar::Number(120.0));

        let PeriodSelection::Selected { dataset, .. } = sheet.select_period(None).unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(dataset.row_number(&dataset.rows[0]), 4);
        assert_eq!(dataset.row_number(&dataset.rows[1]), 6);
    }

    #[test]
    fn header_past_end() {
        let err = parse_sheet("only one line\n", &opts()).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE);
    }
}
