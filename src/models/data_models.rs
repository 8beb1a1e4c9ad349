use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Row index in the source table -> row index in the target table.
///
/// Built once per matching pass. A source row without an entry had no
/// candidate above the threshold.
pub type MatchMapping = BTreeMap<usize, usize>;

/// A single spreadsheet cell as loaded from a workbook.
///
/// Dates and durations keep their Excel serial value so they can be written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(f64),
    Duration(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Borrow the cell as text, only when it actually holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell the way a spreadsheet user would read it.
    /// Missing cells render as `None`.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(render_number(*n)),
            Cell::Text(s) => Some(s.clone()),
            Cell::Bool(true) => Some("True".to_string()),
            Cell::Bool(false) => Some("False".to_string()),
            Cell::DateTime(serial) => Some(render_datetime(*serial)),
            Cell::Duration(serial) => Some(render_duration(*serial)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

/// Format a number without a trailing `.0` when it is integer-valued.
pub fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Excel serial date as `YYYY-MM-DD HH:MM:SS` (1900 date system).
pub fn render_datetime(serial: f64) -> String {
    let seconds = (serial * SECONDS_PER_DAY).round();
    let datetime = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.and_hms_opt(0, 0, 0))
        .zip(TimeDelta::try_seconds(seconds as i64))
        .and_then(|(epoch, offset)| epoch.checked_add_signed(offset));

    match datetime {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => render_number(serial),
    }
}

/// Excel serial duration as `H:MM:SS`, hours unbounded.
pub fn render_duration(serial: f64) -> String {
    let total = (serial * SECONDS_PER_DAY).round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        total % 3600 / 60,
        total % 60
    )
}

/// One `target <- source` column copy used by the field propagator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPair {
    pub target: String,
    pub source: String,
}

impl FieldPair {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// A column that is overwritten with a fixed value on substantive rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedOverride {
    pub column: String,
    pub value: String,
}

impl FixedOverride {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}
