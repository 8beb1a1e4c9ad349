use crate::config::OrdersConfig;
use crate::models::frame::{column_cells, column_cells_or_empty, frame_rows, set_column_cells};
use crate::models::{Cell, FixedOverride};
use anyhow::Result;
use polars::prelude::*;
use regex::Regex;
use tracing::{debug, info};

pub const NO_POSTAL_CODE: &str = "no postal code";

const POSTAL_WIDTH: usize = 7;

/// Per-column clean-up rules applied to the order table after enrichment.
pub struct RuleNormalizer {
    order_no_column: String,
    order_prefix: String,
    overrides: Vec<FixedOverride>,
    address_column: String,
    postal_column: String,
    bracket_regex: Regex,
    postal_regex: Regex,
    digits_regex: Regex,
}

impl RuleNormalizer {
    pub fn new(config: &OrdersConfig) -> Result<Self> {
        Ok(RuleNormalizer {
            order_no_column: config.order_no_column.clone(),
            order_prefix: config.order_prefix.clone(),
            overrides: config.overrides.clone(),
            address_column: config.address_column.clone(),
            postal_column: config.postal_column.clone(),
            bracket_regex: Regex::new(r"\[.*?\]")?,
            // `\d` is any Unicode decimal digit.
            postal_regex: Regex::new(r"^\d{3}-\d{4}$")?,
            digits_regex: Regex::new(r"^\d+$")?,
        })
    }

    pub fn normalize_dataframe(&self, df: &mut DataFrame) -> Result<()> {
        // Order numbers first: the override rule counts them as populated.
        self.normalize_order_numbers(df)?;
        self.apply_fixed_overrides(df)?;
        self.strip_address_brackets(df)?;
        self.normalize_postal_codes(df)?;
        Ok(())
    }

    fn normalize_order_numbers(&self, df: &mut DataFrame) -> Result<()> {
        let prefixed: Vec<Cell> = column_cells(df, &self.order_no_column)?
            .iter()
            .map(|cell| Cell::Text(prefix_order_no(cell, &self.order_prefix)))
            .collect();

        set_column_cells(df, &self.order_no_column, &prefixed)
    }

    fn apply_fixed_overrides(&self, df: &mut DataFrame) -> Result<()> {
        let substantive: Vec<bool> = frame_rows(df)?
            .iter()
            .map(|row| row_is_substantive(row))
            .collect();

        let sparse_rows = substantive.iter().filter(|s| !**s).count();
        if sparse_rows > 0 {
            info!("Leaving defaults unset on {} sparse rows", sparse_rows);
        }

        for rule in &self.overrides {
            let cells: Vec<Cell> = column_cells_or_empty(df, &rule.column)?
                .into_iter()
                .zip(substantive.iter())
                .map(|(cell, is_substantive)| {
                    if *is_substantive {
                        Cell::text(rule.value.as_str())
                    } else {
                        cell
                    }
                })
                .collect();

            set_column_cells(df, &rule.column, &cells)?;
            debug!("Applied fixed value '{}' to '{}'", rule.value, rule.column);
        }

        Ok(())
    }

    fn strip_address_brackets(&self, df: &mut DataFrame) -> Result<()> {
        let stripped: Vec<Cell> = column_cells(df, &self.address_column)?
            .into_iter()
            .map(|cell| self.strip_brackets(cell))
            .collect();

        set_column_cells(df, &self.address_column, &stripped)
    }

    fn normalize_postal_codes(&self, df: &mut DataFrame) -> Result<()> {
        let formatted: Vec<Cell> = column_cells(df, &self.postal_column)?
            .iter()
            .map(|cell| Cell::Text(self.format_postal(cell)))
            .collect();

        let missing = formatted
            .iter()
            .filter(|c| c.as_str() == Some(NO_POSTAL_CODE))
            .count();
        if missing > 0 {
            info!("{} rows have no usable postal code", missing);
        }

        set_column_cells(df, &self.postal_column, &formatted)
    }

    /// Remove every `[...]` annotation. Non-text cells pass through.
    pub fn strip_brackets(&self, cell: Cell) -> Cell {
        match cell {
            Cell::Text(text) => Cell::Text(self.bracket_regex.replace_all(&text, "").into_owned()),
            other => other,
        }
    }

    /// Canonical `ddd-dddd` postal code, or [`NO_POSTAL_CODE`].
    ///
    /// Text already in `ddd-dddd` form is kept (trimmed). Numbers lose their
    /// fraction and flags count as `1`/`0`. Text is then left-padded with zeros
    /// to seven characters and split when it is seven digits. Dates never
    /// qualify. Digits are Unicode decimal digits; superscripts and other
    /// digit-like symbols are not accepted.
    pub fn format_postal(&self, cell: &Cell) -> String {
        let raw = match cell {
            Cell::Empty | Cell::DateTime(_) | Cell::Duration(_) => {
                return NO_POSTAL_CODE.to_string();
            }
            Cell::Text(text) => {
                let trimmed = text.trim();
                if self.postal_regex.is_match(trimmed) {
                    return trimmed.to_string();
                }
                text.clone()
            }
            Cell::Number(n) if n.is_finite() => format!("{}", n.trunc() as i64),
            Cell::Number(_) => return NO_POSTAL_CODE.to_string(),
            Cell::Bool(b) => u8::from(*b).to_string(),
        };

        let padded = zero_pad(&raw, POSTAL_WIDTH);
        if padded.chars().count() == POSTAL_WIDTH && self.digits_regex.is_match(&padded) {
            let split = padded
                .char_indices()
                .nth(3)
                .map_or(padded.len(), |(idx, _)| idx);
            return format!("{}-{}", &padded[..split], &padded[split..]);
        }

        NO_POSTAL_CODE.to_string()
    }
}

/// Render the order number as text and make sure it carries `prefix`.
pub fn prefix_order_no(cell: &Cell, prefix: &str) -> String {
    let text = cell.render().unwrap_or_default();
    if text.starts_with(prefix) {
        text
    } else {
        format!("{}{}", prefix, text)
    }
}

/// A row counts as substantive when more than one of its cells is populated.
///
/// This looks at the whole row, not at the columns being defaulted, so a row
/// holding a single value never receives the fixed defaults even when that
/// value has nothing to do with them. That is probably not what operators
/// expect, but it is the established behavior of the sheet.
pub fn row_is_substantive(row: &[Cell]) -> bool {
    row.iter().filter(|cell| !cell.is_missing()).count() > 1
}

/// Left-pad with zeros to `width` characters, keeping a leading sign first.
fn zero_pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }

    let fill = "0".repeat(width - len);
    match text.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, fill, &text[sign.len_utf8()..]),
        _ => format!("{}{}", fill, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::frame::frame_from_columns;

    fn normalizer() -> RuleNormalizer {
        RuleNormalizer::new(&OrdersConfig::default()).unwrap()
    }

    #[test]
    fn test_format_postal() {
        let n = normalizer();
        assert_eq!(n.format_postal(&Cell::Number(1234567.0)), "123-4567");
        assert_eq!(n.format_postal(&Cell::Number(123456.0)), "012-3456");
        assert_eq!(n.format_postal(&Cell::text("123-4567")), "123-4567");
        assert_eq!(n.format_postal(&Cell::text(" 123-4567 ")), "123-4567");
        assert_eq!(n.format_postal(&Cell::Empty), NO_POSTAL_CODE);
        assert_eq!(n.format_postal(&Cell::text("abcde")), NO_POSTAL_CODE);
    }

    #[test]
    fn test_format_postal_edge_cases() {
        let n = normalizer();
        assert_eq!(n.format_postal(&Cell::Number(1234567.9)), "123-4567");
        assert_eq!(n.format_postal(&Cell::text("123456")), "012-3456");
        assert_eq!(n.format_postal(&Cell::text("1234567")), "123-4567");
        assert_eq!(n.format_postal(&Cell::text("12345678")), NO_POSTAL_CODE);
        assert_eq!(n.format_postal(&Cell::text("123 4567")), NO_POSTAL_CODE);
        assert_eq!(n.format_postal(&Cell::text("-12345")), NO_POSTAL_CODE);
        assert_eq!(n.format_postal(&Cell::Number(f64::NAN)), NO_POSTAL_CODE);
        assert_eq!(n.format_postal(&Cell::text("１２３-４５６７")), "１２３-４５６７");
    }

    #[test]
    fn test_format_postal_other_scripts_and_types() {
        let n = normalizer();
        // Arabic-Indic and Devanagari digits are decimal digits too.
        assert_eq!(n.format_postal(&Cell::text("١٢٣-٤٥٦٧")), "١٢٣-٤٥٦٧");
        assert_eq!(n.format_postal(&Cell::text("१२३४५६७")), "१२३-४५६७");
        assert_eq!(n.format_postal(&Cell::text("¹²³⁴⁵⁶⁷")), NO_POSTAL_CODE);
        assert_eq!(n.format_postal(&Cell::Bool(true)), "000-0001");
        assert_eq!(n.format_postal(&Cell::DateTime(45581.0)), NO_POSTAL_CODE);
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad("123456", 7), "0123456");
        assert_eq!(zero_pad("-42", 5), "-0042");
        assert_eq!(zero_pad("12345678", 7), "12345678");
    }

    #[test]
    fn test_prefix_order_no() {
        assert_eq!(prefix_order_no(&Cell::text("12345"), "86"), "8612345");
        assert_eq!(prefix_order_no(&Cell::text("8612345"), "86"), "8612345");
        assert_eq!(prefix_order_no(&Cell::Number(12345.0), "86"), "8612345");
        assert_eq!(prefix_order_no(&Cell::Empty, "86"), "86");
    }

    #[test]
    fn test_row_is_substantive() {
        assert!(!row_is_substantive(&[]));
        assert!(!row_is_substantive(&[Cell::text("x"), Cell::Empty]));
        assert!(row_is_substantive(&[Cell::text("x"), Cell::Number(0.0)]));
        assert!(row_is_substantive(&[Cell::text(""), Cell::text("")]));
    }

    #[test]
    fn test_strip_brackets() {
        let n = normalizer();
        assert_eq!(
            n.strip_brackets(Cell::text("東京都[建物名なし]渋谷区[x]1-2")),
            Cell::text("東京都渋谷区1-2")
        );
        assert_eq!(n.strip_brackets(Cell::Number(7.0)), Cell::Number(7.0));
        assert_eq!(n.strip_brackets(Cell::Empty), Cell::Empty);
    }

    #[test]
    fn test_normalize_dataframe() {
        let config = OrdersConfig::default();
        let mut df = frame_from_columns(vec![
            (
                config.order_no_column.clone(),
                vec![Cell::Number(12345.0), Cell::text("8699"), Cell::Empty],
            ),
            (
                config.item_name_column.clone(),
                vec![Cell::text("Lip"), Cell::Empty, Cell::Empty],
            ),
            (
                "currency".to_string(),
                vec![Cell::text("KRW"), Cell::text("USD"), Cell::Empty],
            ),
            (
                config.address_column.clone(),
                vec![Cell::text("大阪[注]市"), Cell::Empty, Cell::Empty],
            ),
            (
                config.postal_column.clone(),
                vec![Cell::Number(5300001.0), Cell::text("530-0001"), Cell::Empty],
            ),
        ])
        .unwrap();

        RuleNormalizer::new(&config)
            .unwrap()
            .normalize_dataframe(&mut df)
            .unwrap();

        assert_eq!(
            column_cells(&df, &config.order_no_column).unwrap(),
            vec![Cell::text("8612345"), Cell::text("8699"), Cell::text("86")]
        );
        // Rows 0 and 1 have several populated cells; row 2 only its order number.
        assert_eq!(
            column_cells(&df, "currency").unwrap(),
            vec![Cell::text("JPY"), Cell::text("JPY"), Cell::Empty]
        );
        assert_eq!(
            column_cells(&df, "service code").unwrap(),
            vec![Cell::text("99"), Cell::text("99"), Cell::Empty]
        );
        assert_eq!(
            column_cells(&df, &config.address_column).unwrap(),
            vec![Cell::text("大阪市"), Cell::Empty, Cell::Empty]
        );
        assert_eq!(
            column_cells(&df, &config.postal_column).unwrap(),
            vec![
                Cell::text("530-0001"),
                Cell::text("530-0001"),
                Cell::text(NO_POSTAL_CODE)
            ]
        );
    }
}
