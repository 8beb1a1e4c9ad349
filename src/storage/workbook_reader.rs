use crate::models::Cell;
use crate::models::frame::frame_from_columns;
use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, Xlsx, open_workbook};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Cell texts that spreadsheet exports use for "no value".
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load the first worksheet of an `.xlsx` file. The first row is the header;
/// header names are lowercased.
pub fn read_workbook(path: &Path) -> Result<DataFrame> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first_sheet = sheet_names
        .first()
        .ok_or_else(|| anyhow!("Workbook has no sheets: {}", path.display()))?;

    let range = workbook
        .worksheet_range(first_sheet)
        .with_context(|| format!("Failed to read sheet '{}' of {}", first_sheet, path.display()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        info!("Workbook {} is empty", path.display());
        return Ok(DataFrame::empty());
    };

    let header: Vec<String> = header_row.iter().map(|d| d.to_string()).collect();
    let body: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    let df = frame_from_rows(header, body)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );

    Ok(df)
}

/// Build a frame from a raw header row and body rows.
pub fn frame_from_rows(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<DataFrame> {
    let names = header_names(&header);

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells = rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect();
            (name, cells)
        })
        .collect();

    frame_from_columns(columns)
}

/// Lowercased, unique column names. Blank headers become `unnamed: N` and
/// repeats get a `.1`, `.2`, ... suffix.
fn header_names(header: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(header.len());

    for (idx, raw) in header.iter().enumerate() {
        let base = if raw.trim().is_empty() {
            format!("unnamed: {}", idx)
        } else {
            raw.to_lowercase()
        };

        let mut name = base.clone();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{}.{}", base, count);
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }

    names
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => text_cell(s),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Cell::Duration(dt.as_f64()),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
    }
}

fn text_cell(text: &str) -> Cell {
    if NA_TOKENS.contains(&text) {
        Cell::Empty
    } else {
        Cell::text(text)
    }
}
