use crate::models::Cell;
use crate::models::frame::cells_from_column;
use anyhow::{Context, Result};
use polars::prelude::*;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::Path;

/// Serialize a frame into an in-memory `.xlsx` workbook with a bold header row.
pub fn workbook_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(df)?;
    workbook
        .save_to_buffer()
        .context("Failed to serialize workbook")
}

pub fn write_workbook(df: &DataFrame, path: &Path) -> Result<()> {
    let mut workbook = build_workbook(df)?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook: {}", path.display()))
}

fn build_workbook(df: &DataFrame) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let duration_format = Format::new().set_num_format("[h]:mm:ss");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Sheet1")?;

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = u16::try_from(col_idx).context("Too many columns for a worksheet")?;
        worksheet.write_string_with_format(0, col, column.name().as_str(), &header)?;

        for (row_idx, cell) in cells_from_column(column)?.iter().enumerate() {
            let row = u32::try_from(row_idx + 1).context("Too many rows for a worksheet")?;
            match cell {
                Cell::Empty => {}
                Cell::Number(n) if n.is_finite() => {
                    worksheet.write_number(row, col, *n)?;
                }
                Cell::Number(n) => {
                    worksheet.write_string(row, col, n.to_string())?;
                }
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Cell::DateTime(serial) => match ExcelDateTime::from_serial_datetime(*serial) {
                    Ok(datetime) => {
                        worksheet.write_datetime_with_format(row, col, datetime, &datetime_format)?;
                    }
                    Err(_) => {
                        worksheet.write_number(row, col, *serial)?;
                    }
                },
                Cell::Duration(serial) => {
                    worksheet.write_number_with_format(row, col, *serial, &duration_format)?;
                }
            }
        }
    }

    Ok(workbook)
}
