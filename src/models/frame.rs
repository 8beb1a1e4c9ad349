use super::data_models::Cell;
use anyhow::{Context, Result, bail};
use polars::prelude::*;

/// Read a named column as cells.
pub fn column_cells(df: &DataFrame, name: &str) -> Result<Vec<Cell>> {
    let column = df
        .column(name)
        .with_context(|| format!("Missing column '{}'", name))?;
    cells_from_column(column)
}

/// Read a named column as cells, or an all-empty column when it does not exist.
pub fn column_cells_or_empty(df: &DataFrame, name: &str) -> Result<Vec<Cell>> {
    if df.column(name).is_ok() {
        column_cells(df, name)
    } else {
        Ok(vec![Cell::Empty; df.height()])
    }
}

// Fields of the struct column that holds a column of mixed cell kinds. Each
// row has at most one non-null field.
const NUMBER_FIELD: &str = "number";
const TEXT_FIELD: &str = "text";
const BOOL_FIELD: &str = "bool";
const DATETIME_FIELD: &str = "datetime";
const DURATION_FIELD: &str = "duration";

pub fn cells_from_column(column: &Column) -> Result<Vec<Cell>> {
    let cells = match column.dtype() {
        DataType::String => text_cells(column.as_materialized_series())?,
        DataType::Float64 => float_cells(column.as_materialized_series(), Cell::Number)?,
        DataType::Boolean => bool_cells(column.as_materialized_series())?,
        DataType::Null => vec![Cell::Empty; column.len()],
        DataType::Struct(_) => struct_cells(column)?,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32 => {
            let floats = column.cast(&DataType::Float64)?;
            float_cells(floats.as_materialized_series(), Cell::Number)?
        }
        _ => {
            let strings = column.cast(&DataType::String)?;
            text_cells(strings.as_materialized_series())?
        }
    };

    Ok(cells)
}

fn text_cells(series: &Series) -> Result<Vec<Cell>> {
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map_or(Cell::Empty, |s| Cell::Text(s.to_string())))
        .collect())
}

fn float_cells(series: &Series, kind: fn(f64) -> Cell) -> Result<Vec<Cell>> {
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.map_or(Cell::Empty, kind))
        .collect())
}

fn bool_cells(series: &Series) -> Result<Vec<Cell>> {
    Ok(series
        .bool()?
        .into_iter()
        .map(|v| v.map_or(Cell::Empty, Cell::Bool))
        .collect())
}

fn struct_cells(column: &Column) -> Result<Vec<Cell>> {
    let mut cells = vec![Cell::Empty; column.len()];

    for field in column.struct_()?.fields_as_series() {
        let values = match field.name().as_str() {
            NUMBER_FIELD => float_cells(&field, Cell::Number)?,
            TEXT_FIELD => text_cells(&field)?,
            BOOL_FIELD => bool_cells(&field)?,
            DATETIME_FIELD => float_cells(&field, Cell::DateTime)?,
            DURATION_FIELD => float_cells(&field, Cell::Duration)?,
            other => bail!("Unexpected field '{}' in column '{}'", other, column.name()),
        };

        for (cell, value) in cells.iter_mut().zip(values) {
            if cell.is_missing() {
                *cell = value;
            }
        }
    }

    Ok(cells)
}

/// Build a series from cells.
///
/// A column holding one kind of cell becomes `Float64`, `String` or
/// `Boolean`. Anything else (mixed kinds, dates, durations) becomes a struct
/// column with one field per kind, so every cell keeps its type.
pub fn cells_to_series(name: &str, cells: &[Cell]) -> Result<Series> {
    let has = |kind: fn(&Cell) -> bool| cells.iter().any(kind);
    let numbers = has(|c| matches!(c, Cell::Number(_)));
    let texts = has(|c| matches!(c, Cell::Text(_)));
    let bools = has(|c| matches!(c, Cell::Bool(_)));
    let temporal = has(|c| matches!(c, Cell::DateTime(_) | Cell::Duration(_)));

    let series = match (numbers, texts, bools, temporal) {
        (true, false, false, false) => number_series(name, cells, |c| match c {
            Cell::Number(n) => Some(*n),
            _ => None,
        }),
        (false, _, false, false) => Series::new(
            name.into(),
            cells.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        ),
        (false, false, true, false) => bool_series(name, cells),
        _ => typed_struct_series(name, cells)?,
    };

    Ok(series)
}

fn number_series(name: &str, cells: &[Cell], pick: fn(&Cell) -> Option<f64>) -> Series {
    Series::new(name.into(), cells.iter().map(pick).collect::<Vec<_>>())
}

fn bool_series(name: &str, cells: &[Cell]) -> Series {
    let values: Vec<Option<bool>> = cells
        .iter()
        .map(|c| match c {
            Cell::Bool(b) => Some(*b),
            _ => None,
        })
        .collect();
    Series::new(name.into(), values)
}

fn typed_struct_series(name: &str, cells: &[Cell]) -> Result<Series> {
    let texts: Vec<Option<&str>> = cells.iter().map(|c| c.as_str()).collect();
    let fields = [
        number_series(NUMBER_FIELD, cells, |c| match c {
            Cell::Number(n) => Some(*n),
            _ => None,
        }),
        Series::new(TEXT_FIELD.into(), texts),
        bool_series(BOOL_FIELD, cells),
        number_series(DATETIME_FIELD, cells, |c| match c {
            Cell::DateTime(serial) => Some(*serial),
            _ => None,
        }),
        number_series(DURATION_FIELD, cells, |c| match c {
            Cell::Duration(serial) => Some(*serial),
            _ => None,
        }),
    ];

    let chunked = StructChunked::from_series(name.into(), cells.len(), fields.iter())
        .with_context(|| format!("Failed to build column '{}'", name))?;
    Ok(chunked.into_series())
}

/// Replace (or append) a column with the given cells.
pub fn set_column_cells(df: &mut DataFrame, name: &str, cells: &[Cell]) -> Result<()> {
    df.with_column(cells_to_series(name, cells)?)
        .with_context(|| format!("Failed to write column '{}'", name))?;
    Ok(())
}

/// Assemble a frame from named cell columns, preserving their order.
pub fn frame_from_columns(columns: Vec<(String, Vec<Cell>)>) -> Result<DataFrame> {
    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }

    let columns = columns
        .iter()
        .map(|(name, cells)| Ok(cells_to_series(name, cells)?.into()))
        .collect::<Result<Vec<Column>>>()?;

    DataFrame::new(columns).context("Failed to create DataFrame")
}

/// All cells of the frame, grouped per row.
pub fn frame_rows(df: &DataFrame) -> Result<Vec<Vec<Cell>>> {
    let columns = df
        .get_columns()
        .iter()
        .map(cells_from_column)
        .collect::<Result<Vec<_>>>()?;

    let rows = (0..df.height())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect();

    Ok(rows)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}
