use crate::config::{CatalogConfig, OrdersConfig};
use crate::models::frame::{column_cells, frame_from_columns};
use crate::models::{Cell, FieldPair};
use anyhow::{Context, Result};
use polars::prelude::*;

pub const DR_REF_COLUMN: &str = "ref_no (주문번호)";
pub const DR_CODE_COLUMN: &str = "하이브 상품코드";
pub const DR_NAME_COLUMN: &str = "상품명";
pub const DR_QUANTITY_COLUMN: &str = "수량";
pub const DR_BARCODE_COLUMN: &str = "바코드";

pub const DR_COLUMNS: [&str; 5] = [
    DR_REF_COLUMN,
    DR_CODE_COLUMN,
    DR_NAME_COLUMN,
    DR_QUANTITY_COLUMN,
    DR_BARCODE_COLUMN,
];

/// Builds the shipment-request (DR) sheet from the normalized order table.
pub struct TableAssembler {
    order_no_column: String,
    item_name_column: String,
    quantity_column: String,
}

impl TableAssembler {
    pub fn new(orders: &OrdersConfig) -> Self {
        TableAssembler {
            order_no_column: orders.order_no_column.clone(),
            item_name_column: orders.item_name_column.clone(),
            quantity_column: orders.quantity_column.clone(),
        }
    }

    /// Reference, raw item name and quantity come straight from the orders;
    /// product code and barcode start empty until the catalog pass fills them.
    pub fn assemble(&self, orders: &DataFrame) -> Result<DataFrame> {
        let references = column_cells(orders, &self.order_no_column)?;
        let names = column_cells(orders, &self.item_name_column)?;
        let quantities = column_cells(orders, &self.quantity_column)?;
        let blank = vec![Cell::Empty; orders.height()];

        frame_from_columns(vec![
            (DR_REF_COLUMN.to_string(), references),
            (DR_CODE_COLUMN.to_string(), blank.clone()),
            (DR_NAME_COLUMN.to_string(), names),
            (DR_QUANTITY_COLUMN.to_string(), quantities),
            (DR_BARCODE_COLUMN.to_string(), blank),
        ])
        .context("Failed to assemble DR table")
    }

    /// DR column <- catalog column pairs. The name pair replaces the order's
    /// own item name with the catalog listing name.
    pub fn catalog_fields(catalog: &CatalogConfig) -> Vec<FieldPair> {
        vec![
            FieldPair::new(DR_CODE_COLUMN, catalog.code_column.as_str()),
            FieldPair::new(DR_BARCODE_COLUMN, catalog.barcode_column.as_str()),
            FieldPair::new(DR_NAME_COLUMN, catalog.name_column.as_str()),
        ]
    }
}
