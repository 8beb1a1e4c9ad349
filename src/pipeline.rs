use crate::config::AppConfig;
use crate::models::FieldPair;
use crate::models::frame::column_cells;
use crate::processor::{
    DR_NAME_COLUMN, FieldPropagator, RuleNormalizer, SimilarityMatcher, TableAssembler,
    TextNormalizer,
};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

const DR_PREVIEW_ROWS: usize = 5;

/// Both sheets produced by a run.
pub struct PipelineOutput {
    pub orders: DataFrame,
    pub dr: DataFrame,
    pub order_matches: usize,
    pub dr_matches: usize,
}

impl PipelineOutput {
    /// The first rows of the DR sheet, for a quick look after a run.
    pub fn dr_preview(&self) -> DataFrame {
        self.dr.head(Some(DR_PREVIEW_ROWS))
    }
}

/// Catalog matching, enrichment and DR assembly for one order export.
pub struct DrPipeline {
    config: AppConfig,
    text_normalizer: TextNormalizer,
    matcher: SimilarityMatcher,
    propagator: FieldPropagator,
    rule_normalizer: RuleNormalizer,
    assembler: TableAssembler,
}

impl DrPipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        Ok(DrPipeline {
            text_normalizer: TextNormalizer::new()?,
            matcher: SimilarityMatcher::new(config.matching.threshold),
            propagator: FieldPropagator,
            rule_normalizer: RuleNormalizer::new(&config.orders)?,
            assembler: TableAssembler::new(&config.orders),
            config,
        })
    }

    pub fn run(&self, catalog: &DataFrame, orders: DataFrame) -> Result<PipelineOutput> {
        let catalog_keys = self.catalog_keys(catalog)?;
        info!(
            "Matching {} order rows against {} catalog rows",
            orders.height(),
            catalog_keys.len()
        );

        // 1) Orders -> catalog
        let order_keys = self.name_keys(&orders, &self.config.orders.item_name_column)?;
        let order_mapping = self.matcher.match_items(&order_keys, &catalog_keys);
        info!(
            "Matched {} of {} order rows to the catalog",
            order_mapping.len(),
            orders.height()
        );

        let mut updated = orders;
        self.propagator
            .propagate(&order_mapping, catalog, &mut updated, &self.order_fields())
            .context("Failed to copy catalog fields into the order table")?;

        // 2) Fixed-format rules
        self.rule_normalizer.normalize_dataframe(&mut updated)?;
        info!("Applied normalization rules");

        // 3) DR sheet
        let mut dr = self.assembler.assemble(&updated)?;
        let dr_keys = self.name_keys(&dr, DR_NAME_COLUMN)?;
        let dr_mapping = self.matcher.match_items(&dr_keys, &catalog_keys);
        self.propagator
            .propagate(
                &dr_mapping,
                catalog,
                &mut dr,
                &TableAssembler::catalog_fields(&self.config.catalog),
            )
            .context("Failed to copy catalog fields into the DR table")?;
        info!("🎉 DR table built with {} rows ({} matched)", dr.height(), dr_mapping.len());

        Ok(PipelineOutput {
            orders: updated,
            dr,
            order_matches: order_mapping.len(),
            dr_matches: dr_mapping.len(),
        })
    }

    /// Comparison keys for the catalog names. An empty catalog (no columns)
    /// has no keys.
    pub fn catalog_keys(&self, catalog: &DataFrame) -> Result<Vec<String>> {
        if catalog.width() == 0 {
            return Ok(Vec::new());
        }
        self.name_keys(catalog, &self.config.catalog.name_column)
    }

    fn name_keys(&self, df: &DataFrame, column: &str) -> Result<Vec<String>> {
        let names = column_cells(df, column)?;
        Ok(self.text_normalizer.normalize_cells(&names))
    }

    fn order_fields(&self) -> Vec<FieldPair> {
        let catalog = &self.config.catalog;
        vec![
            FieldPair::new(catalog.url_column.as_str(), catalog.url_column.as_str()),
            FieldPair::new(catalog.price_column.as_str(), catalog.price_column.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::models::frame::frame_from_columns;
    use crate::processor::{
        DR_BARCODE_COLUMN, DR_CODE_COLUMN, DR_QUANTITY_COLUMN, DR_REF_COLUMN,
    };

    fn catalog(names: &[&str]) -> DataFrame {
        let config = AppConfig::default().catalog;
        let n = names.len();
        frame_from_columns(vec![
            (
                config.name_column.clone(),
                names.iter().map(|s| Cell::text(*s)).collect(),
            ),
            (
                config.url_column.clone(),
                (0..n).map(|i| Cell::Text(format!("https://mall/{}", i))).collect(),
            ),
            (
                config.price_column.clone(),
                (0..n).map(|i| Cell::Number(1000.0 + i as f64)).collect(),
            ),
            (
                config.code_column.clone(),
                (0..n).map(|i| Cell::Text(format!("P{}", i + 1))).collect(),
            ),
            (
                config.barcode_column.clone(),
                (0..n).map(|i| Cell::Text(format!("B{}", i + 1))).collect(),
            ),
        ])
        .unwrap()
    }

    fn orders(names: Vec<Cell>, quantities: Vec<Cell>) -> DataFrame {
        let config = AppConfig::default().orders;
        let n = names.len();
        frame_from_columns(vec![
            (
                config.order_no_column.clone(),
                (0..n).map(|i| Cell::Number(12345.0 + i as f64)).collect(),
            ),
            (config.item_name_column.clone(), names),
            (config.quantity_column.clone(), quantities),
            (config.address_column.clone(), vec![Cell::text("大阪[注]市"); n]),
            (config.postal_column.clone(), vec![Cell::Number(123456.0); n]),
        ])
        .unwrap()
    }

    #[test]
    fn test_end_to_end_single_product() {
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let catalog = catalog(&["Premium Red Lipstick #001セット"]);
        let before = catalog.clone();
        let orders = orders(
            vec![Cell::text("Premium Red Lipstick #001セット【送料無料】")],
            vec![Cell::Number(2.0)],
        );

        let output = pipeline.run(&catalog, orders).unwrap();
        assert_eq!(output.order_matches, 1);
        assert_eq!(output.dr_matches, 1);
        assert!(catalog.equals_missing(&before));

        let dr = &output.dr;
        assert_eq!(dr.height(), 1);
        assert_eq!(column_cells(dr, DR_CODE_COLUMN).unwrap(), vec![Cell::text("P1")]);
        assert_eq!(column_cells(dr, DR_BARCODE_COLUMN).unwrap(), vec![Cell::text("B1")]);
        assert_eq!(column_cells(dr, DR_QUANTITY_COLUMN).unwrap(), vec![Cell::Number(2.0)]);
        assert_eq!(
            column_cells(dr, DR_NAME_COLUMN).unwrap(),
            vec![Cell::text("Premium Red Lipstick #001セット")]
        );
        assert_eq!(column_cells(dr, DR_REF_COLUMN).unwrap(), vec![Cell::text("8612345")]);

        let config = AppConfig::default();
        let updated = &output.orders;
        assert_eq!(
            column_cells(updated, &config.catalog.url_column).unwrap(),
            vec![Cell::text("https://mall/0")]
        );
        assert_eq!(
            column_cells(updated, &config.catalog.price_column).unwrap(),
            vec![Cell::Number(1000.0)]
        );
        assert_eq!(
            column_cells(updated, &config.orders.postal_column).unwrap(),
            vec![Cell::text("012-3456")]
        );
        assert_eq!(
            column_cells(updated, &config.orders.address_column).unwrap(),
            vec![Cell::text("大阪市")]
        );
        assert_eq!(column_cells(updated, "currency").unwrap(), vec![Cell::text("JPY")]);
    }

    #[test]
    fn test_fully_bracketed_name_does_not_match() {
        // The hashtag set is removed first, then the bracket pair swallows the
        // whole name, leaving an empty key.
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let catalog = catalog(&["Premium Red Lipstick #001セット"]);
        let orders = orders(
            vec![Cell::text("【Premium Red Lipstick #001セット】")],
            vec![Cell::Number(2.0)],
        );

        let output = pipeline.run(&catalog, orders).unwrap();
        assert_eq!(output.dr_matches, 0);
        assert_eq!(
            column_cells(&output.dr, DR_NAME_COLUMN).unwrap(),
            vec![Cell::text("【Premium Red Lipstick #001セット】")]
        );
        assert_eq!(column_cells(&output.dr, DR_CODE_COLUMN).unwrap(), vec![Cell::Empty]);
    }

    #[test]
    fn test_unmatched_rows_keep_raw_name() {
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let catalog = catalog(&["Velvet Lip Tint 03", "Glow Cushion 21"]);
        let orders = orders(
            vec![
                Cell::text("Glow Cushion 21 #2個セット"),
                Cell::text("zzzz"),
                Cell::Empty,
            ],
            vec![Cell::Number(1.0), Cell::Number(3.0), Cell::Number(1.0)],
        );

        let output = pipeline.run(&catalog, orders).unwrap();
        assert_eq!(output.dr_matches, 1);
        assert_eq!(
            column_cells(&output.dr, DR_NAME_COLUMN).unwrap(),
            vec![Cell::text("Glow Cushion 21"), Cell::text("zzzz"), Cell::Empty]
        );
        assert_eq!(
            column_cells(&output.dr, DR_CODE_COLUMN).unwrap(),
            vec![Cell::text("P2"), Cell::Empty, Cell::Empty]
        );

        let url_column = AppConfig::default().catalog.url_column;
        assert_eq!(
            column_cells(&output.orders, &url_column).unwrap(),
            vec![Cell::text("https://mall/1"), Cell::Empty, Cell::Empty]
        );
    }

    #[test]
    fn test_empty_catalog_produces_unmatched_output() {
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let orders = orders(vec![Cell::text("Lip Tint")], vec![Cell::Number(1.0)]);

        let output = pipeline.run(&DataFrame::empty(), orders).unwrap();
        assert_eq!(output.order_matches, 0);
        assert_eq!(output.dr.width(), 5);
        assert_eq!(
            column_cells(&output.dr, DR_BARCODE_COLUMN).unwrap(),
            vec![Cell::Empty]
        );
        let postal_column = AppConfig::default().orders.postal_column;
        assert_eq!(
            column_cells(&output.orders, &postal_column).unwrap(),
            vec![Cell::text("012-3456")]
        );
    }

    #[test]
    fn test_names_that_clean_to_empty_pair_up() {
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let catalog = catalog(&["Velvet Tint", "【セット品】"]);
        let orders = orders(vec![Cell::text("【おまけ】")], vec![Cell::Number(1.0)]);

        let output = pipeline.run(&catalog, orders).unwrap();
        assert_eq!(
            column_cells(&output.dr, DR_CODE_COLUMN).unwrap(),
            vec![Cell::text("P2")]
        );
    }

    #[test]
    fn test_numeric_names_do_not_match() {
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let catalog = catalog(&["Tint 21"]);
        let orders = orders(
            vec![Cell::text("Tint 21"), Cell::Number(21.0)],
            vec![Cell::Number(1.0), Cell::Number(1.0)],
        );

        let output = pipeline.run(&catalog, orders).unwrap();
        assert_eq!(output.dr_matches, 1);
        assert_eq!(
            column_cells(&output.dr, DR_NAME_COLUMN).unwrap(),
            vec![Cell::text("Tint 21"), Cell::Number(21.0)]
        );
        assert_eq!(
            column_cells(&output.dr, DR_CODE_COLUMN).unwrap(),
            vec![Cell::text("P1"), Cell::Empty]
        );
    }

    #[test]
    fn test_dr_preview_shows_first_rows() {
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let names: Vec<Cell> = (0..7).map(|i| Cell::Text(format!("Tint {}", i))).collect();
        let orders = orders(names, vec![Cell::Number(1.0); 7]);

        let output = pipeline.run(&catalog(&["Tint 0"]), orders).unwrap();
        let preview = output.dr_preview();
        assert_eq!(output.dr.height(), 7);
        assert_eq!(preview.height(), 5);
        assert_eq!(preview.width(), 5);
        assert_eq!(
            column_cells(&preview, DR_REF_COLUMN).unwrap()[0],
            Cell::text("8612345")
        );
    }

    #[test]
    fn test_missing_item_name_column_is_an_error() {
        let pipeline = DrPipeline::new(AppConfig::default()).unwrap();
        let orders = frame_from_columns(vec![("order_no".to_string(), vec![Cell::text("1")])]).unwrap();
        assert!(pipeline.run(&catalog(&["x"]), orders).is_err());
    }
}
