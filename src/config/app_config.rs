use crate::models::FixedOverride;
use crate::processor::DEFAULT_THRESHOLD;
use anyhow::{Context, Result, anyhow};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for one DR generation run. Every section has defaults matching
/// the RINCOS sheet layout, so a config file is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub orders: OrdersConfig,
    pub matching: MatchingConfig,
    pub output: OutputConfig,
}

/// Column layout of the product catalog ("H") workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Bundled catalog used when no other file is supplied
    pub default_path: PathBuf,
    pub name_column: String,
    pub url_column: String,
    pub price_column: String,
    pub code_column: String,
    pub barcode_column: String,
}

/// Column layout of the order export ("S") workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    pub order_no_column: String,
    pub item_name_column: String,
    pub quantity_column: String,
    pub address_column: String,
    pub postal_column: String,
    pub order_prefix: String,
    pub overrides: Vec<FixedOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub order_label: String,
    pub dr_label: String,
    pub date_format: String,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let mut config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.lowercase_columns();
        config.validate()?;

        Ok(config)
    }

    /// Workbook headers are lowercased on load, so configured names must be too.
    fn lowercase_columns(&mut self) {
        let catalog = &mut self.catalog;
        for column in [
            &mut catalog.name_column,
            &mut catalog.url_column,
            &mut catalog.price_column,
            &mut catalog.code_column,
            &mut catalog.barcode_column,
        ] {
            *column = column.to_lowercase();
        }

        let orders = &mut self.orders;
        for column in [
            &mut orders.order_no_column,
            &mut orders.item_name_column,
            &mut orders.quantity_column,
            &mut orders.address_column,
            &mut orders.postal_column,
        ] {
            *column = column.to_lowercase();
        }
        for rule in &mut orders.overrides {
            rule.column = rule.column.to_lowercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.matching.threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(anyhow!(
                "Matching threshold must be in [0, 1), got {}",
                threshold
            ));
        }

        if self.orders.order_prefix.is_empty() {
            return Err(anyhow!("Order number prefix cannot be empty"));
        }

        if self.output.order_label.is_empty() || self.output.dr_label.is_empty() {
            return Err(anyhow!("Output labels cannot be empty"));
        }

        if StrftimeItems::new(&self.output.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(anyhow!(
                "Invalid output date format: {}",
                self.output.date_format
            ));
        }

        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from("H.xlsx"),
            name_column: "출고상품명".to_string(),
            url_column: "상품 shoppingmall url".to_string(),
            price_column: "unit_total price".to_string(),
            code_column: "상품코드".to_string(),
            barcode_column: "바코드".to_string(),
        }
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            order_no_column: "order_no".to_string(),
            item_name_column: "item_name".to_string(),
            quantity_column: "item_pcs".to_string(),
            address_column: "consignee_address (en)_jp지역 현지어 기재".to_string(),
            postal_column: "consignee_ postalcode".to_string(),
            order_prefix: "86".to_string(),
            overrides: vec![
                FixedOverride::new("service code", "99"),
                FixedOverride::new("consignee_국가코드", "JP"),
                FixedOverride::new("pkg", "1"),
                FixedOverride::new("item_origin", "KR"),
                FixedOverride::new("currency", "JPY"),
            ],
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            order_label: "RINCOS_온드_주문등록양식_큐텐".to_string(),
            dr_label: "RINCOS_온드_HIVE센터 B2C 출고요청양식".to_string(),
            date_format: "%y%m%d".to_string(),
        }
    }
}
