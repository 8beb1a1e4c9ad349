use anyhow::{Context, Result};
use dr_generator::config::AppConfig;
use dr_generator::models::frame::column_cells;
use dr_generator::processor::{SimilarityMatcher, TextNormalizer};
use dr_generator::storage::read_workbook;
use std::env;
use std::path::Path;

/// Print the catalog match chosen for every order line, with its score.
///
/// Usage: preview_matches <catalog.xlsx> <orders.xlsx> [threshold]
fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("Usage: {} <catalog.xlsx> <orders.xlsx> [threshold]", args[0]);
        return Ok(());
    }

    let config = AppConfig::default();
    let threshold = match args.get(3) {
        Some(raw) => raw.parse::<f64>().context("Threshold must be a number")?,
        None => config.matching.threshold,
    };

    let catalog = read_workbook(Path::new(&args[1]))?;
    let orders = read_workbook(Path::new(&args[2]))?;

    let normalizer = TextNormalizer::new()?;
    let catalog_names = column_cells(&catalog, &config.catalog.name_column)?;
    let catalog_keys = normalizer.normalize_cells(&catalog_names);
    let order_names = column_cells(&orders, &config.orders.item_name_column)?;

    let matcher = SimilarityMatcher::new(threshold);

    println!("=== MATCH PREVIEW (threshold {}) ===\n", matcher.threshold());

    let mut matched = 0;
    for (idx, name) in order_names.iter().enumerate() {
        let key = normalizer.normalize(name.as_str());
        println!("{:>4}. {}", idx, name);
        println!("      key: {:?}", key);

        match matcher.best_match(&key, &catalog_keys) {
            Some((target, score)) => {
                matched += 1;
                println!(
                    "      -> [{}] {} (score {:.3})",
                    target, catalog_names[target], score
                );
            }
            None => println!("      -> no match"),
        }
    }

    println!("\n{} of {} order lines matched", matched, order_names.len());
    Ok(())
}
