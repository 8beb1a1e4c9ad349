use anyhow::{Context, Result};
use clap::Parser;
use dr_generator::config::AppConfig;
use dr_generator::pipeline::DrPipeline;
use dr_generator::storage::{
    CatalogCache, CatalogSource, StorageManager, load_catalog, read_workbook,
};
use std::path::PathBuf;
use tracing::{Level, error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Order export workbook (S.xlsx)
    #[arg(short, long)]
    orders: Option<PathBuf>,

    /// Catalog workbook to use instead of the default one (H.xlsx)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Do not fall back to the default catalog
    #[arg(long)]
    no_default_catalog: bool,

    /// TOML settings file
    #[arg(long)]
    config: Option<String>,

    /// Where to write the generated workbooks
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("📦 DR generator v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path).context("Failed to load configuration")?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &args.output_dir {
        config.output.directory = dir.clone();
    }

    // An explicitly supplied catalog wins over the default one.
    let use_default = !args.no_default_catalog && args.catalog.is_none();
    let source = CatalogSource::select(use_default, args.catalog.clone())?;
    let cache = CatalogCache::new(&config.catalog.default_path);
    let catalog = load_catalog(&source, &cache).context("Failed to load catalog")?;
    info!("Catalog ready: {} rows ({:?})", catalog.height(), source);

    let Some(orders_path) = &args.orders else {
        info!("Select a catalog, then pass the order export with --orders <S.xlsx>");
        return Ok(());
    };

    let orders = read_workbook(orders_path)
        .with_context(|| format!("Failed to load orders from {}", orders_path.display()))?;

    let pipeline = DrPipeline::new(config.clone())?;
    let output = match pipeline.run(&catalog, orders) {
        Ok(output) => output,
        Err(e) => {
            error!("❌ DR generation failed: {:#}", e);
            return Err(e);
        }
    };

    info!("DR preview:\n{}", output.dr_preview());

    let out = &config.output;
    let artifacts = [
        StorageManager::package(
            &output.orders,
            StorageManager::generate_today_file_name(&out.order_label, &out.date_format),
        )?,
        StorageManager::package(
            &output.dr,
            StorageManager::generate_today_file_name(&out.dr_label, &out.date_format),
        )?,
    ];

    for artifact in &artifacts {
        let path = StorageManager::save(artifact, &out.directory)?;
        info!("📥 Wrote {}", path.display());
    }

    info!(
        "✅ Done: {} order rows enriched, {} DR rows matched to the catalog",
        output.order_matches, output.dr_matches
    );

    Ok(())
}
