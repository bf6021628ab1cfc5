use anyhow::{Context, Result};
use tracing::info;

use extcheck::{cli, config, inventory, logging};

fn main() -> Result<()> {
    logging::init_logging();

    let args = cli::parse_count();
    let loaded = config::load_from_env().context("loading configuration")?;
    let table = loaded.config.support_table();
    info!(
        "supported extensions={} config_hash={}",
        table.len(),
        loaded.config_hash
    );

    println!("Scanning directory: {}", args.dir.display());
    let report = inventory::count_extensions(&args.dir, &table)
        .with_context(|| format!("scanning {}", args.dir.display()))?;

    if logging::json_enabled() {
        info!(report = %serde_json::to_string(&report)?, "extension report");
    }

    println!("\nTotal files found: {}", report.total_files);
    println!("\nExtension Counts:");
    print!("{report}");
    Ok(())
}
