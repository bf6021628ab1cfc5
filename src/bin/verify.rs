use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info};

use extcheck::{
    cli,
    config,
    engine::ProcessEngine,
    harness::{self, Verdict, VerifyPlan, codes},
    logging,
};

fn main() -> ExitCode {
    logging::init_logging();
    let _args = cli::parse_verify();

    match run() {
        Ok(verdict) => {
            info!("verification finished: exit_code={}", verdict.exit_code());
            ExitCode::from(verdict.exit_code())
        }
        Err(err) => {
            error!("verification aborted: {err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::from(codes::SETUP_ERROR)
        }
    }
}

fn run() -> Result<Verdict> {
    let loaded = config::load_from_env().context("loading configuration")?;
    let cfg = loaded.config;
    info!(
        "starting run_id={} config_hash={} fixture_dir={}",
        cfg.run_id,
        loaded.config_hash,
        cfg.verify.fixture_dir.display()
    );

    let plan = VerifyPlan::from_config(&cfg.verify);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let verdict = harness::run_verification(&plan, &ProcessEngine, &mut out)
        .context("running verification")?;
    Ok(verdict)
}
