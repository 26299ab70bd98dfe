// src/bin/run_once.rs
// Run the job once from the command line.
//
// Usage: run_once [RUN_DATE]   (RUN_DATE as YYYY-MM-DD, defaults to today;
//                               the report fetched is two days earlier)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{error, info};
use vozreach::{
    config::Config,
    logging,
    pipeline::{response, Collaborators, Pipeline},
    report_date::ReportDate,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let date = match std::env::args().nth(1) {
        Some(raw) => {
            let run_date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .with_context(|| format!("run date {:?} is not YYYY-MM-DD", raw))?;
            ReportDate::for_run(run_date)
        }
        None => ReportDate::today(),
    };

    let config = Config::from_env().context("loading configuration")?;
    let services = Collaborators::live(&config)
        .await
        .context("initializing cloud clients")?;
    let pipeline = Pipeline::new(config, services);

    let result = pipeline.run_for(date).await;
    let (message, status) = response(&result);
    match result {
        Ok(summary) => {
            for s in &summary.sections {
                info!("page {} → {}: {} rows", s.page, s.table, s.rows);
            }
            println!("{}", message);
            Ok(())
        }
        Err(failure) => {
            error!(stage = %failure.stage, "{}", message);
            eprintln!("{} ({})", message, status);
            std::process::exit(1);
        }
    }
}
