mod azure;
mod blocklist;
mod config;
mod db;
mod grammar;
mod normalize;
mod preprocess;
mod rank;
mod recognizer;
mod server;
mod types;
mod validator;

use crate::azure::AzureOcr;
use crate::blocklist::CsvBlocklist;
use crate::config::Config;
use crate::preprocess::Preprocessor;
use crate::recognizer::Recognizer;
use crate::validator::PlateValidator;
use env_logger::Env;
use log::{error, info};
use std::sync::Arc;

#[macro_use]
extern crate failure;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting plate-reader");

    if let Err(e) = run().await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
    info!("Exiting main");
}

async fn run() -> Result<(), failure::Error> {
    let config = Config::from_env()?;
    if let Some(dir) = &config.processed_dir {
        std::fs::create_dir_all(dir)?;
    }

    let recognizer = Recognizer::new(
        Preprocessor::new(config.max_dimension, config.processed_dir.clone()),
        AzureOcr::new(
            &config.azure_endpoint,
            &config.azure_api_key,
            config.ocr_timeout,
            config.ocr_max_retries,
        )?,
        PlateValidator::new(config.formats.clone(), config.substitution),
        CsvBlocklist::open(&config.blocklist_path),
        db::open(&config.db_path)?,
    );
    info!(
        "Validating formats {:?} with {:?} substitution",
        recognizer.validator().formats(),
        recognizer.validator().substitution()
    );
    server::run(config.port, Arc::new(recognizer)).await;
    Ok(())
}
