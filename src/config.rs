use crate::types::PlateFormat;
use crate::validator::Substitution;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub azure_endpoint: String,
    pub azure_api_key: String,
    pub db_path: PathBuf,
    pub blocklist_path: PathBuf,
    pub port: u16,
    pub max_dimension: u32,
    pub processed_dir: Option<PathBuf>,
    pub ocr_timeout: Duration,
    pub ocr_max_retries: u32,
    pub formats: Vec<PlateFormat>,
    pub substitution: Substitution,
}

impl Config {
    pub fn from_env() -> Result<Config, failure::Error> {
        Config::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Config, failure::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format_err!("{} environment variable unset", key))
        };
        let formats = match var("PLATE_FORMATS") {
            Some(list) => parse_formats(&list)?,
            None => PlateFormat::ALL.to_vec(),
        };

        Ok(Config {
            azure_endpoint: required("AZURE_ENDPOINT")?,
            azure_api_key: required("AZURE_API_KEY")?,
            db_path: var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("database/parking_logs.db")),
            blocklist_path: var("BLOCKLIST_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("database/blocked_plates.csv")),
            port: parse_or(&var, "PORT", 8402)?,
            max_dimension: parse_or(&var, "MAX_DIMENSION", 800)?,
            processed_dir: var("PROCESSED_DIR").map(PathBuf::from),
            ocr_timeout: Duration::from_secs(parse_or(&var, "OCR_TIMEOUT_SECS", 30)?),
            ocr_max_retries: parse_or(&var, "OCR_MAX_RETRIES", 3)?,
            formats,
            substitution: parse_or(&var, "SUBSTITUTION", Substitution::PositionAware)?,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T, failure::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| format_err!("Invalid {} '{}': {}", key, value, e)),
        None => Ok(default),
    }
}

fn parse_formats(list: &str) -> Result<Vec<PlateFormat>, failure::Error> {
    let formats = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<PlateFormat>, _>>()?;
    if formats.is_empty() {
        bail!("PLATE_FORMATS must name at least one format");
    }
    Ok(formats)
}
