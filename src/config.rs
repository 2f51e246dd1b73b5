use std::path::PathBuf;
use std::str::FromStr;
use anyhow::{anyhow, Context, Result};
use simplelog::LevelFilter;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api-certificados-ufrayan.onrender.com/api/crear_certificados";

/// Runtime settings, resolved from flags and environment (`.env` included).
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: Url,
    pub output_dir: PathBuf,
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn resolve(api_url: &str, output_dir: PathBuf, log_level: &str) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .with_context(|| format!("CERT_API_URL is not a valid URL: {}", api_url))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(anyhow!("CERT_API_URL must use http or https, got {}", api_url.scheme()));
        }

        let log_level = LevelFilter::from_str(log_level)
            .map_err(|_| anyhow!("LOG_LEVEL must be one of off, error, warn, info, debug, trace"))?;

        Ok(Settings {
            api_url,
            output_dir,
            log_level,
        })
    }
}
