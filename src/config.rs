use crate::errors::ConfigError;
use std::{env, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_DATASET_PATHS: &str = "data/ewf_matches.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Week 29: linked filters over match attendance.
    Matches,
    /// Week 30: chart cards built in the editor over rural investments.
    Investments,
}

impl Variant {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "matches" | "29" => Ok(Variant::Matches),
            "investments" | "30" => Ok(Variant::Investments),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }

    pub fn week(self) -> u8 {
        match self {
            Variant::Matches => 29,
            Variant::Investments => 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub dataset_paths: Vec<PathBuf>,
    pub variant: Variant,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_path = lookup("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let dataset_paths: Vec<PathBuf> = lookup("APP_DATASET_PATHS")
            .unwrap_or_else(|| DEFAULT_DATASET_PATHS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .collect();
        if dataset_paths.is_empty() {
            return Err(ConfigError::NoDatasets);
        }

        let variant = match lookup("DASHBOARD_VARIANT") {
            Some(value) => Variant::parse(&value)?,
            None => Variant::Matches,
        };

        Ok(Self {
            port,
            data_path,
            dataset_paths,
            variant,
        })
    }
}
