use crate::errors::AppError;
use crate::models::{Figure, Table, Theme};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;
use tracing::error;

/// Editor-owned keys that never leave the session.
const EDITOR_KEYS: [&str; 2] = ["uid", "meta"];
const SOURCE_SUFFIX: &str = "src";

pub type SavedChartSet = Vec<Figure>;

/// Durable client slots: theme preference and the saved chart layout.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientStore {
    #[serde(default)]
    pub theme_dark: Option<bool>,
    #[serde(default)]
    pub saved_charts: SavedChartSet,
}

pub async fn load_store(path: &Path) -> ClientStore {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(store) => store,
            Err(err) => {
                error!("failed to parse store file: {err}");
                ClientStore::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => ClientStore::default(),
        Err(err) => {
            error!("failed to read store file: {err}");
            ClientStore::default()
        }
    }
}

pub async fn persist_store(path: &Path, store: &ClientStore) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(store).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

/// A stored preference wins over the OS hint.
pub fn resolve_theme(stored: Option<bool>, os_prefers_dark: bool) -> Theme {
    Theme::from_dark(stored.unwrap_or(os_prefers_dark))
}

pub fn save_cards<'a>(figures: impl Iterator<Item = &'a Figure>) -> SavedChartSet {
    figures.map(sanitize_figure).collect()
}

/// Drops inline arrays that are backed by a `<key>src` column reference,
/// along with editor bookkeeping keys.
pub fn sanitize_figure(figure: &Figure) -> Figure {
    Figure {
        data: figure.data.iter().cloned().map(strip_sourced).collect(),
        layout: figure.layout.clone(),
    }
}

fn strip_sourced(value: Value) -> Value {
    let Value::Object(mut fields) = value else {
        return value;
    };
    for key in EDITOR_KEYS {
        fields.remove(key);
    }
    let sourced: Vec<String> = source_refs(&fields).map(|(key, _)| key).collect();
    for key in sourced {
        fields.remove(&key);
    }
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key, strip_sourced(value)))
            .collect(),
    )
}

/// `(data_key, column)` pairs for every `<data_key>src` string field.
fn source_refs(fields: &Map<String, Value>) -> impl Iterator<Item = (String, String)> + '_ {
    fields.iter().filter_map(|(key, value)| {
        let base = key.strip_suffix(SOURCE_SUFFIX).filter(|base| !base.is_empty())?;
        let column = value.as_str()?;
        Some((base.to_string(), column.to_string()))
    })
}

/// Inverse of [`sanitize_figure`]: fills column-backed arrays from `table`.
pub fn materialize_figure(figure: &Figure, table: &Table) -> Figure {
    Figure {
        data: figure
            .data
            .iter()
            .cloned()
            .map(|trace| fill_sourced(trace, table))
            .collect(),
        layout: figure.layout.clone(),
    }
}

fn fill_sourced(value: Value, table: &Table) -> Value {
    let Value::Object(fields) = value else {
        return value;
    };
    let refs: Vec<(String, String)> = source_refs(&fields).collect();
    let mut fields: Map<String, Value> = fields
        .into_iter()
        .map(|(key, value)| (key, fill_sourced(value, table)))
        .collect();
    for (key, column) in refs {
        if let Some(values) = table.column_json(&column) {
            fields.insert(key, Value::Array(values));
        }
    }
    Value::Object(fields)
}
