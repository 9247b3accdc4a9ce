use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(value) => Some(*value as f64),
            Cell::Float(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(value) => Some(*value),
            Cell::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Cell::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Text used by the grid and by chart labels.
    pub fn display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Int(value) => value.to_string(),
            Cell::Float(value) => value.to_string(),
            Cell::Text(text) => text.clone(),
            Cell::Date(date) => date_key(*date),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Int(value) => Value::from(*value),
            Cell::Float(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(text) => Value::String(text.clone()),
            Cell::Date(date) => Value::String(date_key(*date)),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

pub type Row = BTreeMap<String, Cell>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    pub fn cell<'a>(&'a self, row: usize, column: &str) -> &'a Cell {
        self.rows
            .get(row)
            .and_then(|row| row.get(column))
            .unwrap_or(&Cell::Null)
    }

    pub fn column_json(&self, column: &str) -> Option<Vec<Value>> {
        if !self.has_column(column) {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(column).map(Cell::to_json).unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Min and max over the finite numeric values of a column.
    pub fn numeric_domain(&self, column: &str) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Cell::as_f64))
            .fold(None, |acc, value| match acc {
                None => Some((value, value)),
                Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
            })
    }

    pub fn date_domain(&self, column: &str) -> Option<(NaiveDate, NaiveDate)> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Cell::as_date))
            .fold(None, |acc, date| match acc {
                None => Some((date, date)),
                Some((lo, hi)) => Some((lo.min(date), hi.max(date))),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub name: String,
    pub table: Table,
}

/// A renderable chart document: trace list plus layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Figure {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub layout: Map<String, Value>,
}

impl Figure {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark(dark: bool) -> Self {
        if dark { Theme::Dark } else { Theme::Light }
    }

    pub fn template(self) -> &'static str {
        match self {
            Theme::Light => "plotly_white",
            Theme::Dark => "plotly_dark",
        }
    }

    pub fn grid_class(self) -> &'static str {
        match self {
            Theme::Light => "ag-theme-alpine",
            Theme::Dark => "ag-theme-alpine-dark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardFigures {
    pub primary: Figure,
    pub secondary: Figure,
    pub extremum: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: u64,
    pub title: String,
    pub figure: Figure,
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChoices {
    pub home_teams: Vec<String>,
    pub away_teams: Vec<String>,
    pub range: [f64; 2],
    pub date_range: [String; 2],
    pub tiers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DatasetView {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub grid_class: &'static str,
}

/// Events as the page posts them to `/api/events`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    FirstPaint {
        #[serde(default)]
        os_prefers_dark: bool,
    },
    Filters(crate::filter::FilterInput),
    ToggleTheme {
        dark: bool,
    },
    AddCard,
    RemoveCard {
        id: u64,
        #[serde(default)]
        n_clicks: u64,
    },
    EditCard {
        id: u64,
        #[serde(default)]
        n_clicks: u64,
    },
    ResetEditor,
    SaveEditor {
        #[serde(default)]
        chart_id: Option<u64>,
        #[serde(default)]
        figure: Option<Figure>,
        #[serde(default)]
        close: bool,
    },
    SaveCharts,
    LoadCharts,
    QuickFilter {
        #[serde(default)]
        text: String,
    },
}
