use crate::config::Variant;
use crate::errors::DatasetError;
use crate::models::{Cell, Dataset, Row, Table};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// Per-column normalizations applied once, right after a file is parsed.
#[derive(Debug, Clone, Default)]
pub struct DatasetSchema {
    pub int_columns: Vec<&'static str>,
    pub id_columns: Vec<(&'static str, usize)>,
    pub date_columns: Vec<&'static str>,
}

impl DatasetSchema {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Matches => Self {
                int_columns: vec!["attendance"],
                id_columns: Vec::new(),
                date_columns: vec!["date"],
            },
            Variant::Investments => Self {
                int_columns: vec!["Investment Dollars", "Number of Investments"],
                id_columns: vec![("County FIPS", 5)],
                date_columns: Vec::new(),
            },
        }
    }

    pub fn apply(&self, table: &mut Table) {
        for row in &mut table.rows {
            for column in &self.int_columns {
                if let Some(cell) = row.get_mut(*column) {
                    *cell = normalize_int(cell);
                }
            }
            for (column, width) in &self.id_columns {
                if let Some(cell) = row.get_mut(*column) {
                    *cell = normalize_identifier(cell, *width);
                }
            }
            for column in &self.date_columns {
                if let Some(cell) = row.get_mut(*column) {
                    *cell = normalize_date(cell);
                }
            }
        }
    }
}

pub async fn load_datasets(paths: &[impl AsRef<Path>], schema: &DatasetSchema) -> Result<Vec<Dataset>, DatasetError> {
    let mut datasets = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let display = path.display().to_string();
        let bytes = fs::read(path).await.map_err(|source| DatasetError::Io {
            path: display.clone(),
            source,
        })?;
        let mut table = parse_records(&display, &bytes)?;
        schema.apply(&mut table);

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or(display);
        info!(dataset = %name, rows = table.len(), "loaded dataset");
        datasets.push(Dataset { name, table });
    }
    Ok(datasets)
}

/// Parses a JSON array of flat records into a table. Columns are the union of
/// every record's keys in first-seen order.
pub fn parse_records(path: &str, bytes: &[u8]) -> Result<Table, DatasetError> {
    let records: Vec<Value> = serde_json::from_slice(bytes).map_err(|source| DatasetError::Parse {
        path: path.to_string(),
        source,
    })?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(DatasetError::Shape {
                path: path.to_string(),
                message: format!("record {index} is not an object"),
            });
        };
        rows.push(record_to_row(fields, &mut columns));
    }

    Ok(Table::new(columns, rows))
}

fn record_to_row(fields: Map<String, Value>, columns: &mut Vec<String>) -> Row {
    let mut row = Row::new();
    for (key, value) in fields {
        if !columns.contains(&key) {
            columns.push(key.clone());
        }
        row.insert(key, json_to_cell(value));
    }
    row
}

fn json_to_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(flag) => Cell::Int(i64::from(flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Cell::Int(int),
            None => number.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        },
        Value::String(text) => Cell::Text(text),
        other => Cell::Text(other.to_string()),
    }
}

fn is_null_token(text: &str) -> bool {
    matches!(text.to_ascii_lowercase().as_str(), "" | "nan" | "na" | "null" | "none")
}

/// Strips thousands separators and casts to an integer; missing values stay null.
pub fn normalize_int(cell: &Cell) -> Cell {
    match cell {
        Cell::Int(value) => Cell::Int(*value),
        Cell::Float(value) if value.is_finite() => Cell::Int(value.trunc() as i64),
        Cell::Text(text) => {
            let cleaned = text.replace(',', "");
            let cleaned = cleaned.trim();
            if is_null_token(cleaned) {
                return Cell::Null;
            }
            match cleaned.parse::<i64>() {
                Ok(value) => Cell::Int(value),
                Err(_) => match cleaned.parse::<f64>() {
                    Ok(value) if value.is_finite() => Cell::Int(value.trunc() as i64),
                    _ => {
                        debug!(value = %text, "dropping non-numeric value");
                        Cell::Null
                    }
                },
            }
        }
        _ => Cell::Null,
    }
}

/// Removes quote characters and left-pads with zeros to `width`.
pub fn normalize_identifier(cell: &Cell, width: usize) -> Cell {
    if cell.is_null() {
        return Cell::Null;
    }
    let raw = match cell {
        Cell::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
        other => other.display(),
    };
    let stripped: String = raw.chars().filter(|ch| *ch != '\'' && *ch != '"').collect();
    let stripped = stripped.trim();
    Cell::Text(format!("{stripped:0>width$}"))
}

pub fn normalize_date(cell: &Cell) -> Cell {
    match cell {
        Cell::Date(date) => Cell::Date(*date),
        Cell::Text(text) => parse_date(text).map(Cell::Date).unwrap_or(Cell::Null),
        _ => Cell::Null,
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

const HOME_MATCH_COLUMNS: [&str; 6] = [
    "home_team",
    "team_id",
    "team_name",
    "opponent_id",
    "opponent_name",
    "date",
];

/// Home-side match rows with team and opponent names canonicalized per id.
pub fn home_matches(dataset: &Dataset) -> Result<Table, DatasetError> {
    for column in HOME_MATCH_COLUMNS {
        if !dataset.table.has_column(column) {
            return Err(DatasetError::MissingColumn {
                dataset: dataset.name.clone(),
                column: column.to_string(),
            });
        }
    }

    let rows: Vec<Row> = dataset
        .table
        .rows
        .iter()
        .filter(|row| row.get("home_team").and_then(Cell::as_i64) == Some(1))
        .cloned()
        .collect();
    let mut table = Table::new(dataset.table.columns.clone(), rows);

    canonicalize_names(&mut table, "team_id", "team_name");
    canonicalize_names(&mut table, "opponent_id", "opponent_name");
    Ok(table)
}

/// Rewrites every `name_column` value to the name used on the most recent
/// row sharing the same `id_column`. Ties on date go to the later row.
pub fn canonicalize_names(table: &mut Table, id_column: &str, name_column: &str) {
    let mut latest: HashMap<String, (Option<NaiveDate>, usize)> = HashMap::new();
    for (position, row) in table.rows.iter().enumerate() {
        let Some(id) = row.get(id_column).filter(|cell| !cell.is_null()) else {
            continue;
        };
        let date = row.get("date").and_then(Cell::as_date);
        let key = id.display();
        let replace = match latest.get(&key) {
            None => true,
            Some((seen_date, _)) => date >= *seen_date,
        };
        if replace {
            latest.insert(key, (date, position));
        }
    }

    let canonical: HashMap<String, Cell> = latest
        .into_iter()
        .map(|(key, (_, position))| (key, table.cell(position, name_column).clone()))
        .collect();

    let mut renamed = 0usize;
    for row in &mut table.rows {
        let Some(key) = row.get(id_column).map(Cell::display) else {
            continue;
        };
        if let (Some(name), Some(cell)) = (canonical.get(&key), row.get_mut(name_column)) {
            if *cell != *name {
                *cell = name.clone();
                renamed += 1;
            }
        }
    }
    if renamed > 0 {
        warn!(column = name_column, renamed, "canonicalized name variants");
    }
}

/// Grid quick filter: every whitespace-separated token must appear,
/// case-insensitively, in at least one cell of the row.
pub fn quick_filter<'a>(table: &'a Table, text: &str) -> Vec<&'a Row> {
    let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    if tokens.is_empty() {
        return table.rows.iter().collect();
    }

    table
        .rows
        .iter()
        .filter(|row| {
            let cells: Vec<String> = row.values().map(|cell| cell.display().to_lowercase()).collect();
            tokens
                .iter()
                .all(|token| cells.iter().any(|cell| cell.contains(token.as_str())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn int_columns_strip_separators_and_keep_nulls() {
        assert_eq!(normalize_int(&Cell::Text("1,234".into())), Cell::Int(1234));
        assert_eq!(normalize_int(&Cell::Text("".into())), Cell::Null);
        assert_eq!(normalize_int(&Cell::Text("nan".into())), Cell::Null);
        assert_eq!(normalize_int(&Cell::Float(812.0)), Cell::Int(812));
        assert_eq!(normalize_int(&Cell::Null), Cell::Null);
    }

    #[test]
    fn identifiers_are_unquoted_and_padded() {
        assert_eq!(normalize_identifier(&Cell::Text("'1001'".into()), 5), Cell::Text("01001".into()));
        assert_eq!(normalize_identifier(&Cell::Int(42), 5), Cell::Text("00042".into()));
        assert_eq!(normalize_identifier(&Cell::Text("123456".into()), 5), Cell::Text("123456".into()));
    }

    #[test]
    fn dates_ignore_time_component() {
        assert_eq!(parse_date("2024-01-01T00:00:00"), Some(date(2024, 1, 1)));
        assert_eq!(parse_date("2024-06-01"), Some(date(2024, 6, 1)));
        assert_eq!(parse_date("June 1st"), None);
    }

    #[test]
    fn records_keep_first_seen_column_order_and_apply_schema() {
        let raw = br#"[
            {"attendance": "1,500", "date": "2024-06-01", "team_name": "B"},
            {"attendance": null, "date": "2024-01-01", "extra": true}
        ]"#;
        let mut table = parse_records("inline", raw).unwrap();
        DatasetSchema::for_variant(Variant::Matches).apply(&mut table);

        assert_eq!(table.columns, vec!["attendance", "date", "team_name", "extra"]);
        assert_eq!(table.cell(0, "attendance"), &Cell::Int(1500));
        assert_eq!(table.cell(1, "attendance"), &Cell::Null);
        assert_eq!(table.cell(1, "date"), &Cell::Date(date(2024, 1, 1)));
        assert_eq!(table.cell(1, "extra"), &Cell::Int(1));
    }

    #[test]
    fn non_object_records_are_rejected() {
        let err = parse_records("inline", b"[1, 2]").unwrap_err();
        assert!(matches!(err, DatasetError::Shape { .. }));
    }

    fn match_row(home: i64, team_id: i64, team: &str, opp_id: i64, opp: &str, day: NaiveDate) -> Row {
        let mut row = Row::new();
        row.insert("home_team".into(), Cell::Int(home));
        row.insert("team_id".into(), Cell::Int(team_id));
        row.insert("team_name".into(), Cell::Text(team.into()));
        row.insert("opponent_id".into(), Cell::Int(opp_id));
        row.insert("opponent_name".into(), Cell::Text(opp.into()));
        row.insert("date".into(), Cell::Date(day));
        row
    }

    #[test]
    fn home_matches_use_most_recent_name_per_id() {
        let columns = HOME_MATCH_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = vec![
            match_row(1, 7, "Arsenal Ladies", 9, "Chelsea LFC", date(2024, 3, 1)),
            match_row(0, 7, "ignored", 9, "ignored", date(2024, 4, 1)),
            match_row(1, 7, "Arsenal", 9, "Chelsea", date(2024, 2, 1)),
            match_row(1, 7, "Arsenal Women", 9, "Chelsea FCW", date(2024, 3, 1)),
        ];
        let dataset = Dataset {
            name: "ewf_matches.json".into(),
            table: Table::new(columns, rows),
        };

        let table = home_matches(&dataset).unwrap();
        assert_eq!(table.len(), 3);
        for row in &table.rows {
            assert_eq!(row["team_name"], Cell::Text("Arsenal Women".into()));
            assert_eq!(row["opponent_name"], Cell::Text("Chelsea FCW".into()));
        }
    }

    #[test]
    fn home_matches_require_team_columns() {
        let dataset = Dataset {
            name: "rural.json".into(),
            table: Table::new(vec!["County FIPS".into()], Vec::new()),
        };
        assert!(matches!(home_matches(&dataset), Err(DatasetError::MissingColumn { .. })));
    }

    #[test]
    fn quick_filter_matches_all_tokens() {
        let columns = HOME_MATCH_COLUMNS.iter().map(|c| c.to_string()).collect();
        let table = Table::new(
            columns,
            vec![
                match_row(1, 1, "Arsenal", 2, "Chelsea", date(2024, 1, 1)),
                match_row(1, 3, "Everton", 2, "Chelsea", date(2024, 2, 1)),
            ],
        );
        assert_eq!(quick_filter(&table, "").len(), 2);
        assert_eq!(quick_filter(&table, "chelsea").len(), 2);
        assert_eq!(quick_filter(&table, "CHELSEA arsenal").len(), 1);
        assert_eq!(quick_filter(&table, "2024-02").len(), 1);
        assert!(quick_filter(&table, "liverpool").is_empty());
    }
}
