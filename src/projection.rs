use crate::errors::ReduceError;
use crate::filter::{FilterColumns, FilteredView};
use crate::models::{Cell, DashboardFigures, Figure, Theme};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

pub const PRIMARY_TITLE: &str = "Home Team Attendance Distribution";
pub const SECONDARY_TITLE: &str = "Attendance Over Time";

/// Color scale bounds taken from the unfiltered table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorDomain {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extremum {
    pub row: usize,
    pub value: f64,
    pub label: String,
    pub date: String,
}

pub fn base_layout(theme: Theme) -> Map<String, Value> {
    let mut layout = Map::new();
    layout.insert("margin".into(), json!({ "r": 0, "l": 0, "b": 0, "t": 35 }));
    layout.insert("template".into(), Value::String(theme.template().to_string()));
    layout
}

fn titled_layout(theme: Theme, title: &str) -> Map<String, Value> {
    let mut layout = base_layout(theme);
    layout.insert("title".into(), json!({ "text": title }));
    layout
}

pub fn project(
    view: &FilteredView<'_>,
    columns: &FilterColumns,
    domain: ColorDomain,
    theme: Theme,
) -> Result<DashboardFigures, ReduceError> {
    let extremum = find_extremum(view, columns).ok_or(ReduceError::EmptyView)?;
    Ok(DashboardFigures {
        primary: treemap(view, columns, domain, theme),
        secondary: scatter(view, columns, theme),
        extremum: indicator(&extremum, theme),
    })
}

struct Node {
    id: String,
    label: String,
    parent: String,
    value: f64,
    weighted: f64,
}

/// Aggregates entity → opponent → date. Node colors are the value-weighted
/// mean of the rows below them.
pub fn treemap(view: &FilteredView<'_>, columns: &FilterColumns, domain: ColorDomain, theme: Theme) -> Figure {
    let mut nodes: Vec<Node> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in view.rows() {
        let Some(value) = row.get(columns.value).and_then(Cell::as_f64) else {
            continue;
        };
        let path = [columns.entity, columns.opponent, columns.date]
            .map(|column| row.get(column).map(Cell::display).unwrap_or_default());

        let mut parent = String::new();
        for label in path {
            let id = if parent.is_empty() {
                label.clone()
            } else {
                format!("{parent}/{label}")
            };
            let position = *positions.entry(id.clone()).or_insert_with(|| {
                nodes.push(Node {
                    id: id.clone(),
                    label,
                    parent: parent.clone(),
                    value: 0.0,
                    weighted: 0.0,
                });
                nodes.len() - 1
            });
            let node = &mut nodes[position];
            node.value += value;
            node.weighted += value * value;
            parent = id;
        }
    }

    let colors: Vec<f64> = nodes
        .iter()
        .map(|node| if node.value == 0.0 { 0.0 } else { node.weighted / node.value })
        .collect();
    let trace = json!({
        "type": "treemap",
        "branchvalues": "total",
        "ids": nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>(),
        "labels": nodes.iter().map(|node| node.label.as_str()).collect::<Vec<_>>(),
        "parents": nodes.iter().map(|node| node.parent.as_str()).collect::<Vec<_>>(),
        "values": nodes.iter().map(|node| node.value).collect::<Vec<_>>(),
        "marker": { "colors": colors, "coloraxis": "coloraxis" },
    });

    let mut layout = titled_layout(theme, PRIMARY_TITLE);
    layout.insert(
        "coloraxis".into(),
        json!({
            "cmin": domain.min,
            "cmax": domain.max,
            "colorbar": { "title": { "text": columns.value } },
        }),
    );
    Figure {
        data: vec![trace],
        layout,
    }
}

pub fn scatter(view: &FilteredView<'_>, columns: &FilterColumns, theme: Theme) -> Figure {
    let (x, y): (Vec<Value>, Vec<f64>) = view
        .rows()
        .filter_map(|row| {
            let value = row.get(columns.value).and_then(Cell::as_f64)?;
            let date = row.get(columns.date).map(Cell::to_json).unwrap_or(Value::Null);
            Some((date, value))
        })
        .unzip();

    let trace = json!({ "type": "scatter", "mode": "markers", "x": x, "y": y });
    let mut layout = titled_layout(theme, SECONDARY_TITLE);
    layout.insert("xaxis".into(), json!({ "title": { "text": columns.date } }));
    layout.insert("yaxis".into(), json!({ "title": { "text": columns.value } }));
    Figure {
        data: vec![trace],
        layout,
    }
}

/// Row with the largest value. Ties resolve to the earliest row in table order.
pub fn find_extremum(view: &FilteredView<'_>, columns: &FilterColumns) -> Option<Extremum> {
    let table = view.table();
    let mut best: Option<(usize, f64)> = None;
    for &index in view.indices() {
        let Some(value) = table.cell(index, columns.value).as_f64() else {
            continue;
        };
        if best.is_none_or(|(_, current)| value > current) {
            best = Some((index, value));
        }
    }

    best.map(|(row, value)| Extremum {
        row,
        value,
        label: table.cell(row, columns.label).display(),
        date: table.cell(row, columns.date).display(),
    })
}

pub fn indicator(extremum: &Extremum, theme: Theme) -> Figure {
    let trace = json!({
        "type": "indicator",
        "mode": "number",
        "value": extremum.value,
        "title": { "text": format!("{}<br>({})", extremum.label, extremum.date) },
    });
    Figure {
        data: vec![trace],
        layout: base_layout(theme),
    }
}
