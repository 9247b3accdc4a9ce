use crate::dataset::parse_date;
use crate::errors::ReduceError;
use crate::models::{Cell, FilterChoices, Row, Table, date_key};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const ALL_TIERS: &str = "All";
const DEFAULT_TIERS: [i64; 2] = [1, 2];

/// Column names the reducer and the projections read.
#[derive(Debug, Clone, Copy)]
pub struct FilterColumns {
    pub entity: &'static str,
    pub opponent: &'static str,
    pub value: &'static str,
    pub date: &'static str,
    pub tier: &'static str,
    pub label: &'static str,
}

impl FilterColumns {
    pub const MATCHES: FilterColumns = FilterColumns {
        entity: "team_name",
        opponent: "opponent_name",
        value: "attendance",
        date: "date",
        tier: "tier",
        label: "match_name",
    };
}

/// Raw control values as the view reports them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterInput {
    #[serde(default)]
    pub range: Vec<f64>,
    #[serde(default)]
    pub date_range: Vec<String>,
    #[serde(default = "default_tier")]
    pub tier: String,
    #[serde(default)]
    pub home: Option<Vec<String>>,
    #[serde(default)]
    pub away: Option<Vec<String>>,
}

fn default_tier() -> String {
    ALL_TIERS.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tier {
    All,
    Only(i64),
}

impl Tier {
    pub fn parse(value: &str) -> Result<Self, ReduceError> {
        if value == ALL_TIERS {
            return Ok(Tier::All);
        }
        value
            .trim()
            .parse()
            .map(Tier::Only)
            .map_err(|_| ReduceError::MalformedTier(value.to_string()))
    }

    pub fn allows(self, tier: i64) -> bool {
        match self {
            Tier::All => DEFAULT_TIERS.contains(&tier),
            Tier::Only(only) => only == tier,
        }
    }
}

/// Validated predicates. An empty allow-set matches every name.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub range: (f64, f64),
    pub dates: (NaiveDate, NaiveDate),
    pub tier: Tier,
    pub home: BTreeSet<String>,
    pub away: BTreeSet<String>,
}

impl TryFrom<&FilterInput> for FilterState {
    type Error = ReduceError;

    fn try_from(input: &FilterInput) -> Result<Self, Self::Error> {
        let &[lo, hi] = input.range.as_slice() else {
            return Err(ReduceError::MalformedRange("range"));
        };
        let [start, end] = input.date_range.as_slice() else {
            return Err(ReduceError::MalformedRange("date_range"));
        };
        let start = parse_date(start).ok_or_else(|| ReduceError::MalformedDate(start.clone()))?;
        let end = parse_date(end).ok_or_else(|| ReduceError::MalformedDate(end.clone()))?;

        Ok(Self {
            range: (lo, hi),
            dates: (start, end),
            tier: Tier::parse(&input.tier)?,
            home: input.home.iter().flatten().cloned().collect(),
            away: input.away.iter().flatten().cloned().collect(),
        })
    }
}

impl FilterState {
    pub fn matches(&self, row: &Row, columns: &FilterColumns) -> bool {
        let text = |column: &str| row.get(column).map(Cell::display).unwrap_or_default();

        let home_ok = self.home.is_empty() || self.home.contains(&text(columns.entity));
        let away_ok = self.away.is_empty() || self.away.contains(&text(columns.opponent));
        let value_ok = row
            .get(columns.value)
            .and_then(Cell::as_f64)
            .is_some_and(|value| self.range.0 <= value && value <= self.range.1);
        let date_ok = row
            .get(columns.date)
            .and_then(Cell::as_date)
            .is_some_and(|date| self.dates.0 <= date && date <= self.dates.1);
        let tier_ok = row
            .get(columns.tier)
            .and_then(Cell::as_i64)
            .is_some_and(|tier| self.tier.allows(tier));

        home_ok && away_ok && value_ok && date_ok && tier_ok
    }
}

/// Rows of `table` that pass every predicate, in table order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a Table,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Row> + '_ {
        let table = self.table;
        self.indices.iter().map(move |index| &table.rows[*index])
    }
}

pub fn reduce<'a>(table: &'a Table, columns: &FilterColumns, state: &FilterState) -> FilteredView<'a> {
    let indices = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| state.matches(row, columns))
        .map(|(index, _)| index)
        .collect();
    FilteredView { table, indices }
}

/// Multi-select choices and the full-range bounds used to seed the controls.
pub fn filter_choices(table: &Table, columns: &FilterColumns) -> Option<FilterChoices> {
    let (lo, hi) = table.numeric_domain(columns.value)?;
    let (start, end) = table.date_domain(columns.date)?;
    let distinct = |column: &str| -> Vec<String> {
        table
            .rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|cell| !cell.is_null())
            .map(Cell::display)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    Some(FilterChoices {
        home_teams: distinct(columns.entity),
        away_teams: distinct(columns.opponent),
        range: [lo, hi],
        date_range: [date_key(start), date_key(end)],
        tiers: vec![ALL_TIERS.to_string(), "1".to_string(), "2".to_string()],
    })
}

impl FilterChoices {
    pub fn initial_input(&self) -> FilterInput {
        FilterInput {
            range: self.range.to_vec(),
            date_range: self.date_range.to_vec(),
            tier: ALL_TIERS.to_string(),
            home: None,
            away: None,
        }
    }
}
