use crate::config::Variant;
use crate::dataset::home_matches;
use crate::dispatch::{Event, Snapshot, dispatch};
use crate::errors::DatasetError;
use crate::filter::{FilterColumns, filter_choices};
use crate::models::{Dataset, FilterChoices, Table};
use crate::projection::ColorDomain;
use crate::storage::ClientStore;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

/// The filter dashboard's table plus everything derived from it once.
#[derive(Debug)]
pub struct MatchesBoard {
    pub table: Table,
    pub columns: FilterColumns,
    pub domain: ColorDomain,
    pub choices: FilterChoices,
}

impl MatchesBoard {
    pub fn new(table: Table, columns: FilterColumns) -> Result<Self, DatasetError> {
        let no_values = || DatasetError::Shape {
            path: "home matches".to_string(),
            message: format!("no rows with both '{}' and '{}'", columns.value, columns.date),
        };
        let (min, max) = table.numeric_domain(columns.value).ok_or_else(no_values)?;
        let choices = filter_choices(&table, &columns).ok_or_else(no_values)?;
        Ok(Self {
            table,
            columns,
            domain: ColorDomain { min, max },
            choices,
        })
    }
}

/// Read-only data shared by every reduction cycle.
#[derive(Debug)]
pub struct DashboardContext {
    pub variant: Variant,
    pub datasets: Vec<Dataset>,
    pub matches: Option<MatchesBoard>,
}

impl DashboardContext {
    pub fn build(variant: Variant, datasets: Vec<Dataset>) -> Result<Self, DatasetError> {
        let Some(main) = datasets.first() else {
            return Err(DatasetError::Shape {
                path: "datasets".to_string(),
                message: "no dataset loaded".to_string(),
            });
        };
        let matches = match variant {
            Variant::Matches => Some(MatchesBoard::new(home_matches(main)?, FilterColumns::MATCHES)?),
            Variant::Investments => None,
        };
        Ok(Self {
            variant,
            datasets,
            matches,
        })
    }

    pub fn main_table(&self) -> &Table {
        &self.datasets[0].table
    }

    pub fn supports_cards(&self) -> bool {
        self.variant == Variant::Investments
    }

    /// Snapshot as rendered on first load: the filter dashboard starts from
    /// the full data range.
    pub fn initial_snapshot(&self) -> Snapshot {
        let empty = Snapshot::default();
        match &self.matches {
            Some(board) => dispatch(self, &empty, Event::FilterChanged(board.choices.initial_input())).next,
            None => empty,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub context: Arc<DashboardContext>,
    pub session: Arc<Mutex<Snapshot>>,
    pub store: Arc<Mutex<ClientStore>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, context: DashboardContext, store: ClientStore) -> Self {
        let session = context.initial_snapshot();
        Self {
            data_path,
            context: Arc::new(context),
            session: Arc::new(Mutex::new(session)),
            store: Arc::new(Mutex::new(store)),
        }
    }
}
