use crate::dataset::quick_filter;
use crate::dispatch::{Effect, Event, Snapshot, Transition, dispatch};
use crate::errors::AppError;
use crate::models::{ClientEvent, DatasetView, FilterChoices};
use crate::state::AppState;
use crate::storage::{ClientStore, persist_store};
use crate::ui::render_index;
use axum::{extract::State, response::Html, Json};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub week: u8,
    pub grid_class: &'static str,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl StateResponse {
    fn new(state: &AppState, snapshot: &Snapshot) -> Self {
        Self {
            week: state.context.variant.week(),
            grid_class: snapshot.theme.grid_class(),
            snapshot: snapshot.clone(),
        }
    }
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(state.context.variant))
}

pub async fn get_options(State(state): State<AppState>) -> Result<Json<FilterChoices>, AppError> {
    let board = state
        .context
        .matches
        .as_ref()
        .ok_or_else(|| AppError::not_found("this dashboard has no filters"))?;
    Ok(Json(board.choices.clone()))
}

pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let session = state.session.lock().await;
    Json(StateResponse::new(&state, &session))
}

pub async fn get_data(State(state): State<AppState>) -> Json<Vec<DatasetView>> {
    let session = state.session.lock().await;
    let grid_class = session.theme.grid_class();
    let views = state
        .context
        .datasets
        .iter()
        .map(|dataset| DatasetView {
            name: dataset.name.clone(),
            columns: dataset.table.columns.clone(),
            rows: quick_filter(&dataset.table, &session.quick_filter)
                .into_iter()
                .cloned()
                .collect(),
            grid_class,
        })
        .collect();
    Json(views)
}

/// Runs one reduction cycle. The session lock is held for the whole cycle so
/// events are applied one at a time. Nothing is committed in memory until
/// the store write succeeds.
pub async fn post_event(
    State(state): State<AppState>,
    Json(payload): Json<ClientEvent>,
) -> Result<Json<StateResponse>, AppError> {
    let mut session = state.session.lock().await;
    let mut store = state.store.lock().await;

    let event = to_event(payload, &store);
    let Transition { next, effects } = dispatch(&state.context, &session, event);

    let mut updated = store.clone();
    if apply_effects(&mut updated, effects) {
        persist_store(&state.data_path, &updated).await?;
        *store = updated;
        info!("client store saved");
    }
    *session = next;

    Ok(Json(StateResponse::new(&state, &session)))
}

fn to_event(payload: ClientEvent, store: &ClientStore) -> Event {
    match payload {
        ClientEvent::FirstPaint { os_prefers_dark } => Event::FirstPaint {
            stored_dark: store.theme_dark,
            os_prefers_dark,
        },
        ClientEvent::Filters(input) => Event::FilterChanged(input),
        ClientEvent::ToggleTheme { dark } => Event::ThemeToggled { dark },
        ClientEvent::AddCard => Event::AddCard,
        ClientEvent::RemoveCard { id, n_clicks } => Event::RemoveCard { id, clicks: n_clicks },
        ClientEvent::EditCard { id, n_clicks } => Event::EditCard { id, clicks: n_clicks },
        ClientEvent::ResetEditor => Event::ResetEditor,
        ClientEvent::SaveEditor {
            chart_id,
            figure,
            close,
        } => Event::SaveEditor {
            chart_id,
            figure,
            close,
        },
        ClientEvent::SaveCharts => Event::SaveCharts,
        ClientEvent::LoadCharts => Event::LoadCharts(store.saved_charts.clone()),
        ClientEvent::QuickFilter { text } => Event::QuickFilter { text },
    }
}

fn apply_effects(store: &mut ClientStore, effects: Vec<Effect>) -> bool {
    let changed = !effects.is_empty();
    for effect in effects {
        match effect {
            Effect::PersistTheme(dark) => store.theme_dark = Some(dark),
            Effect::PersistSavedCharts(saved) => store.saved_charts = saved,
        }
    }
    changed
}
