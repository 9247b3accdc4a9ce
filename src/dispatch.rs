//! One reduction cycle per view event.
//!
//! `dispatch` takes the previous snapshot by reference and returns the next
//! one together with the store writes the HTTP layer has to perform. Any
//! internal failure leaves the snapshot exactly as it was.

use crate::cards::{CardRegistry, EditorSession};
use crate::errors::ReduceError;
use crate::filter::{FilterInput, FilterState, reduce};
use crate::models::{DashboardFigures, Figure, Theme};
use crate::patch::{FigurePatch, apply_patch, retheme};
use crate::projection::project;
use crate::state::DashboardContext;
use crate::storage::{SavedChartSet, materialize_figure, resolve_theme, save_cards};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub theme: Theme,
    pub figures: DashboardFigures,
    pub filter: Option<FilterInput>,
    pub cards: CardRegistry,
    pub editor: EditorSession,
    pub quick_filter: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    FirstPaint { stored_dark: Option<bool>, os_prefers_dark: bool },
    FilterChanged(FilterInput),
    ThemeToggled { dark: bool },
    AddCard,
    RemoveCard { id: u64, clicks: u64 },
    EditCard { id: u64, clicks: u64 },
    ResetEditor,
    SaveEditor { chart_id: Option<u64>, figure: Option<Figure>, close: bool },
    SaveCharts,
    LoadCharts(SavedChartSet),
    QuickFilter { text: String },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::FirstPaint { .. } => "first_paint",
            Event::FilterChanged(_) => "filter_changed",
            Event::ThemeToggled { .. } => "theme_toggled",
            Event::AddCard => "add_card",
            Event::RemoveCard { .. } => "remove_card",
            Event::EditCard { .. } => "edit_card",
            Event::ResetEditor => "reset_editor",
            Event::SaveEditor { .. } => "save_editor",
            Event::SaveCharts => "save_charts",
            Event::LoadCharts(_) => "load_charts",
            Event::QuickFilter { .. } => "quick_filter",
        }
    }
}

/// Writes to the durable client store requested by a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PersistTheme(bool),
    PersistSavedCharts(SavedChartSet),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: Snapshot,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(prev: &Snapshot) -> Self {
        Self {
            next: prev.clone(),
            effects: Vec::new(),
        }
    }

    fn to(next: Snapshot) -> Self {
        Self {
            next,
            effects: Vec::new(),
        }
    }
}

pub fn dispatch(ctx: &DashboardContext, prev: &Snapshot, event: Event) -> Transition {
    let kind = event.kind();
    match apply(ctx, prev, event) {
        Ok(transition) => {
            debug!(event = kind, effects = transition.effects.len(), "event applied");
            transition
        }
        Err(err) => {
            warn!(event = kind, error = %err, "event left state unchanged");
            Transition::unchanged(prev)
        }
    }
}

fn require_cards(ctx: &DashboardContext) -> Result<(), ReduceError> {
    if ctx.supports_cards() {
        Ok(())
    } else {
        Err(ReduceError::Unsupported("chart cards"))
    }
}

fn apply(ctx: &DashboardContext, prev: &Snapshot, event: Event) -> Result<Transition, ReduceError> {
    let mut next = prev.clone();
    match event {
        Event::FirstPaint {
            stored_dark,
            os_prefers_dark,
        } => {
            let theme = resolve_theme(stored_dark, os_prefers_dark);
            next.theme = theme;
            next.figures = retheme(&prev.figures, theme);
            Ok(Transition::to(next))
        }
        Event::FilterChanged(input) => {
            let board = ctx.matches.as_ref().ok_or(ReduceError::Unsupported("filters"))?;
            let state = FilterState::try_from(&input)?;
            let view = reduce(&board.table, &board.columns, &state);
            let fresh = project(&view, &board.columns, board.domain, prev.theme)?;
            next.figures = DashboardFigures {
                primary: apply_patch(&prev.figures.primary, FigurePatch::replace(fresh.primary)),
                secondary: apply_patch(&prev.figures.secondary, FigurePatch::replace(fresh.secondary)),
                extremum: apply_patch(&prev.figures.extremum, FigurePatch::replace(fresh.extremum)),
            };
            next.filter = Some(input);
            debug!(rows = view.len(), "filters applied");
            Ok(Transition::to(next))
        }
        Event::ThemeToggled { dark } => {
            let theme = Theme::from_dark(dark);
            next.theme = theme;
            next.figures = retheme(&prev.figures, theme);
            Ok(Transition {
                next,
                effects: vec![Effect::PersistTheme(dark)],
            })
        }
        Event::AddCard => {
            require_cards(ctx)?;
            next.cards.add();
            Ok(Transition::to(next))
        }
        Event::RemoveCard { id, clicks } => {
            require_cards(ctx)?;
            if next.cards.remove(id, clicks) {
                next.editor.forget(id);
            }
            Ok(Transition::to(next))
        }
        Event::EditCard { id, clicks } => {
            require_cards(ctx)?;
            next.editor.begin_edit(&next.cards, id, clicks);
            Ok(Transition::to(next))
        }
        Event::ResetEditor => {
            require_cards(ctx)?;
            next.editor.reset(&next.cards);
            Ok(Transition::to(next))
        }
        Event::SaveEditor {
            chart_id,
            figure,
            close,
        } => {
            require_cards(ctx)?;
            next.editor.save(&mut next.cards, chart_id, figure, close);
            Ok(Transition::to(next))
        }
        Event::SaveCharts => {
            require_cards(ctx)?;
            let saved = save_cards(prev.cards.figures());
            Ok(Transition {
                next,
                effects: vec![Effect::PersistSavedCharts(saved)],
            })
        }
        Event::LoadCharts(saved) => {
            require_cards(ctx)?;
            let table = ctx.main_table();
            let figures = saved.iter().map(|figure| materialize_figure(figure, table)).collect();
            next.cards.load_saved(figures);
            next.editor.detach();
            Ok(Transition::to(next))
        }
        Event::QuickFilter { text } => {
            next.quick_filter = text;
            Ok(Transition::to(next))
        }
    }
}
