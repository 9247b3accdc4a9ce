use crate::models::{Card, Figure};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Ordered chart cards for one session. Ids start at 1 and are never reused
/// until the set is reloaded from storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardRegistry {
    cards: Vec<Card>,
    next_id: u64,
}

impl Default for CardRegistry {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            next_id: 1,
        }
    }
}

fn make_card(id: u64, figure: Figure) -> Card {
    Card {
        id,
        title: format!("Figure {id}"),
        figure,
    }
}

impl CardRegistry {
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn ids(&self) -> Vec<u64> {
        self.cards.iter().map(|card| card.id).collect()
    }

    pub fn get(&self, id: u64) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn add(&mut self) -> u64 {
        let id = self.next_id;
        self.cards.push(make_card(id, Figure::empty()));
        self.next_id += 1;
        id
    }

    /// A zero click count comes from the initial render of the delete
    /// button and never removes anything.
    pub fn remove(&mut self, id: u64, clicks: u64) -> bool {
        if clicks == 0 {
            return false;
        }
        let Some(position) = self.cards.iter().position(|card| card.id == id) else {
            debug!(id, "remove for unknown card ignored");
            return false;
        };
        self.cards.remove(position);
        true
    }

    pub fn replace_figure(&mut self, id: u64, figure: Figure) -> bool {
        match self.cards.iter_mut().find(|card| card.id == id) {
            Some(card) => {
                card.figure = figure;
                true
            }
            None => false,
        }
    }

    pub fn load_saved(&mut self, figures: Vec<Figure>) {
        self.cards = figures
            .into_iter()
            .zip(1u64..)
            .map(|(figure, id)| make_card(id, figure))
            .collect();
        self.next_id = self.cards.len() as u64 + 1;
    }

    pub fn figures(&self) -> impl Iterator<Item = &Figure> {
        self.cards.iter().map(|card| &card.figure)
    }
}

/// State of the chart editor modal.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EditorSession {
    pub opened: bool,
    pub chart_id: Option<u64>,
    pub loaded_figure: Option<Figure>,
    /// Highest cumulative edit count seen per card.
    #[serde(skip)]
    watermarks: BTreeMap<u64, u64>,
}

fn committed_or_empty(registry: &CardRegistry, id: u64) -> Figure {
    registry
        .get(id)
        .map(|card| &card.figure)
        .filter(|figure| figure.has_data())
        .cloned()
        .unwrap_or_else(Figure::empty)
}

impl EditorSession {
    pub fn watermark(&self, id: u64) -> u64 {
        self.watermarks.get(&id).copied().unwrap_or(0)
    }

    /// Opens the editor on `id` when `clicks` rises above the watermark.
    /// The watermark only moves up; stale or replayed counts are ignored.
    pub fn begin_edit(&mut self, registry: &CardRegistry, id: u64, clicks: u64) -> bool {
        if clicks <= self.watermark(id) || registry.get(id).is_none() {
            return false;
        }

        self.watermarks.insert(id, clicks);
        self.loaded_figure = Some(committed_or_empty(registry, id));
        self.chart_id = Some(id);
        self.opened = true;
        true
    }

    /// Puts the committed figure back into the editor, dropping unsaved edits.
    pub fn reset(&mut self, registry: &CardRegistry) -> bool {
        let Some(id) = self.chart_id else {
            return false;
        };
        self.loaded_figure = Some(committed_or_empty(registry, id));
        true
    }

    pub fn save(
        &mut self,
        registry: &mut CardRegistry,
        chart_id: Option<u64>,
        figure: Option<Figure>,
        close: bool,
    ) -> bool {
        if close {
            self.opened = false;
        }
        let (Some(id), Some(figure)) = (chart_id.or(self.chart_id), figure) else {
            return close;
        };
        let saved = registry.replace_figure(id, figure);
        if !saved {
            debug!(id, "save for unknown card ignored");
        }
        saved || close
    }

    pub fn forget(&mut self, id: u64) {
        self.watermarks.remove(&id);
    }

    /// Drops per-card bookkeeping after the registry was rebuilt.
    pub fn detach(&mut self) {
        self.watermarks.clear();
        self.opened = false;
        self.chart_id = None;
        self.loaded_figure = None;
    }
}
