use crate::models::{DashboardFigures, Figure, Theme};
use serde_json::{Map, Value};

/// How a patch treats the existing layout.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutPatch {
    /// Swap the whole layout.
    Replace(Map<String, Value>),
    /// Overwrite only the listed top-level keys.
    Merge(Map<String, Value>),
}

/// Partial figure update. `None` leaves that half of the figure untouched;
/// `data` is always replaced wholesale when present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FigurePatch {
    pub data: Option<Vec<Value>>,
    pub layout: Option<LayoutPatch>,
}

impl FigurePatch {
    pub fn replace(figure: Figure) -> Self {
        Self {
            data: Some(figure.data),
            layout: Some(LayoutPatch::Replace(figure.layout)),
        }
    }
}

pub fn apply_patch(existing: &Figure, patch: FigurePatch) -> Figure {
    let mut next = existing.clone();
    if let Some(data) = patch.data {
        next.data = data;
    }
    match patch.layout {
        Some(LayoutPatch::Replace(layout)) => next.layout = layout,
        Some(LayoutPatch::Merge(fields)) => next.layout.extend(fields),
        None => {}
    }
    next
}

pub fn theme_patch(theme: Theme) -> FigurePatch {
    let mut fields = Map::new();
    fields.insert("template".into(), Value::String(theme.template().to_string()));
    FigurePatch {
        data: None,
        layout: Some(LayoutPatch::Merge(fields)),
    }
}

pub fn retheme(figures: &DashboardFigures, theme: Theme) -> DashboardFigures {
    DashboardFigures {
        primary: apply_patch(&figures.primary, theme_patch(theme)),
        secondary: apply_patch(&figures.secondary, theme_patch(theme)),
        extremum: apply_patch(&figures.extremum, theme_patch(theme)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn figure() -> Figure {
        let mut layout = Map::new();
        layout.insert("template".into(), json!("plotly_white"));
        layout.insert("title".into(), json!({ "text": "Attendance" }));
        Figure {
            data: vec![json!({ "type": "scatter", "y": [1, 2] })],
            layout,
        }
    }

    #[test]
    fn theme_patch_keeps_data_and_other_layout_keys() {
        let before = figure();
        let after = apply_patch(&before, theme_patch(Theme::Dark));
        assert_eq!(after.data, before.data);
        assert_eq!(after.layout["template"], "plotly_dark");
        assert_eq!(after.layout["title"], before.layout["title"]);
    }

    #[test]
    fn replace_swaps_both_halves() {
        let before = figure();
        let after = apply_patch(&before, FigurePatch::replace(Figure::empty()));
        assert_eq!(after, Figure::empty());
    }

    #[test]
    fn data_only_patch_leaves_layout() {
        let before = figure();
        let patch = FigurePatch {
            data: Some(Vec::new()),
            layout: None,
        };
        let after = apply_patch(&before, patch);
        assert!(after.data.is_empty());
        assert_eq!(after.layout, before.layout);
    }
}
