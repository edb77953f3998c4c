//! Column descriptors: the declarative surface of the queryable view.

use serde::Serialize;

/// Semantic type of a column, used to cast drill-down equality values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ColonneKind {
    #[default]
    Text,
    Integer,
}

/// Descriptor for one queryable column.
///
/// `code` is the exact column identifier of the view. `concatenate` names a
/// companion column carried along when this column is used as a grouping
/// key, so the aggregation rows keep a human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Colonne {
    pub code: &'static str,
    pub label: &'static str,
    pub kind: ColonneKind,
    /// Whether the column is visible by default in the tabular view.
    pub default_visible: bool,
    pub concatenate: Option<&'static str>,
}

impl Colonne {
    pub const fn text(code: &'static str, label: &'static str) -> Self {
        Self {
            code,
            label,
            kind: ColonneKind::Text,
            default_visible: true,
            concatenate: None,
        }
    }

    pub const fn integer(code: &'static str, label: &'static str) -> Self {
        Self {
            code,
            label,
            kind: ColonneKind::Integer,
            default_visible: true,
            concatenate: None,
        }
    }

    pub const fn with_concatenate(mut self, companion: &'static str) -> Self {
        self.concatenate = Some(companion);
        self
    }

    pub const fn hidden(mut self) -> Self {
        self.default_visible = false;
        self
    }
}
