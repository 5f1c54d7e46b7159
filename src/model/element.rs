//! Output elements of the reading-order document model.

use serde::{Deserialize, Serialize};

/// A top-level element of `elements.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// A body-text block made of text runs and inline crops
    Block {
        /// Children in reading order
        childs: Vec<Child>,
    },
    /// A cropped non-text region
    Shot {
        /// Relative path of the image asset
        path: String,
    },
}

/// A child of a block element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Child {
    /// Body text
    Text {
        /// The text
        text: String,
    },
    /// Inline content rendered as an image (formula, inset font, ...)
    Shot {
        /// Relative path of the image asset
        path: String,
    },
}

impl Element {
    /// Check if this is a block element.
    pub fn is_block(&self) -> bool {
        matches!(self, Element::Block { .. })
    }

    /// Check if this is a shot element.
    pub fn is_shot(&self) -> bool {
        matches!(self, Element::Shot { .. })
    }

    /// Plain text of a block element; empty for shots.
    pub fn plain_text(&self) -> String {
        match self {
            Element::Block { childs } => childs
                .iter()
                .filter_map(|c| match c {
                    Child::Text { text } => Some(text.as_str()),
                    Child::Shot { .. } => None,
                })
                .collect(),
            Element::Shot { .. } => String::new(),
        }
    }
}
