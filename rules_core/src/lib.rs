use serde::{Deserialize, Serialize};
use std::fmt;

pub mod drag;
pub mod error;
pub mod filter;
pub mod image;
pub mod settings;
pub mod table;
pub mod tablecmd;

pub use drag::DragState;
pub use error::{FilterParseError, PayloadError, TableError};
pub use filter::{FilterLines, display_lines, kind_of_word, parse_filter_spec};
pub use image::{ImageSource, PickedImage};
pub use settings::{MissingPolicy, SelectionMode, Settings};
pub use table::RuleTable;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub type RowId = u64;

/// What a fragment of a filter expression stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Condition,
    Operator,
    Value,
}

impl TokenKind {
    pub fn label(self) -> &'static str {
        match self {
            TokenKind::Condition => "condition",
            TokenKind::Operator => "operator",
            TokenKind::Value => "value",
        }
    }
}

/// One labeled fragment of a rule's filter expression.
/// Order inside a rule matters: conditions start new display lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterToken {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl FilterToken {
    pub fn new(text: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn condition(text: impl Into<String>) -> Self {
        Self::new(text, TokenKind::Condition)
    }

    pub fn operator(text: impl Into<String>) -> Self {
        Self::new(text, TokenKind::Operator)
    }

    pub fn value(text: impl Into<String>) -> Self {
        Self::new(text, TokenKind::Value)
    }
}

impl fmt::Display for FilterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.text, self.kind.label())
    }
}

/// An image placed into one cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Displayable payload, a `data:` URL.
    pub image: String,
    /// Usually the name of the uploaded file.
    pub title: String,
}

impl Assignment {
    pub fn new(image: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            title: title.into(),
        }
    }
}

pub type Cell = Option<Assignment>;

/// One row of the table: a filter plus one cell per variant column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RowId,
    pub filter: Vec<FilterToken>,
    pub variants: Vec<Cell>,
}

impl Rule {
    pub fn new(id: RowId, filter: Vec<FilterToken>, columns: usize) -> Self {
        Self {
            id,
            filter,
            variants: vec![None; columns],
        }
    }

    pub fn assigned_count(&self) -> usize {
        self.variants.iter().filter(|c| c.is_some()).count()
    }
}

/// Header text for a variant column. Column 0 is the protected primary one.
pub fn column_label(index: usize) -> String {
    if index == 0 {
        "Primary".to_string()
    } else {
        format!("Variant {}", index + 1)
    }
}

/// A helper: the two demonstration rules a fresh table starts with.
pub fn sample_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            1,
            vec![
                FilterToken::condition("image_list.ProductImage2"),
                FilterToken::operator("isEmpty"),
                FilterToken::condition("AND Discount Percentage"),
                FilterToken::operator("is"),
                FilterToken::value("0"),
            ],
            2,
        ),
        Rule::new(
            2,
            vec![
                FilterToken::condition("tags"),
                FilterToken::operator("contains"),
                FilterToken::value("onsale"),
            ],
            2,
        ),
    ]
}
