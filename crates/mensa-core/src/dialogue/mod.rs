//! Dialogue layer: structured turn input, response directives and the
//! orchestrating engine.
//!
//! Intent classification and entity extraction happen upstream; a turn
//! arrives here as an intent name plus optional entity strings.

pub mod engine;
pub mod response;

pub use engine::{DialogueEngine, TurnOutcome};
pub use response::Response;

use serde::{Deserialize, Serialize};

/// Intent of a user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greet,
    Goodbye,
    /// "What's on the menu?"
    AskMenu,
    /// User supplies slot values, usually after a prompt
    Inform,
    SelectCategory,
    SetDate,
    Reset,
    /// Anything the engine has no rule for
    Other(String),
}

impl Intent {
    /// Map an upstream intent name
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "greet" => Intent::Greet,
            "goodbye" => Intent::Goodbye,
            "ask_menu" | "check_menu" => Intent::AskMenu,
            "inform" | "set_canteen" => Intent::Inform,
            "select_category" | "show_category" => Intent::SelectCategory,
            "set_menu_date" | "set_date" => Intent::SetDate,
            "reset" | "reset_menu" => Intent::Reset,
            _ => Intent::Other(name.to_string()),
        }
    }

    /// Whether slot entities are applied before the intent is handled
    pub fn applies_slots(&self) -> bool {
        !matches!(self, Intent::Greet | Intent::Goodbye | Intent::Reset)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Greet => write!(f, "greet"),
            Intent::Goodbye => write!(f, "goodbye"),
            Intent::AskMenu => write!(f, "ask_menu"),
            Intent::Inform => write!(f, "inform"),
            Intent::SelectCategory => write!(f, "select_category"),
            Intent::SetDate => write!(f, "set_menu_date"),
            Intent::Reset => write!(f, "reset"),
            Intent::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Entity values extracted from the user's message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canteen: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// One structured user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInput {
    pub intent: String,

    #[serde(default)]
    pub entities: Entities,
}

impl TurnInput {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            entities: Entities::default(),
        }
    }

    pub fn with_canteen(mut self, canteen: impl Into<String>) -> Self {
        self.entities.canteen = Some(canteen.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.entities.date = Some(date.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.entities.category = Some(category.into());
        self
    }

    pub fn intent(&self) -> Intent {
        Intent::from_name(&self.intent)
    }
}

/// Trimmed, non-empty entity value
pub(crate) fn entity(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
