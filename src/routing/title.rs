//! Title validation module
//!
//! The path grammar lives here and nowhere else. Each grammar is one
//! compiled pattern, built on first use and shared for the process lifetime.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::error::{Result, WikiError};
use crate::storage::Title;

static STRICT_PATH: OnceLock<Regex> = OnceLock::new();
static PERMISSIVE_PATH: OnceLock<Regex> = OnceLock::new();

fn strict_path() -> &'static Regex {
    STRICT_PATH.get_or_init(|| {
        Regex::new(r"^/(edit|save|view)/([a-zA-Z0-9]+)$").expect("strict path pattern is valid")
    })
}

fn permissive_path() -> &'static Regex {
    PERMISSIVE_PATH.get_or_init(|| {
        Regex::new(r"^/([a-zA-Z0-9]+)(?:/([a-zA-Z0-9]+))?$")
            .expect("permissive path pattern is valid")
    })
}

/// Which path shapes are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
    /// Only `/{operation}/{title}`
    #[default]
    Strict,
    /// Also `/{title}`, treated as a request to view that title
    Permissive,
}

/// Operation selected by the first path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    View,
    Edit,
    Save,
    /// Bare `/{title}` under the permissive grammar
    Alias,
}

impl Operation {
    /// Parse a recognized operation segment; `Alias` has no segment
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            "save" => Some(Self::Save),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Save => "save",
            Self::Alias => "alias",
        }
    }

    /// Canonical path for this operation on `title`
    pub fn path_for(self, title: &Title) -> String {
        match self {
            Self::Alias => format!("/{title}"),
            op => format!("/{}/{title}", op.as_str()),
        }
    }
}

/// A validated request target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub operation: Operation,
    pub title: Title,
}

/// Parse a request path into an operation and title
///
/// Pure function of its input. Anything outside the grammar is
/// `WikiError::InvalidTitle`.
pub fn validate(path: &str, grammar: Grammar) -> Result<Route> {
    let invalid = || WikiError::InvalidTitle(path.to_string());

    let (operation, title) = match grammar {
        Grammar::Strict => {
            let caps = strict_path().captures(path).ok_or_else(invalid)?;
            let operation = Operation::from_segment(&caps[1]).ok_or_else(invalid)?;
            (operation, caps[2].to_string())
        }
        Grammar::Permissive => {
            let caps = permissive_path().captures(path).ok_or_else(invalid)?;
            match caps.get(2) {
                // Explicit title slot: the first segment must name an operation
                Some(title) => {
                    let operation = Operation::from_segment(&caps[1]).ok_or_else(invalid)?;
                    (operation, title.as_str().to_string())
                }
                // Only one segment: it is the title
                None => (Operation::Alias, caps[1].to_string()),
            }
        }
    };

    Ok(Route {
        operation,
        title: Title::parse(&title)?,
    })
}
