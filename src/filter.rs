//! Playlist filters
//!
//! Boolean expressions over track tags, used by the playlist builder and by
//! Rhythmbox automatic playlists. A predicate on a missing tag is false.

use crate::model::{Tag, TagValue, Track};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Anything that can accept or reject a track
pub trait TrackFilter: Send + Sync {
    fn matches(&self, track: &Track) -> bool;
}

/// Composable filter expression
#[derive(Clone)]
pub enum FilterExpr {
    /// Always true or always false
    Const(bool),
    Predicate(Predicate),
    /// True when every child is true; stops at the first false
    And(Vec<FilterExpr>),
    /// True when any child is true; stops at the first true
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    /// User-supplied filter
    Custom(Arc<dyn TrackFilter>),
}

impl FilterExpr {
    pub fn and(filters: Vec<FilterExpr>) -> Self {
        FilterExpr::And(filters)
    }

    pub fn or(filters: Vec<FilterExpr>) -> Self {
        FilterExpr::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(filter))
    }

    pub fn custom(filter: impl TrackFilter + 'static) -> Self {
        FilterExpr::Custom(Arc::new(filter))
    }

    /// Evaluate against a track
    pub fn matches(&self, track: &Track) -> bool {
        match self {
            FilterExpr::Const(value) => *value,
            FilterExpr::Predicate(predicate) => predicate.matches(track),
            FilterExpr::And(filters) => filters.iter().all(|f| f.matches(track)),
            FilterExpr::Or(filters) => filters.iter().any(|f| f.matches(track)),
            FilterExpr::Not(filter) => !filter.matches(track),
            FilterExpr::Custom(filter) => filter.matches(track),
        }
    }
}

impl TrackFilter for FilterExpr {
    fn matches(&self, track: &Track) -> bool {
        FilterExpr::matches(self, track)
    }
}

impl From<Predicate> for FilterExpr {
    fn from(predicate: Predicate) -> Self {
        FilterExpr::Predicate(predicate)
    }
}

impl fmt::Debug for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Const(value) => write!(f, "Const({})", value),
            FilterExpr::Predicate(predicate) => write!(f, "{:?}", predicate),
            FilterExpr::And(filters) => f.debug_tuple("And").field(filters).finish(),
            FilterExpr::Or(filters) => f.debug_tuple("Or").field(filters).finish(),
            FilterExpr::Not(filter) => f.debug_tuple("Not").field(filter).finish(),
            FilterExpr::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How a text predicate compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    /// Equals one element of a `/`-separated multi-value tag
    Has,
}

/// A single test against one tag
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Text comparison; numbers and dates compare by their printed form
    Text {
        tag: Tag,
        mode: TextMatch,
        value: String,
        case_sensitive: bool,
    },
    /// Inclusive range; dates compare by day number
    Range {
        tag: Tag,
        min: Option<f64>,
        max: Option<f64>,
    },
    Less { tag: Tag, value: f64 },
    Greater { tag: Tag, value: f64 },
    /// Tag is present and not empty
    Exists { tag: Tag },
}

impl Predicate {
    pub fn text(tag: Tag, mode: TextMatch, value: impl Into<String>) -> Self {
        Predicate::Text {
            tag,
            mode,
            value: value.into(),
            case_sensitive: false,
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Predicate::Text { tag, .. }
            | Predicate::Range { tag, .. }
            | Predicate::Less { tag, .. }
            | Predicate::Greater { tag, .. }
            | Predicate::Exists { tag } => *tag,
        }
    }

    /// Evaluate against a track
    pub fn matches(&self, track: &Track) -> bool {
        let Some(track_value) = track.tag(self.tag()) else {
            return false;
        };

        match self {
            Predicate::Text {
                tag,
                mode,
                value,
                case_sensitive,
            } => {
                let expected = fold(value, *case_sensitive);
                if *mode == TextMatch::Has {
                    return track
                        .split_tag(*tag)
                        .into_iter()
                        .any(|part| fold(part, *case_sensitive) == expected);
                }
                if let (TagValue::Number(actual), Ok(wanted)) = (track_value, value.parse::<f64>()) {
                    if *mode == TextMatch::Equals {
                        return *actual == wanted;
                    }
                }

                let rendered = track_value.to_string();
                let actual = fold(&rendered, *case_sensitive);
                match mode {
                    TextMatch::Equals => actual == expected,
                    TextMatch::Contains => actual.contains(&*expected),
                    TextMatch::StartsWith => actual.starts_with(&*expected),
                    TextMatch::EndsWith => actual.ends_with(&*expected),
                    TextMatch::Has => false,
                }
            }
            Predicate::Range { min, max, .. } => match track_value.as_number() {
                Some(n) => min.map_or(true, |min| n >= min) && max.map_or(true, |max| n <= max),
                None => false,
            },
            Predicate::Less { value, .. } => track_value.as_number().is_some_and(|n| n < *value),
            Predicate::Greater { value, .. } => {
                track_value.as_number().is_some_and(|n| n > *value)
            }
            Predicate::Exists { .. } => match track_value {
                TagValue::Text(text) => !text.trim().is_empty(),
                _ => true,
            },
        }
    }
}

fn fold(text: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.to_lowercase())
    }
}
