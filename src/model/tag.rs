use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Track tags understood across platforms
///
/// Platforms map their native field names onto these; anything they do not
/// map stays in the track's preserved data and is written back untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Title,
    Artist,
    Remixer,
    Album,
    Genre,
    Label,
    Key,
    Comments,
    Bpm,
    Rating,
    Year,
    PlayCount,
    DateAdded,
}

/// Value type carried by a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Text,
    Number,
    Date,
}

impl Tag {
    pub const ALL: [Tag; 13] = [
        Tag::Title,
        Tag::Artist,
        Tag::Remixer,
        Tag::Album,
        Tag::Genre,
        Tag::Label,
        Tag::Key,
        Tag::Comments,
        Tag::Bpm,
        Tag::Rating,
        Tag::Year,
        Tag::PlayCount,
        Tag::DateAdded,
    ];

    pub fn kind(&self) -> TagKind {
        match self {
            Tag::Bpm | Tag::Rating | Tag::Year | Tag::PlayCount => TagKind::Number,
            Tag::DateAdded => TagKind::Date,
            _ => TagKind::Text,
        }
    }

    /// Name used in config files
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Title => "title",
            Tag::Artist => "artist",
            Tag::Remixer => "remixer",
            Tag::Album => "album",
            Tag::Genre => "genre",
            Tag::Label => "label",
            Tag::Key => "key",
            Tag::Comments => "comments",
            Tag::Bpm => "bpm",
            Tag::Rating => "rating",
            Tag::Year => "year",
            Tag::PlayCount => "play_count",
            Tag::DateAdded => "date_added",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let tag = match normalized.as_str() {
            "title" | "name" => Tag::Title,
            "artist" => Tag::Artist,
            "remixer" => Tag::Remixer,
            "album" => Tag::Album,
            "genre" => Tag::Genre,
            "label" => Tag::Label,
            "key" | "tonality" => Tag::Key,
            "comments" | "comment" => Tag::Comments,
            "bpm" | "average_bpm" => Tag::Bpm,
            "rating" => Tag::Rating,
            "year" => Tag::Year,
            "play_count" | "playcount" => Tag::PlayCount,
            "date_added" | "dateadded" => Tag::DateAdded,
            _ => return Err(format!("unknown tag '{}'", s)),
        };
        Ok(tag)
    }
}

/// A typed tag value
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl TagValue {
    pub fn kind(&self) -> TagKind {
        match self {
            TagValue::Text(_) => TagKind::Text,
            TagValue::Number(_) => TagKind::Number,
            TagValue::Date(_) => TagKind::Date,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric view used by range comparisons
    ///
    /// Dates compare as their day number since the common era.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TagValue::Number(n) => Some(*n),
            TagValue::Date(date) => Some(date.num_days_from_ce() as f64),
            TagValue::Text(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            TagValue::Date(date) => Some(*date),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Text(text) => f.write_str(text),
            TagValue::Number(n) => write!(f, "{}", n),
            TagValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Number(value)
    }
}

impl From<NaiveDate> for TagValue {
    fn from(value: NaiveDate) -> Self {
        TagValue::Date(value)
    }
}
