//! Configuration
//!
//! Settings live in a TOML file (`collection.toml` by default). The
//! playlist structure for the builder is part of it:
//!
//! ```toml
//! platform = "rekordbox"
//! collection_path = "~/rekordbox.xml"
//!
//! [[playlists]]
//! name = "Genres"
//!
//! [[playlists.children]]
//! name = "House"
//! filter = { op = "has", tag = "genre", value = "house" }
//! ```

use crate::builder::Node;
use crate::error::{CollectionError, Result};
use crate::filter::{FilterExpr, Predicate, TextMatch};
use crate::model::{Tag, TagKind, TagValue};
use crate::platform::Platform;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "collection.toml";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Platform name, resolved through the registry
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Collection file to load
    pub collection_path: String,

    /// Where build and shuffle write the result (defaults to `collection_path`)
    #[serde(default)]
    pub output_path: Option<String>,

    /// Playlists whose tracks are shuffled
    #[serde(default)]
    pub shuffle_playlists: Vec<String>,

    /// Playlists whose audio files are copied
    #[serde(default)]
    pub copy_playlists: Vec<String>,

    /// Directory receiving copied audio files
    #[serde(default)]
    pub copy_destination: Option<String>,

    /// Local root replacing everything up to the shared `DJ Music` folder
    #[serde(default)]
    pub media_root: Option<String>,

    /// Playlist structure for the builder
    #[serde(default)]
    pub playlists: Vec<RawNode>,
}

fn default_platform() -> String {
    Platform::Rekordbox.name().to_string()
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl Config {
    /// Create a configuration for the collection at `collection_path`
    pub fn new(collection_path: impl Into<String>) -> Self {
        Self {
            platform: default_platform(),
            collection_path: collection_path.into(),
            output_path: None,
            shuffle_playlists: Vec::new(),
            copy_playlists: Vec::new(),
            copy_destination: None,
            media_root: None,
            playlists: Vec::new(),
        }
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CollectionError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CollectionError::Config(e.to_string()))
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform.name().to_string();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_shuffle_playlists(mut self, names: Vec<String>) -> Self {
        self.shuffle_playlists = names;
        self
    }

    /// Set the playlists to copy and where their audio goes
    pub fn with_copy_playlists(mut self, names: Vec<String>, destination: impl Into<String>) -> Self {
        self.copy_playlists = names;
        self.copy_destination = Some(destination.into());
        self
    }

    pub fn with_media_root(mut self, root: impl Into<String>) -> Self {
        self.media_root = Some(root.into());
        self
    }

    pub fn with_playlists(mut self, playlists: Vec<RawNode>) -> Self {
        self.playlists = playlists;
        self
    }

    pub fn platform(&self) -> Result<Platform> {
        self.platform.parse()
    }

    pub fn collection_path(&self) -> PathBuf {
        expand(&self.collection_path)
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => expand(path),
            None => self.collection_path(),
        }
    }

    pub fn copy_destination(&self) -> Result<PathBuf> {
        self.copy_destination
            .as_deref()
            .map(expand)
            .ok_or_else(|| CollectionError::Config("copy_destination is not set".to_string()))
    }

    pub fn media_root(&self) -> Result<PathBuf> {
        self.media_root
            .as_deref()
            .map(expand)
            .ok_or_else(|| CollectionError::Config("media_root is not set".to_string()))
    }

    /// Compile the playlist structure; fails before anything is built
    pub fn playlist_structure(&self) -> Result<Vec<Node>> {
        if self.playlists.is_empty() {
            return Err(CollectionError::Config(
                "no playlists configured for the builder".to_string(),
            ));
        }
        self.playlists.iter().map(RawNode::compile).collect()
    }
}

/// Playlist structure node as written in the config file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawNode {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RawNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<RawFilter>,
}

impl RawNode {
    pub fn folder(name: impl Into<String>, children: Vec<RawNode>) -> Self {
        Self {
            name: name.into(),
            children: Some(children),
            filter: None,
        }
    }

    pub fn rule(name: impl Into<String>, filter: RawFilter) -> Self {
        Self {
            name: name.into(),
            children: None,
            filter: Some(filter),
        }
    }

    pub fn compile(&self) -> Result<Node> {
        if self.name.trim().is_empty() {
            return Err(CollectionError::Config("playlist node without a name".to_string()));
        }
        match (&self.children, &self.filter) {
            (Some(children), None) => Ok(Node::folder(
                self.name.as_str(),
                children.iter().map(RawNode::compile).collect::<Result<_>>()?,
            )),
            (None, Some(filter)) => Ok(Node::rule(self.name.as_str(), filter.compile()?)),
            (Some(_), Some(_)) => Err(CollectionError::Config(format!(
                "'{}' has both children and a filter",
                self.name
            ))),
            (None, None) => Err(CollectionError::Config(format!(
                "'{}' needs either children or a filter",
                self.name
            ))),
        }
    }
}

/// Filter as written in the config file
///
/// `op` selects the operator; the other fields are used as it requires:
///
/// | op | fields |
/// |----|--------|
/// | `equals`, `contains`, `starts_with`, `ends_with`, `has` | `tag`, `value`, `case_sensitive` |
/// | `range` | `tag`, `min` and/or `max` |
/// | `less`, `greater` | `tag`, `value` |
/// | `exists` | `tag` |
/// | `and`, `or` | `filters` |
/// | `not` | `filter` |
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawFilter {
    pub op: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<toml::Value>,

    #[serde(default)]
    pub case_sensitive: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<toml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<toml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<RawFilter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<RawFilter>>,
}

impl RawFilter {
    /// Text comparison filter
    pub fn text(op: &str, tag: &str, value: impl Into<String>) -> Self {
        Self {
            op: op.to_string(),
            tag: Some(tag.to_string()),
            value: Some(toml::Value::String(value.into())),
            ..Self::default()
        }
    }

    pub fn compile(&self) -> Result<FilterExpr> {
        let op = self.op.to_ascii_lowercase().replace('-', "_");
        let text_mode = match op.as_str() {
            "equals" => Some(TextMatch::Equals),
            "contains" => Some(TextMatch::Contains),
            "starts_with" => Some(TextMatch::StartsWith),
            "ends_with" => Some(TextMatch::EndsWith),
            "has" => Some(TextMatch::Has),
            _ => None,
        };
        if let Some(mode) = text_mode {
            return Ok(Predicate::Text {
                tag: self.tag()?,
                mode,
                value: scalar_text(self.required("value", &self.value)?),
                case_sensitive: self.case_sensitive,
            }
            .into());
        }

        match op.as_str() {
            "range" => {
                let tag = self.comparable_tag()?;
                let min = self.min.as_ref().map(|v| bound(tag, v)).transpose()?;
                let max = self.max.as_ref().map(|v| bound(tag, v)).transpose()?;
                if min.is_none() && max.is_none() {
                    return Err(self.missing("min or max"));
                }
                Ok(Predicate::Range { tag, min, max }.into())
            }
            "less" | "greater" => {
                let tag = self.comparable_tag()?;
                let value = bound(tag, self.required("value", &self.value)?)?;
                let predicate = if op == "less" {
                    Predicate::Less { tag, value }
                } else {
                    Predicate::Greater { tag, value }
                };
                Ok(predicate.into())
            }
            "exists" => Ok(Predicate::Exists { tag: self.tag()? }.into()),
            "and" | "or" => {
                let filters = self
                    .required("filters", &self.filters)?
                    .iter()
                    .map(RawFilter::compile)
                    .collect::<Result<Vec<_>>>()?;
                if filters.is_empty() {
                    return Err(self.missing("filters"));
                }
                Ok(if op == "and" {
                    FilterExpr::and(filters)
                } else {
                    FilterExpr::or(filters)
                })
            }
            "not" => Ok(FilterExpr::not(self.required("filter", &self.filter)?.compile()?)),
            _ => Err(CollectionError::Config(format!("unknown filter operator '{}'", self.op))),
        }
    }

    fn tag(&self) -> Result<Tag> {
        self.required("tag", &self.tag)?
            .parse()
            .map_err(CollectionError::Config)
    }

    /// Tag usable with numeric comparisons
    fn comparable_tag(&self) -> Result<Tag> {
        let tag = self.tag()?;
        if tag.kind() == TagKind::Text {
            return Err(CollectionError::Config(format!(
                "'{}' cannot compare text tag '{}'",
                self.op, tag
            )));
        }
        Ok(tag)
    }

    fn required<'a, T>(&self, field: &str, value: &'a Option<T>) -> Result<&'a T> {
        value.as_ref().ok_or_else(|| self.missing(field))
    }

    fn missing(&self, field: &str) -> CollectionError {
        CollectionError::Config(format!("filter '{}' requires {}", self.op, field))
    }
}

fn scalar_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Numeric bound of a comparison; dates become day numbers
fn bound(tag: Tag, value: &toml::Value) -> Result<f64> {
    match (tag.kind(), value) {
        (TagKind::Number, toml::Value::Integer(n)) => Ok(*n as f64),
        (TagKind::Number, toml::Value::Float(n)) => Ok(*n),
        (TagKind::Number, toml::Value::String(text)) => text
            .trim()
            .parse()
            .map_err(|_| CollectionError::Config(format!("'{}' is not a number", text))),
        (TagKind::Date, toml::Value::String(text)) => {
            let date = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map_err(|_| CollectionError::Config(format!("'{}' is not a date (YYYY-MM-DD)", text)))?;
            day_number(date)
        }
        (TagKind::Date, toml::Value::Datetime(datetime)) => {
            let date = datetime
                .date
                .and_then(|d| NaiveDate::from_ymd_opt(d.year as i32, d.month as u32, d.day as u32))
                .ok_or_else(|| CollectionError::Config(format!("'{}' is not a date", datetime)))?;
            day_number(date)
        }
        (_, other) => Err(CollectionError::Config(format!(
            "invalid bound {} for tag '{}'",
            other, tag
        ))),
    }
}

fn day_number(date: NaiveDate) -> Result<f64> {
    TagValue::Date(date)
        .as_number()
        .ok_or_else(|| CollectionError::Config(format!("invalid date {}", date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;

    const CONFIG: &str = r#"
platform = "rhythmbox"
collection_path = "/music/rhythmdb.xml"
shuffle_playlists = ["Warmup", "Peak"]

[[playlists]]
name = "Genres"

[[playlists.children]]
name = "House"
filter = { op = "has", tag = "genre", value = "house" }

[[playlists.children]]
name = "Fast Techno"

[playlists.children.filter]
op = "and"
filters = [
    { op = "has", tag = "genre", value = "techno" },
    { op = "range", tag = "bpm", min = 130 },
]

[[playlists]]
name = "Recent"
filter = { op = "range", tag = "date_added", min = 2024-01-01 }
"#;

    fn compile(filter: &str) -> Result<FilterExpr> {
        let raw: RawFilter = toml::from_str(filter).map_err(|e| CollectionError::Config(e.to_string()))?;
        raw.compile()
    }

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml(CONFIG).unwrap();
        assert_eq!(config.platform().unwrap(), Platform::Rhythmbox);
        assert_eq!(config.shuffle_playlists, vec!["Warmup", "Peak"]);
        assert_eq!(config.output_path(), PathBuf::from("/music/rhythmdb.xml"));

        let nodes = config.playlist_structure().unwrap();
        assert_eq!(nodes.len(), 2);
        let Node::Folder { children, .. } = &nodes[0] else {
            panic!("expected a folder");
        };
        assert_eq!(children[1].name(), "Fast Techno");
    }

    #[test]
    fn test_compiled_rules_match() {
        let config = Config::from_toml(CONFIG).unwrap();
        let nodes = config.playlist_structure().unwrap();
        let Node::Folder { children, .. } = &nodes[0] else {
            panic!("expected a folder");
        };
        let Node::Rule { filter, .. } = &children[1] else {
            panic!("expected a rule");
        };

        let mut track = Track::new("1", "/a.mp3");
        track.set_tag(Tag::Genre, "Minimal / Techno").unwrap();
        track.set_tag(Tag::Bpm, 131.0).unwrap();
        assert!(filter.matches(&track));
        track.set_tag(Tag::Bpm, 128.0).unwrap();
        assert!(!filter.matches(&track));
    }

    #[test]
    fn test_date_bounds() {
        let expr = compile(r#"op = "range"
tag = "date_added"
min = "2024-01-01""#)
        .unwrap();
        let mut track = Track::new("1", "/a.mp3");
        track
            .set_tag(Tag::DateAdded, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .unwrap();
        assert!(expr.matches(&track));

        let err = compile(r#"op = "range"
tag = "date_added"
min = "March""#)
        .unwrap_err();
        assert!(matches!(err, CollectionError::Config(_)));
    }

    #[test]
    fn test_malformed_filters() {
        for filter in [
            r#"op = "fuzzy""#,
            r#"op = "equals""#,
            r#"op = "equals"
tag = "mood"
value = "x""#,
            r#"op = "range"
tag = "genre"
min = 1"#,
            r#"op = "and"
filters = []"#,
            r#"op = "not""#,
        ] {
            assert!(
                matches!(compile(filter), Err(CollectionError::Config(_))),
                "accepted {}",
                filter
            );
        }
    }

    #[test]
    fn test_node_needs_exactly_one_of_children_or_filter() {
        let both = RawNode {
            name: "x".to_string(),
            children: Some(Vec::new()),
            filter: Some(RawFilter::text("equals", "genre", "house")),
        };
        assert!(both.compile().is_err());

        let neither = RawNode {
            name: "x".to_string(),
            children: None,
            filter: None,
        };
        assert!(neither.compile().is_err());
    }

    #[test]
    fn test_missing_collection_path() {
        assert!(matches!(
            Config::from_toml("platform = \"rekordbox\""),
            Err(CollectionError::Config(_))
        ));
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::new("~/collection.xml")
            .with_platform(Platform::Rhythmbox)
            .with_output_path("/tmp/out.xml")
            .with_media_root("/mnt/usb");
        assert_eq!(config.platform().unwrap(), Platform::Rhythmbox);
        assert_eq!(config.output_path(), PathBuf::from("/tmp/out.xml"));
        assert!(config.copy_destination().is_err());
    }
}
