use super::tag::{Tag, TagValue};
use crate::error::{CollectionError, Result};
use crate::platform::xml::Preserved;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable track identity used by playlist membership
///
/// Ordering is numeric when both ids are numbers (Rekordbox `TrackID`),
/// lexicographic otherwise. This is the canonical iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for TrackId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TrackId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Represents a single catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,

    /// Path to the audio file, platform-native
    location: PathBuf,

    /// Ordering field written by shuffle
    track_number: Option<u32>,

    tags: BTreeMap<Tag, TagValue>,

    /// Platform fields this model does not interpret
    preserved: Preserved,
}

impl Track {
    /// Create a track with no tags
    pub fn new(id: impl Into<TrackId>, location: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            track_number: None,
            tags: BTreeMap::new(),
            preserved: Preserved::default(),
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Replace the audio file path. No existence check is made.
    pub fn set_location(&mut self, location: impl Into<PathBuf>) {
        self.location = location.into();
    }

    pub fn track_number(&self) -> Option<u32> {
        self.track_number
    }

    /// Overwrite the ordering field; numbering starts at 1
    pub fn set_track_number(&mut self, number: u32) -> Result<()> {
        if number == 0 {
            return Err(CollectionError::InvalidTrackNumber {
                track_id: self.id.to_string(),
                number,
            });
        }
        self.track_number = Some(number);
        Ok(())
    }

    pub(crate) fn restore_track_number(&mut self, number: Option<u32>) {
        self.track_number = number;
    }

    pub fn tag(&self, tag: Tag) -> Option<&TagValue> {
        self.tags.get(&tag)
    }

    /// Text value of a tag, if present and textual
    pub fn text(&self, tag: Tag) -> Option<&str> {
        self.tag(tag).and_then(TagValue::as_text)
    }

    /// Elements of a `/`-separated multi-value tag such as `House / Techno`
    pub fn split_tag(&self, tag: Tag) -> Vec<&str> {
        self.text(tag)
            .map(|text| {
                text.split('/')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set a tag, checking the value type against the tag
    pub fn set_tag(&mut self, tag: Tag, value: impl Into<TagValue>) -> Result<()> {
        let value = value.into();
        if value.kind() != tag.kind() {
            return Err(CollectionError::Config(format!(
                "tag '{}' expects a {:?} value, got {:?}",
                tag,
                tag.kind(),
                value.kind()
            )));
        }
        self.tags.insert(tag, value);
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: Tag) -> Option<TagValue> {
        self.tags.remove(&tag)
    }

    /// All tags in canonical tag order
    pub fn tags(&self) -> impl Iterator<Item = (Tag, &TagValue)> {
        self.tags.iter().map(|(tag, value)| (*tag, value))
    }

    pub fn title(&self) -> Option<&str> {
        self.text(Tag::Title)
    }

    pub fn artist(&self) -> Option<&str> {
        self.text(Tag::Artist)
    }

    pub(crate) fn preserved(&self) -> &Preserved {
        &self.preserved
    }

    pub(crate) fn set_preserved(&mut self, preserved: Preserved) {
        self.preserved = preserved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_track_ids_sort_numerically() {
        let mut ids = vec![TrackId::new("10"), TrackId::new("9"), TrackId::new("abc")];
        ids.sort();
        assert_eq!(ids, vec![TrackId::new("9"), TrackId::new("10"), TrackId::new("abc")]);
    }

    #[test]
    fn test_track_number_must_be_positive() {
        let mut track = Track::new("1", "/music/a.mp3");
        assert!(track.set_track_number(0).is_err());
        assert_eq!(track.track_number(), None);

        track.set_track_number(3).unwrap();
        assert_eq!(track.track_number(), Some(3));
    }

    #[test]
    fn test_set_tag_checks_kind() {
        let mut track = Track::new("1", "/music/a.mp3");
        track.set_tag(Tag::Genre, "House / Techno").unwrap();
        track.set_tag(Tag::Bpm, 128.0).unwrap();
        track
            .set_tag(Tag::DateAdded, NaiveDate::from_ymd_opt(2023, 4, 1).unwrap())
            .unwrap();

        assert!(track.set_tag(Tag::Bpm, "fast").is_err());
        assert_eq!(track.split_tag(Tag::Genre), vec!["House", "Techno"]);
        assert_eq!(track.tag(Tag::Bpm), Some(&TagValue::Number(128.0)));
    }

    #[test]
    fn test_set_location_keeps_identity() {
        let mut track = Track::new("7", "/old/a.mp3");
        track.set_location("/new/a.mp3");
        assert_eq!(track.id().as_str(), "7");
        assert_eq!(track.location(), Path::new("/new/a.mp3"));
    }
}
