//! Rekordbox XML collection format
//!
//! ```text
//! <DJ_PLAYLISTS Version="1.0.0">
//!   <PRODUCT .../>
//!   <COLLECTION Entries="N">
//!     <TRACK TrackID="1" Name=".." Location="file://localhost/..">..</TRACK>
//!   </COLLECTION>
//!   <PLAYLISTS>
//!     <NODE Type="0" Name="ROOT" Count="..">       folder
//!       <NODE Name=".." Type="1" KeyType="0" Entries="..">   leaf
//!         <TRACK Key="1"/>
//! ```
//!
//! Leaves with `KeyType="1"` reference tracks by location instead of id.

use super::location::{location_to_path, stored_location};
use super::xml::{self, Element, Node, Preserved};
use super::{CollectionFormat, Encoded, Platform};
use crate::error::{CollectionError, Result};
use crate::model::{
    Collection, Playlist, PlaylistKind, Tag, TagKind, TagValue, Track, TrackId, ROOT_PLAYLIST,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const URI_HOST: &str = "localhost";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rekordbox stores ratings as 0-255 in steps of 51 per star
const RATING_STEP: f64 = 51.0;

/// TRACK attributes mapped onto tags, in the order they are written
const TAG_ATTRIBUTES: [(&str, Tag); 13] = [
    ("Name", Tag::Title),
    ("Artist", Tag::Artist),
    ("Remixer", Tag::Remixer),
    ("Album", Tag::Album),
    ("Genre", Tag::Genre),
    ("Label", Tag::Label),
    ("Tonality", Tag::Key),
    ("Comments", Tag::Comments),
    ("AverageBpm", Tag::Bpm),
    ("Rating", Tag::Rating),
    ("Year", Tag::Year),
    ("PlayCount", Tag::PlayCount),
    ("DateAdded", Tag::DateAdded),
];

fn tag_for_attribute(name: &str) -> Option<Tag> {
    TAG_ATTRIBUTES
        .iter()
        .find(|(attribute, _)| *attribute == name)
        .map(|(_, tag)| *tag)
}

/// Rekordbox XML format
pub struct RekordboxFormat;

impl CollectionFormat for RekordboxFormat {
    fn platform(&self) -> Platform {
        Platform::Rekordbox
    }

    fn load(&self, path: &Path) -> Result<Collection> {
        let mut document = xml::read_document(path)?;
        if document.name != "DJ_PLAYLISTS" {
            return Err(CollectionError::format(
                path,
                format!("expected <DJ_PLAYLISTS> root, found <{}>", document.name),
            ));
        }

        let collection_element = document
            .find_child_mut("COLLECTION")
            .ok_or_else(|| CollectionError::format(path, "missing <COLLECTION> element"))?;
        let mut tracks = Vec::new();
        let mut kept = Vec::new();
        for node in std::mem::take(&mut collection_element.children) {
            match node {
                Node::Element(element) if element.name == "TRACK" => {
                    tracks.push(decode_track(element, path)?)
                }
                other => kept.push(other),
            }
        }
        collection_element.children = kept;
        collection_element.remove_attr("Entries");

        let location_index: HashMap<PathBuf, TrackId> = tracks
            .iter()
            .map(|track| (track.location().to_path_buf(), track.id().clone()))
            .collect();

        let root_node = document
            .find_child_mut("PLAYLISTS")
            .and_then(|playlists| playlists.take_child("NODE"));
        let root = match root_node {
            Some(node) => decode_node(node, &location_index, path)?,
            None => Playlist::new_folder(ROOT_PLAYLIST, Vec::new()),
        };
        if !root.is_folder() {
            return Err(CollectionError::format(path, "playlist root must be a folder"));
        }

        log::debug!("Decoded {} Rekordbox tracks from {:?}", tracks.len(), path);
        let preserved = Preserved {
            attributes: Vec::new(),
            children: vec![Node::Element(document)],
        };
        Collection::from_parts(Platform::Rekordbox, path.to_path_buf(), tracks, root, preserved)
    }

    fn encode(&self, collection: &Collection) -> Result<Encoded> {
        let mut document = collection
            .preserved()
            .elements()
            .find(|element| element.name == "DJ_PLAYLISTS")
            .cloned()
            .unwrap_or_else(empty_document);

        let track_elements: Vec<Node> = collection
            .get_tracks()
            .values()
            .map(|track| Node::Element(encode_track(track)))
            .collect();

        if document.find_child("COLLECTION").is_none() {
            document.push(Element::new("COLLECTION"));
        }
        if let Some(collection_element) = document.find_child_mut("COLLECTION") {
            collection_element.set_attr("Entries", track_elements.len().to_string());
            let kept = std::mem::take(&mut collection_element.children);
            collection_element.children = track_elements;
            collection_element.children.extend(kept);
        }

        if document.find_child("PLAYLISTS").is_none() {
            document.push(Element::new("PLAYLISTS"));
        }
        if let Some(playlists) = document.find_child_mut("PLAYLISTS") {
            let root = encode_node(collection.root(), collection);
            playlists.children.insert(0, Node::Element(root));
        }

        Ok(Encoded {
            main: xml::write_document(&document)?,
            siblings: Vec::new(),
        })
    }
}

fn empty_document() -> Element {
    let mut document = Element::new("DJ_PLAYLISTS").with_attr("Version", "1.0.0");
    document.push(
        Element::new("PRODUCT")
            .with_attr("Name", env!("CARGO_PKG_NAME"))
            .with_attr("Version", env!("CARGO_PKG_VERSION"))
            .with_attr("Company", ""),
    );
    document.push(Element::new("COLLECTION"));
    document.push(Element::new("PLAYLISTS"));
    document
}

fn decode_track(element: Element, path: &Path) -> Result<Track> {
    let id = element
        .attr("TrackID")
        .ok_or_else(|| CollectionError::format(path, "TRACK without TrackID"))?
        .to_string();
    let uri = element
        .attr("Location")
        .ok_or_else(|| CollectionError::format(path, format!("TRACK {} without Location", id)))?
        .to_string();
    if !uri.starts_with("file://") {
        log::debug!("Track {} has a non-file location: {}", id, uri);
    }

    let mut track = Track::new(id.as_str(), location_to_path(&uri));
    // the stored URI is written back while the track stays put
    let mut preserved = Preserved {
        attributes: vec![("Location".to_string(), uri)],
        children: Vec::new(),
    };

    for (key, value) in element.attributes {
        match key.as_str() {
            "TrackID" | "Location" => {}
            "TrackNumber" => match value.parse::<u32>() {
                Ok(number) => track.restore_track_number(Some(number)),
                Err(_) => preserved.attributes.push((key, value)),
            },
            _ => match tag_for_attribute(&key).and_then(|tag| decode_value(tag, &value)) {
                Some((tag, tag_value)) => track.set_tag(tag, tag_value)?,
                None => preserved.attributes.push((key, value)),
            },
        }
    }
    preserved.children = element.children;
    track.set_preserved(preserved);
    Ok(track)
}

/// Parse a raw attribute value; unparsable values stay preserved verbatim
fn decode_value(tag: Tag, raw: &str) -> Option<(Tag, TagValue)> {
    let value = match tag.kind() {
        TagKind::Text => TagValue::Text(raw.to_string()),
        TagKind::Number => {
            let number = raw.trim().parse::<f64>().ok()?;
            if tag == Tag::Rating {
                TagValue::Number(number / RATING_STEP)
            } else {
                TagValue::Number(number)
            }
        }
        TagKind::Date => TagValue::Date(NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()?),
    };
    Some((tag, value))
}

fn encode_value(tag: Tag, value: &TagValue) -> String {
    match value {
        TagValue::Number(n) if tag == Tag::Bpm => format!("{:.2}", n),
        TagValue::Number(n) if tag == Tag::Rating => format!("{}", (n * RATING_STEP).round() as i64),
        TagValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        TagValue::Date(date) => date.format(DATE_FORMAT).to_string(),
        other => other.to_string(),
    }
}

fn encode_track(track: &Track) -> Element {
    let mut element = Element::new("TRACK").with_attr("TrackID", track.id().as_str());
    for (attribute, tag) in TAG_ATTRIBUTES {
        if let Some(value) = track.tag(tag) {
            element.set_attr(attribute, encode_value(tag, value));
        }
    }
    if let Some(number) = track.track_number() {
        element.set_attr("TrackNumber", number.to_string());
    }
    element.set_attr("Location", track_uri(track));

    // raw values the model could not read only fill fields it left empty
    let preserved = track.preserved();
    for (key, value) in &preserved.attributes {
        if element.attr(key).is_none() {
            element.set_attr(key, value.as_str());
        }
    }
    element.children = preserved.children.clone();
    element
}

/// Location URI of a track: the loaded one unless the track has moved
fn track_uri(track: &Track) -> String {
    let original = track
        .preserved()
        .attributes
        .iter()
        .find(|(key, _)| key == "Location")
        .map(|(_, value)| value.as_str());
    stored_location(original, track.location(), URI_HOST)
}

fn decode_node(
    element: Element,
    location_index: &HashMap<PathBuf, TrackId>,
    path: &Path,
) -> Result<Playlist> {
    let name = element
        .attr("Name")
        .ok_or_else(|| CollectionError::format(path, "NODE without Name"))?
        .to_string();
    let node_type = element.attr("Type").unwrap_or("0").to_string();
    let by_location = element.attr("KeyType") == Some("1");

    let mut preserved = Preserved {
        attributes: element
            .attributes
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "Name" | "Type" | "Count" | "Entries"))
            .cloned()
            .collect(),
        children: Vec::new(),
    };

    let mut playlist = match node_type.as_str() {
        "0" => {
            let mut folder = Playlist::new_folder(name, Vec::new());
            for node in element.children {
                match node {
                    Node::Element(child) if child.name == "NODE" => {
                        folder.add_playlist(decode_node(child, location_index, path)?)?
                    }
                    other => preserved.children.push(other),
                }
            }
            folder
        }
        "1" => {
            let mut ids = Vec::new();
            for node in element.children {
                match node {
                    Node::Element(child) if child.name == "TRACK" => {
                        let key = child.attr("Key").ok_or_else(|| {
                            CollectionError::format(path, format!("entry of '{}' without Key", name))
                        })?;
                        ids.push(resolve_key(key, by_location, location_index, &name)?);
                    }
                    other => preserved.children.push(other),
                }
            }
            Playlist::new_playlist(name, ids)
        }
        other => {
            return Err(CollectionError::format(
                path,
                format!("NODE '{}' has unknown Type '{}'", name, other),
            ))
        }
    };
    playlist.set_preserved(preserved);
    Ok(playlist)
}

fn resolve_key(
    key: &str,
    by_location: bool,
    location_index: &HashMap<PathBuf, TrackId>,
    playlist: &str,
) -> Result<TrackId> {
    if !by_location {
        return Ok(TrackId::new(key));
    }
    location_index
        .get(&location_to_path(key))
        .cloned()
        .ok_or_else(|| CollectionError::Consistency {
            playlist: playlist.to_string(),
            track_id: key.to_string(),
        })
}

fn encode_node(playlist: &Playlist, collection: &Collection) -> Element {
    let preserved = playlist.preserved();
    let mut element = match playlist.kind() {
        PlaylistKind::Folder(children) => {
            let mut element = Element::new("NODE")
                .with_attr("Type", "0")
                .with_attr("Name", playlist.name())
                .with_attr("Count", children.len().to_string());
            for child in children {
                element.push(encode_node(child, collection));
            }
            element
        }
        PlaylistKind::Leaf(ids) => {
            let by_location = preserved
                .attributes
                .iter()
                .any(|(key, value)| key == "KeyType" && value == "1");
            let mut element = Element::new("NODE")
                .with_attr("Name", playlist.name())
                .with_attr("Type", "1")
                .with_attr("KeyType", if by_location { "1" } else { "0" })
                .with_attr("Entries", ids.len().to_string());
            for id in ids {
                let key = match collection.get_track(id) {
                    Some(track) if by_location => track_uri(track),
                    _ => id.to_string(),
                };
                element.push(Element::new("TRACK").with_attr("Key", key));
            }
            element
        }
    };

    for (key, value) in &preserved.attributes {
        element.set_attr(key, value.as_str());
    }
    element.children.extend(preserved.children.iter().cloned());
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_uses_star_scale() {
        let (_, value) = decode_value(Tag::Rating, "204").unwrap();
        assert_eq!(value, TagValue::Number(4.0));
        assert_eq!(encode_value(Tag::Rating, &value), "204");
    }

    #[test]
    fn test_unparsable_values_are_not_tags() {
        assert!(decode_value(Tag::Bpm, "").is_none());
        assert!(decode_value(Tag::DateAdded, "yesterday").is_none());
        assert!(decode_value(Tag::Genre, "").is_some());
    }

    #[test]
    fn test_encode_number_formats() {
        assert_eq!(encode_value(Tag::Bpm, &TagValue::Number(128.0)), "128.00");
        assert_eq!(encode_value(Tag::Year, &TagValue::Number(2019.0)), "2019");
        assert_eq!(encode_value(Tag::PlayCount, &TagValue::Number(3.0)), "3");
    }

    #[test]
    fn test_decode_track_keeps_unknown_fields() {
        let mut element = Element::new("TRACK")
            .with_attr("TrackID", "5")
            .with_attr("Name", "Song")
            .with_attr("Kind", "MP3 File")
            .with_attr("TrackNumber", "0")
            .with_attr("Location", "file://localhost/music/song.mp3");
        element.push(Element::new("TEMPO").with_attr("Bpm", "120.00"));

        let track = decode_track(element, Path::new("x.xml")).unwrap();
        assert_eq!(track.id().as_str(), "5");
        assert_eq!(track.title(), Some("Song"));
        assert_eq!(track.track_number(), Some(0));
        assert_eq!(track.location(), Path::new("/music/song.mp3"));

        let encoded = encode_track(&track);
        assert_eq!(encoded.attr("Kind"), Some("MP3 File"));
        assert_eq!(encoded.attr("TrackNumber"), Some("0"));
        assert_eq!(encoded.find_child("TEMPO").unwrap().attr("Bpm"), Some("120.00"));
    }

    fn track_element(location: &str) -> Element {
        Element::new("TRACK")
            .with_attr("TrackID", "7")
            .with_attr("Location", location)
    }

    #[test]
    fn test_location_is_written_back_verbatim() {
        let stream = "http://example.com/x.mp3";
        let track = decode_track(track_element(stream), Path::new("x.xml")).unwrap();
        assert_eq!(track.location(), Path::new(stream));
        assert_eq!(encode_track(&track).attr("Location"), Some(stream));

        // a URI spelled differently from path_to_uri's output survives too
        let odd = "file://localhost/music/a(1).mp3";
        let mut track = decode_track(track_element(odd), Path::new("x.xml")).unwrap();
        assert_eq!(encode_track(&track).attr("Location"), Some(odd));

        track.set_location("/usb/a.mp3");
        assert_eq!(encode_track(&track).attr("Location"), Some("file://localhost/usb/a.mp3"));
    }

    #[test]
    fn test_model_values_replace_unparsable_raw_values() {
        let element = track_element("file://localhost/music/a.mp3")
            .with_attr("AverageBpm", "")
            .with_attr("TrackNumber", "")
            .with_attr("DateAdded", "someday");
        let mut track = decode_track(element, Path::new("x.xml")).unwrap();
        assert_eq!(track.tag(Tag::Bpm), None);
        assert_eq!(track.track_number(), None);

        // untouched raw values are written back as they were
        let encoded = encode_track(&track);
        assert_eq!(encoded.attr("AverageBpm"), Some(""));
        assert_eq!(encoded.attr("DateAdded"), Some("someday"));

        track.set_tag(Tag::Bpm, 128.0).unwrap();
        track.set_track_number(5).unwrap();
        let reloaded = decode_track(encode_track(&track), Path::new("x.xml")).unwrap();
        assert_eq!(reloaded.tag(Tag::Bpm), Some(&TagValue::Number(128.0)));
        assert_eq!(reloaded.track_number(), Some(5));
        assert_eq!(encode_track(&reloaded).attr("DateAdded"), Some("someday"));
    }
}
