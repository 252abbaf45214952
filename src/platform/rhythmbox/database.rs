//! Rhythmbox database (rhythmdb.xml) song entries

use super::track_id_for;
use crate::error::{CollectionError, Result};
use crate::model::{Collection, Tag, TagKind, TagValue, Track};
use crate::platform::location::{location_to_path, stored_location};
use crate::platform::xml::{Element, Node, Preserved};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use std::path::Path;

/// Entry fields mapped onto tags, in the order they are written
pub(super) const TAG_FIELDS: [(&str, Tag); 8] = [
    ("title", Tag::Title),
    ("genre", Tag::Genre),
    ("artist", Tag::Artist),
    ("album", Tag::Album),
    ("comment", Tag::Comments),
    ("beats-per-minute", Tag::Bpm),
    ("rating", Tag::Rating),
    ("play-count", Tag::PlayCount),
];

pub(super) fn tag_for_field(name: &str) -> Option<Tag> {
    TAG_FIELDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, tag)| *tag)
}

/// Split the database into song tracks and a template holding everything else
pub(super) fn decode_database(mut document: Element, path: &Path) -> Result<(Vec<Track>, Element)> {
    if document.name != "rhythmdb" {
        return Err(CollectionError::format(
            path,
            format!("expected <rhythmdb> root, found <{}>", document.name),
        ));
    }

    let mut tracks = Vec::new();
    let mut kept = Vec::new();
    for node in std::mem::take(&mut document.children) {
        match node {
            Node::Element(entry) if entry.name == "entry" && entry.attr("type") == Some("song") => {
                tracks.push(decode_entry(entry, path)?)
            }
            other => kept.push(other),
        }
    }
    document.children = kept;

    log::info!("Parsed {} tracks from Rhythmbox database", tracks.len());
    Ok((tracks, document))
}

fn decode_entry(entry: Element, path: &Path) -> Result<Track> {
    let uri = entry
        .find_child("location")
        .map(Element::text)
        .ok_or_else(|| CollectionError::format(path, "song entry without <location>"))?;
    let location = location_to_path(&uri);

    let mut track = Track::new(track_id_for(&uri), location);
    let mut preserved = Preserved {
        attributes: entry
            .attributes
            .into_iter()
            .filter(|(key, _)| key != "type")
            .collect(),
        children: Vec::new(),
    };

    for node in entry.children {
        let Node::Element(field) = node else {
            preserved.children.push(node);
            continue;
        };
        let name = field.name.clone();
        let text = field.text();
        match name.as_str() {
            // the original URI stays in place so ids survive a round trip
            "location" => preserved.children.push(Node::Element(field)),
            "track-number" => match text.parse::<u32>() {
                Ok(number) => track.restore_track_number(Some(number)),
                Err(_) => preserved.children.push(Node::Element(field)),
            },
            "date" => match decode_year(&text) {
                Some(year) => track.set_tag(Tag::Year, year)?,
                None => preserved.children.push(Node::Element(field)),
            },
            _ => match tag_for_field(&name)
                .and_then(|tag| decode_value(tag, &text).map(|value| (tag, value)))
            {
                Some((tag, value)) => track.set_tag(tag, value)?,
                None => preserved.children.push(Node::Element(field)),
            },
        }
    }

    track.set_preserved(preserved);
    Ok(track)
}

fn decode_value(tag: Tag, raw: &str) -> Option<TagValue> {
    match tag.kind() {
        TagKind::Text => Some(TagValue::Text(raw.to_string())),
        TagKind::Number => raw.trim().parse::<f64>().ok().map(TagValue::Number),
        TagKind::Date => None,
    }
}

/// Rhythmbox stores dates as GLib julian days; only January 1st maps to a year
fn decode_year(raw: &str) -> Option<f64> {
    let days = raw.trim().parse::<i32>().ok()?;
    let date = NaiveDate::from_num_days_from_ce_opt(days)?;
    (date.ordinal() == 1).then_some(date.year() as f64)
}

fn encode_year(year: f64) -> Option<i32> {
    if year.fract() != 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, 1, 1).map(|date| date.num_days_from_ce())
}

fn encode_value(value: &TagValue) -> String {
    match value {
        TagValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        other => other.to_string(),
    }
}

/// URI written for a track: the original one while the path is unchanged
pub(super) fn entry_uri(track: &Track) -> String {
    let original = track
        .preserved()
        .children
        .iter()
        .find_map(|node| match node {
            Node::Element(element) if element.name == "location" => Some(element.text()),
            _ => None,
        });
    stored_location(original.as_deref(), track.location(), "")
}

/// Rebuild the database document from the template and the tracks
pub(super) fn encode_database(collection: &Collection, template: Option<&Element>) -> Element {
    let mut document = template
        .cloned()
        .unwrap_or_else(|| Element::new("rhythmdb").with_attr("version", "2.0"));

    let kept = std::mem::take(&mut document.children);
    for track in collection.get_tracks().values() {
        document.push(encode_entry(track));
    }
    document.children.extend(kept);
    document
}

fn encode_entry(track: &Track) -> Element {
    let mut entry = Element::new("entry").with_attr("type", "song");
    let preserved = track.preserved();
    for (key, value) in &preserved.attributes {
        entry.set_attr(key, value.as_str());
    }

    for (field, tag) in TAG_FIELDS {
        if let Some(value) = track.tag(tag) {
            entry.push(Element::with_text(field, encode_value(value)));
        }
    }
    if let Some(julian) = track
        .tag(Tag::Year)
        .and_then(TagValue::as_number)
        .and_then(encode_year)
    {
        entry.push(Element::with_text("date", julian.to_string()));
    }
    if let Some(number) = track.track_number() {
        entry.push(Element::with_text("track-number", number.to_string()));
    }

    // raw fields the model could not read only fill fields it left empty
    let written: HashSet<String> = entry
        .child_elements()
        .map(|field| field.name.clone())
        .collect();
    let mut wrote_location = false;
    for node in &preserved.children {
        match node {
            Node::Element(element) if element.name == "location" => {
                entry.push(Element::with_text("location", entry_uri(track)));
                wrote_location = true;
            }
            Node::Element(element) if written.contains(&element.name) => {}
            other => entry.children.push(other.clone()),
        }
    }
    if !wrote_location {
        entry.push(Element::with_text("location", entry_uri(track)));
    }
    entry
}
