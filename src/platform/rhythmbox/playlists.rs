//! Rhythmbox playlists (playlists.xml)
//!
//! Static and queue playlists list track locations. Automatic playlists
//! store a query instead; their membership is evaluated against the loaded
//! tracks and the query itself is written back untouched.
//!
//! Rhythmbox has no folders. Names are joined with `/` on write and split
//! back into folders on load.

use super::database::entry_uri;
use super::query::compile_query;
use crate::error::{CollectionError, Result};
use crate::model::{Collection, Playlist, PlaylistKind, Track, TrackId, ROOT_PLAYLIST};
use crate::platform::location::location_to_path;
use crate::platform::xml::{Element, Node, Preserved};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const FOLDER_SEPARATOR: char = '/';

/// Playlist types decoded into leaves; anything else stays in the template
const LEAF_TYPES: [&str; 3] = ["static", "queue", "automatic"];

/// Decode playlists.xml into a root folder and a template of untouched content
pub(super) fn decode_playlists(
    mut document: Element,
    tracks: &[Track],
    path: &Path,
) -> Result<(Playlist, Element)> {
    if document.name != "rhythmdb-playlists" {
        return Err(CollectionError::format(
            path,
            format!("expected <rhythmdb-playlists> root, found <{}>", document.name),
        ));
    }

    let by_location: HashMap<PathBuf, TrackId> = tracks
        .iter()
        .map(|track| (track.location().to_path_buf(), track.id().clone()))
        .collect();

    let mut root = Playlist::new_folder(ROOT_PLAYLIST, Vec::new());
    let mut kept = Vec::new();
    let mut decoded = 0;
    for node in std::mem::take(&mut document.children) {
        match node {
            Node::Element(element)
                if element.name == "playlist"
                    && LEAF_TYPES.contains(&element.attr("type").unwrap_or("static")) =>
            {
                let (names, playlist) = decode_playlist(element, tracks, &by_location, path)?;
                attach(&mut root, &names, playlist)?;
                decoded += 1;
            }
            other => kept.push(other),
        }
    }
    document.children = kept;

    log::debug!("Decoded {} Rhythmbox playlists", decoded);
    Ok((root, document))
}

/// Decode one playlist; returns the folder path it belongs under
fn decode_playlist(
    element: Element,
    tracks: &[Track],
    by_location: &HashMap<PathBuf, TrackId>,
    path: &Path,
) -> Result<(Vec<String>, Playlist)> {
    let full_name = element
        .attr("name")
        .ok_or_else(|| CollectionError::format(path, "playlist without name"))?
        .to_string();
    let mut names: Vec<String> = full_name
        .split(FOLDER_SEPARATOR)
        .map(str::to_string)
        .collect();
    let name = names.pop().unwrap_or_default();
    let automatic = element.attr("type") == Some("automatic");

    let mut preserved = Preserved {
        attributes: element
            .attributes
            .iter()
            .filter(|(key, _)| key != "name")
            .cloned()
            .collect(),
        children: Vec::new(),
    };

    let ids = if automatic {
        let query = compile_query(element.child_elements());
        let mut ids: Vec<TrackId> = tracks
            .iter()
            .filter(|track| query.matches(track))
            .map(|track| track.id().clone())
            .collect();
        ids.sort();
        log::debug!("Automatic playlist '{}' matched {} tracks", full_name, ids.len());
        preserved.children = element.children;
        ids
    } else {
        let mut ids = Vec::new();
        for node in element.children {
            match node {
                Node::Element(child) if child.name == "location" => {
                    let uri = child.text();
                    let id = by_location
                        .get(&location_to_path(&uri))
                        .cloned()
                        .ok_or_else(|| CollectionError::Consistency {
                            playlist: full_name.clone(),
                            track_id: uri.clone(),
                        })?;
                    ids.push(id);
                }
                other => preserved.children.push(other),
            }
        }
        ids
    };

    let mut playlist = Playlist::new_playlist(name, ids);
    playlist.set_preserved(preserved);
    Ok((names, playlist))
}

/// Hang a playlist under the folder path `names`, creating folders as needed
fn attach(folder: &mut Playlist, names: &[String], playlist: Playlist) -> Result<()> {
    let Some((first, rest)) = names.split_first() else {
        return folder.add_playlist(playlist);
    };

    if folder.child_folder_mut(first).is_none() {
        folder.add_playlist(Playlist::new_folder(first.as_str(), Vec::new()))?;
    }
    match folder.child_folder_mut(first) {
        Some(child) => attach(child, rest, playlist),
        None => folder.add_playlist(playlist),
    }
}

/// Rebuild playlists.xml from the template and the playlist tree
pub(super) fn encode_playlists(collection: &Collection, template: Option<&Element>) -> Element {
    let mut document = template
        .cloned()
        .unwrap_or_else(|| Element::new("rhythmdb-playlists"));

    let mut encoded = Vec::new();
    for child in collection.root().children() {
        encode_into(child, "", collection, &mut encoded);
    }

    let kept = std::mem::take(&mut document.children);
    document.children = encoded.into_iter().map(Node::Element).collect();
    document.children.extend(kept);
    document
}

fn encode_into(playlist: &Playlist, prefix: &str, collection: &Collection, out: &mut Vec<Element>) {
    let name = format!("{}{}", prefix, playlist.name());
    match playlist.kind() {
        PlaylistKind::Folder(children) => {
            let prefix = format!("{}{}", name, FOLDER_SEPARATOR);
            for child in children {
                encode_into(child, &prefix, collection, out);
            }
        }
        PlaylistKind::Leaf(ids) => out.push(encode_leaf(playlist, name, ids, collection)),
    }
}

fn encode_leaf(playlist: &Playlist, name: String, ids: &[TrackId], collection: &Collection) -> Element {
    let preserved = playlist.preserved();
    let mut element = Element::new("playlist").with_attr("name", name);
    if preserved.attributes.is_empty() {
        element = element
            .with_attr("show-browser", "true")
            .with_attr("browser-position", "180")
            .with_attr("search-type", "search-match")
            .with_attr("type", "static");
    }
    for (key, value) in &preserved.attributes {
        element.set_attr(key, value.as_str());
    }

    // automatic playlists are defined by their query only
    if element.attr("type") != Some("automatic") {
        for track in ids.iter().filter_map(|id| collection.get_track(id)) {
            element.push(Element::with_text("location", entry_uri(track)));
        }
    }
    element.children.extend(preserved.children.iter().cloned());
    element
}
