//! Playlist builder
//!
//! Turns a declarative tree of folders and tag rules into real playlists.
//! The result hangs from a single `PLAYLIST_BUILDER` folder at the root,
//! which replaces the one from the previous run.

use crate::config::Config;
use crate::error::Result;
use crate::filter::FilterExpr;
use crate::model::{Collection, Playlist};

/// Name of the folder holding everything the builder produces
pub const BUILDER_FOLDER: &str = "PLAYLIST_BUILDER";

/// One node of a playlist structure
#[derive(Debug, Clone)]
pub enum Node {
    /// Folder with child nodes, in order
    Folder { name: String, children: Vec<Node> },

    /// Leaf holding every track the filter accepts
    Rule { name: String, filter: FilterExpr },
}

impl Node {
    pub fn folder(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Folder {
            name: name.into(),
            children,
        }
    }

    pub fn rule(name: impl Into<String>, filter: FilterExpr) -> Self {
        Node::Rule {
            name: name.into(),
            filter,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Folder { name, .. } | Node::Rule { name, .. } => name,
        }
    }
}

/// Build the `PLAYLIST_BUILDER` folder for `nodes`
///
/// Leaves list their tracks in track id order, so the same collection and
/// structure always give the same tree.
pub fn build_playlists(collection: &Collection, nodes: &[Node]) -> Result<Playlist> {
    build_node(collection, &Node::folder(BUILDER_FOLDER, nodes.to_vec()))
}

fn build_node(collection: &Collection, node: &Node) -> Result<Playlist> {
    match node {
        Node::Folder { name, children } => {
            let mut folder = Playlist::new_folder(name.as_str(), Vec::new());
            for child in children {
                folder.add_playlist(build_node(collection, child)?)?;
            }
            Ok(folder)
        }
        Node::Rule { name, filter } => {
            let ids = collection
                .get_tracks()
                .values()
                .filter(|track| filter.matches(track))
                .map(|track| track.id().clone());
            let playlist = Playlist::new_playlist(name.as_str(), ids);
            log::debug!("Rule '{}' matched {} tracks", name, playlist.len());
            Ok(playlist)
        }
    }
}

/// Replace the builder folder of `collection` with a fresh build of `nodes`
pub fn apply(collection: &mut Collection, nodes: &[Node]) -> Result<()> {
    let folder = build_playlists(collection, nodes)?;
    let removed = collection.remove_playlists(BUILDER_FOLDER);
    if !removed.is_empty() {
        log::info!("Replacing previous {} folder", BUILDER_FOLDER);
    }
    collection.add_playlist(folder)
}

/// Load the configured collection, rebuild its playlists and write it out
pub fn run(config: &Config) -> Result<Collection> {
    let nodes = config.playlist_structure()?;
    let mut collection = Collection::load(config.platform()?, &config.collection_path())?;

    apply(&mut collection, &nodes)?;
    log::info!("Built {} top-level playlist nodes", nodes.len());

    collection.serialize(&config.output_path())?;
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Predicate, TextMatch};
    use crate::model::{Tag, Track, TrackId, ROOT_PLAYLIST};
    use crate::platform::xml::Preserved;
    use crate::platform::Platform;
    use std::path::PathBuf;

    fn collection() -> Collection {
        let track = |id: &str, genre: &str, bpm: f64| {
            let mut track = Track::new(id, format!("/music/{}.mp3", id));
            track.set_tag(Tag::Genre, genre).unwrap();
            track.set_tag(Tag::Bpm, bpm).unwrap();
            track
        };
        Collection::from_parts(
            Platform::Rekordbox,
            PathBuf::from("collection.xml"),
            vec![
                track("10", "Techno", 132.0),
                track("2", "House / Techno", 124.0),
                track("1", "House", 122.0),
            ],
            Playlist::new_folder(ROOT_PLAYLIST, Vec::new()),
            Preserved::default(),
        )
        .unwrap()
    }

    fn structure() -> Vec<Node> {
        vec![
            Node::folder(
                "Genres",
                vec![
                    Node::rule("House", Predicate::text(Tag::Genre, TextMatch::Has, "house").into()),
                    Node::rule("Techno", Predicate::text(Tag::Genre, TextMatch::Has, "techno").into()),
                ],
            ),
            Node::rule(
                "Fast",
                Predicate::Range {
                    tag: Tag::Bpm,
                    min: Some(125.0),
                    max: None,
                }
                .into(),
            ),
        ]
    }

    fn ids(raw: &[&str]) -> Vec<TrackId> {
        raw.iter().map(|id| TrackId::new(*id)).collect()
    }

    #[test]
    fn test_build_mirrors_structure() {
        let folder = build_playlists(&collection(), &structure()).unwrap();
        assert_eq!(folder.name(), BUILDER_FOLDER);
        assert_eq!(folder.children().len(), 2);

        let genres = &folder.children()[0];
        assert!(genres.is_folder());
        assert_eq!(genres.children()[0].track_ids(), ids(&["1", "2"]).as_slice());
        assert_eq!(genres.children()[1].track_ids(), ids(&["2", "10"]).as_slice());
        assert_eq!(folder.children()[1].track_ids(), ids(&["10"]).as_slice());
    }

    #[test]
    fn test_build_is_deterministic() {
        let collection = collection();
        let first = build_playlists(&collection, &structure()).unwrap();
        let second = build_playlists(&collection, &structure()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_apply_replaces_previous_build() {
        let mut collection = collection();
        apply(&mut collection, &structure()).unwrap();
        apply(&mut collection, &structure()[..1]).unwrap();

        let builds = collection.get_playlists(BUILDER_FOLDER);
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].children().len(), 1);
    }

    #[test]
    fn test_empty_rule_gives_empty_leaf() {
        let nodes = vec![Node::rule("Nothing", FilterExpr::Const(false))];
        let folder = build_playlists(&collection(), &nodes).unwrap();
        let leaf = &folder.children()[0];
        assert!(!leaf.is_folder());
        assert!(leaf.is_empty());
    }
}
