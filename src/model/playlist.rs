use super::track::TrackId;
use crate::error::{CollectionError, Result};
use crate::platform::xml::Preserved;
use std::collections::HashSet;

/// Folder or leaf contents of a playlist
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistKind {
    /// Holds child playlists, in order
    Folder(Vec<Playlist>),

    /// Holds track references, in order, without duplicates
    Leaf(Vec<TrackId>),
}

/// Represents a playlist node
///
/// Leaves reference tracks by id only; the tracks themselves live in the
/// owning [`Collection`](super::Collection).
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    name: String,
    kind: PlaylistKind,

    /// Platform fields this model does not interpret
    preserved: Preserved,
}

impl Playlist {
    /// Create a leaf playlist from track ids; repeated ids keep their first position
    pub fn new_playlist(name: impl Into<String>, tracks: impl IntoIterator<Item = TrackId>) -> Self {
        let mut playlist = Self {
            name: name.into(),
            kind: PlaylistKind::Leaf(Vec::new()),
            preserved: Preserved::default(),
        };
        if let PlaylistKind::Leaf(ids) = &mut playlist.kind {
            let mut seen = HashSet::new();
            for id in tracks {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        playlist
    }

    /// Create a folder playlist
    pub fn new_folder(name: impl Into<String>, children: Vec<Playlist>) -> Self {
        Self {
            name: name.into(),
            kind: PlaylistKind::Folder(children),
            preserved: Preserved::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PlaylistKind {
        &self.kind
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, PlaylistKind::Folder(_))
    }

    /// Track ids of a leaf; empty for folders
    pub fn track_ids(&self) -> &[TrackId] {
        match &self.kind {
            PlaylistKind::Leaf(ids) => ids,
            PlaylistKind::Folder(_) => &[],
        }
    }

    /// Child playlists of a folder; empty for leaves
    pub fn children(&self) -> &[Playlist] {
        match &self.kind {
            PlaylistKind::Folder(children) => children,
            PlaylistKind::Leaf(_) => &[],
        }
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.track_ids().contains(id)
    }

    /// Number of direct tracks or children
    pub fn len(&self) -> usize {
        match &self.kind {
            PlaylistKind::Folder(children) => children.len(),
            PlaylistKind::Leaf(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every playlist in this subtree named `name`
    ///
    /// Depth-first, this node first, children in insertion order.
    pub fn get_playlists(&self, name: &str) -> Vec<&Playlist> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Playlist>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.children() {
            child.collect_named(name, found);
        }
    }

    /// Append a child playlist; leaves cannot hold children
    pub fn add_playlist(&mut self, playlist: Playlist) -> Result<()> {
        match &mut self.kind {
            PlaylistKind::Folder(children) => {
                children.push(playlist);
                Ok(())
            }
            PlaylistKind::Leaf(_) => Err(CollectionError::TypeKind {
                playlist: self.name.clone(),
                kind: "leaf",
                action: "hold child playlists",
            }),
        }
    }

    /// Append a track reference; returns false if it was already present
    pub fn add_track(&mut self, id: TrackId) -> Result<bool> {
        match &mut self.kind {
            PlaylistKind::Leaf(ids) => {
                if ids.contains(&id) {
                    return Ok(false);
                }
                ids.push(id);
                Ok(true)
            }
            PlaylistKind::Folder(_) => Err(CollectionError::TypeKind {
                playlist: self.name.clone(),
                kind: "folder",
                action: "hold tracks",
            }),
        }
    }

    /// Remove direct children named `name`, returning them
    pub fn remove_playlists(&mut self, name: &str) -> Vec<Playlist> {
        match &mut self.kind {
            PlaylistKind::Folder(children) => {
                let (removed, kept) = std::mem::take(children)
                    .into_iter()
                    .partition(|child| child.name == name);
                *children = kept;
                removed
            }
            PlaylistKind::Leaf(_) => Vec::new(),
        }
    }

    /// Track ids referenced anywhere in this subtree, with the owning playlist name
    pub fn references(&self) -> Vec<(&str, &TrackId)> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<(&'a str, &'a TrackId)>) {
        match &self.kind {
            PlaylistKind::Leaf(ids) => refs.extend(ids.iter().map(|id| (self.name.as_str(), id))),
            PlaylistKind::Folder(children) => {
                for child in children {
                    child.collect_references(refs);
                }
            }
        }
    }

    /// Last direct child folder named `name`
    pub(crate) fn child_folder_mut(&mut self, name: &str) -> Option<&mut Playlist> {
        match &mut self.kind {
            PlaylistKind::Folder(children) => children
                .iter_mut()
                .rev()
                .find(|child| child.is_folder() && child.name == name),
            PlaylistKind::Leaf(_) => None,
        }
    }

    pub(crate) fn preserved(&self) -> &Preserved {
        &self.preserved
    }

    pub(crate) fn set_preserved(&mut self, preserved: Preserved) {
        self.preserved = preserved;
    }
}
