use super::{Playlist, Track, TrackId};
use crate::error::{CollectionError, Result};
use crate::platform::xml::Preserved;
use crate::platform::{self, Platform};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the root folder every collection hangs its playlists from
pub const ROOT_PLAYLIST: &str = "ROOT";

/// One collection file held in memory: all tracks plus the playlist tree
#[derive(Debug, Clone)]
pub struct Collection {
    platform: Platform,

    /// File this collection was loaded from
    path: PathBuf,

    /// Canonical track set, in canonical id order
    tracks: BTreeMap<TrackId, Track>,

    /// Root folder of the playlist tree
    root: Playlist,

    /// Document-level data owned by the platform format
    preserved: Preserved,
}

impl Collection {
    /// Create an empty collection
    pub fn new(platform: Platform, path: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            path: path.into(),
            tracks: BTreeMap::new(),
            root: Playlist::new_folder(ROOT_PLAYLIST, Vec::new()),
            preserved: Preserved::default(),
        }
    }

    /// Load a collection file using the platform's format
    pub fn load(platform: Platform, path: &Path) -> Result<Self> {
        log::info!("Loading {} collection from {:?}", platform, path);
        let collection = platform.format().load(path)?;
        log::info!(
            "Loaded collection: {} tracks, {} playlists",
            collection.track_count(),
            collection.playlist_count()
        );
        Ok(collection)
    }

    /// Assemble a collection from decoded parts, checking referential integrity
    pub(crate) fn from_parts(
        platform: Platform,
        path: PathBuf,
        tracks: Vec<Track>,
        root: Playlist,
        preserved: Preserved,
    ) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for track in tracks {
            if let Some(previous) = by_id.insert(track.id().clone(), track) {
                return Err(CollectionError::format(
                    &path,
                    format!("duplicate track id '{}'", previous.id()),
                ));
            }
        }

        let collection = Self {
            platform,
            path,
            tracks: by_id,
            root,
            preserved,
        };
        collection.check_references(&collection.root)?;
        Ok(collection)
    }

    fn check_references(&self, playlist: &Playlist) -> Result<()> {
        for (name, id) in playlist.references() {
            if !self.tracks.contains_key(id) {
                return Err(CollectionError::Consistency {
                    playlist: name.to_string(),
                    track_id: id.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Playlist {
        &self.root
    }

    /// All playlists named `name`, depth-first; empty when none match
    pub fn get_playlists(&self, name: &str) -> Vec<&Playlist> {
        self.root.get_playlists(name)
    }

    /// Like [`get_playlists`](Self::get_playlists) but at least one match is required
    pub fn require_playlists(&self, name: &str) -> Result<Vec<&Playlist>> {
        let playlists = self.get_playlists(name);
        if playlists.is_empty() {
            return Err(CollectionError::Lookup(name.to_string()));
        }
        Ok(playlists)
    }

    /// The canonical track set
    pub fn get_tracks(&self) -> &BTreeMap<TrackId, Track> {
        &self.tracks
    }

    pub fn get_track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn get_track_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(id)
    }

    /// Mutable access to every track; identities cannot change through it
    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut()
    }

    /// Add or replace a track in the canonical set
    pub fn insert_track(&mut self, track: Track) -> Option<Track> {
        self.tracks.insert(track.id().clone(), track)
    }

    /// Tracks of a leaf playlist, in playlist order
    pub fn tracks_of(&self, playlist: &Playlist) -> Vec<&Track> {
        playlist
            .track_ids()
            .iter()
            .filter_map(|id| self.tracks.get(id))
            .collect()
    }

    /// Attach a playlist at the root, after the existing entries
    pub fn add_playlist(&mut self, playlist: Playlist) -> Result<()> {
        self.check_references(&playlist)?;
        self.root.add_playlist(playlist)
    }

    /// Detach root-level playlists named `name`
    pub fn remove_playlists(&mut self, name: &str) -> Vec<Playlist> {
        self.root.remove_playlists(name)
    }

    /// Total number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Total number of playlists and folders below the root
    pub fn playlist_count(&self) -> usize {
        fn count(playlist: &Playlist) -> usize {
            playlist.children().iter().map(|child| 1 + count(child)).sum()
        }
        count(&self.root)
    }

    /// New collection holding `playlists` and only the tracks they reference
    pub fn subset(&self, playlists: Vec<Playlist>, path: impl Into<PathBuf>) -> Result<Self> {
        let mut subset = Self {
            platform: self.platform,
            path: path.into(),
            tracks: BTreeMap::new(),
            root: Playlist::new_folder(ROOT_PLAYLIST, Vec::new()),
            preserved: self.preserved.clone(),
        };
        for playlist in playlists {
            for (name, id) in playlist.references() {
                let track = self.tracks.get(id).ok_or_else(|| CollectionError::Consistency {
                    playlist: name.to_string(),
                    track_id: id.to_string(),
                })?;
                subset.tracks.insert(id.clone(), track.clone());
            }
            subset.root.add_playlist(playlist)?;
        }
        Ok(subset)
    }

    /// Encode the whole collection in the platform's native format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.platform.format().encode(self)?.main)
    }

    /// Write the whole collection to `path`, replacing any previous content
    ///
    /// Every file is written to a temporary sibling and renamed into place.
    /// Returns the bytes of the main collection file.
    pub fn serialize(&self, path: &Path) -> Result<Vec<u8>> {
        let encoded = self.platform.format().encode(self)?;
        for (file_name, bytes) in &encoded.siblings {
            platform::write_atomic(&path.with_file_name(file_name), bytes)?;
        }
        platform::write_atomic(path, &encoded.main)?;

        log::info!(
            "Wrote {} collection ({} tracks, {} bytes) to {:?}",
            self.platform,
            self.track_count(),
            encoded.main.len(),
            path
        );
        Ok(encoded.main)
    }

    pub(crate) fn preserved(&self) -> &Preserved {
        &self.preserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Collection {
        let tracks = vec![Track::new("1", "/a.mp3"), Track::new("2", "/b.mp3")];
        let root = Playlist::new_folder(
            ROOT_PLAYLIST,
            vec![Playlist::new_playlist("FOO", vec![TrackId::new("1"), TrackId::new("2")])],
        );
        Collection::from_parts(
            Platform::Rekordbox,
            PathBuf::from("collection.xml"),
            tracks,
            root,
            Preserved::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_collection_creation() {
        let collection = Collection::new(Platform::Rekordbox, "x.xml");
        assert_eq!(collection.track_count(), 0);
        assert_eq!(collection.playlist_count(), 0);
        assert!(collection.root().is_folder());
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let root = Playlist::new_folder(
            ROOT_PLAYLIST,
            vec![Playlist::new_playlist("FOO", vec![TrackId::new("9")])],
        );
        let err = Collection::from_parts(
            Platform::Rekordbox,
            PathBuf::from("x.xml"),
            vec![Track::new("1", "/a.mp3")],
            root,
            Preserved::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CollectionError::Consistency { ref track_id, .. } if track_id == "9"));
    }

    #[test]
    fn test_add_playlist_checks_references() {
        let mut collection = sample();
        let bad = Playlist::new_playlist("BAD", vec![TrackId::new("3")]);
        assert!(collection.add_playlist(bad).is_err());

        let good = Playlist::new_playlist("GOOD", vec![TrackId::new("2")]);
        collection.add_playlist(good).unwrap();
        assert_eq!(collection.root().children().last().unwrap().name(), "GOOD");
        assert_eq!(collection.playlist_count(), 2);
    }

    #[test]
    fn test_require_playlists() {
        let collection = sample();
        assert_eq!(collection.require_playlists("FOO").unwrap().len(), 1);
        assert!(matches!(
            collection.require_playlists("NOPE"),
            Err(CollectionError::Lookup(_))
        ));
    }

    #[test]
    fn test_subset_keeps_referenced_tracks_only() {
        let mut collection = sample();
        collection.insert_track(Track::new("3", "/c.mp3"));
        let foo = collection.get_playlists("FOO")[0].clone();

        let subset = collection.subset(vec![foo], "out.xml").unwrap();
        assert_eq!(subset.track_count(), 2);
        assert!(subset.get_track(&TrackId::new("3")).is_none());
        assert_eq!(subset.get_playlists("FOO").len(), 1);
    }
}
