//! Track relocation
//!
//! Two ways of moving a collection's audio files around:
//!
//! - [`rewrite_track_paths`] re-roots every location at the local copy of the
//!   shared `DJ Music` folder, for collections written on another machine.
//! - [`copy_playlists`] copies the audio of selected playlists into one flat
//!   directory and writes a collection holding only those playlists.

use super::worker_pool;
use crate::config::Config;
use crate::error::{CollectionError, Result};
use crate::model::{Collection, Playlist, Track, TrackId};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Folder name shared by every user's music library
pub const SHARED_MEDIA_FOLDER: &str = "DJ Music";

/// Location of `location` under `media_root`
///
/// Everything up to the last `DJ Music` component is replaced by
/// `media_root`. Returns `None` when the path has no such component.
pub fn rebase_location(location: &Path, media_root: &Path) -> Option<PathBuf> {
    let components: Vec<Component> = location.components().collect();
    let marker = components
        .iter()
        .rposition(|component| component.as_os_str() == SHARED_MEDIA_FOLDER)?;

    let mut rebased = media_root.join(SHARED_MEDIA_FOLDER);
    for component in &components[marker + 1..] {
        rebased.push(component.as_os_str());
    }
    Some(rebased)
}

/// Re-root every track of `collection` under `media_root`; returns how many moved
pub fn rewrite_track_paths(collection: &mut Collection, media_root: &Path) -> usize {
    let mut rewritten = 0;
    for track in collection.tracks_mut() {
        match rebase_location(track.location(), media_root) {
            Some(location) => {
                log::debug!("{}: {:?} -> {:?}", track.id(), track.location(), location);
                track.set_location(location);
                rewritten += 1;
            }
            None => log::warn!(
                "Track {} is outside '{}', keeping {:?}",
                track.id(),
                SHARED_MEDIA_FOLDER,
                track.location()
            ),
        }
    }
    log::info!("Rewrote {} of {} track locations", rewritten, collection.track_count());
    rewritten
}

/// Destination file for every track, in a flat directory
///
/// Two different files with the same name are told apart by prefixing the
/// track id to the later one.
fn plan_copies<'a>(tracks: &[&'a Track], destination: &Path) -> Vec<(&'a Track, PathBuf)> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut plan = Vec::with_capacity(tracks.len());

    for track in tracks {
        let source = track.location();
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| track.id().to_string());

        let mut target = destination.join(&file_name);
        if claimed.get(&target).is_some_and(|owner| *owner != source) {
            target = destination.join(format!("{}_{}", track.id(), file_name));
        }
        claimed.insert(target.clone(), source);
        plan.push((*track, target));
    }
    plan
}

/// Copy `source` to a new file at `target`
///
/// An existing target, the source itself included, is never replaced. A
/// partial copy is removed before returning the error.
fn copy_file(source: &Path, target: &Path) -> Result<()> {
    let copy_error = |error: io::Error| CollectionError::Copy {
        from: source.to_path_buf(),
        to: target.to_path_buf(),
        source: error,
    };

    let mut reader = File::open(source).map_err(copy_error)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(copy_error)?;

    let written = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    drop(writer);
    if let Err(error) = written {
        remove_copies(&[target.to_path_buf()]);
        return Err(copy_error(error));
    }
    Ok(())
}

fn remove_copies(copies: &[PathBuf]) {
    for target in copies {
        if let Err(e) = fs::remove_file(target) {
            log::warn!("Could not remove {:?}: {}", target, e);
        }
    }
}

/// Copy the audio of the named playlists into `destination` and write the
/// subset collection at `output`
///
/// Returns the written collection, holding only those playlists, with every
/// track pointing at its copy. If any copy or the write fails, every file
/// this call created is removed again; files already in `destination` are
/// left alone.
pub fn copy_playlists(
    collection: &Collection,
    names: &[String],
    destination: &Path,
    output: &Path,
) -> Result<Collection> {
    let mut playlists: Vec<Playlist> = Vec::new();
    for name in names {
        playlists.extend(collection.require_playlists(name)?.into_iter().cloned());
    }

    let mut tracks: BTreeMap<&TrackId, &Track> = BTreeMap::new();
    for playlist in &playlists {
        for (name, id) in playlist.references() {
            let track = collection.get_track(id).ok_or_else(|| CollectionError::Consistency {
                playlist: name.to_string(),
                track_id: id.to_string(),
            })?;
            tracks.insert(id, track);
        }
    }
    let tracks: Vec<&Track> = tracks.into_values().collect();

    fs::create_dir_all(destination)?;
    let plan = plan_copies(&tracks, destination);
    log::info!("Copying {} tracks to {:?}", plan.len(), destination);

    // tracks sharing a file share its copy
    let mut jobs: BTreeMap<&Path, &Path> = BTreeMap::new();
    for (track, target) in &plan {
        jobs.entry(target.as_path()).or_insert(track.location());
    }

    let pool = worker_pool()?;
    let results: Vec<(PathBuf, Result<()>)> = pool.install(|| {
        jobs.par_iter()
            .map(|(target, source)| (target.to_path_buf(), copy_file(source, target)))
            .collect()
    });

    let mut failure = None;
    let mut created = Vec::new();
    for (target, result) in results {
        match result {
            Ok(()) => created.push(target),
            Err(e) if failure.is_none() => failure = Some(e),
            Err(e) => log::error!("{}", e),
        }
    }
    if let Some(e) = failure {
        log::error!("Copy failed, removing {} copied files", created.len());
        remove_copies(&created);
        return Err(e);
    }

    let written = collection.subset(playlists, output).and_then(|mut subset| {
        for (track, target) in plan {
            if let Some(copy) = subset.get_track_mut(track.id()) {
                copy.set_location(target);
            }
        }
        subset.serialize(output)?;
        Ok(subset)
    });
    if written.is_err() {
        log::error!("Writing {:?} failed, removing {} copied files", output, created.len());
        remove_copies(&created);
    }
    written
}

/// Load another user's collection, re-root its tracks and write it back
pub fn run_rewrite(config: &Config, collection_path: &Path) -> Result<Collection> {
    let media_root = config.media_root()?;
    let mut collection = Collection::load(config.platform()?, collection_path)?;
    rewrite_track_paths(&mut collection, &media_root);
    collection.serialize(collection_path)?;
    Ok(collection)
}

/// Copy the configured playlists and write the subset collection
pub fn run_copy(config: &Config) -> Result<Collection> {
    let destination = config.copy_destination()?;
    let collection = Collection::load(config.platform()?, &config.collection_path())?;

    let output = destination.join(
        collection
            .path()
            .file_name()
            .unwrap_or_else(|| collection.path().as_os_str()),
    );
    copy_playlists(&collection, &config.copy_playlists, &destination, &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ROOT_PLAYLIST;
    use crate::platform::xml::Preserved;
    use crate::platform::Platform;
    use tempfile::TempDir;

    #[test]
    fn test_rebase_location() {
        let root = Path::new("/mnt/usb");
        assert_eq!(
            rebase_location(Path::new("/home/other/DJ Music/House/a.mp3"), root),
            Some(PathBuf::from("/mnt/usb/DJ Music/House/a.mp3"))
        );
        // the last occurrence wins
        assert_eq!(
            rebase_location(Path::new("/DJ Music/old/DJ Music/b.mp3"), root),
            Some(PathBuf::from("/mnt/usb/DJ Music/b.mp3"))
        );
        assert_eq!(rebase_location(Path::new("/music/c.mp3"), root), None);
        // only whole components match
        assert_eq!(rebase_location(Path::new("/My DJ Music/d.mp3"), root), None);
    }

    #[test]
    fn test_plan_copies_disambiguates_names() {
        let a = Track::new("1", "/one/song.mp3");
        let b = Track::new("2", "/two/song.mp3");
        let c = Track::new("3", "/one/other.mp3");
        let plan = plan_copies(&[&a, &b, &c], Path::new("/dest"));

        let targets: Vec<_> = plan.iter().map(|(_, target)| target.clone()).collect();
        assert_eq!(
            targets,
            vec![
                PathBuf::from("/dest/song.mp3"),
                PathBuf::from("/dest/2_song.mp3"),
                PathBuf::from("/dest/other.mp3"),
            ]
        );
    }

    fn collection(dir: &Path, missing: bool) -> Collection {
        let source = dir.join("source");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.mp3"), b"aaaa").unwrap();
        if !missing {
            fs::write(source.join("b.mp3"), b"bbbb").unwrap();
        }

        let tracks = vec![
            Track::new("1", source.join("a.mp3")),
            Track::new("2", source.join("b.mp3")),
            Track::new("3", source.join("c.mp3")),
        ];
        let root = Playlist::new_folder(
            ROOT_PLAYLIST,
            vec![
                Playlist::new_playlist("Gig", vec![TrackId::new("1"), TrackId::new("2")]),
                Playlist::new_playlist("Other", vec![TrackId::new("3")]),
            ],
        );
        Collection::from_parts(
            Platform::Rekordbox,
            dir.join("collection.xml"),
            tracks,
            root,
            Preserved::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_copy_playlists() {
        let dir = TempDir::new().unwrap();
        let collection = collection(dir.path(), false);
        let destination = dir.path().join("usb");

        let subset = copy_playlists(
            &collection,
            &["Gig".to_string()],
            &destination,
            &destination.join("collection.xml"),
        )
        .unwrap();

        assert_eq!(subset.track_count(), 2);
        assert_eq!(subset.get_playlists("Other").len(), 0);
        let track = subset.get_track(&TrackId::new("2")).unwrap();
        assert_eq!(track.location(), destination.join("b.mp3"));
        assert_eq!(fs::read(destination.join("b.mp3")).unwrap(), b"bbbb");

        let written = Collection::load(Platform::Rekordbox, &destination.join("collection.xml")).unwrap();
        let track = written.get_track(&TrackId::new("1")).unwrap();
        assert_eq!(track.location(), destination.join("a.mp3"));
        assert_eq!(written.get_playlists("Gig")[0].len(), 2);
    }

    #[test]
    fn test_failed_copy_removes_copies() {
        let dir = TempDir::new().unwrap();
        let collection = collection(dir.path(), true);
        let destination = dir.path().join("usb");

        let err = copy_playlists(
            &collection,
            &["Gig".to_string()],
            &destination,
            &destination.join("collection.xml"),
        )
        .unwrap_err();

        assert!(matches!(err, CollectionError::Copy { .. }));
        assert_eq!(fs::read_dir(&destination).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        let collection = collection(dir.path(), false);
        let destination = dir.path().join("usb");
        fs::create_dir_all(&destination).unwrap();
        fs::write(destination.join("a.mp3"), b"PREVIOUS-RUN").unwrap();

        let err = copy_playlists(
            &collection,
            &["Gig".to_string()],
            &destination,
            &destination.join("collection.xml"),
        )
        .unwrap_err();

        assert!(matches!(err, CollectionError::Copy { ref to, .. } if *to == destination.join("a.mp3")));
        assert_eq!(fs::read(destination.join("a.mp3")).unwrap(), b"PREVIOUS-RUN");
        assert!(!destination.join("b.mp3").exists());
        assert!(!destination.join("collection.xml").exists());
    }

    #[test]
    fn test_copy_onto_source_folder_leaves_sources_intact() {
        let dir = TempDir::new().unwrap();
        let collection = collection(dir.path(), false);
        let source = dir.path().join("source");

        let err = copy_playlists(
            &collection,
            &["Gig".to_string()],
            &source,
            &source.join("collection.xml"),
        )
        .unwrap_err();

        assert!(matches!(err, CollectionError::Copy { .. }));
        assert_eq!(fs::read(source.join("a.mp3")).unwrap(), b"aaaa");
        assert_eq!(fs::read(source.join("b.mp3")).unwrap(), b"bbbb");
    }

    #[test]
    fn test_failed_write_removes_copies() {
        let dir = TempDir::new().unwrap();
        let collection = collection(dir.path(), false);
        let destination = dir.path().join("usb");

        // the output directory does not exist
        let err = copy_playlists(
            &collection,
            &["Gig".to_string()],
            &destination,
            &dir.path().join("missing").join("collection.xml"),
        )
        .unwrap_err();

        assert!(matches!(err, CollectionError::Io(_)));
        assert_eq!(fs::read_dir(&destination).unwrap().count(), 0);
        assert!(dir.path().join("source/a.mp3").exists());
    }

    #[test]
    fn test_copy_unknown_playlist() {
        let dir = TempDir::new().unwrap();
        let collection = collection(dir.path(), false);
        let err = copy_playlists(
            &collection,
            &["Nope".to_string()],
            &dir.path().join("usb"),
            &dir.path().join("usb/collection.xml"),
        )
        .unwrap_err();
        assert!(matches!(err, CollectionError::Lookup(_)));
        assert!(!dir.path().join("usb").exists());
    }
}
