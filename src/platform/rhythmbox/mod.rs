//! Rhythmbox library format
//!
//! A Rhythmbox library is two files in one directory: the song database
//! `rhythmdb.xml` (the collection path) and `playlists.xml` next to it.

mod database;
mod playlists;
mod query;

use super::xml::{self, Node, Preserved};
use super::{CollectionFormat, Encoded, Platform};
use crate::error::Result;
use crate::model::{Collection, Playlist, TrackId, ROOT_PLAYLIST};
use std::path::Path;

/// File name of the playlist file written next to the database
pub const PLAYLISTS_FILE: &str = "playlists.xml";

/// Rhythmbox rhythmdb.xml + playlists.xml format
pub struct RhythmboxFormat;

/// Track ids are derived from the entry's location URI
pub(crate) fn track_id_for(uri: &str) -> TrackId {
    TrackId::new(format!("{:x}", md5::compute(uri.as_bytes())))
}

impl CollectionFormat for RhythmboxFormat {
    fn platform(&self) -> Platform {
        Platform::Rhythmbox
    }

    fn load(&self, path: &Path) -> Result<Collection> {
        log::info!("Parsing Rhythmbox database from {:?}", path);
        let (tracks, database_template) = database::decode_database(xml::read_document(path)?, path)?;
        let mut templates = vec![Node::Element(database_template)];

        let playlists_path = path.with_file_name(PLAYLISTS_FILE);
        let root = if playlists_path.is_file() {
            log::info!("Parsing Rhythmbox playlists from {:?}", playlists_path);
            let document = xml::read_document(&playlists_path)?;
            let (root, template) = playlists::decode_playlists(document, &tracks, &playlists_path)?;
            templates.push(Node::Element(template));
            root
        } else {
            log::warn!("No {} next to {:?}, starting without playlists", PLAYLISTS_FILE, path);
            Playlist::new_folder(ROOT_PLAYLIST, Vec::new())
        };

        let preserved = Preserved {
            attributes: Vec::new(),
            children: templates,
        };
        Collection::from_parts(Platform::Rhythmbox, path.to_path_buf(), tracks, root, preserved)
    }

    fn encode(&self, collection: &Collection) -> Result<Encoded> {
        let template = |name: &str| {
            collection
                .preserved()
                .elements()
                .find(|element| element.name == name)
        };

        let database = database::encode_database(collection, template("rhythmdb"));
        let playlists = playlists::encode_playlists(collection, template("rhythmdb-playlists"));

        Ok(Encoded {
            main: xml::write_document(&database)?,
            siblings: vec![(PLAYLISTS_FILE.to_string(), xml::write_document(&playlists)?)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectionError;
    use crate::model::Tag;
    use crate::platform::xml::Element;
    use tempfile::TempDir;

    const DATABASE: &str = r#"<?xml version="1.0" standalone="yes"?>
<rhythmdb version="2.0">
  <entry type="song">
    <title>First</title>
    <genre>House</genre>
    <artist>Someone</artist>
    <duration>300</duration>
    <location>file:///music/first.mp3</location>
    <mtime>1600000000</mtime>
  </entry>
  <entry type="iradio">
    <title>Radio</title>
    <location>http://radio.example/stream</location>
  </entry>
  <entry type="song">
    <title>Second</title>
    <genre>Techno</genre>
    <location>file:///music/second.mp3</location>
  </entry>
</rhythmdb>
"#;

    const PLAYLISTS: &str = r#"<?xml version="1.0"?>
<rhythmdb-playlists>
  <playlist name="Warmup" show-browser="false" browser-position="180" search-type="search-match" type="static">
    <location>file:///music/second.mp3</location>
  </playlist>
  <playlist name="Play Queue" show-browser="false" browser-position="180" search-type="search-match" type="queue"/>
</rhythmdb-playlists>
"#;

    fn library() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("rhythmdb.xml");
        std::fs::write(&db, DATABASE).unwrap();
        std::fs::write(dir.path().join(PLAYLISTS_FILE), PLAYLISTS).unwrap();
        (dir, db)
    }

    #[test]
    fn test_track_ids_are_location_hashes() {
        let id = track_id_for("file:///music/first.mp3");
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(id, track_id_for("file:///music/first.mp3"));
        assert_ne!(id, track_id_for("file:///music/second.mp3"));
    }

    #[test]
    fn test_load_library() {
        let (_dir, db) = library();
        let collection = RhythmboxFormat.load(&db).unwrap();

        assert_eq!(collection.track_count(), 2);
        assert_eq!(collection.playlist_count(), 2);
        let warmup = collection.get_playlists("Warmup")[0];
        let tracks = collection.tracks_of(warmup);
        assert_eq!(tracks[0].title(), Some("Second"));
        assert_eq!(tracks[0].text(Tag::Genre), Some("Techno"));
    }

    #[test]
    fn test_round_trip_keeps_other_entries() {
        let (dir, db) = library();
        let collection = RhythmboxFormat.load(&db).unwrap();
        let out = dir.path().join("out").join("rhythmdb.xml");
        std::fs::create_dir_all(out.parent().unwrap()).unwrap();
        collection.serialize(&out).unwrap();

        let reloaded = RhythmboxFormat.load(&out).unwrap();
        assert_eq!(reloaded.get_tracks(), collection.get_tracks());
        assert_eq!(reloaded.root(), collection.root());

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("http://radio.example/stream"));
        assert!(text.contains("<mtime>1600000000</mtime>"));
    }

    const NESTED_PLAYLISTS: &str = r#"<?xml version="1.0"?>
<rhythmdb-playlists>
  <playlist name="Sets/Friday" show-browser="false" browser-position="180" search-type="search-match" type="static">
    <location>file:///music/second.mp3</location>
  </playlist>
  <playlist name="House" show-browser="true" browser-position="180" search-type="search-match" type="automatic" sort-key="Artist" limit-count="0">
    <conjunction>
      <like prop="genre-folded">house</like>
    </conjunction>
  </playlist>
</rhythmdb-playlists>
"#;

    #[test]
    fn test_round_trip_writes_folders_and_queries() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("rhythmdb.xml");
        std::fs::write(&db, DATABASE).unwrap();
        std::fs::write(dir.path().join(PLAYLISTS_FILE), NESTED_PLAYLISTS).unwrap();

        let mut collection = RhythmboxFormat.load(&db).unwrap();
        assert!(collection.get_playlists("Sets")[0].is_folder());
        let second = track_id_for("file:///music/second.mp3");
        collection
            .add_playlist(Playlist::new_folder(
                "Gigs",
                vec![Playlist::new_folder(
                    "2024",
                    vec![Playlist::new_playlist("May", vec![second.clone()])],
                )],
            ))
            .unwrap();

        let out = dir.path().join("out").join("rhythmdb.xml");
        std::fs::create_dir_all(out.parent().unwrap()).unwrap();
        collection.serialize(&out).unwrap();

        let written = xml::read_document(&out.with_file_name(PLAYLISTS_FILE)).unwrap();
        let playlist = |name: &str| {
            written
                .child_elements()
                .find(|element| element.name == "playlist" && element.attr("name") == Some(name))
                .cloned()
                .unwrap()
        };

        let friday = playlist("Sets/Friday");
        let locations: Vec<String> = friday.child_elements().map(Element::text).collect();
        assert_eq!(locations, vec!["file:///music/second.mp3"]);

        let may = playlist("Gigs/2024/May");
        assert_eq!(may.attr("type"), Some("static"));
        assert_eq!(may.child_elements().count(), 1);

        // the query goes back as it was, without members
        let house = playlist("House");
        assert_eq!(house.attr("type"), Some("automatic"));
        assert_eq!(house.attr("sort-key"), Some("Artist"));
        assert!(house.find_child("location").is_none());
        let like = house
            .find_child("conjunction")
            .and_then(|conjunction| conjunction.find_child("like"))
            .unwrap();
        assert_eq!(like.attr("prop"), Some("genre-folded"));
        assert_eq!(like.text(), "house");

        let reloaded = RhythmboxFormat.load(&out).unwrap();
        for name in ["Sets", "Friday", "House"] {
            assert_eq!(reloaded.get_playlists(name), collection.get_playlists(name));
        }
        assert_eq!(
            reloaded.get_playlists("House")[0].track_ids(),
            &[track_id_for("file:///music/first.mp3")]
        );
        assert_eq!(reloaded.get_playlists("May")[0].track_ids(), &[second]);
        assert!(reloaded.get_playlists("2024")[0].is_folder());
    }

    #[test]
    fn test_missing_playlists_file_is_empty_tree() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("rhythmdb.xml");
        std::fs::write(&db, DATABASE).unwrap();

        let collection = RhythmboxFormat.load(&db).unwrap();
        assert_eq!(collection.playlist_count(), 0);
    }

    #[test]
    fn test_wrong_root_is_format_error() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("rhythmdb.xml");
        std::fs::write(&db, "<DJ_PLAYLISTS/>").unwrap();
        assert!(matches!(
            RhythmboxFormat.load(&db),
            Err(CollectionError::Format { .. })
        ));
    }
}
