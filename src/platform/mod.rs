//! Platform registry and collection file formats
//!
//! Each supported DJ application gets one [`CollectionFormat`]
//! implementation. The set is closed: [`resolve`] maps a platform name to
//! its format once per invocation.

pub mod location;
pub mod rekordbox;
pub mod rhythmbox;
pub mod xml;

use crate::error::{CollectionError, Result};
use crate::model::Collection;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

/// Supported DJ software platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Rekordbox XML export (single file)
    Rekordbox,

    /// Rhythmbox rhythmdb.xml with a sibling playlists.xml
    Rhythmbox,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Rekordbox, Platform::Rhythmbox];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Rekordbox => "rekordbox",
            Platform::Rhythmbox => "rhythmbox",
        }
    }

    /// The format implementation for this platform
    pub fn format(&self) -> &'static dyn CollectionFormat {
        match self {
            Platform::Rekordbox => &rekordbox::RekordboxFormat,
            Platform::Rhythmbox => &rhythmbox::RhythmboxFormat,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self> {
        Platform::ALL
            .into_iter()
            .find(|platform| platform.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CollectionError::UnsupportedPlatform(s.to_string()))
    }
}

/// Resolve a platform name to its format
pub fn resolve(name: &str) -> Result<&'static dyn CollectionFormat> {
    Ok(name.parse::<Platform>()?.format())
}

/// Encoded collection files
#[derive(Debug, Clone, Default)]
pub struct Encoded {
    /// Content of the collection file itself
    pub main: Vec<u8>,

    /// Extra files written next to it, by file name
    pub siblings: Vec<(String, Vec<u8>)>,
}

/// Load/encode capability set of a platform
pub trait CollectionFormat: Send + Sync {
    fn platform(&self) -> Platform;

    /// Deserialize a collection from `path`
    fn load(&self, path: &Path) -> Result<Collection>;

    /// Serialize a collection into the platform's native files
    fn encode(&self, collection: &Collection) -> Result<Encoded>;
}

/// Replace `path` with `bytes` via a temporary file in the same directory
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    // the replacement keeps the permissions of the file it replaces
    match fs::metadata(path) {
        Ok(metadata) => file.as_file().set_permissions(metadata.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    log::debug!("Replaced {:?} ({} bytes)", path, bytes.len());
    Ok(())
}
