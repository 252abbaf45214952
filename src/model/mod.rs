//! Platform-independent collection model
//!
//! Tracks live in one arena inside the [`Collection`], keyed by [`TrackId`].
//! Playlists reference tracks by id and are either folders or leaves.

mod collection;
mod playlist;
mod tag;
mod track;

pub use collection::{Collection, ROOT_PLAYLIST};
pub use playlist::{Playlist, PlaylistKind};
pub use tag::{Tag, TagKind, TagValue};
pub use track::{Track, TrackId};
