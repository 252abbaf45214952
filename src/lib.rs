//! DJ collection manager
//!
//! Loads a DJ application's collection file (tracks plus a nested playlist
//! tree) into memory, runs operations on it and writes it back in the
//! platform's native format:
//!
//! - [`builder`]: playlists generated from tag rules
//! - [`operations::shuffle`]: emulated shuffling through track numbers
//! - [`operations::relocate`]: path rewriting and playlist copying

pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod operations;
pub mod platform;

pub use config::Config;
pub use error::{CollectionError, Result};
pub use model::{Collection, Playlist, Track, TrackId};
pub use platform::Platform;
