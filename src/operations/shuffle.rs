//! Playlist shuffling
//!
//! DJ software cannot shuffle, so the order is emulated: the tracks of the
//! selected playlists are permuted, numbered 1..N through their track
//! number, and collected into a new `SHUFFLE` playlist at the root.

use super::worker_pool;
use crate::config::Config;
use crate::error::Result;
use crate::model::{Collection, Playlist, Track, TrackId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Name of the playlist holding the shuffled tracks
pub const SHUFFLE_PLAYLIST: &str = "SHUFFLE";

/// Union of the tracks of every playlist named in `names`
///
/// A track found in several playlists takes the position of its last
/// occurrence. Fails if any name matches no playlist.
pub fn collect_tracks(collection: &Collection, names: &[String]) -> Result<Vec<TrackId>> {
    let mut all = Vec::new();
    for name in names {
        for playlist in collection.require_playlists(name)? {
            for (_, id) in playlist.references() {
                all.push(id.clone());
            }
        }
    }

    let mut seen = HashSet::new();
    let mut union: Vec<TrackId> = all
        .into_iter()
        .rev()
        .filter(|id| seen.insert(id.clone()))
        .collect();
    union.reverse();
    Ok(union)
}

/// Shuffle the tracks of `names` and insert the `SHUFFLE` playlist
///
/// Returns the shuffled order. Nothing is mutated if a playlist is missing.
pub fn shuffle_playlists<R: Rng + ?Sized>(
    collection: &mut Collection,
    names: &[String],
    rng: &mut R,
) -> Result<Vec<TrackId>> {
    let mut order = collect_tracks(collection, names)?;
    log::info!("Shuffling {} tracks from {} playlist name(s)", order.len(), names.len());

    order.shuffle(rng);
    apply_track_numbers(collection, &order)?;

    collection.add_playlist(Playlist::new_playlist(SHUFFLE_PLAYLIST, order.iter().cloned()))?;
    Ok(order)
}

/// Write `1..=N` onto the tracks in `order`, in parallel
fn apply_track_numbers(collection: &mut Collection, order: &[TrackId]) -> Result<()> {
    let positions: HashMap<&TrackId, u32> = order.iter().zip(1u32..).collect();
    let mut assignments: Vec<(&mut Track, u32)> = collection
        .tracks_mut()
        .filter_map(|track| {
            let number = *positions.get(track.id())?;
            Some((track, number))
        })
        .collect();

    let pool = worker_pool()?;
    pool.install(|| {
        assignments
            .par_iter_mut()
            .try_for_each(|(track, number)| track.set_track_number(*number))
    })?;

    log::debug!("Assigned track numbers to {} tracks", assignments.len());
    Ok(())
}

/// Load the configured collection, shuffle, and write it to the output path
pub fn run(config: &Config, seed: Option<u64>) -> Result<Collection> {
    let mut collection = Collection::load(config.platform()?, &config.collection_path())?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    shuffle_playlists(&mut collection, &config.shuffle_playlists, &mut rng)?;

    collection.serialize(&config.output_path())?;
    Ok(collection)
}
