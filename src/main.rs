use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dj_collection::config::DEFAULT_CONFIG_FILE;
use dj_collection::operations::{relocate, shuffle};
use dj_collection::{builder, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dj-collection")]
#[command(about = "Build, shuffle and relocate DJ collection playlists", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: String,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the PLAYLIST_BUILDER folder from the configured playlist rules
    Build,

    /// Shuffle the configured playlists into a SHUFFLE playlist
    Shuffle {
        /// Seed for a reproducible order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Copy the audio of the configured playlists to copy_destination
    Copy,

    /// Re-root another user's collection at the configured media_root
    RewritePaths {
        /// Collection file to rewrite in place
        collection: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = PathBuf::from(shellexpand::tilde(&args.config).as_ref());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config {:?}", config_path))?;

    match args.command {
        Command::Build => {
            let collection = builder::run(&config).context("Playlist build failed")?;
            log::info!(
                "Collection now has {} playlists; written to {:?}",
                collection.playlist_count(),
                config.output_path()
            );
        }
        Command::Shuffle { seed } => {
            let collection = shuffle::run(&config, seed).context("Shuffle failed")?;
            let shuffled = collection
                .get_playlists(shuffle::SHUFFLE_PLAYLIST)
                .last()
                .map_or(0, |playlist| playlist.len());
            log::info!("Shuffled {} tracks into {}", shuffled, shuffle::SHUFFLE_PLAYLIST);
        }
        Command::Copy => {
            let subset = relocate::run_copy(&config).context("Copy failed")?;
            log::info!(
                "Copied {} tracks; collection written to {:?}",
                subset.track_count(),
                subset.path()
            );
        }
        Command::RewritePaths { collection } => {
            let path = PathBuf::from(shellexpand::tilde(&collection).as_ref());
            relocate::run_rewrite(&config, &path)
                .with_context(|| format!("Failed to rewrite {:?}", path))?;
        }
    }

    log::info!("Done");
    Ok(())
}
