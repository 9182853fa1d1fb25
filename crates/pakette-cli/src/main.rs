//! pakette builds servable pk3 archives from a Quake 3 installation.
//!
//! `pakette build` turns a game directory into a baseline archive, a
//! manifest and one archive per map; `pakette map` resolves a single map
//! from a saved manifest; `pakette demo` summarizes the assets a recorded
//! match needs.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pakette_storage::manifest::Manifest;
use pakette_storage::{baseline, StorageError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pakette", version, about = "Quake 3 map and demo asset packaging")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build baseline archives, manifest and every map archive
    Build {
        /// Game installation directory (contains baseq3/, missionpack/)
        quake3_dir: PathBuf,
        /// Output directory for archives and manifest
        output_dir: PathBuf,
    },
    /// Resolve one map into its archive using a saved manifest
    Map {
        /// Map name (without path or extension)
        name: String,
        /// Game variant the map belongs to
        #[arg(long, default_value = "baseq3")]
        game: String,
        /// Manifest file from a previous build
        #[arg(long)]
        manifest: PathBuf,
        /// Directory to write the map archive into
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Summarize the assets a demo recording references
    Demo {
        /// Demo file to parse
        path: PathBuf,
        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Build {
            quake3_dir,
            output_dir,
        } => {
            let manifest = baseline::build_all(&quake3_dir, &output_dir)
                .with_context(|| format!("build from {}", quake3_dir.display()))?;
            println!(
                "built {} game variant(s) into {}",
                manifest.games.len(),
                output_dir.display()
            );
            Ok(())
        }
        Command::Map {
            name,
            game,
            manifest,
            output_dir,
        } => {
            let manifest = Manifest::load(&manifest)
                .with_context(|| format!("load manifest {}", manifest.display()))?;
            let game_manifest = manifest.game(&game)?;

            std::fs::create_dir_all(&output_dir)?;
            let output_path = output_dir.join(format!("{}.pk3", name.to_ascii_lowercase()));

            match baseline::build_map_archive(&name, game_manifest, &output_path) {
                Ok(Some(files)) => {
                    println!("{} ({files} files)", output_path.display());
                    Ok(())
                }
                Ok(None) => {
                    println!("{name}: baseline only, no archive needed");
                    Ok(())
                }
                Err(StorageError::MapNotFound(path)) => {
                    bail!("map not found: {path}")
                }
                Err(err) => Err(err).context(format!("build map {name}")),
            }
        }
        Command::Demo { path, json } => {
            let info = pakette_formats::demo::summarize(&path)
                .with_context(|| format!("parse demo {}", path.display()))?;

            if json {
                let players: Vec<_> = info
                    .player_infos
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "model": p.model,
                            "hmodel": p.head_model,
                        })
                    })
                    .collect();
                let summary = serde_json::json!({
                    "mapName": info.map_name,
                    "fsGame": info.fs_game,
                    "gameType": info.game_type,
                    "models": info.models,
                    "sounds": info.sounds,
                    "players": players,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("map:      {}", info.map_name);
                if !info.fs_game.is_empty() {
                    println!("game:     {}", info.fs_game);
                }
                println!("gametype: {}", info.game_type);
                println!("models:   {}", info.models.len());
                for model in &info.models {
                    println!("  {model}");
                }
                println!("sounds:   {}", info.sounds.len());
                for sound in &info.sounds {
                    println!("  {sound}");
                }
                println!("players:  {}", info.player_infos.len());
                for player in &info.player_infos {
                    if player.head_model.is_empty() {
                        println!("  {}", player.model);
                    } else {
                        println!("  {} (head {})", player.model, player.head_model);
                    }
                }
            }
            Ok(())
        }
    }
}
