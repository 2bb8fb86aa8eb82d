use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "plantcare")]
#[command(about = "Keep track of when your houseplants need watering, feeding, pruning and repotting")]
#[command(version)]
pub struct Cli {
    /// Directory holding the plant data (overrides PLANT_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Show overdue, due and upcoming care (default if no subcommand)
    Agenda {
        /// How many days ahead to look
        #[arg(long)]
        days: Option<i64>,
    },
    /// List plants with their care status
    Plants,
    /// Add a plant
    Add {
        name: String,
        #[arg(long)]
        species: Option<String>,
        /// bedroom, balcony, office, living-room, kitchen, bathroom or other
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Water every N days
        #[arg(long, value_name = "DAYS")]
        water: Option<u32>,
        /// Fertilize every N days
        #[arg(long, value_name = "DAYS")]
        fertilize: Option<u32>,
        /// Prune every N days
        #[arg(long, value_name = "DAYS")]
        prune: Option<u32>,
        /// Repot every N days
        #[arg(long, value_name = "DAYS")]
        repot: Option<u32>,
    },
    /// Mark a care task as done now
    Done {
        plant_id: String,
        /// watering, fertilization, pruning or repotting
        category: String,
    },
    /// Delete a plant and its photos
    Remove { plant_id: String },
    /// Schedule reminders, optionally changing the preferences first
    Remind {
        /// Days of lead time before a task is due
        #[arg(long)]
        before: Option<i64>,
        /// Time of day, HH:MM
        #[arg(long)]
        at: Option<String>,
        #[arg(long, conflicts_with = "on")]
        off: bool,
        #[arg(long)]
        on: bool,
    },
    /// Manage the photo log of a plant
    Photo {
        #[command(subcommand)]
        action: PhotoCommand,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Agenda { days: None }
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum PhotoCommand {
    Add {
        plant_id: String,
        image_uri: String,
        #[arg(long)]
        notes: Option<String>,
        /// Height in centimetres
        #[arg(long)]
        height: Option<f32>,
        /// Width in centimetres
        #[arg(long)]
        width: Option<f32>,
    },
    List { plant_id: String },
}
