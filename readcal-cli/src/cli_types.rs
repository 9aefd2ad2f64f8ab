//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "readcal")]
#[command(about = "Track manga releases across metadata sources", long_about = None)]
pub(crate) struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Search for works by title
    Search {
        query: String,

        /// Only search this source (anilist, mangadex, jikan)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Reconcile one work and add it to the calendar
    Resolve {
        /// Source name, e.g. anilist
        source: String,

        /// The source's identifier for the work
        id: String,

        /// Ignore cached data and query the source again
        #[arg(long)]
        refresh: bool,
    },

    /// Show upcoming and recent releases
    Calendar {
        /// First day to show (YYYY-MM-DD, default: start of the window)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to show (YYYY-MM-DD, default: end of the window)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Only show one work (source:id)
        #[arg(long)]
        work: Option<String>,
    },

    /// Rebuild calendar events for every tracked work
    Refresh,

    /// List recently updated works
    Latest {
        /// Only query this source
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Manage the metadata cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// List metadata sources, or enable/disable one
    Providers {
        #[command(subcommand)]
        action: Option<ProviderAction>,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Remove cached payloads
    Clear {
        /// Only clear entries from this source
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Show row counts for the local database
    Stats,
}

#[derive(Subcommand)]
pub(crate) enum ProviderAction {
    /// Enable a source in the settings file
    Enable { name: String },

    /// Disable a source in the settings file
    Disable { name: String },
}
