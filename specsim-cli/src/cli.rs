use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Find similar requirements across specification documents")]
pub struct Cli {
    /// Path to the settings file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the settings file)
    #[clap(long)]
    pub db: Option<PathBuf>,

    /// Log debug output
    #[clap(long, short = 'v')]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init {
        /// Drop and recreate every table
        #[clap(long)]
        overwrite: bool,

        /// Skip the confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Import specification documents (YAML or JSON)
    Import {
        /// Documents to import
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },

    /// List imported specifications
    Specs,

    /// Compare every requirement of one specification against another
    Compare {
        /// Specification id, name or name@version (a numeric value is tried as an id first)
        spec1: String,

        /// Specification id, name or name@version (a numeric value is tried as an id first)
        spec2: String,

        /// Comparison method (custom or cosine)
        #[clap(long)]
        method: Option<String>,

        /// Similarity threshold in [0, 1]
        #[clap(long)]
        threshold: Option<f64>,
    },

    /// Find stored requirements similar to a text
    Find {
        /// Requirement text to look for
        text: String,

        /// Print results as JSON
        #[clap(long)]
        json: bool,

        /// Comparison method (custom or cosine)
        #[clap(long)]
        method: Option<String>,

        /// Similarity threshold in [0, 1]
        #[clap(long)]
        threshold: Option<f64>,
    },

    /// Show stored similarities for a specification
    Similarities {
        /// Specification id, name or name@version (a numeric value is tried as an id first)
        spec: String,
    },

    /// Count stored similarities per specification pair
    Counts,

    /// Show a requirement by its number
    Show {
        /// Requirement number, e.g. A_17124
        number: String,
    },

    /// Search requirement titles and descriptions
    Search {
        /// Text to search for
        text: String,
    },
}
