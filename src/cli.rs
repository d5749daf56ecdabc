use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API.
    Serve {
        /// Address to listen on. Overrides `bind` from config.yaml
        #[clap(short, long, env = "RECIPE_FINDER_BIND")]
        bind: Option<String>,
    },

    /// Build the vector index from the precomputed embedding arrays.
    BuildIndex {},

    /// Search recipes by a free-text description
    Search {
        /// What you feel like eating
        query: String,

        /// Number of results to skip
        #[clap(short, long, default_value = "0")]
        offset: usize,

        /// Number of results to show (default from config)
        #[clap(short, long)]
        limit: Option<usize>,

        /// Query a running server instead of loading the model locally
        #[clap(long, env = "RECIPE_FINDER_ADDR")]
        remote: Option<String>,

        /// Print raw json
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Show a recipe in full
    Show {
        id: u64,

        /// Query a running server instead of reading the table locally
        #[clap(long, env = "RECIPE_FINDER_ADDR")]
        remote: Option<String>,

        /// Print raw json
        #[clap(long, default_value = "false")]
        json: bool,
    },
}
