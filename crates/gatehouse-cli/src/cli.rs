use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(name = "gatehouse")]
#[command(
    author,
    version,
    about = "Evaluate Gatehouse policy documents against request fixtures"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        default_value = "gatehouse.yaml",
        env = "GATEHOUSE_CONFIG"
    )]
    pub config: String,

    /// Policy document path
    #[arg(short, long, global = true)]
    pub policy: Option<String>,

    /// Request fixture path
    #[arg(short, long, global = true)]
    pub request: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize the request fixture against the configured profiles
    Check {
        /// Profiles to try, in order (comma-separated)
        #[arg(long = "profile", value_delimiter = ',')]
        profiles: Vec<String>,

        /// Controller name, defaults to the fixture's
        #[arg(long)]
        controller: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },

    /// Print the raw decision of a single profile
    Validate {
        /// Profile name
        #[arg(long)]
        profile: String,

        /// Action identifiers to check (comma-separated)
        #[arg(long = "action", required = true, value_delimiter = ',')]
        actions: Vec<String>,
    },

    /// Load the policy document and list its profiles and tests
    Lint,
}

/// Report format of `check`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
