use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "wander")]
#[command(about = "Browse countries and keep a synced list of favorites")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name for Supabase configuration and stored session
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the country catalogue
    Countries {
        #[command(subcommand)]
        command: CountriesCommands,
    },
    /// Manage favorite countries for the signed-in account
    #[command(alias = "favs")]
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate CLI profile with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum CountriesCommands {
    /// List countries, optionally filtered by name and region
    List {
        /// Case-insensitive substring of the common name
        #[arg(short, long, value_name = "TEXT", default_value = "")]
        search: String,
        /// Region filter (Africa, Americas, Asia, Europe, Oceania or All)
        #[arg(short, long, value_name = "REGION", default_value = "All")]
        region: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show details for one country
    Show {
        /// Three-letter country code, e.g. DEU
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum FavoritesCommands {
    /// List favorite countries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a country to favorites, or remove it if already present
    Toggle {
        /// Three-letter country code, e.g. DEU
        code: String,
        /// Skip the removal confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove a country from favorites
    Remove {
        /// Three-letter country code, e.g. DEU
        code: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// REST Countries API base URL
        #[arg(long, value_name = "URL")]
        countries_api_url: Option<String>,
        /// Favorites table name
        #[arg(long, value_name = "TABLE")]
        favorites_table: Option<String>,
        /// Seconds before a favorites write is abandoned
        #[arg(long, value_name = "SECONDS")]
        write_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
        /// Skip checking the Supabase URL and key against the auth settings endpoint
        #[arg(long)]
        no_verify: bool,
    },
    /// Show the resolved configuration for a profile
    Show {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Create a Supabase account and its empty favorites list
    Signup {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password (at least 8 characters)
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Login with Supabase email/password and store session in keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Logout profile and clear stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
