use axis::config::{AppConfig, load_or_default};
use axis::dictionary::Dictionaries;
use axis::model::{AppError, NewListing};
use axis::parser::{Parser as _, PostParser};
use axis::storage::SqliteStorage;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "axis",
    version,
    about = "Catalog access-broker marketplace posts into structured listings"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (JSON)
    #[arg(long, default_value = "config.json", global = true)]
    config: String,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Print suggested listing fields for a raw post
    Suggest {
        #[command(flatten)]
        post: PostInput,
    },
    /// Manage brokers
    Broker {
        #[command(subcommand)]
        command: BrokerCommand,
    },
    /// Manage listings
    Listing {
        #[command(subcommand)]
        command: ListingCommand,
    },
    /// Search listings by broker, sector, revenue, country, access or description
    Search { query: String },
}

#[derive(Subcommand)]
enum BrokerCommand {
    /// Register a broker under its normalized name
    Add {
        name: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    List,
    /// Replace a broker's notes
    Notes { id: i64, notes: String },
    /// Delete a broker and all of its listings
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ListingCommand {
    /// Extract fields from a post, apply overrides and save the listing
    Add {
        /// Broker name; created if unknown
        #[arg(long)]
        broker: String,
        #[command(flatten)]
        post: PostInput,
        #[command(flatten)]
        fields: FieldOverrides,
        /// Forum or market the post came from
        #[arg(long, default_value = "")]
        source: String,
        /// Link to the original post
        #[arg(long)]
        url: Option<String>,
        /// Save even when likely duplicates exist
        #[arg(long)]
        force: bool,
    },
    /// Listings of a broker
    List {
        #[arg(long)]
        broker: String,
    },
    Show { id: i64 },
    Delete { id: i64 },
}

#[derive(Args)]
struct PostInput {
    #[arg(long, default_value = "")]
    title: String,
    /// Post body
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,
    /// File holding the post body, `-` for stdin
    #[arg(long)]
    text_file: Option<String>,
}

impl PostInput {
    fn body(&self) -> Result<String, AppError> {
        match (&self.text, self.text_file.as_deref()) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some("-")) => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
            (None, Some(path)) => Ok(fs::read_to_string(path)?),
            (None, None) => Ok(String::new()),
        }
    }
}

/// Values that replace the suggested ones.
#[derive(Args)]
struct FieldOverrides {
    #[arg(long)]
    access_type: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    privilege: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    sector: Option<String>,
    #[arg(long)]
    revenue: Option<String>,
    #[arg(long)]
    post_date: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl FieldOverrides {
    fn apply(self, listing: &mut NewListing) {
        let pairs = [
            (self.access_type, &mut listing.access_type),
            (self.country, &mut listing.country),
            (self.privilege, &mut listing.privilege),
            (self.price, &mut listing.price),
            (self.sector, &mut listing.sector),
            (self.revenue, &mut listing.revenue),
            (self.post_date, &mut listing.post_date),
            (self.description, &mut listing.description),
        ];
        for (value, field) in pairs {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match load_or_default(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cli.command, &config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Command, config: &AppConfig) -> Result<(), AppError> {
    let dict = match &config.dictionary_path {
        Some(path) => Dictionaries::load(path)?,
        None => Dictionaries::builtin().clone(),
    };
    let parser = PostParser::new(dict.clone()).with_description_max_len(config.description_max_len);

    let open_storage = || -> Result<SqliteStorage, AppError> {
        Ok(SqliteStorage::new(&config.database_path)?.with_dictionaries(dict.clone()))
    };

    match command {
        Command::Suggest { post } => {
            let suggestion = parser.suggest(&post.title, &post.body()?);
            print_json(&suggestion)
        }
        Command::Broker { command } => broker_command(command, &open_storage()?),
        Command::Listing { command } => listing_command(command, &open_storage()?, &parser),
        Command::Search { query } => print_json(&open_storage()?.search(&query)?),
    }
}

fn broker_command(command: BrokerCommand, storage: &SqliteStorage) -> Result<(), AppError> {
    match command {
        BrokerCommand::Add { name, notes } => {
            let (broker, duplicate) = storage.create_broker(&name, &notes)?;
            if duplicate {
                warn!("Another broker is already stored as '{}'", broker.name);
            }
            print_json(&broker)
        }
        BrokerCommand::List => print_json(&storage.list_brokers()?),
        BrokerCommand::Notes { id, notes } => {
            storage.update_broker_notes(id, &notes)?;
            info!("Updated notes of broker {}", id);
            Ok(())
        }
        BrokerCommand::Delete { id } => storage.delete_broker(id).map_err(AppError::from),
    }
}

fn listing_command(
    command: ListingCommand,
    storage: &SqliteStorage,
    parser: &PostParser,
) -> Result<(), AppError> {
    match command {
        ListingCommand::Add {
            broker,
            post,
            fields,
            source,
            url,
            force,
        } => {
            let body = post.body()?;
            let broker_id = match storage.find_brokers_by_name(&broker)?.first() {
                Some(existing) => existing.id,
                None => storage.create_broker(&broker, "")?.0.id,
            };

            let suggestion = parser.suggest(&post.title, &body);
            let mut listing = NewListing::from_suggestion(broker_id, &suggestion);
            fields.apply(&mut listing);
            listing.source = source;
            listing.raw_title = Some(post.title).filter(|t| !t.is_empty());
            listing.raw_text = Some(body).filter(|t| !t.is_empty());
            listing.raw_url = url;

            let duplicates = storage.find_duplicates(&listing)?;
            if !duplicates.is_empty() {
                warn!("Found {} likely duplicate listing(s)", duplicates.len());
                print_json(&duplicates)?;
                if !force {
                    return Err(AppError::Refused(
                        "likely duplicate, rerun with --force to save anyway".to_string(),
                    ));
                }
            }

            print_json(&storage.insert_listing(&listing)?)
        }
        ListingCommand::List { broker } => {
            let mut listings = Vec::new();
            for b in storage.find_brokers_by_name(&broker)? {
                listings.extend(storage.listings_for_broker(b.id)?);
            }
            print_json(&listings)
        }
        ListingCommand::Show { id } => match storage.get_listing(id)? {
            Some(listing) => print_json(&listing),
            None => Err(AppError::Refused(format!("listing {} not found", id))),
        },
        ListingCommand::Delete { id } => storage.delete_listing(id).map_err(AppError::from),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            database_path: dir.join("axis.db").to_string_lossy().into_owned(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn suggest_does_not_touch_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let command = Command::Suggest {
            post: PostInput {
                title: "[US] RDP access".to_string(),
                text: Some("domain admin, revenue 10 millions".to_string()),
                text_file: None,
            },
        };

        run(command, &config).unwrap();
        assert!(!dir.path().join("axis.db").exists());
    }

    #[test]
    fn storage_commands_open_the_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        run(Command::Broker { command: BrokerCommand::List }, &config).unwrap();
        assert!(dir.path().join("axis.db").exists());
    }
}
