//! Pocket Cart CLI - Inspect and edit a file-backed cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the saved cart
//! pocket-cart show
//!
//! # Add a product, then bump and drop its quantity
//! pocket-cart add --id sku-1 --title "Dried Pineapple" --price 8.50
//! pocket-cart increment sku-1
//! pocket-cart decrement sku-1
//!
//! # Use a different cart
//! pocket-cart --dir /tmp/carts --namespace @GoMarketplace show
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart as a table (or JSON with `--json`)
//! - `add` - Add one unit of a product
//! - `increment` / `decrement` - Change a product's quantity by one
//! - `clear` - Delete the saved cart
//!
//! Configuration comes from `POCKET_CART_*` environment variables (see
//! `pocket_cart_store::config`); `--dir` and `--namespace` override them.
//! `SENTRY_DSN` enables error reporting.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pocket_cart_core::{Cart, CatalogItem, Price, ProductId};
use pocket_cart_store::{CartConfig, CartError, CartProvider};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "pocket-cart")]
#[command(author, version, about = "Pocket Cart command-line tools")]
struct Cli {
    /// Directory holding the saved cart (overrides `POCKET_CART_DIR`)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Storage key namespace (overrides `POCKET_CART_NAMESPACE`)
    #[arg(long, global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show {
        /// Print the saved JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    #[command(flatten)]
    Edit(Edit),
    /// Delete the saved cart
    Clear,
}

/// Commands that change the cart and print the result.
#[derive(Subcommand)]
enum Edit {
    /// Add one unit of a product to the cart
    Add {
        /// Product ID
        #[arg(long)]
        id: String,

        /// Product title
        #[arg(short, long)]
        title: String,

        /// Product image URL
        #[arg(short, long, default_value = "")]
        image_url: String,

        /// Unit price (e.g. 8.50)
        #[arg(short, long)]
        price: Price,
    },
    /// Increase a product's quantity by one
    Increment {
        /// Product ID
        id: String,
    },
    /// Decrease a product's quantity by one (may go below zero)
    Decrement {
        /// Product ID
        id: String,
    },
}

/// Read the Sentry DSN, treating a blank value as unset.
fn sentry_dsn(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    lookup("SENTRY_DSN")
        .map(|dsn| dsn.trim().to_string())
        .filter(|dsn| !dsn.is_empty())
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (also loads .env)
    let config = CartConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let dsn = sentry_dsn(|name| std::env::var(name).ok());
    let sentry_guard = init_sentry(dsn.as_deref());

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pocket_cart=info,pocket_cart_store=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        sentry::capture_error(e.as_ref());
        tracing::error!("Command failed: {e}");
        // Flush pending Sentry events before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CartConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config;
    if let Some(dir) = cli.dir {
        config = config.with_storage_dir(dir);
    }
    if let Some(namespace) = cli.namespace {
        config = config.with_namespace(namespace);
    }

    let (cart, json) = match cli.command {
        // Clearing must not depend on the saved cart being readable
        Commands::Clear => {
            commands::cart::clear(&config).await?;
            return Ok(());
        }
        Commands::Show { json } => (commands::cart::open(&config).await?.products(), json),
        Commands::Edit(edit) => {
            let store = commands::cart::open(&config).await?;
            let cart = CartProvider::new(store).scope(apply(edit)).await?;
            (cart, false)
        }
    };

    let rendered = commands::cart::render(&cart, json)?;
    std::io::stdout().write_all(rendered.as_bytes())?;
    Ok(())
}

async fn apply(edit: Edit) -> Result<Cart, CartError> {
    match edit {
        Edit::Add {
            id,
            title,
            image_url,
            price,
        } => {
            let item = CatalogItem {
                id: ProductId::new(id),
                title,
                image_url,
                price,
            };
            commands::cart::add(item).await
        }
        Edit::Increment { id } => commands::cart::increment(&ProductId::new(id)).await,
        Edit::Decrement { id } => commands::cart::decrement(&ProductId::new(id)).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pocket-cart").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_edit_commands_parse_at_top_level() {
        let cli = parse(&["add", "--id", "sku-1", "-t", "Pineapple", "-p", "8.50"]);
        assert!(matches!(
            cli.command,
            Commands::Edit(Edit::Add { ref id, ref image_url, price, .. })
                if id == "sku-1" && image_url.is_empty() && price.to_string() == "8.50"
        ));

        let cli = parse(&["--dir", "/tmp/carts", "decrement", "sku-1"]);
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/carts")));
        assert!(matches!(cli.command, Commands::Edit(Edit::Decrement { ref id }) if id == "sku-1"));
    }

    #[test]
    fn test_show_and_clear_parse() {
        assert!(matches!(parse(&["show", "--json"]).command, Commands::Show { json: true }));
        assert!(matches!(parse(&["--namespace", "shop", "clear"]).command, Commands::Clear));
    }

    #[test]
    fn test_sentry_dsn_blank_is_unset() {
        assert_eq!(sentry_dsn(|_| None), None);
        assert_eq!(sentry_dsn(|_| Some("  ".to_string())), None);
        assert_eq!(
            sentry_dsn(|_| Some("https://key@sentry.example/1".to_string())).as_deref(),
            Some("https://key@sentry.example/1")
        );
    }
}
