//! Tienda CLI - Database migrations, seeding and order tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! tienda-cli migrate
//!
//! # Load countries, users and products
//! tienda-cli seed crates/cli/seed/catalog.yaml
//!
//! # Browse the catalog
//! tienda-cli products list --page 2
//!
//! # Place an order from a checkout JSON file
//! tienda-cli orders place -u <user-id> -c cart.json
//!
//! # Record a payment
//! tienda-cli orders pay <order-id> --transaction-id ch_123
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database from a YAML file
//! - `products` - List and show catalog products
//! - `orders` - Place, inspect and pay orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tienda_core::{OrderId, UserId};
use tienda_storefront::config::{LogFormat, StorefrontConfig};
use tienda_storefront::services::products::DEFAULT_PER_PAGE;

mod commands;

#[derive(Parser)]
#[command(name = "tienda-cli")]
#[command(author, version, about = "Tienda storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Load countries, users and products from a YAML file
    Seed {
        /// Path to the seed file
        file: PathBuf,

        /// Only validate the file, do not touch the database
        #[arg(long)]
        check: bool,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Place and inspect orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List one page of products, newest first
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Products per page
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Show a single product as JSON
    Show {
        /// Product slug
        slug: String,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Place an order from a checkout JSON file (`lines` and `address`)
    Place {
        /// Id of the user placing the order
        #[arg(short, long)]
        user: UserId,

        /// Path to the checkout JSON file
        #[arg(short, long)]
        cart: PathBuf,
    },
    /// Price a cart without placing it
    Summary {
        /// Path to a JSON file holding either a checkout or a bare list of lines
        #[arg(short, long)]
        cart: PathBuf,
    },
    /// Show one of a user's orders
    Show {
        /// Id of the user who owns the order
        #[arg(short, long)]
        user: UserId,

        /// Order id
        order_id: OrderId,
    },
    /// List a user's orders, newest first
    List {
        /// Id of the user
        #[arg(short, long)]
        user: UserId,
    },
    /// Record a payment for an order
    Pay {
        /// Order id
        order_id: OrderId,

        /// Payment provider transaction id
        #[arg(long)]
        transaction_id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry.sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
///
/// Only errors become Sentry events; rejected orders are logged at `warn`
/// and `info` and travel as breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO | tracing::Level::DEBUG => {
            sentry_tracing::EventFilter::Breadcrumb
        }
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tienda_storefront=info,tienda_cli=info".into());

    let (json, pretty) = match format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(pretty)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        // Flush pending Sentry events before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run(config).await?,
        Commands::Seed { file, check } => {
            let seed = commands::seed::load(&file).await?;
            if !check {
                commands::seed::apply(config, &seed).await?;
            }
        }
        Commands::Products { action } => match action {
            ProductAction::List { page, per_page } => {
                commands::products::list(config, page, per_page).await?;
            }
            ProductAction::Show { slug } => commands::products::show(config, &slug).await?,
        },
        Commands::Orders { action } => match action {
            OrderAction::Place { user, cart } => {
                commands::orders::place(config, user, &cart).await?;
            }
            OrderAction::Summary { cart } => commands::orders::summary(config, &cart).await?,
            OrderAction::Show { user, order_id } => {
                commands::orders::show(config, user, order_id).await?;
            }
            OrderAction::List { user } => commands::orders::list(config, user).await?,
            OrderAction::Pay {
                order_id,
                transaction_id,
            } => commands::orders::pay(config, order_id, &transaction_id).await?,
        },
    }
    Ok(())
}
