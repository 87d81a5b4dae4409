//! Kanto Inventory - command line entry point
//!
//! Ingests seller CSV exports, prints reports and allocation summaries, and
//! serves the dashboard.

use clap::{Parser, Subcommand};
use kanto_common::TitleMatch;
use kanto_inventory::catalog::{
    get_product, products_without_entry, set_display_name, set_image, set_set_name,
    set_unit_cost,
};
use kanto_inventory::web::{WebConfig, DEFAULT_BIND, DEFAULT_PORT};
use kanto_inventory::{
    allocation, allocation_summary, backup_to, build_report, import_allocations,
    ingest_csv_files, load_allocation_sheets, open_database, InventoryError, ReportOptions,
    Result,
};
use serde::Serialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Kanto inventory - sales ingestion, reporting and owner allocations
#[derive(Parser, Debug)]
#[command(name = "kanto_inventory")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true, env = "KANTO_DB_PATH", default_value_t = default_db_path())]
    db_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load seller CSV exports (files or directories of *.csv)
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Also store giveaways and other non-sale rows
        #[arg(long)]
        include_non_sales: bool,
    },
    /// Print sold quantities per item
    Report {
        #[arg(long, default_value_t = TitleMatch::Exact)]
        title_match: TitleMatch,
        #[arg(long)]
        group_by_buyer: bool,
        #[arg(long)]
        include_non_sales: bool,
    },
    /// Import owner allocations from a workbook or CSV
    Allocate {
        sheet: PathBuf,
        /// Show what would be stored without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print allocated versus available stock
    Summary,
    /// Delete every stored allocation
    ClearAllocations,
    /// Inspect or edit the product catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Write a copy of the database to a new file
    Backup { destination: PathBuf },
    /// Serve the dashboard
    Serve {
        #[arg(long, env = "KANTO_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value_t = DEFAULT_BIND)]
        bind: IpAddr,
        /// PIN required for edits; without one the dashboard is read-only
        #[arg(long, env = "KANTO_ADMIN_PIN", hide_env_values = true)]
        admin_pin: Option<String>,
        /// Directory product images are served from (default: next to the database)
        #[arg(long, env = "KANTO_IMAGES_DIR")]
        images_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List inventory items without a catalog entry
    Missing,
    /// Update the catalog entry of a normalized item name
    Set {
        normalized_name: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        set: Option<String>,
    },
}

/// Returns the default database path: ~/.local/share/kanto_inventory/inventory.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kanto_inventory")
        .join("inventory.db")
        .to_string_lossy()
        .to_string()
}

fn default_images_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("product_images")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let db_path = PathBuf::from(&cli.db_path);
    log::debug!("Database path: {}", db_path.display());
    let mut conn = open_database(&db_path)?;

    match cli.command {
        Command::Ingest {
            paths,
            include_non_sales,
        } => print_json(&ingest_csv_files(&mut conn, &paths, include_non_sales)?),
        Command::Report {
            title_match,
            group_by_buyer,
            include_non_sales,
        } => print_json(&build_report(
            &conn,
            ReportOptions {
                group_by_buyer,
                include_non_sales,
                title_match,
            },
        )?),
        Command::Allocate { sheet, dry_run } => {
            let sheets = load_allocation_sheets(&sheet)?;
            print_json(&import_allocations(&mut conn, &sheets, dry_run)?)
        }
        Command::Summary => print_json(&allocation_summary(&conn)?),
        Command::ClearAllocations => {
            let removed = allocation::clear_allocations(&conn)?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        Command::Catalog { command } => run_catalog(&conn, command),
        Command::Backup { destination } => {
            backup_to(&conn, &destination)?;
            print_json(&serde_json::json!({ "backup": destination }))
        }
        Command::Serve {
            port,
            bind,
            admin_pin,
            images_dir,
        } => {
            let config = WebConfig {
                bind,
                port,
                admin_pin,
                images_dir: images_dir.unwrap_or_else(|| default_images_dir(&db_path)),
            };
            // Wrap connection in Arc<Mutex> for the handlers
            let db = Arc::new(Mutex::new(conn));
            kanto_inventory::web::serve(db, &config).await
        }
    }
}

fn run_catalog(conn: &rusqlite::Connection, command: CatalogCommand) -> Result<()> {
    match command {
        CatalogCommand::Missing => print_json(&products_without_entry(conn)?),
        CatalogCommand::Set {
            normalized_name,
            name,
            price,
            image,
            set,
        } => {
            if name.is_none() && price.is_none() && image.is_none() && set.is_none() {
                return Err(InventoryError::InvalidInput(
                    "nothing to update: pass --name, --price, --image or --set".to_string(),
                ));
            }
            if let Some(name) = &name {
                set_display_name(conn, &normalized_name, name)?;
            }
            if let Some(price) = price {
                set_unit_cost(conn, &normalized_name, price)?;
            }
            if let Some(image) = &image {
                set_image(conn, &normalized_name, image, None)?;
            }
            if let Some(set) = &set {
                set_set_name(conn, &normalized_name, set)?;
            }
            print_json(&get_product(conn, &normalized_name)?)
        }
    }
}
