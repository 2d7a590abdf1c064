use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use refeed::config::Config;
use refeed::feed::{
    self, build_client, fetch_document, Diagnostic, DocumentKind, Feed, SelectorSet, Value,
};
use refeed::render;
use refeed::storage::{Database, WriteOutcome};
use refeed::util::normalize_source_url;

/// Get the config directory path (~/.config/refeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("refeed"))
}

#[derive(Parser, Debug)]
#[command(
    name = "refeed",
    about = "Normalize RSS and scraped HTML sources into deduplicated feeds"
)]
struct Args {
    /// Database file (overrides config and the default location)
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch an RSS document and store its normalized feed
    Ingest {
        /// Source URL; https:// is assumed when no scheme is given
        url: String,
    },
    /// Scrape an HTML listing page into a feed using CSS selectors
    Scrape {
        /// Page URL; https:// is assumed when no scheme is given
        url: String,
        /// Selector for the feed title element
        #[arg(long, value_name = "CSS")]
        title_selector: String,
        /// Selector matching one element per item
        #[arg(long, value_name = "CSS")]
        item_selector: String,
        /// Selector for the title (and link) inside each item
        #[arg(long, value_name = "CSS")]
        item_title_selector: String,
        /// Channel description to store; listing pages rarely carry one and
        /// RSS output requires it
        #[arg(long, value_name = "TEXT")]
        description: Option<String>,
    },
    /// Print a stored feed as an RSS 2.0 document
    Render { id: i64 },
    /// List stored feeds
    List,
    /// Delete a stored feed and its items
    Remove { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("refeed=info")),
        )
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }
    let config =
        Config::load(&config_dir.join("config.toml")).context("Failed to load configuration")?;

    let db_path = args
        .database
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| config_dir.join("refeed.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path_str)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Ingest { url } => ingest(&db, &config, &url).await,
        Command::Scrape {
            url,
            title_selector,
            item_selector,
            item_title_selector,
            description,
        } => {
            let selectors = SelectorSet {
                feed_title: title_selector,
                item: item_selector,
                item_title: item_title_selector,
            };
            scrape(&db, &config, &url, &selectors, description).await
        }
        Command::Render { id } => render_feed(&db, id).await,
        Command::List => list_feeds(&db).await,
        Command::Remove { id } => remove_feed(&db, id).await,
    }
}

async fn ingest(db: &Database, config: &Config, url: &str) -> Result<()> {
    let source = normalize_source_url(url)?;
    let options = config.fetch_options();
    let client = build_client(&options).context("Failed to build HTTP client")?;

    let document = fetch_document(&client, source.as_str(), &options)
        .await
        .with_context(|| format!("Failed to fetch {source}"))?;
    if document.kind != DocumentKind::Xml {
        anyhow::bail!("{source} looks like an HTML page; use `refeed scrape` with selectors");
    }

    let normalized = feed::xml::parse(&document.body, source.as_str())
        .with_context(|| format!("Failed to parse RSS from {source}"))?;
    report_diagnostics(&normalized.diagnostics);
    store_feed(db, &normalized.feed).await
}

async fn scrape(
    db: &Database,
    config: &Config,
    url: &str,
    selectors: &SelectorSet,
    description: Option<String>,
) -> Result<()> {
    let source = normalize_source_url(url)?;
    let options = config.fetch_options();
    let client = build_client(&options).context("Failed to build HTTP client")?;

    let document = fetch_document(&client, source.as_str(), &options)
        .await
        .with_context(|| format!("Failed to fetch {source}"))?;
    if document.kind != DocumentKind::Html {
        anyhow::bail!("{source} looks like an RSS document; use `refeed ingest`");
    }

    let mut normalized = feed::html::parse(&document.body, source.as_str(), selectors)
        .with_context(|| format!("Failed to scrape {source}"))?;
    if let Some(text) = description {
        normalized
            .feed
            .elements
            .insert("description".into(), Value::Text(text));
    }
    report_diagnostics(&normalized.diagnostics);
    store_feed(db, &normalized.feed).await
}

async fn store_feed(db: &Database, feed: &Feed) -> Result<()> {
    match db.create_feed(feed).await? {
        WriteOutcome::Created(id) => {
            println!(
                "Created feed {} ({} items) from {}",
                id,
                feed.items.len(),
                feed.source
            );
        }
        WriteOutcome::DuplicateSource => {
            println!("A feed for {} already exists; nothing stored.", feed.source);
        }
    }
    Ok(())
}

async fn render_feed(db: &Database, id: i64) -> Result<()> {
    let feed = db.get_feed(id).await?;
    let xml = render::to_xml(&feed)?;
    println!("{xml}");
    Ok(())
}

async fn list_feeds(db: &Database) -> Result<()> {
    let summaries = db.get_feed_summaries().await?;
    if summaries.is_empty() {
        println!("No feeds stored.");
        return Ok(());
    }
    for summary in summaries {
        let created = chrono::DateTime::from_timestamp(summary.created_at, 0)
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{:>4}  {}  {:>4} items  {:<30}  {}",
            summary.id,
            created,
            summary.item_count,
            summary.title.as_deref().unwrap_or("(untitled)"),
            summary.source
        );
    }
    Ok(())
}

async fn remove_feed(db: &Database, id: i64) -> Result<()> {
    db.delete_feed(id).await?;
    println!("Removed feed {id}");
    Ok(())
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("warning: {diagnostic}");
    }
}
