use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use magpie::config::Config;
use magpie::db::{self, PostStore, SqlitePostStore};
use magpie::output::terminal;
use magpie::pipeline::fetch::effective_retention;
use magpie::pipeline::{
    CancelFlag, EventSink, FetchOrchestrator, ProgressEvent, TranslationOrchestrator,
};
use magpie::source;
use magpie::threads::build_threads;
use magpie::translate::AiTranslator;
use magpie::{output, status};

use indicatif::{ProgressBar, ProgressStyle};

/// The single owner a CLI deployment serves.
const OWNER: i64 = 1;

/// Magpie: tracked-account tweet ingestion, thread reconstruction, and
/// AI translation.
///
/// Fetches recent posts for the accounts you track, keeps them within a
/// rolling retention window, and translates them (with a short editorial
/// remark) through a configurable AI provider.
#[derive(Parser)]
#[command(name = "magpie", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Start tracking an account
    Track {
        /// The handle to track (without the @)
        username: String,

        /// Days of posts to keep for this account (max 7)
        #[arg(long, default_value = "1")]
        retention_days: i64,
    },

    /// Stop tracking an account (its posts are purged on the next fetch)
    Untrack { username: String },

    /// List tracked accounts
    Accounts,

    /// Fetch recent posts for all tracked accounts
    Fetch {
        /// Override the retention window for this run (days, max 7)
        #[arg(long)]
        retention_days: Option<i64>,

        /// Max posts to request per account
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Translate the untranslated backlog
    Translate {
        /// How many backlog posts to process
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Concurrent translation calls per wave
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Re-translate a single post by id
    TranslateOne { id: String },

    /// Show reconstructed threads for a tracked account
    Threads { username: String },

    /// Show system status (accounts, backlog, last runs)
    Status,

    /// Start the web server (JSON + SSE streaming endpoints)
    #[cfg(feature = "web")]
    Serve {
        #[arg(long, default_value = "3000")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("magpie=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Magpie database...");
            let config = Config::load()?;
            let store = init_store(&config)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext: `magpie track <username>` and set up your .env");
        }

        Commands::Track {
            username,
            retention_days,
        } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let retention = retention_days.clamp(1, magpie::config::MAX_RETENTION_DAYS);
            if store
                .get_tracked_account(OWNER, &username)
                .await?
                .is_some()
            {
                anyhow::bail!("@{username} is already tracked");
            }
            store
                .add_tracked_account(OWNER, &username, retention)
                .await?;
            println!("Now tracking @{username} (retention {retention}d)");
        }

        Commands::Untrack { username } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            if store.remove_tracked_account(OWNER, &username).await? {
                println!("Stopped tracking @{username}. Posts purge on the next fetch.");
            } else {
                println!("@{username} was not tracked.");
            }
        }

        Commands::Accounts => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let accounts = store.list_tracked_accounts(OWNER).await?;
            if accounts.is_empty() {
                println!("No tracked accounts. Run `magpie track <username>` first.");
            } else {
                for account in accounts {
                    println!(
                        "@{} (retention {}d, since {})",
                        account.username, account.retention_days, account.created_at
                    );
                }
            }
        }

        Commands::Fetch {
            retention_days,
            limit,
        } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let provider = source::create_provider(&config)?;

            let accounts = store.list_tracked_accounts(OWNER).await?;
            if accounts.is_empty() {
                anyhow::bail!("No tracked accounts. Run `magpie track <username>` first.");
            }

            let retention = retention_days
                .map(|d| d.clamp(1, magpie::config::MAX_RETENTION_DAYS))
                .unwrap_or_else(|| effective_retention(config.retention_days, &accounts));
            let limit = limit.unwrap_or(config.fetch_limit);

            println!(
                "Fetching {} accounts (retention {}d)...",
                accounts.len(),
                retention
            );

            let (sink, mut rx) = EventSink::channel();
            let printer = tokio::spawn(async move {
                let mut bar: Option<ProgressBar> = None;
                while let Some(event) = rx.recv().await {
                    match event {
                        ProgressEvent::Cleanup(e) => {
                            println!(
                                "Purged {} expired and {} orphaned posts",
                                e.purged_expired, e.purged_orphans
                            );
                        }
                        ProgressEvent::Account(e) => {
                            let bar = bar.get_or_insert_with(|| {
                                let bar = ProgressBar::new(e.total as u64);
                                bar.set_style(
                                    ProgressStyle::default_bar()
                                        .template("  Accounts [{bar:30}] {pos}/{len}")
                                        .unwrap(),
                                );
                                bar
                            });
                            match &e.error {
                                Some(err) => bar.println(format!("  {} {}", "!".red(), err)),
                                None => bar.println(format!(
                                    "  @{}: {} received, {} new, {} outside retention",
                                    e.account, e.tweets_received, e.new_posts, e.filtered
                                )),
                            }
                            bar.set_position(e.current as u64);
                        }
                        _ => {}
                    }
                }
                if let Some(bar) = bar {
                    bar.finish_and_clear();
                }
            });

            let orchestrator = FetchOrchestrator::new(provider, store);
            let result = orchestrator
                .run(OWNER, &accounts, retention, limit, Some(&sink))
                .await;

            drop(sink);
            let _ = printer.await;

            terminal::display_fetch_result(&result?);
        }

        Commands::Translate { limit, concurrency } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let translator = AiTranslator::from_config(&config)?;

            let posts = store.find_untranslated(OWNER, limit).await?;
            if posts.is_empty() {
                println!("Backlog is empty — nothing to translate.");
                return Ok(());
            }

            let concurrency = concurrency.unwrap_or(config.translate_concurrency);
            println!(
                "Translating {} posts ({} concurrent)...",
                posts.len(),
                concurrency
            );

            let (sink, mut rx) = EventSink::channel();
            let printer = tokio::spawn(async move {
                let mut bar: Option<ProgressBar> = None;
                while let Some(event) = rx.recv().await {
                    let bar_ref = bar.get_or_insert_with(|| {
                        let bar = ProgressBar::new(0);
                        bar.set_style(
                            ProgressStyle::default_bar()
                                .template("  Posts [{bar:30}] {pos}/{len}")
                                .unwrap(),
                        );
                        bar
                    });
                    match event {
                        ProgressEvent::Translated(e) => {
                            bar_ref.set_length(e.total as u64);
                            bar_ref.println(format!(
                                "  {}: {}",
                                e.post_id,
                                output::truncate_chars(&e.translated_text, 80)
                            ));
                            bar_ref.set_position(e.current as u64);
                        }
                        ProgressEvent::TranslateError(e) => {
                            bar_ref.set_length(e.total as u64);
                            bar_ref.println(format!(
                                "  {} {}: {}",
                                "!".red(),
                                e.post_id,
                                output::truncate_chars(&e.error, 80)
                            ));
                            bar_ref.set_position(e.current as u64);
                        }
                        _ => {}
                    }
                }
                if let Some(bar) = bar {
                    bar.finish_and_clear();
                }
            });

            let orchestrator =
                TranslationOrchestrator::new(Arc::new(translator), store, concurrency);
            let result = orchestrator
                .run_batch(OWNER, &posts, Some(&sink), &CancelFlag::new())
                .await;

            drop(sink);
            let _ = printer.await;

            terminal::display_translate_result(&result?);
        }

        Commands::TranslateOne { id } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let translator = AiTranslator::from_config(&config)?;

            let post = store
                .get_post(OWNER, &id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("post {id} not found"))?;

            let orchestrator = TranslationOrchestrator::new(
                Arc::new(translator),
                store,
                config.translate_concurrency,
            );
            let translation = orchestrator.translate_one(&post).await?;

            println!("{}", translation.translated_text);
            if let Some(quoted) = &translation.quoted_translated_text {
                println!("\n[引用] {quoted}");
            }
            if !translation.comment_text.is_empty() {
                println!("\n{} {}", "锐评:".yellow(), translation.comment_text);
            }
        }

        Commands::Threads { username } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let account = store
                .get_tracked_account(OWNER, &username)
                .await?
                .ok_or_else(|| anyhow::anyhow!("@{username} is not tracked"))?;
            let posts = store.posts_for_account(account.id).await?;
            let threads = build_threads(&posts)?;
            terminal::display_threads(&account.username, &threads);
        }

        Commands::Status => {
            let config = Config::load()?;
            let store: Arc<dyn PostStore> = match db::open(&config.db_path) {
                Ok(conn) => Arc::new(SqlitePostStore::new(conn)),
                Err(_) => {
                    println!("Database: not initialized");
                    println!("\nRun `magpie init` to set up the database.");
                    return Ok(());
                }
            };
            status::show(&store, OWNER, &config.db_path).await?;
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            magpie::web::run_server(config, store, port, &bind).await?;
        }
    }

    Ok(())
}

fn init_store(config: &Config) -> Result<Arc<dyn PostStore>> {
    let conn = db::initialize(&config.db_path)?;
    Ok(Arc::new(SqlitePostStore::new(conn)))
}

fn open_store(config: &Config) -> Result<Arc<dyn PostStore>> {
    let conn = db::open(&config.db_path)?;
    Ok(Arc::new(SqlitePostStore::new(conn)))
}
