use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use release_watch::calendar::CalDavClient;
use release_watch::config::{self, Config};
use release_watch::db::{self, ListOrder, OrderColumn};
use release_watch::dispatch::Dispatcher;
use release_watch::model::MediaKind;
use release_watch::status;
use release_watch::tmdb::{MediaSummary, Page, TmdbClient};
use release_watch::tracker::Tracker;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate one show or movie and print the record without storing it
    Check {
        kind: MediaKind,
        id: String,
        /// Proximity threshold in days (defaults to app.threshold_days)
        #[arg(long)]
        threshold: Option<i64>,
        /// Do not schedule calendar reminders
        #[arg(long)]
        no_notify: bool,
    },
    /// Evaluate and store, overwriting the existing row
    Track {
        kind: MediaKind,
        id: String,
        #[arg(long)]
        threshold: Option<i64>,
        #[arg(long)]
        no_notify: bool,
        /// Leave an existing row untouched instead of overwriting it
        #[arg(long)]
        keep_existing: bool,
    },
    /// Re-evaluate every tracked item
    Refresh {
        #[arg(long)]
        threshold: Option<i64>,
        #[arg(long)]
        no_notify: bool,
    },
    /// Print tracked items
    List {
        kind: MediaKind,
        #[arg(long, value_enum, default_value_t)]
        order_by: OrderColumn,
        #[arg(long)]
        desc: bool,
    },
    /// Stop tracking an item
    Untrack { kind: MediaKind, id: String },
    /// Search the metadata service
    Search {
        kind: MediaKind,
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one of the metadata service's release feeds
    Feed {
        #[arg(value_enum)]
        which: Feed,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Feed {
    OnTheAir,
    AiringToday,
    Upcoming,
}

fn dispatcher_for(cfg: &Config, no_notify: bool) -> Result<Option<Dispatcher>> {
    if no_notify {
        return Ok(None);
    }
    let calendar = CalDavClient::from_config(cfg)?;
    Ok(Some(Dispatcher::connect(
        Arc::new(calendar),
        cfg.caldav.calendar.clone(),
        cfg.sync_grace(),
    )))
}

fn print_page(page: &Page<MediaSummary>) {
    for item in &page.results {
        println!(
            "{:>8}  {:<10}  {}",
            item.id,
            item.release_date.as_deref().unwrap_or("-"),
            item.title.as_deref().unwrap_or("?")
        );
    }
    println!("page {}/{} ({} results)", page.page, page.total_pages, page.total_results);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let tmdb = Arc::new(TmdbClient::from_config(&cfg)?);

    match args.command {
        Command::Check {
            kind,
            id,
            threshold,
            no_notify,
        } => {
            let tracker = Tracker::new(tmdb, dispatcher_for(&cfg, no_notify)?);
            let threshold = threshold.unwrap_or(cfg.app.threshold_days);
            let record = tracker.check(kind, &id, threshold).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            if let Some(d) = tracker.dispatcher() {
                d.wait_idle().await;
            }
        }
        Command::Track {
            kind,
            id,
            threshold,
            no_notify,
            keep_existing,
        } => {
            let pool = db::init_pool(&cfg.database_url()).await?;
            db::run_migrations(&pool).await?;
            let tracker = Tracker::new(tmdb, dispatcher_for(&cfg, no_notify)?);
            let threshold = threshold.unwrap_or(cfg.app.threshold_days);
            let record = tracker.check(kind, &id, threshold).await?;
            if keep_existing {
                if db::insert_if_absent(&pool, &record).await? {
                    info!(%kind, external_id = %id, "now tracking");
                } else {
                    info!(%kind, external_id = %id, "already tracked; row left as is");
                }
            } else {
                db::upsert(&pool, std::slice::from_ref(&record)).await?;
                info!(%kind, external_id = %id, status = record.status, "tracked");
            }
            if let Some(d) = tracker.dispatcher() {
                d.wait_idle().await;
            }
        }
        Command::Refresh {
            threshold,
            no_notify,
        } => {
            let pool = db::init_pool(&cfg.database_url()).await?;
            db::run_migrations(&pool).await?;
            let tracker = Tracker::new(tmdb, dispatcher_for(&cfg, no_notify)?);
            let threshold = threshold.unwrap_or(cfg.app.threshold_days);
            let summary = tracker.refresh(&pool, threshold).await?;
            if let Some(d) = tracker.dispatcher() {
                d.wait_idle().await;
            }
            println!("refreshed {} item(s), {} failed", summary.refreshed, summary.failed);
        }
        Command::List {
            kind,
            order_by,
            desc,
        } => {
            let pool = db::init_pool(&cfg.database_url()).await?;
            db::run_migrations(&pool).await?;
            let order = ListOrder {
                column: order_by,
                descending: desc,
            };
            for record in db::list(&pool, kind, order).await? {
                println!(
                    "{:>8}  {:<40}  {}",
                    record.external_id,
                    record.name,
                    status::render(record.status)
                );
            }
        }
        Command::Untrack { kind, id } => {
            let pool = db::init_pool(&cfg.database_url()).await?;
            db::run_migrations(&pool).await?;
            if db::remove(&pool, kind, &id).await? {
                println!("removed {kind} {id}");
            } else {
                println!("{kind} {id} was not tracked");
            }
        }
        Command::Search { kind, query, page } => {
            print_page(&tmdb.search(kind, &query, page).await?);
        }
        Command::Feed { which } => {
            let page = match which {
                Feed::OnTheAir => tmdb.shows_on_the_air().await?,
                Feed::AiringToday => tmdb.shows_airing_today().await?,
                Feed::Upcoming => tmdb.upcoming_movies().await?,
            };
            print_page(&page);
        }
    }

    Ok(())
}
