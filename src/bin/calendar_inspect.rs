use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use release_watch::calendar::{CalDavClient, CalendarService};
use release_watch::config;

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Also list the summaries of each calendar's events
    #[arg(long)]
    events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = config::load(Some(&args.config))?;
    let client = CalDavClient::from_config(&cfg)?;

    for calendar in client.list_calendars().await? {
        println!(
            "{} -> {{ url: {}, ctag: {} }}",
            calendar.display_name.as_deref().unwrap_or("(unnamed)"),
            calendar.url,
            calendar.ctag.as_deref().unwrap_or("-")
        );
        if !args.events {
            continue;
        }
        let synced = client.sync_calendar(&calendar).await?;
        for object in synced.objects {
            let summary = object
                .data
                .lines()
                .find_map(|l| l.strip_prefix("SUMMARY:"))
                .unwrap_or("(no summary)");
            println!("  {summary}");
        }
    }
    Ok(())
}
