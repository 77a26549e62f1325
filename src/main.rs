use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;

use mail_digest::args::Args;
use mail_digest::{config, summarize};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = config::get_config(&args.config)?;
    let config = args.overwrite_config(config);

    let date = match &args.date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .context("--date must be a date like 2024-01-05")?,
        // The server matches on its own calendar day, so "yesterday" in
        // local time is only the closest guess at the day that just ended.
        None => Local::now().date_naive() - Duration::days(1),
    };

    if args.no_summary {
        for header in mail_digest::fetch_day(&config, date)? {
            println!("{}", header.to_json()?);
        }
        return Ok(());
    }

    let summarizer = summarize::InferenceClient::new(config.summarizer.clone())?;
    let summary = mail_digest::run_digest(&config, date, &summarizer)?;

    println!("Summary for {}", date.format("%d/%m/%Y"));
    println!("{}", summary);
    Ok(())
}
