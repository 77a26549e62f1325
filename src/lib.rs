use anyhow::Result;
use chrono::NaiveDate;

pub mod args;
pub mod config;
pub mod connect;
pub mod fetch;
pub mod message;
pub mod summarize;

/// Mailbox half of the pipeline: connect, pull one day of headers, tear the
/// session down. The session lives for exactly this one cycle.
pub fn fetch_day(
    config: &config::Config,
    date: NaiveDate,
) -> Result<Vec<message::MessageHeader>> {
    let tls = config
        .tls
        .clone()
        .unwrap_or_default();
    let mut session = connect::connect(&config.connection, &tls)?;
    Ok(fetch::fetch_headers(&mut session, date)?)
}

/// One full digest run. The inference call happens strictly after the
/// mailbox session has been released.
pub fn run_digest(
    config: &config::Config,
    date: NaiveDate,
    summarizer: &impl summarize::Summarizer,
) -> Result<String> {
    let headers = fetch_day(config, date)?;
    summarizer.summarize(&headers)
}
