use crate::message::MessageHeader;
use anyhow::Result;
use chrono::NaiveDate;
use std::io::{Read, Write};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum FetchError {
    /// A SEARCH or FETCH command failed outright, which means the session
    /// itself is gone. Anything accumulated so far is discarded.
    #[error("mailbox session failed: {0}")]
    Session(String),
}

/// The handful of session operations the fetcher needs, as a seam over
/// `imap::Session` so tests can drive it with a fake transport.
pub trait MailSession {
    /// Sequence numbers matching the query, in ascending order.
    fn search(&mut self, query: &str) -> Result<Vec<u32>>;

    /// Raw RFC 822 bytes of one message, or None if the server sent no body.
    fn fetch_rfc822(&mut self, seq: u32) -> Result<Option<Vec<u8>>>;

    fn close(&mut self) -> Result<()>;

    fn logout(&mut self) -> Result<()>;
}

impl<T: Read + Write> MailSession for imap::Session<T> {
    fn search(&mut self, query: &str) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = imap::Session::search(self, query)?
            .into_iter()
            .collect();
        // The imap crate hands the ids back as a set. Ascending sequence
        // numbers are the server's arrival order.
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_rfc822(&mut self, seq: u32) -> Result<Option<Vec<u8>>> {
        let fetches = self.fetch(seq.to_string(), "RFC822")?;
        Ok(fetches
            .iter()
            .next()
            .and_then(|f| f.body())
            .map(|b| b.to_vec()))
    }

    fn close(&mut self) -> Result<()> {
        Ok(imap::Session::close(self)?)
    }

    fn logout(&mut self) -> Result<()> {
        Ok(imap::Session::logout(self)?)
    }
}

/// IMAP SEARCH criterion matching messages received on `date`, by the mail
/// server's own calendar day. The caller's timezone plays no part in it;
/// pick the date accordingly.
pub fn search_criterion(date: NaiveDate) -> String {
    format!("(ON \"{}\")", date.format("%d-%b-%Y"))
}

/// Retrieves sender and subject for every message received on `date`,
/// preserving server order, then releases the session.
///
/// Zero matches is an empty Vec, not an error. A message that can't be
/// parsed (or comes back bodyless) is skipped with a warning rather than
/// sinking the whole day. Close and logout run on every exit path, exactly
/// once; their own errors are logged and swallowed.
pub fn fetch_headers(
    session: &mut impl MailSession,
    date: NaiveDate,
) -> Result<Vec<MessageHeader>, FetchError> {
    let result = collect_headers(session, date);

    if let Err(e) = session.close() {
        debug!("error closing folder: {}", e);
    }
    if let Err(e) = session.logout() {
        debug!("error logging out: {}", e);
    }

    result
}

fn collect_headers(
    session: &mut impl MailSession,
    date: NaiveDate,
) -> Result<Vec<MessageHeader>, FetchError> {
    let criterion = search_criterion(date);
    let ids = session
        .search(&criterion)
        .map_err(|e| FetchError::Session(e.to_string()))?;
    debug!("{} messages match {}", ids.len(), criterion);

    let mut headers = Vec::with_capacity(ids.len());
    let mut skipped: usize = 0;

    for id in ids {
        let raw = session
            .fetch_rfc822(id)
            .map_err(|e| FetchError::Session(e.to_string()))?;

        let raw = match raw {
            Some(raw) => raw,
            None => {
                warn!("message {} came back without a body, skipping", id);
                skipped += 1;
                continue;
            }
        };

        match MessageHeader::from_rfc822(&raw) {
            Ok(header) => headers.push(header),
            Err(e) => {
                warn!("couldn't parse message {}, skipping: {}", id, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(
            "skipped {} of {} messages for {}",
            skipped,
            skipped + headers.len(),
            date
        );
    }

    Ok(headers)
}
