use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use mail_digest::fetch::{fetch_headers, FetchError, MailSession};

/// Fake transport. Hands out canned messages and counts teardown calls so
/// the release-exactly-once invariant can be checked on every path.
struct FakeSession {
    messages: Vec<(u32, Option<Vec<u8>>)>,
    fail_fetch_at: Option<u32>,
    last_query: Option<String>,
    close_calls: usize,
    logout_calls: usize,
}

impl FakeSession {
    fn new(messages: Vec<(u32, Option<Vec<u8>>)>) -> FakeSession {
        FakeSession {
            messages,
            fail_fetch_at: None,
            last_query: None,
            close_calls: 0,
            logout_calls: 0,
        }
    }
}

impl MailSession for FakeSession {
    fn search(&mut self, query: &str) -> Result<Vec<u32>> {
        self.last_query = Some(query.to_string());
        Ok(self
            .messages
            .iter()
            .map(|(id, _)| *id)
            .collect())
    }

    fn fetch_rfc822(&mut self, seq: u32) -> Result<Option<Vec<u8>>> {
        if self.fail_fetch_at == Some(seq) {
            return Err(anyhow!("connection reset by peer"));
        }
        Ok(self
            .messages
            .iter()
            .find(|(id, _)| *id == seq)
            .and_then(|(_, raw)| raw.clone()))
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.logout_calls += 1;
        Ok(())
    }
}

fn raw(headers: &str) -> Option<Vec<u8>> {
    Some(format!("{}\r\n\r\nbody\r\n", headers).into_bytes())
}

fn jan_5() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
}

#[test]
fn empty_day_is_empty_not_an_error() {
    let mut session = FakeSession::new(vec![]);

    let headers = fetch_headers(&mut session, jan_5()).unwrap();

    assert!(headers.is_empty());
    assert_eq!(session.logout_calls, 1);
    assert_eq!(session.close_calls, 1);
}

#[test]
fn search_uses_the_on_criterion() {
    let mut session = FakeSession::new(vec![]);

    fetch_headers(&mut session, jan_5()).unwrap();

    assert_eq!(
        session.last_query.as_deref(),
        Some("(ON \"05-Jan-2024\")")
    );
}

#[test]
fn headers_come_back_in_server_order_with_subjects_decoded() {
    let mut session = FakeSession::new(vec![
        (3, raw("From: a@example.com\r\nSubject: Invoice")),
        (
            7,
            raw("From: b@example.com\r\nSubject: =?UTF-8?Q?Re=3A_Meeting?="),
        ),
        // No Subject header at all; must not abort the batch.
        (9, raw("From: c@example.com")),
    ]);

    let headers = fetch_headers(&mut session, jan_5()).unwrap();

    let subjects: Vec<&str> = headers
        .iter()
        .map(|h| h.subject.as_str())
        .collect();
    assert_eq!(subjects, vec!["Invoice", "Re: Meeting", ""]);
    assert_eq!(headers[0].sender, "a@example.com");
    assert_eq!(session.logout_calls, 1);
}

#[test]
fn bodyless_message_is_skipped_not_fatal() {
    let mut session = FakeSession::new(vec![
        (1, raw("From: a@example.com\r\nSubject: first")),
        (2, None),
        (3, raw("From: c@example.com\r\nSubject: third")),
    ]);

    let headers = fetch_headers(&mut session, jan_5()).unwrap();

    let subjects: Vec<&str> = headers
        .iter()
        .map(|h| h.subject.as_str())
        .collect();
    assert_eq!(subjects, vec!["first", "third"]);
    assert_eq!(session.logout_calls, 1);
}

#[test]
fn fatal_fetch_error_still_releases_the_session_once() {
    let mut session = FakeSession::new(vec![
        (1, raw("From: a@example.com\r\nSubject: first")),
        (2, raw("From: b@example.com\r\nSubject: second")),
    ]);
    session.fail_fetch_at = Some(2);

    let err = fetch_headers(&mut session, jan_5()).unwrap_err();

    assert!(matches!(err, FetchError::Session(_)));
    assert_eq!(session.logout_calls, 1);
    assert_eq!(session.close_calls, 1);
}
