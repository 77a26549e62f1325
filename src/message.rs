use anyhow::Result;
use mailparse::MailHeaderMap;
use serde::{Deserialize, Serialize};
use serde_json;

/// The two header fields the digest cares about. `subject` is the decoded
/// form: RFC 2047 encoded-words are resolved by mailparse using the charset
/// declared in the header, falling back to a lossy UTF-8 read. A message
/// with no `Subject` header at all gets an empty string.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub sender: String,
    pub subject: String,
}

impl MessageHeader {
    pub fn from_rfc822(raw: &[u8]) -> Result<MessageHeader> {
        let parsed = mailparse::parse_mail(raw)?;

        Ok(MessageHeader {
            sender: parsed
                .headers
                .get_first_value("From")
                .unwrap_or_default(),
            subject: parsed
                .headers
                .get_first_value("Subject")
                .unwrap_or_default(),
        })
    }

    /// The block this message contributes to the summarization prompt.
    pub fn prompt_block(&self) -> String {
        format!("From: {}\nSubject: {}\n\n", self.sender, self.subject)
    }

    pub fn from_json(json: &str) -> serde_json::Result<MessageHeader> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self)
    }
}
