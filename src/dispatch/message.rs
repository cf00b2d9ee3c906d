//! Per-recipient message assembly.

use std::path::{Path, PathBuf};

use lettre::message::header::{ContentDisposition, ContentTransferEncoding, ContentType};
use lettre::message::{Body, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageBuildError {
    #[error("invalid address {address}: {cause}")]
    Address { address: String, cause: String },
    #[error("message assembly failed: {0}")]
    Assembly(#[from] lettre::error::Error),
}

/// A transport-ready message plus notes about attachments that were skipped
/// because their bytes could not be read. The notes are surfaced to the
/// progress stream by the engine; the message is sent either way.
#[derive(Debug)]
pub struct BuiltMessage {
    pub message: Message,
    pub skipped_attachments: Vec<String>,
}

/// Builds one message per recipient from the run-constant parts.
///
/// Sender, subject, body and attachment paths are fixed for a run; only the
/// recipient varies. Attachment bytes are read fresh on every build, so a
/// file that disappears mid-run only affects messages built after that
/// moment. An unreadable attachment is dropped from that one message with a
/// note; it never fails the build.
pub struct MessageBuilder {
    from: String,
    subject: String,
    body: String,
    attachments: Vec<PathBuf>,
}

impl MessageBuilder {
    pub fn new(from: String, subject: String, body: String, attachments: Vec<PathBuf>) -> Self {
        Self {
            from,
            subject,
            body,
            attachments,
        }
    }

    pub async fn build(&self, recipient: &str) -> Result<BuiltMessage, MessageBuildError> {
        let from = parse_mailbox(&self.from)?;
        let to = parse_mailbox(recipient)?;
        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone());

        let mut parts = Vec::new();
        let mut skipped = Vec::new();
        for path in &self.attachments {
            match tokio::fs::read(path).await {
                Ok(bytes) => parts.push(attachment_part(path, bytes)),
                Err(err) => skipped.push(format!(
                    "Attachment error: {} ({}), skipping this file.",
                    path.display(),
                    err
                )),
            }
        }

        let message = if parts.is_empty() {
            builder
                .header(ContentType::TEXT_PLAIN)
                .body(self.body.clone())?
        } else {
            let mut multipart = MultiPart::mixed().singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(self.body.clone()),
            );
            for part in parts {
                multipart = multipart.singlepart(part);
            }
            builder.multipart(multipart)?
        };

        Ok(BuiltMessage {
            message,
            skipped_attachments: skipped,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MessageBuildError> {
    address
        .parse()
        .map_err(|err: lettre::address::AddressError| MessageBuildError::Address {
            address: address.to_string(),
            cause: err.to_string(),
        })
}

fn attachment_part(path: &Path, bytes: Vec<u8>) -> SinglePart {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    // Base64 keeps arbitrary bytes mail-safe; it accepts any input, so the
    // fallback arm is never taken in practice.
    let body = Body::new_with_encoding(bytes, ContentTransferEncoding::Base64)
        .unwrap_or_else(Body::new);
    SinglePart::builder()
        .header(ContentType::parse("application/octet-stream").unwrap_or(ContentType::TEXT_PLAIN))
        .header(ContentDisposition::attachment(&filename))
        .body(body)
}
