//! Message extraction via MIME parsing.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use chrono::DateTime;
use log::debug;
use mail_parser::{Message, MessageParser, MimeHeaders};
use regex::Regex;

use super::{ConvertError, Converter};

/// File the message body text is written to inside the extraction directory.
pub const BODY_FILE_NAME: &str = "Email.txt";

/// Extracts a message binary into its body text and attachments.
pub struct MailConverter;

impl Converter for MailConverter {
    fn convert(&self, binary_path: &Path, out_dir: &Path) -> Result<(), ConvertError> {
        let raw = fs::read(binary_path).map_err(|e| ConvertError::ReadBinary {
            path: binary_path.to_path_buf(),
            source: e,
        })?;

        let message = MessageParser::default()
            .parse(&raw)
            .ok_or_else(|| ConvertError::Malformed("not a parsable message".to_string()))?;

        fs::create_dir_all(out_dir).map_err(|e| ConvertError::WriteExtracted {
            path: out_dir.to_path_buf(),
            source: e,
        })?;

        let body_path = out_dir.join(BODY_FILE_NAME);
        fs::write(&body_path, build_body_text(&message)).map_err(|e| {
            ConvertError::WriteExtracted {
                path: body_path,
                source: e,
            }
        })?;

        for (index, part) in message.attachments().enumerate() {
            let filename = part
                .attachment_name()
                .map(sanitize_filename)
                .unwrap_or_else(|| format!("attachment_{}", index + 1));

            let mut path = out_dir.join(&filename);
            // Attachments may repeat a name within one message.
            if path.exists() {
                path = out_dir.join(format!("{}_{}", index + 1, filename));
            }

            debug!(
                "Extracting attachment '{}' ({} bytes)",
                filename,
                part.contents().len()
            );
            fs::write(&path, part.contents()).map_err(|e| ConvertError::WriteExtracted {
                path: path.clone(),
                source: e,
            })?;
        }

        Ok(())
    }
}

/// Renders the message headers and body text the way they are stored in the
/// extraction directory.
fn build_body_text(message: &Message) -> String {
    let mut text = String::new();

    if let Some(from) = message.from().and_then(|addr| addr.first()) {
        text.push_str(&format!("From: {}\n", format_address(from)));
    }
    if let Some(to) = message.to().and_then(|addr| addr.first()) {
        text.push_str(&format!("To: {}\n", format_address(to)));
    }
    if let Some(subject) = message.subject() {
        text.push_str(&format!("Subject: {}\n", subject));
    }
    if let Some(date) = message.date() {
        text.push_str(&format!("Date: {}\n", date.to_rfc3339()));
    }

    text.push('\n');
    if let Some(body) = message.body_text(0) {
        text.push_str(&body);
    }
    text
}

/// Formats an address as "Name <mail>" when a display name is present.
fn format_address(addr: &mail_parser::Addr) -> String {
    if let Some(name) = addr.name() {
        format!("{} <{}>", name, addr.address().unwrap_or_default())
    } else {
        addr.address().unwrap_or_default().to_string()
    }
}

/// Sanitizes an attachment filename.
fn sanitize_filename(filename: &str) -> String {
    let filename: String = filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let filename = filename.trim_matches(|c| c == '.' || c == ' ');
    if filename.is_empty() {
        "attachment".to_string()
    } else {
        filename.to_string()
    }
}

/// Matches the date header line of the extracted body text. German-localized
/// messages carry `Datum:` instead of `Date:`.
fn date_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:Date|Datum): (.*)$").expect("valid regex"))
}

/// Pulls the message date from the extracted body text and normalizes it to
/// `YYYY-MM-DD HH:MM:SS`. Returns `None` when the header is missing or not
/// parsable; the timestamp is optional for callers.
pub fn extract_mail_timestamp(extraction_dir: &Path) -> Option<String> {
    let body = fs::read_to_string(extraction_dir.join(BODY_FILE_NAME)).ok()?;

    for line in body.lines() {
        if line.is_empty() {
            // Headers end at the first blank line.
            return None;
        }
        if let Some(caps) = date_line().captures(line) {
            return normalize_mail_date(caps[1].trim());
        }
    }
    None
}

/// Normalizes a raw date header value. Only dates that parse are used, so the
/// finalized-title prefix always has the same shape.
fn normalize_mail_date(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
}
