//! Batch input loading.
//!
//! Recipient lists arrive as small CSV exports whose headers vary between
//! Korean and English spellings, so the loader guesses columns from
//! candidate lists instead of demanding an exact schema. Cells in the
//! `"id(nickname)"` mixed form are split. Blank identifiers are kept so the
//! record indices stay aligned with the source rows; the dispatch loop fails
//! them without touching the channel.

use std::path::Path;

use crate::domain::{Batch, Recipient};
use crate::error::{Result, SendrError};

/// Header spellings accepted for the identifier column.
const ID_COLUMNS: &[&str] = &["후원아이디", "아이디", "ID", "id", "userId", "후원 아이디"];

/// Header spellings accepted for the nickname column.
const NICK_COLUMNS: &[&str] = &["닉네임", "후원닉네임", "닉", "별명", "name", "nick"];

/// Header spellings accepted for the weight column.
const WEIGHT_COLUMNS: &[&str] = &["후원하트", "하트", "hearts", "heart", "총하트", "하트수"];

/// Load a batch from a recipients CSV and a base-message text file.
pub fn load_batch(recipients_path: &Path, message_path: &Path) -> Result<Batch> {
    let recipients = load_recipients(recipients_path)?;
    let base_message = load_message(message_path)?;
    Ok(Batch::new(recipients, base_message))
}

/// Load and parse the recipients CSV.
pub fn load_recipients(path: &Path) -> Result<Vec<Recipient>> {
    let content = read_input(path)?;
    parse_recipients(&content)
}

/// Load the base message text. The content is taken verbatim; the engine
/// derives variants from it but never rewrites it.
pub fn load_message(path: &Path) -> Result<String> {
    read_input(path)
}

fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(SendrError::MissingInput(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    // Excel exports prepend a UTF-8 BOM
    Ok(content.trim_start_matches('\u{feff}').to_string())
}

/// Parse CSV text into recipients, in row order.
pub fn parse_recipients(content: &str) -> Result<Vec<Recipient>> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| SendrError::Batch("recipients file is empty".to_string()))?;
    let columns: Vec<String> = split_row(header)
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();

    let id_col = guess_column(&columns, ID_COLUMNS).unwrap_or(0);
    let nick_col = guess_column(&columns, NICK_COLUMNS);
    let weight_col = guess_column(&columns, WEIGHT_COLUMNS);

    log::debug!(
        "recipient columns: id={:?} nick={:?} weight={:?}",
        columns.get(id_col),
        nick_col.and_then(|i| columns.get(i)),
        weight_col.and_then(|i| columns.get(i)),
    );

    let mut recipients = Vec::new();
    for line in lines {
        let fields = split_row(line);
        let raw_id = fields.get(id_col).map(String::as_str).unwrap_or("").trim();

        let (id, mixed_nick) = split_mixed_id(raw_id);

        let nick = mixed_nick.or_else(|| {
            nick_col
                .and_then(|i| fields.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        });

        let weight = weight_col
            .and_then(|i| fields.get(i))
            .map(|s| parse_weight(s))
            .unwrap_or(0);

        recipients.push(Recipient { id, nick, weight });
    }

    Ok(recipients)
}

/// Find the first header matching a candidate list, comparing with spaces
/// removed so "후원 아이디" and "후원아이디" are the same column.
fn guess_column(columns: &[String], candidates: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = candidates.iter().map(|c| c.replace(' ', "")).collect();
    columns
        .iter()
        .position(|col| normalized.iter().any(|c| col.replace(' ', "") == *c))
}

/// Split an `"id(nickname)"` cell into its parts. Plain ids pass through.
fn split_mixed_id(raw: &str) -> (String, Option<String>) {
    if let Some(open) = raw.find('(')
        && let Some(close) = raw.rfind(')')
        && open < close
    {
        let id = raw[..open].trim().to_string();
        let nick = raw[open + 1..close].trim().to_string();
        let nick = if nick.is_empty() { None } else { Some(nick) };
        return (id, nick);
    }
    (raw.to_string(), None)
}

/// Parse a weight cell, tolerating digit grouping ("1,234") and decimals.
fn parse_weight(raw: &str) -> u64 {
    let cleaned = raw.trim().replace(',', "");
    cleaned
        .parse::<u64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|f| f.max(0.0) as u64))
        .unwrap_or(0)
}

/// Split one CSV row, honoring double-quoted fields with `""` escapes.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
