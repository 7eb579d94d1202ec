//! Message variant derivation.
//!
//! The destination service suppresses duplicate message bodies by verbatim
//! comparison. Appending fullwidth spaces (U+3000) to the end of one line
//! changes the bytes without changing what a reader sees. One variant is
//! shared by every GROUP_SIZE consecutive sends; fresh content appears only
//! when the send sequence crosses a group boundary.

/// Sends per mutation group.
pub const GROUP_SIZE: u64 = 5;

/// Maximum message length accepted by the service, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Fullwidth space: renders invisibly but is byte-distinct from U+0020.
pub const INVISIBLE_MARKER: char = '\u{3000}';

/// Derive the message variant for the given send sequence number.
///
/// Deterministic and total: the same `(base, seq)` pair always yields the
/// same output, and the output never exceeds [`MAX_MESSAGE_CHARS`].
///
/// The marker line rotates through the message as groups advance; once every
/// line has been used, the marker count on the chosen line increments:
/// `group = seq / GROUP_SIZE`, target line `group % lines`, marker count
/// `group / lines + 1`.
pub fn mutate(base: &str, seq: u64) -> String {
    // split('\n') yields at least one element even for an empty base
    let lines: Vec<&str> = base.split('\n').collect();
    let line_count = lines.len() as u64;

    let group = seq / GROUP_SIZE;
    let target = (group % line_count) as usize;
    let repeat = (group / line_count + 1) as usize;

    let mut out = String::with_capacity(base.len() + repeat * INVISIBLE_MARKER.len_utf8());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
        if i == target {
            for _ in 0..repeat {
                out.push(INVISIBLE_MARKER);
            }
        }
    }

    truncate_chars(out, MAX_MESSAGE_CHARS)
}

/// Truncate to at most `max` characters, dropping from the tail.
fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}
