//! Filename sanitization for media titles.
//!
//! Media titles arrive as arbitrary Unicode and end up as on-disk filenames,
//! so they are cleaned before the engine ever sees them: filesystem-reserved
//! characters and characters outside the Basic Multilingual Plane (emoji and
//! other supplementary-plane symbols) are dropped, then runs of whitespace
//! collapse to single spaces with the ends trimmed.

/// Characters rejected by at least one mainstream filesystem
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Clean a media title for use as a filename.
///
/// The transformation is idempotent: sanitizing an already-sanitized string
/// returns it unchanged. An input of only reserved characters and whitespace
/// collapses to the empty string.
pub fn sanitize_filename(title: &str) -> String {
    let filtered: String = title
        .chars()
        .filter(|c| !RESERVED.contains(c) && (*c as u32) <= 0xFFFF)
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}
