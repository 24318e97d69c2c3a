//! Display-string normalization
//!
//! Produces the search-stable comparison form stored alongside every
//! textual field of a track document. Applied to title, artist, album,
//! and each genre entry; never to path keys or external identifiers.

/// Normalize a display string into its canonical comparison form.
///
/// Lowercases, trims leading/trailing whitespace, and drops every
/// character that is not a lowercase letter, digit, or whitespace.
/// Interior whitespace runs are kept as-is, so removing a separator
/// like `" - "` leaves the surrounding spaces intact:
///
/// ```
/// # use trackdex::normalize::normalize;
/// assert_eq!(normalize("Daft Punk - Around The World!"), "daft punk  around the world");
/// ```
///
/// Total function: no errors, no external state, and idempotent.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_lowercase() || c.is_numeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}
