//! File-name derivation: sanitization, underscore normalization, and
//! artist/title parsing.

/// Placeholder artist used when the title carries no hyphen separator
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Maximum file-name length in bytes (Linux NAME_MAX)
const NAME_MAX: usize = 255;

/// Sanitize a title or caller-supplied file name for filesystem use.
///
/// Strips characters that are reserved on common filesystems (`/ \ ? % * : |
/// " < >`), NUL, and control characters, then trims leading/trailing spaces
/// and dots. Spaces are preserved; underscore normalization is a separate
/// step so artist/title parsing still sees the original word boundaries.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' | '\0' => {}
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Replace spaces with underscores.
pub fn underscored(name: &str) -> String {
    name.split(' ').collect::<Vec<_>>().join("_")
}

/// Parse a sanitized title into `(artist, title)` by splitting on the first
/// hyphen: artist is the text before, title the text after, both trimmed.
/// Without a hyphen the whole title is the title and the artist is
/// [`UNKNOWN_ARTIST`].
pub fn split_artist_title(sanitized_title: &str) -> (String, String) {
    match sanitized_title.split_once('-') {
        Some((artist, title)) => (artist.trim().to_string(), title.trim().to_string()),
        None => (UNKNOWN_ARTIST.to_string(), sanitized_title.to_string()),
    }
}

/// Derive the output base name: explicit file name if given (sanitized),
/// else the underscore-normalized sanitized title, else the video ID.
pub fn output_base_name(
    explicit_file_name: Option<&str>,
    underscored_title: &str,
    video_id: &str,
) -> String {
    if let Some(name) = explicit_file_name {
        let sanitized = sanitize(name);
        if !sanitized.is_empty() {
            return sanitized;
        }
    }
    if underscored_title.is_empty() {
        video_id.to_string()
    } else {
        underscored_title.to_string()
    }
}
