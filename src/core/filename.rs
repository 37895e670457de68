/// Name used when a title sanitises down to nothing.
pub const FALLBACK_FILENAME: &str = "audio.mp3";

/// Removes characters the backend also strips from titles: `\ / * ? : " < > |`.
/// Control characters are dropped as well.
pub fn sanitize_title(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Suggested download name, `"<title>.mp3"`.
pub fn download_filename(title: &str) -> String {
    let clean = sanitize_title(title);
    if clean.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    format!("{}.mp3", clean)
}

/// Makes a server-announced filename safe to join onto a directory.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let clean = sanitize_title(name);
    let clean = clean.trim_start_matches('.');
    if clean.is_empty() {
        None
    } else {
        Some(clean.to_string())
    }
}
