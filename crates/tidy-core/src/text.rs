/// Canonical form used for rule and task comparison: trimmed, lower-cased.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Filesystem-safe slug for a zone name ("Living Room" -> "living_room").
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "zone".to_string()
    } else {
        trimmed.to_string()
    }
}
