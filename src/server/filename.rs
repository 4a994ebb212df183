//! Upload name sanitising.
//!
//! Produces a name that is safe to join onto a directory: ASCII letters,
//! digits, `_`, `.` and `-` only, no path separators, no leading dots, and no
//! bare Windows device names. The extension survives so the classifier can
//! still detect the content kind.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "AUX", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3", "PRN", "NUL",
];

/// Sanitise a client-supplied file name. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.chars().filter(char::is_ascii).collect();
    let flattened = ascii.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = RE_UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    let stem = trimmed.split('.').next().unwrap_or("");
    if WINDOWS_DEVICE_NAMES.contains(&stem.to_ascii_uppercase().as_str()) {
        return format!("_{trimmed}");
    }
    trimmed.to_string()
}
