//! Main-section attribute lookup for `META-INF/MANIFEST.MF`.
//!
//! Only what module detection needs: header lines with `Name: value`, continuation
//! lines starting with one space, and the blank line that closes the main section.

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
pub const AUTOMATIC_MODULE_NAME: &str = "Automatic-Module-Name";

/// Returns the trimmed value of `name` in the main section, if present and non-empty.
///
/// Attribute names compare case-insensitively.
pub fn main_attribute(manifest: &str, name: &str) -> Option<String> {
    let normalized = manifest.replace("\r\n", "\n").replace('\r', "\n");
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in normalized.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some((_, value)) = headers.last_mut() {
                value.push_str(rest);
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.to_string()));
        }
    }

    headers
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
