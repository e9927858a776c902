//! Remote name to local file name mapping

/// Characters that are illegal in file names on at least one supported platform
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// Make a remote name safe to use as a local file name
///
/// Drops non-ASCII characters and `\/:"*?<>|`, then trims trailing
/// whitespace. Distinct remote names may map to the same result, and the
/// result may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii() && !ILLEGAL_CHARS.contains(c))
        .collect();
    kept.trim_end().to_string()
}
