//! ROM file name normalization and collision-free destination paths.

use crate::services::workspace::Workspace;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::sync::LazyLock;

/// Bracketed tag groups like `[Europe]` or `[!]`, non-greedy.
static BRACKET_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("Invalid bracket tag regex"));

static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Split a file name at its final `.`; the extension keeps its dot.
///
/// A name without a `.` has an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) => name.split_at(i),
        None => (name, ""),
    }
}

/// Normalize a raw ROM file name.
///
/// Underscores become spaces, `[...]` tag groups are removed, whitespace is
/// collapsed and trimmed, every word is title-cased and the extension is
/// lowercased. If nothing is left of the base name the raw base is kept.
///
/// # Examples
///
/// ```
/// use romtidy::services::naming::clean_name;
///
/// assert_eq!(clean_name("Super_Mario_Bros_[Europe].nes"), "Super Mario Bros.nes");
/// assert_eq!(clean_name("foo_bar.ZIP"), "Foo Bar.zip");
/// ```
pub fn clean_name(raw: &str) -> String {
    let (base, ext) = split_extension(raw);

    let spaced = base.replace('_', " ");
    let untagged = BRACKET_TAGS.replace_all(&spaced, "");
    let collapsed = WHITESPACE_RUNS.replace_all(&untagged, " ");
    let mut cleaned = title_case(collapsed.trim());
    if cleaned.is_empty() {
        cleaned = base.to_string();
    }

    format!("{}{}", cleaned, ext.to_lowercase())
}

/// Uppercase the first letter of each space-separated word, lowercase the rest.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First free path for `path`: the path itself if nothing is there, else
/// `<base>_<n><ext>` for the smallest `n` starting at 1.
pub fn resolve_dup(workspace: &Workspace, path: &Utf8Path) -> Utf8PathBuf {
    if !workspace.exists(path) {
        return path.to_path_buf();
    }

    let name = path.file_name().unwrap_or_default();
    let (base, ext) = split_extension(name);
    let parent = path.parent().unwrap_or(Utf8Path::new(""));

    let mut counter: u64 = 1;
    loop {
        let candidate = parent.join(format!("{}_{}{}", base, counter, ext));
        if !workspace.exists(&candidate) {
            tracing::debug!("{} is taken, using {}", path, candidate);
            return candidate;
        }
        counter += 1;
    }
}
