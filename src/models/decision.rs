/// Answer to an ambiguous archive (junk entries or several ROMs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveDecision {
    /// Extract every ROM entry; the archive itself stays.
    Extract,
    Keep,
    /// Schedule the archive for deletion.
    Delete,
}

/// Answer to a file without an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionlessDecision {
    /// Rename to `<name>.<extension>`.
    Rename(String),
    Delete,
    Skip,
}

impl ExtensionlessDecision {
    /// Build a rename answer from raw user input.
    ///
    /// Surrounding whitespace and a leading dot are dropped. An empty answer,
    /// or one that is not a plain extension, means the file is skipped.
    pub fn rename(extension: &str) -> Self {
        let ext = extension.trim().trim_start_matches('.');
        if is_valid_extension(ext) {
            ExtensionlessDecision::Rename(ext.to_string())
        } else {
            ExtensionlessDecision::Skip
        }
    }
}

/// A non-empty extension that keeps the renamed file in its directory.
pub fn is_valid_extension(ext: &str) -> bool {
    !ext.is_empty() && !ext.contains(['/', '\\']) && !ext.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_strips_dot_and_whitespace() {
        assert_eq!(
            ExtensionlessDecision::rename(" .sfc \n"),
            ExtensionlessDecision::Rename("sfc".to_string())
        );
    }

    #[test]
    fn test_empty_rename_is_skip() {
        assert_eq!(ExtensionlessDecision::rename("  "), ExtensionlessDecision::Skip);
        assert_eq!(ExtensionlessDecision::rename("."), ExtensionlessDecision::Skip);
    }

    #[test]
    fn test_rename_rejects_path_separators() {
        assert_eq!(ExtensionlessDecision::rename("x/../y"), ExtensionlessDecision::Skip);
        assert_eq!(ExtensionlessDecision::rename("..\\up"), ExtensionlessDecision::Skip);
        assert_eq!(ExtensionlessDecision::rename("a/b"), ExtensionlessDecision::Skip);
        assert!(is_valid_extension("tar.gz"));
        assert!(!is_valid_extension(""));
    }
}
