//! Depth-first directory traversal with subtree skipping.
//!
//! [`walk`] visits a tree in pre-order for directories (so a visitor can skip a
//! whole subtree) and post-order for directory cleanup. Each directory's
//! listing is taken before any of its entries is visited, so files that a
//! visitor moves or extracts into an already-listed directory are not visited
//! again.

use crate::services::error::ReconcileError;
use crate::services::workspace::{Entry, Workspace};
use camino::{Utf8Path, Utf8PathBuf};

/// What the walker should do after a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Keep going (descend into a directory).
    Descend,
    /// Do not descend into this directory and do not post-visit it.
    SkipSubtree,
    /// Stop the whole walk.
    Done,
}

/// Anything that can list a directory.
pub trait Listing {
    fn list(&self, dir: &Utf8Path) -> Result<Vec<Entry>, ReconcileError>;
}

impl Listing for Workspace {
    fn list(&self, dir: &Utf8Path) -> Result<Vec<Entry>, ReconcileError> {
        self.list_dir(dir).map_err(ReconcileError::at(dir))
    }
}

/// Callbacks driven by [`walk`]. Every callback receives the host mutably so
/// it can act on what it sees.
pub trait TreeVisitor<H: ?Sized> {
    fn pre_visit_dir(&mut self, _host: &mut H, _dir: &Utf8Path) -> Result<WalkControl, ReconcileError> {
        Ok(WalkControl::Descend)
    }

    fn visit_file(&mut self, host: &mut H, entry: &Entry) -> Result<WalkControl, ReconcileError>;

    fn post_visit_dir(&mut self, _host: &mut H, _dir: &Utf8Path) -> Result<(), ReconcileError> {
        Ok(())
    }
}

/// Walk `root` (inclusive). Returns [`WalkControl::Done`] if a visitor ended
/// the walk early.
pub fn walk<H, V>(host: &mut H, root: &Utf8Path, visitor: &mut V) -> Result<WalkControl, ReconcileError>
where
    H: Listing + ?Sized,
    V: TreeVisitor<H> + ?Sized,
{
    match visitor.pre_visit_dir(host, root)? {
        WalkControl::Descend => {}
        WalkControl::SkipSubtree => return Ok(WalkControl::Descend),
        WalkControl::Done => return Ok(WalkControl::Done),
    }

    let entries = host.list(root)?;
    for entry in &entries {
        let control = if entry.is_dir() {
            walk(host, &entry.path, visitor)?
        } else {
            visitor.visit_file(host, entry)?
        };
        if control == WalkControl::Done {
            return Ok(WalkControl::Done);
        }
    }

    visitor.post_visit_dir(host, root)?;
    Ok(WalkControl::Descend)
}

/// True if any regular file exists anywhere beneath `dir`.
pub fn contains_regular_file<H: Listing + ?Sized>(host: &mut H, dir: &Utf8Path) -> Result<bool, ReconcileError> {
    struct Probe;

    impl<T: ?Sized> TreeVisitor<T> for Probe {
        fn visit_file(&mut self, _host: &mut T, entry: &Entry) -> Result<WalkControl, ReconcileError> {
            if entry.is_file() {
                Ok(WalkControl::Done)
            } else {
                Ok(WalkControl::Descend)
            }
        }
    }

    Ok(walk(host, dir, &mut Probe)? == WalkControl::Done)
}

/// Every path beneath `root` (inclusive), children before their parents.
pub fn collect_post_order<H: Listing + ?Sized>(
    host: &mut H,
    root: &Utf8Path,
    include_files: bool,
) -> Result<Vec<Utf8PathBuf>, ReconcileError> {
    struct Collector {
        include_files: bool,
        paths: Vec<Utf8PathBuf>,
    }

    impl<T: ?Sized> TreeVisitor<T> for Collector {
        fn visit_file(&mut self, _host: &mut T, entry: &Entry) -> Result<WalkControl, ReconcileError> {
            if self.include_files {
                self.paths.push(entry.path.clone());
            }
            Ok(WalkControl::Descend)
        }

        fn post_visit_dir(&mut self, _host: &mut T, dir: &Utf8Path) -> Result<(), ReconcileError> {
            self.paths.push(dir.to_path_buf());
            Ok(())
        }
    }

    let mut collector = Collector {
        include_files,
        paths: Vec::new(),
    };
    walk(host, root, &mut collector)?;
    Ok(collector.paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scratch() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, root)
    }

    /// Records the order of callbacks and skips directories named `skip`.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TreeVisitor<Workspace> for Recorder {
        fn pre_visit_dir(&mut self, _ws: &mut Workspace, dir: &Utf8Path) -> Result<WalkControl, ReconcileError> {
            let name = dir.file_name().unwrap_or_default();
            self.events.push(format!("pre {name}"));
            if name == "skip" {
                Ok(WalkControl::SkipSubtree)
            } else {
                Ok(WalkControl::Descend)
            }
        }

        fn visit_file(&mut self, _ws: &mut Workspace, entry: &Entry) -> Result<WalkControl, ReconcileError> {
            self.events.push(format!("file {}", entry.file_name()));
            Ok(WalkControl::Descend)
        }

        fn post_visit_dir(&mut self, _ws: &mut Workspace, dir: &Utf8Path) -> Result<(), ReconcileError> {
            self.events.push(format!("post {}", dir.file_name().unwrap_or_default()));
            Ok(())
        }
    }

    #[test]
    fn test_pre_and_post_order_with_skip() {
        let (_tmp, root) = scratch();
        let sys = root.join("sys");
        fs::create_dir_all(sys.join("a")).unwrap();
        fs::create_dir_all(sys.join("skip/inner")).unwrap();
        fs::write(sys.join("a/one.nes"), b"1").unwrap();
        fs::write(sys.join("skip/hidden.nes"), b"1").unwrap();
        fs::write(sys.join("top.nes"), b"1").unwrap();

        let mut ws = Workspace::new(false);
        let mut recorder = Recorder::default();
        let control = walk(&mut ws, &sys, &mut recorder).unwrap();

        assert_eq!(control, WalkControl::Descend);
        assert_eq!(
            recorder.events,
            vec![
                "pre sys",
                "pre a",
                "file one.nes",
                "post a",
                "pre skip",
                "file top.nes",
                "post sys",
            ]
        );
    }

    #[test]
    fn test_contains_regular_file() {
        let (_tmp, root) = scratch();
        fs::create_dir_all(root.join("empty/deeper/still")).unwrap();
        fs::create_dir_all(root.join("full/deeper")).unwrap();
        fs::write(root.join("full/deeper/x.txt"), b"x").unwrap();

        let mut ws = Workspace::new(false);
        assert!(!contains_regular_file(&mut ws, &root.join("empty")).unwrap());
        assert!(contains_regular_file(&mut ws, &root.join("full")).unwrap());
    }

    #[test]
    fn test_collect_post_order_children_first() {
        let (_tmp, root) = scratch();
        fs::create_dir_all(root.join("d/e")).unwrap();
        fs::write(root.join("d/e/f.bin"), b"x").unwrap();

        let mut ws = Workspace::new(false);
        let all = collect_post_order(&mut ws, &root.join("d"), true).unwrap();
        assert_eq!(
            all,
            vec![root.join("d/e/f.bin"), root.join("d/e"), root.join("d")]
        );

        let dirs = collect_post_order(&mut ws, &root.join("d"), false).unwrap();
        assert_eq!(dirs, vec![root.join("d/e"), root.join("d")]);
    }
}
