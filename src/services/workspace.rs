//! Filesystem view used by every stage of a run.
//!
//! All reads and mutations of the collection go through [`Workspace`]. In a
//! real run it is a thin layer over `std::fs`. In a dry run every mutation is
//! recorded in an overlay instead of being performed, and every later read
//! consults that overlay, so classification observes the same tree it would
//! observe in a real run while the disk stays untouched:
//!
//! - renamed directories are listed under their new name and resolved to the
//!   untouched real directory when read
//! - moved or extracted files appear at their destination with their size
//! - deleted or moved-away paths disappear, including whole subtrees
//!
//! Moves never overwrite: an existing destination is an `AlreadyExists` error.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Read};

/// What a directory entry is, as far as classification cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks, sockets, devices.
    Other,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: Utf8PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Overlay {
    /// (virtual path, real path) for directories renamed during a dry run.
    renamed: Vec<(Utf8PathBuf, Utf8PathBuf)>,
    /// Files that exist only virtually, with their byte size.
    added: BTreeMap<Utf8PathBuf, u64>,
    /// Virtual paths that no longer exist; hides their subtree too.
    removed: HashSet<Utf8PathBuf>,
}

/// Filesystem access with an optional dry-run overlay.
#[derive(Debug)]
pub struct Workspace {
    dry_run: bool,
    overlay: Overlay,
}

impl Workspace {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            overlay: Overlay::default(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Map a path as the run sees it to the path on disk.
    pub fn real_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        for (virtual_path, real) in self.overlay.renamed.iter().rev() {
            if let Ok(rest) = path.strip_prefix(virtual_path) {
                return if rest.as_str().is_empty() {
                    real.clone()
                } else {
                    real.join(rest)
                };
            }
        }
        path.to_path_buf()
    }

    fn is_removed(&self, path: &Utf8Path) -> bool {
        !self.overlay.removed.is_empty()
            && path.ancestors().any(|a| self.overlay.removed.contains(a))
    }

    pub fn kind(&self, path: &Utf8Path) -> Option<EntryKind> {
        if self.overlay.added.contains_key(path) {
            return Some(EntryKind::File);
        }
        if self.is_removed(path) {
            return None;
        }
        fs::symlink_metadata(self.real_path(path))
            .ok()
            .map(|m| kind_of(m.file_type()))
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        self.kind(path).is_some()
    }

    pub fn is_dir(&self, path: &Utf8Path) -> bool {
        self.kind(path) == Some(EntryKind::Dir)
    }

    pub fn is_file(&self, path: &Utf8Path) -> bool {
        self.kind(path) == Some(EntryKind::File)
    }

    pub fn file_size(&self, path: &Utf8Path) -> io::Result<u64> {
        if let Some(size) = self.overlay.added.get(path) {
            return Ok(*size);
        }
        if self.is_removed(path) {
            return Err(not_found(path));
        }
        Ok(fs::metadata(self.real_path(path))?.len())
    }

    /// Children of `dir`, sorted by file name.
    pub fn list_dir(&self, dir: &Utf8Path) -> io::Result<Vec<Entry>> {
        if self.is_removed(dir) {
            return Err(not_found(dir));
        }

        let mut entries = Vec::new();
        for item in fs::read_dir(self.real_path(dir))? {
            let item = item?;
            let name = match item.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("Skipping non UTF-8 entry {:?} in {}", raw, dir);
                    continue;
                }
            };
            let path = dir.join(&name);
            if self.is_removed(&path) || self.overlay.added.contains_key(&path) {
                continue;
            }
            entries.push(Entry {
                path,
                kind: kind_of(item.file_type()?),
            });
        }

        for (virtual_path, _) in &self.overlay.renamed {
            if virtual_path.parent() == Some(dir) && !self.is_removed(virtual_path) {
                entries.push(Entry {
                    path: virtual_path.clone(),
                    kind: EntryKind::Dir,
                });
            }
        }
        for path in self.overlay.added.keys() {
            if path.parent() == Some(dir) {
                entries.push(Entry {
                    path: path.clone(),
                    kind: EntryKind::File,
                });
            }
        }

        entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        entries.dedup_by(|a, b| a.path == b.path);
        Ok(entries)
    }

    pub fn is_empty_dir(&self, dir: &Utf8Path) -> io::Result<bool> {
        Ok(self.list_dir(dir)?.is_empty())
    }

    /// Open a file for reading from disk.
    pub fn open(&self, path: &Utf8Path) -> io::Result<File> {
        if self.overlay.added.contains_key(path) {
            return Err(io::Error::other(format!(
                "{} exists only in the dry-run overlay",
                path
            )));
        }
        if self.is_removed(path) {
            return Err(not_found(path));
        }
        File::open(self.real_path(path))
    }

    /// Move a file or directory. Never overwrites an existing destination.
    pub fn rename(&mut self, from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
        let case_only = from != to && from.as_str().eq_ignore_ascii_case(to.as_str());
        if self.exists(to) && !case_only {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination already exists: {}", to),
            ));
        }
        let kind = self.kind(from).ok_or_else(|| not_found(from))?;

        if !self.dry_run {
            return fs::rename(from, to);
        }

        match kind {
            EntryKind::Dir => {
                let real = self.real_path(from);
                self.forget(from);
                self.overlay.removed.remove(to);
                self.overlay.renamed.push((to.to_path_buf(), real));
            }
            _ => {
                let size = self.file_size(from)?;
                self.forget(from);
                self.overlay.removed.remove(to);
                self.overlay.added.insert(to.to_path_buf(), size);
            }
        }
        Ok(())
    }

    /// Create `dest` from `reader`. `size` is the expected byte count and is
    /// what a dry run records for the new file.
    pub fn create_from_reader(
        &mut self,
        dest: &Utf8Path,
        reader: &mut dyn Read,
        size: u64,
    ) -> io::Result<u64> {
        if self.exists(dest) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination already exists: {}", dest),
            ));
        }

        if self.dry_run {
            self.overlay.removed.remove(dest);
            self.overlay.added.insert(dest.to_path_buf(), size);
            return Ok(size);
        }

        let mut out = File::create_new(dest)?;
        match io::copy(reader, &mut out) {
            Ok(written) => Ok(written),
            Err(e) => {
                drop(out);
                let _ = fs::remove_file(dest);
                Err(e)
            }
        }
    }

    pub fn remove_file(&mut self, path: &Utf8Path) -> io::Result<()> {
        if !self.dry_run {
            return fs::remove_file(path);
        }
        match self.kind(path) {
            None => Err(not_found(path)),
            Some(EntryKind::Dir) => Err(io::Error::other(format!("is a directory: {}", path))),
            Some(_) => {
                self.forget(path);
                Ok(())
            }
        }
    }

    /// Remove an empty directory.
    pub fn remove_dir(&mut self, path: &Utf8Path) -> io::Result<()> {
        if !self.dry_run {
            return fs::remove_dir(path);
        }
        if !self.is_dir(path) {
            return Err(not_found(path));
        }
        if !self.is_empty_dir(path)? {
            return Err(io::Error::other(format!("directory not empty: {}", path)));
        }
        self.forget(path);
        Ok(())
    }

    fn forget(&mut self, path: &Utf8Path) {
        if self.overlay.added.remove(path).is_none() {
            self.overlay.removed.insert(path.to_path_buf());
        }
    }
}

fn kind_of(file_type: fs::FileType) -> EntryKind {
    if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else {
        EntryKind::Other
    }
}

fn not_found(path: &Utf8Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {}", path))
}

/// Lowercase extension of a file name (without the dot); empty if none.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(i) => name[i + 1..].to_lowercase(),
        None => String::new(),
    }
}
