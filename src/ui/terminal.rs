// TerminalDecisions - Interactive decision provider
//
// Asks the user on a terminal (any BufRead/Write pair) whenever the engine
// needs a decision. The run blocks until an answer arrives; there is no
// timeout. Unrecognized answers repeat the question, and end of input picks
// the answer that leaves the file alone.

use crate::models::{ArchiveDecision, ExtensionlessDecision, is_valid_extension};
use crate::services::decisions::DecisionProvider;
use crate::services::error::ReconcileError;
use camino::Utf8Path;
use std::io::{self, BufRead, Stdin, Stdout, Write};

/// Prompts on a reader/writer pair.
pub struct TerminalDecisions<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl TerminalDecisions<io::StdinLock<'static>, Stdout> {
    /// Prompt on stdin/stdout.
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalDecisions<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read one trimmed line; `None` at end of input.
    fn read_answer(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        self.read_answer()
    }

    fn archive_decision(&mut self, archive: &Utf8Path, rom_entries: &[String]) -> io::Result<ArchiveDecision> {
        writeln!(self.output, "Archive {} needs a decision. ROM entries:", archive)?;
        for entry in rom_entries {
            writeln!(self.output, "  - {}", entry)?;
        }

        loop {
            let Some(answer) = self.ask("[e]xtract, [k]eep or [d]elete? ")? else {
                writeln!(self.output)?;
                return Ok(ArchiveDecision::Keep);
            };
            match answer.to_lowercase().as_str() {
                "e" | "extract" => return Ok(ArchiveDecision::Extract),
                "k" | "keep" => return Ok(ArchiveDecision::Keep),
                "d" | "delete" => return Ok(ArchiveDecision::Delete),
                other => writeln!(self.output, "Unrecognized answer: {:?}", other)?,
            }
        }
    }

    fn extensionless_decision(&mut self, file: &Utf8Path) -> io::Result<ExtensionlessDecision> {
        writeln!(self.output, "File {} has no extension.", file)?;

        loop {
            let Some(answer) = self.ask("[r]ename, [d]elete or [s]kip? ")? else {
                writeln!(self.output)?;
                return Ok(ExtensionlessDecision::Skip);
            };
            match answer.to_lowercase().as_str() {
                "r" | "rename" => {
                    let extension = self.ask("New extension: ")?.unwrap_or_default();
                    let bare = extension.trim_start_matches('.');
                    if !bare.is_empty() && !is_valid_extension(bare) {
                        writeln!(self.output, "Not a plain extension: {:?}", extension)?;
                        continue;
                    }
                    return Ok(ExtensionlessDecision::rename(&extension));
                }
                "d" | "delete" => return Ok(ExtensionlessDecision::Delete),
                "s" | "skip" => return Ok(ExtensionlessDecision::Skip),
                other => writeln!(self.output, "Unrecognized answer: {:?}", other)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> DecisionProvider for TerminalDecisions<R, W> {
    fn resolve_archive(
        &mut self,
        archive: &Utf8Path,
        rom_entries: &[String],
    ) -> Result<ArchiveDecision, ReconcileError> {
        let decision = self
            .archive_decision(archive, rom_entries)
            .map_err(ReconcileError::Prompt)?;
        tracing::info!("Decision for {}: {:?}", archive, decision);
        Ok(decision)
    }

    fn resolve_extensionless(&mut self, file: &Utf8Path) -> Result<ExtensionlessDecision, ReconcileError> {
        let decision = self
            .extensionless_decision(file)
            .map_err(ReconcileError::Prompt)?;
        tracing::info!("Decision for {}: {:?}", file, decision);
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn terminal(input: &str) -> TerminalDecisions<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalDecisions::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_archive_answers() {
        let archive = Utf8Path::new("/roms/gb/pack.zip");
        let roms = vec!["a.gb".to_string(), "b.gb".to_string()];

        let mut term = terminal("E\n");
        assert_eq!(term.resolve_archive(archive, &roms).unwrap(), ArchiveDecision::Extract);
        let shown = String::from_utf8(term.output).unwrap();
        assert!(shown.contains("  - a.gb"));
        assert!(shown.contains("  - b.gb"));

        let mut term = terminal("maybe\ndelete\n");
        assert_eq!(term.resolve_archive(archive, &roms).unwrap(), ArchiveDecision::Delete);
        assert!(String::from_utf8(term.output).unwrap().contains("Unrecognized answer"));
    }

    #[test]
    fn test_end_of_input_leaves_things_alone() {
        let mut term = terminal("");
        assert_eq!(
            term.resolve_archive(Utf8Path::new("/x.zip"), &[]).unwrap(),
            ArchiveDecision::Keep
        );

        let mut term = terminal("");
        assert_eq!(
            term.resolve_extensionless(Utf8Path::new("/roms/nes/sub/README")).unwrap(),
            ExtensionlessDecision::Skip
        );
    }

    #[test]
    fn test_extensionless_rename_reads_extension() {
        let mut term = terminal("r\n .NES \n");
        assert_eq!(
            term.resolve_extensionless(Utf8Path::new("/roms/nes/sub/Tetris")).unwrap(),
            ExtensionlessDecision::Rename("NES".to_string())
        );

        let mut term = terminal("rename\n\n");
        assert_eq!(
            term.resolve_extensionless(Utf8Path::new("/roms/nes/sub/Tetris")).unwrap(),
            ExtensionlessDecision::Skip
        );

        let mut term = terminal("r\nx/../y\nr\nsfc\n");
        assert_eq!(
            term.resolve_extensionless(Utf8Path::new("/roms/nes/sub/Tetris")).unwrap(),
            ExtensionlessDecision::Rename("sfc".to_string())
        );
        assert!(String::from_utf8(term.output).unwrap().contains("Not a plain extension"));

        let mut term = terminal("s\n");
        assert_eq!(
            term.resolve_extensionless(Utf8Path::new("/roms/nes/sub/Tetris")).unwrap(),
            ExtensionlessDecision::Skip
        );
    }
}
