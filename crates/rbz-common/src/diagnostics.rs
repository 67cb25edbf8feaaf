//! Diagnostics for the resolver and later passes.
//!
//! Failures in user programs are reported, never thrown: a pass substitutes
//! a stub and keeps going. `ErrorQueue` is append-only and tolerates
//! concurrent appends; the parallel pre-walk gives each worker its own
//! queue and merges them in file order so output stays deterministic.

use crate::files::{FileTable, StrictLevel};
use crate::span::Loc;
use std::sync::Mutex;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

/// A secondary location attached to a diagnostic ("Previous definition",
/// "Signature", ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLine {
    pub loc: Loc,
    pub message: String,
}

impl ErrorLine {
    pub fn new(loc: Loc, message: impl Into<String>) -> Self {
        ErrorLine {
            loc,
            message: message.into(),
        }
    }
}

/// A suggested source replacement (autocorrect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autocorrect {
    pub title: String,
    pub loc: Loc,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub loc: Loc,
    pub header: String,
    pub lines: Vec<ErrorLine>,
    /// Free-standing sections such as did-you-mean suggestion lists.
    pub sections: Vec<Vec<ErrorLine>>,
    pub autocorrect: Option<Autocorrect>,
}

/// Append-only sink for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorQueue {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl ErrorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an error unless the file's strictness suppresses reporting.
    ///
    /// Mirrors the `if let Some(e) = begin_error(..)` shape at every call
    /// site: the builder emits into the queue when dropped.
    pub fn begin_error<'q>(
        &'q self,
        files: &FileTable,
        loc: Loc,
        code: u32,
    ) -> Option<ErrorBuilder<'q>> {
        if loc.exists() && files.strict_level(loc.file) == StrictLevel::Ignore {
            return None;
        }
        Some(ErrorBuilder {
            queue: self,
            diag: Diagnostic {
                category: DiagnosticCategory::Error,
                code,
                loc,
                header: String::new(),
                lines: Vec::new(),
                sections: Vec::new(),
                autocorrect: None,
            },
        })
    }

    pub fn push(&self, diag: Diagnostic) {
        self.diagnostics.lock().unwrap().push(diag);
    }

    /// Move another queue's contents onto the end of this one, preserving
    /// the other queue's internal order.
    pub fn absorb(&self, other: ErrorQueue) {
        let mut incoming = other.diagnostics.into_inner().unwrap();
        self.diagnostics.lock().unwrap().append(&mut incoming);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner().unwrap()
    }

    /// Count diagnostics carrying the given code.
    pub fn count_code(&self, code: u32) -> usize {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.code == code)
            .count()
    }
}

/// Chained construction of a single diagnostic; emits on drop.
pub struct ErrorBuilder<'q> {
    queue: &'q ErrorQueue,
    diag: Diagnostic,
}

impl<'q> ErrorBuilder<'q> {
    pub fn set_header(&mut self, header: impl Into<String>) -> &mut Self {
        self.diag.header = header.into();
        self
    }

    pub fn add_error_line(&mut self, loc: Loc, message: impl Into<String>) -> &mut Self {
        self.diag.lines.push(ErrorLine::new(loc, message));
        self
    }

    pub fn add_error_section(&mut self, lines: Vec<ErrorLine>) -> &mut Self {
        self.diag.sections.push(lines);
        self
    }

    pub fn replace_with(
        &mut self,
        title: impl Into<String>,
        loc: Loc,
        replacement: impl Into<String>,
    ) -> &mut Self {
        self.diag.autocorrect = Some(Autocorrect {
            title: title.into(),
            loc,
            replacement: replacement.into(),
        });
        self
    }
}

impl Drop for ErrorBuilder<'_> {
    fn drop(&mut self) {
        let diag = std::mem::replace(
            &mut self.diag,
            Diagnostic {
                category: DiagnosticCategory::Error,
                code: 0,
                loc: Loc::none(),
                header: String::new(),
                lines: Vec::new(),
                sections: Vec::new(),
                autocorrect: None,
            },
        );
        self.queue.push(diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{File, FileId, FileTable};

    fn table_with(strict: StrictLevel) -> (FileTable, FileId) {
        let mut files = FileTable::new();
        let id = files.enter(File {
            path: "test.rb".to_string(),
            strict,
            original_sigil: Some(strict),
            is_rbi: false,
            permits_overloads: false,
        });
        (files, id)
    }

    #[test]
    fn builder_emits_on_drop() {
        let (files, file) = table_with(StrictLevel::True);
        let queue = ErrorQueue::new();
        if let Some(mut e) = queue.begin_error(&files, Loc::new(file, 0, 3), 4001) {
            e.set_header("Unable to resolve constant `Foo`");
        }
        let diags = queue.into_vec();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, 4001);
        assert_eq!(diags[0].header, "Unable to resolve constant `Foo`");
    }

    #[test]
    fn ignore_files_suppress_errors() {
        let (files, file) = table_with(StrictLevel::Ignore);
        let queue = ErrorQueue::new();
        assert!(queue.begin_error(&files, Loc::new(file, 0, 3), 4001).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn absorb_preserves_order() {
        let (files, file) = table_with(StrictLevel::True);
        let main = ErrorQueue::new();
        let worker = ErrorQueue::new();
        for code in [1, 2, 3] {
            if let Some(mut e) = worker.begin_error(&files, Loc::new(file, code, code + 1), code) {
                e.set_header(format!("e{code}"));
            }
        }
        main.absorb(worker);
        let diags = main.into_vec();
        assert_eq!(diags.iter().map(|d| d.code).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
