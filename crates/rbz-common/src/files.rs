//! File metadata: ids, paths, and strictness levels.
//!
//! Every parsed file is registered here before resolution starts. The
//! resolver reads strictness levels when sorting failed work items (so the
//! strictest file wins the deterministic error-site choice) and when
//! deciding whether a file permits overloaded method definitions.

use serde::{Deserialize, Serialize};

/// Stable id of a file, in command-line order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub const NONE: FileId = FileId(u32::MAX);

    #[inline]
    pub const fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// The `# typed:` sigil ladder.
///
/// Errors in `Ignore` files are suppressed entirely. The ordering matters:
/// failed-resolution reporting visits the strictest file first so that a
/// suppressed duplicate never masks a reportable one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrictLevel {
    Ignore,
    #[default]
    False,
    True,
    Strict,
    Strong,
}

/// Per-file metadata the resolver consumes.
#[derive(Clone, Debug)]
pub struct File {
    pub path: String,
    /// Effective strictness used for error suppression and sorting.
    pub strict: StrictLevel,
    /// The sigil literally written in the file, if any. A `sig` in a file
    /// with no written sigil is an error even when the effective level
    /// defaults to `False`.
    pub original_sigil: Option<StrictLevel>,
    /// Interface (.rbi) files may declare methods with no bodies.
    pub is_rbi: bool,
    /// Whether this file may define overloaded methods (multiple sigs on
    /// one def). Reserved for interface files shipped with the checker.
    pub permits_overloads: bool,
}

/// Registry of all files in the program.
#[derive(Debug, Default)]
pub struct FileTable {
    files: Vec<File>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, file: File) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(file);
        id
    }

    pub fn get(&self, id: FileId) -> Option<&File> {
        self.files.get(id.0 as usize)
    }

    /// Strictness of a file; locations outside any file rank strongest so
    /// synthesized locations sort ahead of user code.
    pub fn strict_level(&self, id: FileId) -> StrictLevel {
        self.get(id).map_or(StrictLevel::Strong, |f| f.strict)
    }

    pub fn permits_overloads(&self, id: FileId) -> bool {
        self.get(id).is_some_and(|f| f.permits_overloads)
    }

    pub fn is_rbi(&self, id: FileId) -> bool {
        self.get(id).is_some_and(|f| f.is_rbi)
    }

    pub fn original_sigil(&self, id: FileId) -> Option<StrictLevel> {
        self.get(id).and_then(|f| f.original_sigil)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
