//! The single mutable home of program-wide state.
//!
//! Parallel phases get `&GlobalState`; all symbol-table mutation happens
//! on the one thread holding `&mut GlobalState`.

use crate::names::NameInterner;
use crate::symbols::SymbolTable;
use crate::types::TypeStore;
use rbz_common::{ErrorBuilder, ErrorQueue, FileTable, Loc};

#[derive(Debug)]
pub struct GlobalState {
    pub files: FileTable,
    pub names: NameInterner,
    pub symbols: SymbolTable,
    pub types: TypeStore,
    pub errors: ErrorQueue,
}

impl GlobalState {
    pub fn new() -> Self {
        GlobalState {
            files: FileTable::new(),
            names: NameInterner::new(),
            symbols: SymbolTable::new(),
            types: TypeStore::new(),
            errors: ErrorQueue::new(),
        }
    }

    /// Start an error against the shared queue, honoring per-file
    /// suppression.
    pub fn begin_error(&self, loc: Loc, code: u32) -> Option<ErrorBuilder<'_>> {
        self.errors.begin_error(&self.files, loc, code)
    }

    /// External symbol-table finalization between resolver walks: default
    /// superclasses for classes nothing resolved one for.
    pub fn finalize_ancestors(&mut self) {
        tracing::debug!("finalize_ancestors");
        self.symbols.finalize_ancestors();
    }

    /// External symbol-table finalization: cache ancestor linearizations
    /// for the single-threaded walks that follow.
    pub fn finalize_symbols(&mut self) {
        tracing::debug!("finalize_symbols");
        self.symbols.finalize_symbols();
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new()
    }
}
