//! Name and type resolution for the rbz checker.
//!
//! The namer has already entered every lexical class, module, method, and
//! field into the symbol table; this pass links the program together:
//!
//! - `resolve_constants` binds every textual constant reference to a
//!   symbol and materializes superclasses, mixins, class aliases, and
//!   type aliases through a deterministic work-list fixpoint (see that
//!   module's docs for the full story).
//! - `resolve_mixes_in_class_methods` records module class-method mixin
//!   targets.
//! - `resolve_type_params` fills in type-member bounds.
//! - `resolve_signatures` elaborates `sig` annotations onto method
//!   symbols, types variable declarations, and rewrites `T.let`-style
//!   casts.
//! - `sanity_check` (debug builds) asserts the structural
//!   postconditions.
//!
//! Between walks the driver invokes the symbol table's finalization steps
//! (`finalize_ancestors`, `finalize_symbols`).

pub mod errors;
pub mod mixes_in_class_methods;
pub mod resolve_constants;
pub mod sanity;
pub mod signatures;
pub mod type_params;
pub mod type_syntax;

use rbz_ast::ParsedFile;
use rbz_core::GlobalState;

pub use mixes_in_class_methods::resolve_mixes_in_class_methods;
pub use resolve_constants::resolve_constants;
pub use sanity::sanity_check;
pub use signatures::resolve_signatures;
pub use type_params::resolve_type_params;
pub use type_syntax::{ParsedSig, TypeSyntaxArgs};

pub struct Resolver;

impl Resolver {
    /// The full pipeline: returns the rewritten trees and mutates the
    /// symbol table. `workers` sizes the pre-walk pool; zero or one means
    /// fully serial.
    pub fn run(gs: &mut GlobalState, trees: Vec<ParsedFile>, workers: usize) -> Vec<ParsedFile> {
        let mut trees = resolve_constants(gs, trees, workers);
        gs.finalize_ancestors();
        resolve_mixes_in_class_methods(gs, &mut trees);
        gs.finalize_symbols();
        resolve_type_params(gs, &mut trees);
        resolve_signatures(gs, &mut trees);
        sanity_check(gs, &trees);
        trees
    }

    /// Synchronous variant of `run` that skips the symbol-table
    /// finalization steps; used by callers that manage those themselves.
    pub fn run_tree_passes(gs: &mut GlobalState, trees: Vec<ParsedFile>) -> Vec<ParsedFile> {
        let mut trees = resolve_constants(gs, trees, 0);
        resolve_mixes_in_class_methods(gs, &mut trees);
        resolve_type_params(gs, &mut trees);
        resolve_signatures(gs, &mut trees);
        sanity_check(gs, &trees);
        trees
    }

    /// Constant resolution only, for incremental callers and test
    /// harnesses.
    pub fn run_constant_resolution(
        gs: &mut GlobalState,
        trees: Vec<ParsedFile>,
        workers: usize,
    ) -> Vec<ParsedFile> {
        let trees = resolve_constants(gs, trees, workers);
        sanity_check(gs, &trees);
        trees
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
#[path = "../tests/resolve_constants_tests.rs"]
mod resolve_constants_tests;
#[cfg(test)]
#[path = "../tests/determinism_tests.rs"]
mod determinism_tests;
#[cfg(test)]
#[path = "../tests/signatures_tests.rs"]
mod signatures_tests;
#[cfg(test)]
#[path = "../tests/type_params_tests.rs"]
mod type_params_tests;
#[cfg(test)]
#[path = "../tests/mixes_in_tests.rs"]
mod mixes_in_tests;
#[cfg(test)]
#[path = "../tests/fields_tests.rs"]
mod fields_tests;
