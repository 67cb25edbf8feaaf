//! Core program state for the rbz checker.
//!
//! This crate provides:
//! - `NameInterner` - Interned identifier storage
//! - `SymbolTable` - Symbol storage, lookup, and ancestry queries
//! - `TypeStore` - Interned type storage with the small lattice the
//!   resolver needs for bounds checks
//! - `GlobalState` - The single mutable home of all of the above

pub mod names;
pub mod state;
pub mod symbols;
pub mod types;

pub use names::{NameId, NameInterner, UniqueNameKind, well_known};
pub use state::GlobalState;
pub use symbols::{ArgFlags, ArgInfo, Symbol, SymbolId, SymbolKind, SymbolTable, symbol_flags};
pub use types::{TypeId, TypeKey, TypeStore};
