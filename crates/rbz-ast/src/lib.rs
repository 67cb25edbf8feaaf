//! Arena-based AST for the rbz checker.
//!
//! This crate provides:
//! - `AstArena`/`NodeId` - Index-addressed node storage, one arena per file
//! - `NodeKind` - The node payloads the resolver consumes and rewrites
//! - `mk` - Constructors for synthesized nodes
//! - `visit` - Structural child traversal

pub mod builder;
pub mod node;
pub mod visit;

pub use builder::mk;
pub use node::{
    ArgNodeFlags, AstArena, CastKind, ClassKind, IdentKind, Literal, Node, NodeId, NodeKind,
    ParsedFile,
};
pub use visit::{for_each_child, preorder};
