//! Debug-only structural postconditions of the pass.

use crate::resolve_constants::is_already_resolved;
use rbz_ast::{NodeKind, ParsedFile, preorder};
use rbz_core::{GlobalState, symbols::reserved};

/// Assert that resolution left the trees in the shape every later pass
/// assumes: no textual constants, no placeholder symbols, every bound
/// constant actually bound. Compiled away outside debug builds.
pub fn sanity_check(gs: &GlobalState, trees: &[ParsedFile]) {
    if !cfg!(debug_assertions) {
        return;
    }
    for tree in trees {
        preorder(&tree.arena, tree.root, &mut |id| match tree.arena.kind(id) {
            NodeKind::UnresolvedConstant { .. } => {
                panic!("unresolved constant survived resolution at {}", tree.arena.loc(id));
            }
            NodeKind::ClassDef { symbol, .. } | NodeKind::MethodDef { symbol, .. } => {
                assert!(
                    symbol.exists() && *symbol != reserved::TODO,
                    "definition symbol left unbound at {}",
                    tree.arena.loc(id)
                );
            }
            NodeKind::Constant { .. } => {
                assert!(
                    is_already_resolved(gs, &tree.arena, id),
                    "constant left unresolved at {}",
                    tree.arena.loc(id)
                );
            }
            _ => {}
        });
    }
}
