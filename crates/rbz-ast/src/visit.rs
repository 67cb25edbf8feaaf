//! Structural child traversal.
//!
//! `Constant::original` is metadata, not a structural child: it holds the
//! textual form of an already-rewritten reference and must not be visited,
//! or post-resolution walks would re-discover `UnresolvedConstant` nodes
//! that no longer exist in the tree.

use crate::node::{AstArena, NodeId, NodeKind};

/// Invoke `f` on each structural child of `id`.
pub fn for_each_child(arena: &AstArena, id: NodeId, f: &mut impl FnMut(NodeId)) {
    match arena.kind(id) {
        NodeKind::EmptyTree
        | NodeKind::SelfRef
        | NodeKind::Literal(_)
        | NodeKind::Ident { .. }
        | NodeKind::Constant { .. } => {}
        NodeKind::UnresolvedConstant { scope, .. } => f(*scope),
        NodeKind::ClassDef {
            ancestors,
            singleton_ancestors,
            body,
            ..
        } => {
            for &child in ancestors.iter().chain(singleton_ancestors).chain(body) {
                f(child);
            }
        }
        NodeKind::MethodDef { args, body, .. } => {
            for &child in args {
                f(child);
            }
            f(*body);
        }
        NodeKind::Arg { default, .. } => f(*default),
        NodeKind::Send {
            recv, args, block, ..
        } => {
            f(*recv);
            for &child in args {
                f(child);
            }
            f(*block);
        }
        NodeKind::Assign { lhs, rhs } => {
            f(*lhs);
            f(*rhs);
        }
        NodeKind::Hash { keys, values } => {
            for &child in keys.iter().chain(values) {
                f(child);
            }
        }
        NodeKind::InsSeq { stats, expr } => {
            for &child in stats {
                f(child);
            }
            f(*expr);
        }
        NodeKind::Cast { expr, .. } => f(*expr),
    }
}

/// Preorder walk of the structural tree under `root`.
pub fn preorder(arena: &AstArena, root: NodeId, f: &mut impl FnMut(NodeId)) {
    f(root);
    let mut children = Vec::new();
    for_each_child(arena, root, &mut |child| children.push(child));
    for child in children {
        preorder(arena, child, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::mk;
    use rbz_common::Loc;
    use rbz_core::{NameId, SymbolId};

    #[test]
    fn preorder_skips_constant_originals() {
        let mut arena = AstArena::new();
        let loc = Loc::none();
        let original = mk::uconst(&mut arena, loc, NameId(0));
        let bound = mk::constant(&mut arena, loc, SymbolId(6), original);
        let seq = mk::ins_seq(&mut arena, loc, vec![bound], bound);

        let mut unresolved = 0;
        preorder(&arena, seq, &mut |id| {
            if matches!(arena.kind(id), NodeKind::UnresolvedConstant { .. }) {
                unresolved += 1;
            }
        });
        assert_eq!(unresolved, 0);
    }
}
