//! Node constructors.
//!
//! Used by the resolver when it synthesizes trees (default-argument casts,
//! `Magic.suggest_type` wrapping) and by tests building programs by hand.

use crate::node::{
    ArgNodeFlags, AstArena, CastKind, ClassKind, IdentKind, Literal, NodeId, NodeKind,
};
use rbz_common::Loc;
use rbz_core::{NameId, SymbolId, TypeId};

pub mod mk {
    use super::*;

    pub fn empty(arena: &mut AstArena, loc: Loc) -> NodeId {
        arena.alloc(loc, NodeKind::EmptyTree)
    }

    pub fn self_ref(arena: &mut AstArena, loc: Loc) -> NodeId {
        arena.alloc(loc, NodeKind::SelfRef)
    }

    pub fn lit_int(arena: &mut AstArena, loc: Loc, value: i64) -> NodeId {
        arena.alloc(loc, NodeKind::Literal(Literal::Int(value)))
    }

    pub fn lit_sym(arena: &mut AstArena, loc: Loc, name: NameId) -> NodeId {
        arena.alloc(loc, NodeKind::Literal(Literal::Sym(name)))
    }

    pub fn lit_str(arena: &mut AstArena, loc: Loc, name: NameId) -> NodeId {
        arena.alloc(loc, NodeKind::Literal(Literal::Str(name)))
    }

    pub fn lit_nil(arena: &mut AstArena, loc: Loc) -> NodeId {
        arena.alloc(loc, NodeKind::Literal(Literal::Nil))
    }

    /// Unqualified textual constant.
    pub fn uconst(arena: &mut AstArena, loc: Loc, name: NameId) -> NodeId {
        let scope = empty(arena, loc);
        arena.alloc(loc, NodeKind::UnresolvedConstant { scope, name })
    }

    /// Scope-qualified textual constant (`scope::name`).
    pub fn uconst_in(arena: &mut AstArena, loc: Loc, scope: NodeId, name: NameId) -> NodeId {
        arena.alloc(loc, NodeKind::UnresolvedConstant { scope, name })
    }

    /// An already-bound constant, as synthesized by the resolver itself.
    pub fn constant(arena: &mut AstArena, loc: Loc, symbol: SymbolId, original: NodeId) -> NodeId {
        arena.alloc(
            loc,
            NodeKind::Constant {
                symbol,
                resolution_scope: SymbolId::NONE,
                original,
            },
        )
    }

    pub fn class_def(
        arena: &mut AstArena,
        loc: Loc,
        symbol: SymbolId,
        kind: ClassKind,
        ancestors: Vec<NodeId>,
        body: Vec<NodeId>,
    ) -> NodeId {
        arena.alloc(
            loc,
            NodeKind::ClassDef {
                symbol,
                kind,
                ancestors,
                singleton_ancestors: Vec::new(),
                body,
            },
        )
    }

    pub fn method_def(
        arena: &mut AstArena,
        loc: Loc,
        symbol: SymbolId,
        name: NameId,
        is_self_method: bool,
        args: Vec<NodeId>,
        body: NodeId,
    ) -> NodeId {
        arena.alloc(
            loc,
            NodeKind::MethodDef {
                symbol,
                name,
                is_self_method,
                args,
                body,
            },
        )
    }

    pub fn arg(arena: &mut AstArena, loc: Loc, name: NameId, flags: ArgNodeFlags) -> NodeId {
        let default = empty(arena, loc);
        arena.alloc(loc, NodeKind::Arg { name, flags, default })
    }

    pub fn arg_with_default(
        arena: &mut AstArena,
        loc: Loc,
        name: NameId,
        flags: ArgNodeFlags,
        default: NodeId,
    ) -> NodeId {
        arena.alloc(loc, NodeKind::Arg { name, flags, default })
    }

    pub fn send(
        arena: &mut AstArena,
        loc: Loc,
        recv: NodeId,
        fun: NameId,
        args: Vec<NodeId>,
    ) -> NodeId {
        let block = empty(arena, loc);
        arena.alloc(loc, NodeKind::Send { recv, fun, args, block })
    }

    pub fn send_with_block(
        arena: &mut AstArena,
        loc: Loc,
        recv: NodeId,
        fun: NameId,
        args: Vec<NodeId>,
        block: NodeId,
    ) -> NodeId {
        arena.alloc(loc, NodeKind::Send { recv, fun, args, block })
    }

    pub fn assign(arena: &mut AstArena, loc: Loc, lhs: NodeId, rhs: NodeId) -> NodeId {
        arena.alloc(loc, NodeKind::Assign { lhs, rhs })
    }

    pub fn ident(arena: &mut AstArena, loc: Loc, kind: IdentKind, name: NameId) -> NodeId {
        arena.alloc(loc, NodeKind::Ident { kind, name })
    }

    pub fn hash(arena: &mut AstArena, loc: Loc, keys: Vec<NodeId>, values: Vec<NodeId>) -> NodeId {
        arena.alloc(loc, NodeKind::Hash { keys, values })
    }

    pub fn ins_seq(arena: &mut AstArena, loc: Loc, stats: Vec<NodeId>, expr: NodeId) -> NodeId {
        arena.alloc(loc, NodeKind::InsSeq { stats, expr })
    }

    pub fn cast(
        arena: &mut AstArena,
        loc: Loc,
        kind: CastKind,
        ty: TypeId,
        expr: NodeId,
    ) -> NodeId {
        arena.alloc(loc, NodeKind::Cast { kind, ty, expr })
    }
}
