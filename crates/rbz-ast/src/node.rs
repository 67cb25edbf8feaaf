//! AST node storage.
//!
//! Each file owns one `AstArena`; nodes are addressed by `NodeId` and
//! rewritten in place by replacing the slot's kind. That is how the
//! resolver turns `UnresolvedConstant` into `Constant` (the textual
//! original is copied into a fresh slot, kept only for diagnostics) and
//! `T.let` sends into `Cast` nodes, without disturbing parent links.

use rbz_common::Loc;
use rbz_core::{ArgFlags, NameId, SymbolId, TypeId};

pub use rbz_common::FileId;

/// Index of a node within its file's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Module,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentKind {
    Local,
    /// `@ivar`
    Instance,
    /// `@@cvar`
    Class,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    /// `T.let`
    Let,
    /// `T.cast`
    Cast,
    /// `T.assert_type!`
    AssertType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(NameId),
    Sym(NameId),
    Bool(bool),
    Nil,
}

/// Flags mirrored onto method-argument nodes by the parser.
pub type ArgNodeFlags = ArgFlags;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    EmptyTree,
    SelfRef,
    Literal(Literal),
    /// A textual constant reference, `scope` pointing at another constant
    /// node or `EmptyTree` when the reference is unqualified.
    UnresolvedConstant { scope: NodeId, name: NameId },
    /// A bound constant. `original` points at a copy of the textual node
    /// and is not part of the structural tree; `resolution_scope` records
    /// where resolution gave up, for downstream diagnostics.
    Constant {
        symbol: SymbolId,
        resolution_scope: SymbolId,
        original: NodeId,
    },
    ClassDef {
        symbol: SymbolId,
        kind: ClassKind,
        ancestors: Vec<NodeId>,
        singleton_ancestors: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    MethodDef {
        symbol: SymbolId,
        name: NameId,
        is_self_method: bool,
        args: Vec<NodeId>,
        body: NodeId,
    },
    /// One formal argument of a `MethodDef`. `default` is `EmptyTree`
    /// unless the argument has a default expression.
    Arg {
        name: NameId,
        flags: ArgNodeFlags,
        default: NodeId,
    },
    Send {
        recv: NodeId,
        fun: NameId,
        args: Vec<NodeId>,
        /// Body of an attached block, `EmptyTree` when absent.
        block: NodeId,
    },
    Assign { lhs: NodeId, rhs: NodeId },
    Ident { kind: IdentKind, name: NameId },
    Hash { keys: Vec<NodeId>, values: Vec<NodeId> },
    InsSeq { stats: Vec<NodeId>, expr: NodeId },
    Cast {
        kind: CastKind,
        ty: TypeId,
        expr: NodeId,
    },
}

#[derive(Clone, Debug)]
pub struct Node {
    pub loc: Loc,
    pub kind: NodeKind,
}

/// Node storage for one file.
#[derive(Clone, Debug, Default)]
pub struct AstArena {
    nodes: Vec<Node>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, loc: Loc, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { loc, kind });
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0 as usize].kind
    }

    #[inline]
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0 as usize].kind
    }

    #[inline]
    pub fn loc(&self, id: NodeId) -> Loc {
        self.nodes[id.0 as usize].loc
    }

    /// Replace a node's payload in place, returning the old one.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) -> NodeKind {
        std::mem::replace(&mut self.nodes[id.0 as usize].kind, kind)
    }

    /// Copy a subtree into fresh slots. Used when one expression must
    /// appear in two places, e.g. a default argument re-checked through a
    /// synthesized `T.let`.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let Node { loc, kind } = self.nodes[id.0 as usize].clone();
        let kind = match kind {
            NodeKind::EmptyTree
            | NodeKind::SelfRef
            | NodeKind::Literal(_)
            | NodeKind::Ident { .. } => kind,
            NodeKind::UnresolvedConstant { scope, name } => NodeKind::UnresolvedConstant {
                scope: self.deep_copy(scope),
                name,
            },
            NodeKind::Constant {
                symbol,
                resolution_scope,
                original,
            } => NodeKind::Constant {
                symbol,
                resolution_scope,
                original: self.deep_copy(original),
            },
            NodeKind::ClassDef {
                symbol,
                kind,
                ancestors,
                singleton_ancestors,
                body,
            } => NodeKind::ClassDef {
                symbol,
                kind,
                ancestors: self.deep_copy_all(ancestors),
                singleton_ancestors: self.deep_copy_all(singleton_ancestors),
                body: self.deep_copy_all(body),
            },
            NodeKind::MethodDef {
                symbol,
                name,
                is_self_method,
                args,
                body,
            } => NodeKind::MethodDef {
                symbol,
                name,
                is_self_method,
                args: self.deep_copy_all(args),
                body: self.deep_copy(body),
            },
            NodeKind::Arg { name, flags, default } => NodeKind::Arg {
                name,
                flags,
                default: self.deep_copy(default),
            },
            NodeKind::Send {
                recv,
                fun,
                args,
                block,
            } => NodeKind::Send {
                recv: self.deep_copy(recv),
                fun,
                args: self.deep_copy_all(args),
                block: self.deep_copy(block),
            },
            NodeKind::Assign { lhs, rhs } => NodeKind::Assign {
                lhs: self.deep_copy(lhs),
                rhs: self.deep_copy(rhs),
            },
            NodeKind::Hash { keys, values } => NodeKind::Hash {
                keys: self.deep_copy_all(keys),
                values: self.deep_copy_all(values),
            },
            NodeKind::InsSeq { stats, expr } => NodeKind::InsSeq {
                stats: self.deep_copy_all(stats),
                expr: self.deep_copy(expr),
            },
            NodeKind::Cast { kind, ty, expr } => NodeKind::Cast {
                kind,
                ty,
                expr: self.deep_copy(expr),
            },
        };
        self.alloc(loc, kind)
    }

    fn deep_copy_all(&mut self, ids: Vec<NodeId>) -> Vec<NodeId> {
        ids.into_iter().map(|id| self.deep_copy(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn is_empty_tree(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::EmptyTree)
    }

    #[inline]
    pub fn is_self_ref(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::SelfRef)
    }

    /// The symbol of a `Constant` node, `SymbolId::NONE` otherwise.
    pub fn constant_symbol(&self, id: NodeId) -> SymbolId {
        match self.kind(id) {
            NodeKind::Constant { symbol, .. } => *symbol,
            _ => SymbolId::NONE,
        }
    }

    /// Nesting depth of a bound constant's scope prefix: `A::B::C` has
    /// depth 2 at `C`. Used as the failure-report tiebreak so the least
    /// nested reference reports first.
    pub fn constant_depth(&self, id: NodeId) -> u32 {
        let mut depth = 0;
        let mut cur = id;
        loop {
            let NodeKind::Constant { original, .. } = self.kind(cur) else {
                return depth;
            };
            let NodeKind::UnresolvedConstant { scope, .. } = self.kind(*original) else {
                return depth;
            };
            if matches!(self.kind(*scope), NodeKind::Constant { .. }) {
                depth += 1;
                cur = *scope;
            } else {
                return depth;
            }
        }
    }
}

/// One file's tree, as handed between passes.
#[derive(Clone, Debug)]
pub struct ParsedFile {
    pub file: FileId,
    pub root: NodeId,
    pub arena: AstArena,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbz_common::Loc;

    #[test]
    fn replace_keeps_identity() {
        let mut arena = AstArena::new();
        let loc = Loc::none();
        let scope = arena.alloc(loc, NodeKind::EmptyTree);
        let id = arena.alloc(loc, NodeKind::UnresolvedConstant { scope, name: NameId(0) });
        let old = arena.replace(
            id,
            NodeKind::Constant {
                symbol: SymbolId(3),
                resolution_scope: SymbolId::NONE,
                original: NodeId(0),
            },
        );
        assert!(matches!(old, NodeKind::UnresolvedConstant { .. }));
        assert_eq!(arena.constant_symbol(id), SymbolId(3));
    }
}
