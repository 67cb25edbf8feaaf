//! Elaboration of annotation expressions into types.
//!
//! This is the boundary the resolver hands fully-resolved expressions to:
//! it never drives constant resolution itself. `parse_sig` consumes the
//! builder chain inside a `sig { ... }` block; `get_result_type` turns a
//! single type expression into a `TypeId`.

use crate::errors;
use rbz_ast::{AstArena, Literal, NodeId, NodeKind};
use rbz_common::Loc;
use rbz_core::{
    GlobalState, NameId, SymbolId, TypeId, TypeKey, symbols::reserved, well_known,
};
use rustc_hash::FxHashMap;

/// Switches the caller grants the elaborator.
#[derive(Clone, Copy, Debug)]
pub struct TypeSyntaxArgs {
    pub allow_self_type: bool,
    pub allow_rebind: bool,
    pub allow_type_member: bool,
    pub owner: SymbolId,
}

/// Which builder calls a sig chain mentioned.
#[derive(Clone, Copy, Debug, Default)]
pub struct SigSeen {
    pub sig: bool,
    pub params: bool,
    pub returns: bool,
    pub void: bool,
    pub abstract_: bool,
    pub override_: bool,
    pub overridable: bool,
    pub final_: bool,
    pub incompatible_override: bool,
    pub generated: bool,
    pub bind: bool,
    pub type_parameters: bool,
}

/// One `params(name: Type)` entry.
#[derive(Clone, Debug)]
pub struct ArgSpec {
    pub name: NameId,
    pub loc: Loc,
    pub ty: TypeId,
    pub rebind: SymbolId,
}

/// A parsed signature, ready to be applied to a method symbol.
#[derive(Clone, Debug)]
pub struct ParsedSig {
    pub seen: SigSeen,
    pub arg_types: Vec<ArgSpec>,
    pub returns: Option<TypeId>,
    pub bind: SymbolId,
    pub type_arg_names: Vec<(NameId, Loc)>,
}

impl Default for ParsedSig {
    fn default() -> Self {
        ParsedSig {
            seen: SigSeen::default(),
            arg_types: Vec::new(),
            returns: None,
            bind: SymbolId::NONE,
            type_arg_names: Vec::new(),
        }
    }
}

/// Whether a send is a `sig { ... }` annotation.
pub fn is_sig(arena: &AstArena, send: NodeId) -> bool {
    match arena.kind(send) {
        NodeKind::Send {
            recv, fun, block, ..
        } => {
            *fun == well_known::SIG
                && (arena.is_empty_tree(*recv) || arena.is_self_ref(*recv))
                && !arena.is_empty_tree(*block)
        }
        _ => false,
    }
}

/// Scan a sig's builder chain for `type_parameters(:x, ...)` names without
/// materializing anything. The caller enters the type-argument symbols
/// before the full parse so `T.type_parameter(:x)` can refer to them.
pub fn collect_type_param_names(arena: &AstArena, sig_send: NodeId) -> Vec<(NameId, Loc)> {
    let NodeKind::Send { block, .. } = arena.kind(sig_send) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cur = *block;
    while let NodeKind::Send { recv, fun, args, .. } = arena.kind(cur) {
        if *fun == well_known::TYPE_PARAMETERS {
            for &arg in args {
                if let NodeKind::Literal(Literal::Sym(name)) = arena.kind(arg) {
                    out.push((*name, arena.loc(arg)));
                }
            }
        }
        cur = *recv;
    }
    // The chain reads outside-in; declaration order is inside-out.
    out.reverse();
    out
}

/// Parse the builder chain of a `sig { ... }` block.
///
/// `type_args` maps type-parameter names to the already-entered
/// type-argument symbols of the method under elaboration; empty when
/// parsing a sig with no method to attach to.
pub fn parse_sig(
    gs: &GlobalState,
    arena: &AstArena,
    sig_send: NodeId,
    type_args: &FxHashMap<NameId, SymbolId>,
    args: &TypeSyntaxArgs,
) -> ParsedSig {
    let mut sig = ParsedSig::default();
    sig.seen.sig = true;

    let NodeKind::Send { block, .. } = arena.kind(sig_send) else {
        return sig;
    };

    // The chain nests outward: `params(...).returns(...)` parses the
    // `returns` send first with `params` as its receiver.
    let mut cur = *block;
    loop {
        match arena.kind(cur) {
            NodeKind::Send {
                recv,
                fun,
                args: send_args,
                ..
            } => {
                let fun = *fun;
                let send_args = send_args.clone();
                let loc = arena.loc(cur);
                let next = *recv;
                parse_sig_builder(gs, arena, &mut sig, fun, &send_args, loc, type_args, args);
                cur = next;
            }
            _ => break,
        }
    }

    sig
}

#[allow(clippy::too_many_arguments)]
fn parse_sig_builder(
    gs: &GlobalState,
    arena: &AstArena,
    sig: &mut ParsedSig,
    fun: NameId,
    send_args: &[NodeId],
    loc: Loc,
    type_args: &FxHashMap<NameId, SymbolId>,
    args: &TypeSyntaxArgs,
) {
    match fun {
        well_known::PARAMS => {
            sig.seen.params = true;
            let Some(&hash) = send_args.first() else {
                if let Some(mut e) =
                    gs.begin_error(loc, errors::INVALID_METHOD_SIGNATURE)
                {
                    e.set_header("Malformed `sig`: `params` expects keyword arguments");
                }
                return;
            };
            let NodeKind::Hash { keys, values } = arena.kind(hash) else {
                if let Some(mut e) =
                    gs.begin_error(loc, errors::INVALID_METHOD_SIGNATURE)
                {
                    e.set_header("Malformed `sig`: `params` expects keyword arguments");
                }
                return;
            };
            let pairs: Vec<(NodeId, NodeId)> =
                keys.iter().copied().zip(values.iter().copied()).collect();
            for (key, value) in pairs {
                let NodeKind::Literal(Literal::Sym(name)) = arena.kind(key) else {
                    continue;
                };
                let ty = get_result_type_with_params(gs, arena, value, type_args, args);
                sig.arg_types.push(ArgSpec {
                    name: *name,
                    loc: arena.loc(key),
                    ty,
                    rebind: SymbolId::NONE,
                });
            }
        }
        well_known::RETURNS => {
            sig.seen.returns = true;
            if let Some(&ret) = send_args.first() {
                sig.returns = Some(get_result_type_with_params(gs, arena, ret, type_args, args));
            } else if let Some(mut e) = gs.begin_error(loc, errors::INVALID_METHOD_SIGNATURE) {
                e.set_header("Malformed `sig`: `returns` expects a type");
            }
        }
        well_known::VOID => sig.seen.void = true,
        well_known::ABSTRACT => sig.seen.abstract_ = true,
        well_known::OVERRIDE => sig.seen.override_ = true,
        well_known::OVERRIDABLE => sig.seen.overridable = true,
        well_known::INCOMPATIBLE_OVERRIDE => sig.seen.incompatible_override = true,
        well_known::FINAL => sig.seen.final_ = true,
        well_known::GENERATED => sig.seen.generated = true,
        well_known::BIND => {
            sig.seen.bind = true;
            if let Some(&target) = send_args.first()
                && let NodeKind::Constant { symbol, .. } = arena.kind(target)
            {
                sig.bind = gs.symbols.dealias(&gs.types, *symbol);
            }
        }
        well_known::TYPE_PARAMETERS => {
            sig.seen.type_parameters = true;
            for &arg in send_args {
                if let NodeKind::Literal(Literal::Sym(name)) = arena.kind(arg) {
                    sig.type_arg_names.push((*name, arena.loc(arg)));
                }
            }
        }
        _ => {
            if let Some(mut e) = gs.begin_error(loc, errors::INVALID_METHOD_SIGNATURE) {
                let shown = gs.names.resolve(fun);
                e.set_header(format!("Malformed `sig`: unknown builder `{shown}`"));
            }
        }
    }
}

/// Materialize a type expression. Every constant inside `expr` must have
/// been resolved before this is called.
pub fn get_result_type(
    gs: &GlobalState,
    arena: &AstArena,
    expr: NodeId,
    parent_sig: &ParsedSig,
    args: &TypeSyntaxArgs,
) -> TypeId {
    let _ = parent_sig;
    get_result_type_with_params(gs, arena, expr, &FxHashMap::default(), args)
}

fn get_result_type_with_params(
    gs: &GlobalState,
    arena: &AstArena,
    expr: NodeId,
    type_args: &FxHashMap<NameId, SymbolId>,
    args: &TypeSyntaxArgs,
) -> TypeId {
    let loc = arena.loc(expr);
    match arena.kind(expr) {
        NodeKind::Constant { symbol, .. } => {
            constant_result_type(gs, *symbol, loc, args)
        }
        NodeKind::Send {
            recv,
            fun,
            args: send_args,
            ..
        } => {
            if arena.constant_symbol(*recv) != reserved::T {
                if let Some(mut e) = gs.begin_error(loc, errors::INVALID_TYPE_DECLARATION) {
                    e.set_header("Unsupported expression in type position");
                }
                return TypeId::UNTYPED;
            }
            let fun = *fun;
            let send_args = send_args.clone();
            t_helper_result_type(gs, arena, fun, &send_args, loc, type_args, args)
        }
        NodeKind::Literal(lit) => literal_result_type(gs, *lit),
        _ => {
            if let Some(mut e) = gs.begin_error(loc, errors::INVALID_TYPE_DECLARATION) {
                e.set_header("Unsupported expression in type position");
            }
            TypeId::UNTYPED
        }
    }
}

fn constant_result_type(
    gs: &GlobalState,
    symbol: SymbolId,
    loc: Loc,
    args: &TypeSyntaxArgs,
) -> TypeId {
    if !symbol.exists() || symbol == reserved::UNTYPED {
        return TypeId::UNTYPED;
    }
    let Some(sym) = gs.symbols.get(symbol) else {
        return TypeId::UNTYPED;
    };
    if sym.is_type_alias() {
        return sym.result_type.unwrap_or(TypeId::UNTYPED);
    }
    if matches!(
        sym.kind,
        rbz_core::SymbolKind::TypeMember | rbz_core::SymbolKind::TypeArgument
    ) {
        if !args.allow_type_member {
            if let Some(mut e) = gs.begin_error(loc, errors::INVALID_TYPE_DECLARATION) {
                let shown = gs.symbols.show(&gs.names, symbol);
                e.set_header(format!("Type member `{shown}` is not permitted here"));
            }
            return TypeId::UNTYPED;
        }
        return gs.types.intern(TypeKey::TypeVar(symbol));
    }
    let dealiased = gs.symbols.dealias(&gs.types, symbol);
    if gs.symbols.get(dealiased).is_some_and(|s| s.is_class()) {
        gs.types.class_instance(dealiased)
    } else {
        TypeId::UNTYPED
    }
}

fn t_helper_result_type(
    gs: &GlobalState,
    arena: &AstArena,
    fun: NameId,
    send_args: &[NodeId],
    loc: Loc,
    type_args: &FxHashMap<NameId, SymbolId>,
    args: &TypeSyntaxArgs,
) -> TypeId {
    match fun {
        well_known::UNTYPED => TypeId::UNTYPED,
        well_known::NILABLE => {
            let Some(&inner) = send_args.first() else {
                return TypeId::UNTYPED;
            };
            let inner = get_result_type_with_params(gs, arena, inner, type_args, args);
            gs.types.nilable(inner)
        }
        well_known::ANY | well_known::ALL => {
            let mut tys = send_args
                .iter()
                .map(|&a| get_result_type_with_params(gs, arena, a, type_args, args));
            let Some(first) = tys.next() else {
                return TypeId::UNTYPED;
            };
            tys.fold(first, |acc, ty| {
                let key = if fun == well_known::ANY {
                    TypeKey::Or(acc, ty)
                } else {
                    TypeKey::And(acc, ty)
                };
                gs.types.intern(key)
            })
        }
        well_known::SELF_TYPE => {
            if args.allow_self_type {
                TypeId::SELF_TYPE
            } else {
                if let Some(mut e) = gs.begin_error(loc, errors::INVALID_TYPE_DECLARATION) {
                    e.set_header("Only top-level T.self_type is supported");
                }
                TypeId::UNTYPED
            }
        }
        well_known::TYPE_PARAMETER => {
            let name = send_args.first().and_then(|&a| match arena.kind(a) {
                NodeKind::Literal(Literal::Sym(name)) => Some(*name),
                _ => None,
            });
            match name.and_then(|n| type_args.get(&n).copied()) {
                Some(sym) => gs.types.intern(TypeKey::TypeVar(sym)),
                None => {
                    if let Some(mut e) =
                        gs.begin_error(loc, errors::INVALID_TYPE_DECLARATION)
                    {
                        e.set_header(
                            "Unknown type parameter; declare it with `type_parameters`",
                        );
                    }
                    TypeId::UNTYPED
                }
            }
        }
        _ => {
            if let Some(mut e) = gs.begin_error(loc, errors::INVALID_TYPE_DECLARATION) {
                let shown = gs.names.resolve(fun);
                e.set_header(format!("Unsupported type syntax `T.{shown}`"));
            }
            TypeId::UNTYPED
        }
    }
}

pub(crate) fn literal_result_type(gs: &GlobalState, lit: Literal) -> TypeId {
    match lit {
        Literal::Int(v) => gs.types.intern(TypeKey::LiteralInt(v)),
        Literal::Str(s) => gs.types.intern(TypeKey::LiteralStr(s)),
        Literal::Sym(s) => gs.types.intern(TypeKey::LiteralSym(s)),
        Literal::Bool(b) => gs.types.intern(TypeKey::LiteralBool(b)),
        Literal::Nil => TypeId::NIL,
    }
}

/// `parse_sig` variant used when a sig has no method definition to attach
/// to: parse purely for the errors it forces.
pub fn parse_sig_for_errors(gs: &GlobalState, arena: &AstArena, sig_send: NodeId) {
    let _ = parse_sig(
        gs,
        arena,
        sig_send,
        &FxHashMap::default(),
        &TypeSyntaxArgs {
            allow_self_type: true,
            allow_rebind: false,
            allow_type_member: true,
            owner: reserved::UNTYPED,
        },
    );
}

/// The sig-aware entry point used during method elaboration.
pub fn parse_sig_with_type_args(
    gs: &GlobalState,
    arena: &AstArena,
    sig_send: NodeId,
    type_args: &FxHashMap<NameId, SymbolId>,
    owner: SymbolId,
) -> ParsedSig {
    parse_sig(
        gs,
        arena,
        sig_send,
        type_args,
        &TypeSyntaxArgs {
            allow_self_type: true,
            allow_rebind: false,
            allow_type_member: true,
            owner,
        },
    )
}
