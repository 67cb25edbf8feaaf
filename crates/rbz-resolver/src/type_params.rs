//! Type-member bounds resolution.
//!
//! For each `Name = type_member(...)` declaration, fill in the member's
//! `(lower, upper)` bounds from the declaration hash and validate them
//! against the same-named member on the parent class.

use crate::errors;
use crate::type_syntax::{self, ParsedSig, TypeSyntaxArgs};
use rbz_ast::{AstArena, Literal, NodeId, NodeKind, ParsedFile};
use rbz_common::Loc;
use rbz_core::{GlobalState, SymbolId, TypeId, symbols::reserved, well_known};

pub fn resolve_type_params(gs: &mut GlobalState, trees: &mut [ParsedFile]) {
    for tree in trees.iter_mut() {
        tracing::debug!(file = tree.file.0, "resolve_type_params");
        visit(gs, &tree.arena, tree.root);
    }
}

fn visit(gs: &mut GlobalState, arena: &AstArena, id: NodeId) {
    match arena.kind(id) {
        NodeKind::ClassDef { body, .. } => {
            let body = body.clone();
            for stat in body {
                visit(gs, arena, stat);
            }
        }
        NodeKind::InsSeq { stats, expr } => {
            let children: Vec<NodeId> = stats.iter().copied().chain([*expr]).collect();
            for child in children {
                visit(gs, arena, child);
            }
        }
        NodeKind::Assign { lhs, rhs } => {
            let (lhs, rhs) = (*lhs, *rhs);
            post_transform_assign(gs, arena, lhs, rhs);
        }
        _ => {}
    }
}

fn post_transform_assign(gs: &mut GlobalState, arena: &AstArena, lhs: NodeId, rhs: NodeId) {
    let sym = arena.constant_symbol(lhs);
    if !sym.exists() {
        return;
    }
    let Some(data) = gs.symbols.get(sym) else {
        return;
    };
    if data.is_type_alias() || !data.is_type_member() {
        return;
    }

    let NodeKind::Send { fun, args, .. } = arena.kind(rhs) else {
        return;
    };
    debug_assert!(
        *fun == well_known::TYPE_MEMBER || *fun == well_known::TYPE_TEMPLATE,
        "namer only marks type members declared via type_member/type_template"
    );
    let send_args = args.clone();
    let send_loc = arena.loc(rhs);

    // The namer leaves both bounds untyped; an unannotated member spans
    // the whole lattice.
    let mut lower = TypeId::BOTTOM;
    let mut upper = TypeId::TOP;

    let owner = gs.symbols.get(sym).map_or(SymbolId::NONE, |s| s.owner);
    let member_name = gs.symbols.get(sym).map_or(rbz_core::NameId::NONE, |s| s.name);
    let parent_class = gs.symbols.get(owner).map_or(SymbolId::NONE, |s| s.superclass);
    let mut parent_bounds: Option<(TypeId, TypeId)> = None;
    if parent_class.exists()
        && parent_class != reserved::TODO
        && let Some(parent_member) = gs.symbols.find_member(parent_class, member_name)
    {
        let parent_data = gs.symbols.get(parent_member);
        if parent_data.is_some_and(|s| s.is_type_member()) {
            // An unprocessed parent still reads as untyped bounds, which
            // subtyping treats as compatible either way.
            parent_bounds = Some(
                parent_data
                    .and_then(|s| s.bounds)
                    .unwrap_or((TypeId::UNTYPED, TypeId::UNTYPED)),
            );
        } else if let Some(mut e) =
            gs.begin_error(send_loc, errors::PARENT_TYPE_BOUNDS_MISMATCH)
        {
            let child_shown = gs.symbols.show(&gs.names, sym);
            let parent_shown = gs.symbols.show(&gs.names, parent_member);
            e.set_header(format!(
                "`{child_shown}` is a type member but `{parent_shown}` is not a type member"
            ));
            let parent_loc = gs.symbols.get(parent_member).map_or(Loc::none(), |s| s.loc);
            e.add_error_line(parent_loc, format!("`{parent_shown}` definition"));
        }
    }

    // Bounds come from the optional trailing hash: a variance symbol may
    // precede it.
    let hash = send_args
        .iter()
        .rev()
        .find(|&&arg| matches!(arena.kind(arg), NodeKind::Hash { .. }))
        .copied();
    if let Some(hash) = hash
        && let NodeKind::Hash { keys, values } = arena.kind(hash)
    {
        let pairs: Vec<(NodeId, NodeId)> =
            keys.iter().copied().zip(values.iter().copied()).collect();
        for (key, value) in pairs {
            let NodeKind::Literal(Literal::Sym(key_name)) = arena.kind(key) else {
                continue;
            };
            let key_name = *key_name;
            let ty = type_syntax::get_result_type(
                gs,
                arena,
                value,
                &ParsedSig::default(),
                &TypeSyntaxArgs {
                    allow_self_type: true,
                    allow_rebind: false,
                    allow_type_member: false,
                    owner: sym,
                },
            );
            match key_name {
                well_known::FIXED => {
                    lower = ty;
                    upper = ty;
                }
                well_known::LOWER => lower = ty,
                well_known::UPPER => upper = ty,
                _ => {}
            }
        }
    }

    if let Some((parent_lower, parent_upper)) = parent_bounds {
        if !gs.types.is_subtype(&gs.symbols, parent_lower, lower)
            && let Some(mut e) = gs.begin_error(send_loc, errors::PARENT_TYPE_BOUNDS_MISMATCH)
        {
            let parent_shown = gs.types.show(&gs.symbols, &gs.names, parent_lower);
            let child_shown = gs.types.show(&gs.symbols, &gs.names, lower);
            e.set_header(format!(
                "parent lower bound `{parent_shown}` is not a subtype of lower bound `{child_shown}`"
            ));
        }
        if !gs.types.is_subtype(&gs.symbols, upper, parent_upper)
            && let Some(mut e) = gs.begin_error(send_loc, errors::PARENT_TYPE_BOUNDS_MISMATCH)
        {
            let child_shown = gs.types.show(&gs.symbols, &gs.names, upper);
            let parent_shown = gs.types.show(&gs.symbols, &gs.names, parent_upper);
            e.set_header(format!(
                "upper bound `{child_shown}` is not a subtype of parent upper bound `{parent_shown}`"
            ));
        }
    }

    // A no-op for `fixed`, where both bounds are the same type.
    if !gs.types.is_subtype(&gs.symbols, lower, upper)
        && let Some(mut e) = gs.begin_error(send_loc, errors::INVALID_TYPE_MEMBER_BOUNDS)
    {
        let lower_shown = gs.types.show(&gs.symbols, &gs.names, lower);
        let upper_shown = gs.types.show(&gs.symbols, &gs.names, upper);
        e.set_header(format!("`{lower_shown}` is not a subtype of `{upper_shown}`"));
    }

    if let Some(member) = gs.symbols.get_mut(sym) {
        member.bounds = Some((lower, upper));
    }
}
