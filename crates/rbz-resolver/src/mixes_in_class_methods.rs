//! `mixes_in_class_methods` resolution.
//!
//! A module may declare that, when included into a class, a companion
//! module's instance methods become class methods. The target is recorded
//! under the module's reserved class-methods member slot; the annotation
//! send itself is deleted from the tree.

use crate::errors;
use rbz_ast::{AstArena, NodeId, NodeKind, ParsedFile};
use rbz_core::{GlobalState, SymbolId, symbols::reserved, well_known};

pub fn resolve_mixes_in_class_methods(gs: &mut GlobalState, trees: &mut [ParsedFile]) {
    for tree in trees.iter_mut() {
        tracing::debug!(file = tree.file.0, "resolve_mixes_in_class_methods");
        let root = tree.root;
        visit(gs, &mut tree.arena, root, reserved::ROOT);
    }
}

fn visit(gs: &mut GlobalState, arena: &mut AstArena, id: NodeId, owner: SymbolId) {
    match arena.kind(id) {
        NodeKind::ClassDef { symbol, body, .. } => {
            let class_owner = *symbol;
            let body = body.clone();
            for stat in body {
                visit(gs, arena, stat, class_owner);
            }
        }
        NodeKind::MethodDef { symbol, body, .. } => {
            let method = *symbol;
            let body = *body;
            visit(gs, arena, body, method);
        }
        NodeKind::InsSeq { stats, expr } => {
            let children: Vec<NodeId> = stats.iter().copied().chain([*expr]).collect();
            for child in children {
                visit(gs, arena, child, owner);
            }
        }
        NodeKind::Assign { lhs, rhs } => {
            let (lhs, rhs) = (*lhs, *rhs);
            visit(gs, arena, lhs, owner);
            visit(gs, arena, rhs, owner);
        }
        NodeKind::Send { recv, fun, .. } => {
            let is_mixes = arena.is_self_ref(*recv) && *fun == well_known::MIXES_IN_CLASS_METHODS;
            if is_mixes {
                process_mixes_in_class_methods(gs, arena, id, owner);
                arena.replace(id, NodeKind::EmptyTree);
                return;
            }
            let NodeKind::Send {
                recv, args, block, ..
            } = arena.kind(id)
            else {
                return;
            };
            let children: Vec<NodeId> = [*recv]
                .into_iter()
                .chain(args.iter().copied())
                .chain([*block])
                .collect();
            for child in children {
                visit(gs, arena, child, owner);
            }
        }
        NodeKind::Cast { expr, .. } => {
            let expr = *expr;
            visit(gs, arena, expr, owner);
        }
        _ => {}
    }
}

fn process_mixes_in_class_methods(
    gs: &mut GlobalState,
    arena: &AstArena,
    send: NodeId,
    owner: SymbolId,
) {
    let loc = arena.loc(send);
    let owner_is_module = gs.symbols.get(owner).is_some_and(|s| s.is_module());
    if !owner_is_module {
        if let Some(mut e) = gs.begin_error(loc, errors::INVALID_MIXIN_DECLARATION) {
            e.set_header(
                "`mixes_in_class_methods` can only be declared inside a module, not a class",
            );
        }
        // Keep processing anyway.
    }

    let NodeKind::Send { args, .. } = arena.kind(send) else {
        return;
    };
    if args.len() != 1 {
        if let Some(mut e) = gs.begin_error(loc, errors::INVALID_MIXIN_DECLARATION) {
            e.set_header(format!(
                "Wrong number of arguments to `mixes_in_class_methods`: Expected: `1`, got: `{}`",
                args.len()
            ));
        }
        return;
    }

    let target = arena.constant_symbol(args[0]);
    if !target.exists() || !gs.symbols.get(target).is_some_and(|s| s.is_class()) {
        if let Some(mut e) = gs.begin_error(loc, errors::INVALID_MIXIN_DECLARATION) {
            e.set_header("Argument to `mixes_in_class_methods` must be statically resolvable to a module");
        }
        return;
    }
    if !gs.symbols.get(target).is_some_and(|s| s.is_module()) {
        if let Some(mut e) = gs.begin_error(loc, errors::INVALID_MIXIN_DECLARATION) {
            let shown = gs.symbols.show(&gs.names, target);
            e.set_header(format!(
                "`{shown}` is a class, not a module; Only modules may be mixins"
            ));
        }
        return;
    }
    if target == owner {
        if let Some(mut e) = gs.begin_error(loc, errors::INVALID_MIXIN_DECLARATION) {
            e.set_header("Must not pass your self to `mixes_in_class_methods`");
        }
        return;
    }

    let existing = gs.symbols.find_member(owner, well_known::CLASS_METHODS);
    if let Some(existing) = existing
        && existing != target
    {
        if let Some(mut e) = gs.begin_error(loc, errors::INVALID_MIXIN_DECLARATION) {
            let old_shown = gs.symbols.show(&gs.names, existing);
            let new_shown = gs.symbols.show(&gs.names, target);
            e.set_header(format!(
                "Redeclaring `mixes_in_class_methods` from module `{old_shown}` to module `{new_shown}`"
            ));
        }
        return;
    }

    if let Some(owner_sym) = gs.symbols.get_mut(owner) {
        owner_sym.members.insert(well_known::CLASS_METHODS, target);
    }
}
