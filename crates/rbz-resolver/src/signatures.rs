//! Signature elaboration.
//!
//! `sig { ... }` calls preceding a method definition are buffered per
//! statement sequence and applied when the `MethodDef` arrives. This walk
//! also types instance/class-variable declarations, rewrites `T.let` /
//! `T.cast` / `T.assert_type!` into `Cast` nodes, elaborates
//! `alias_method`, and derives types for static-field assignments.

use crate::errors;
use crate::type_syntax::{self, ParsedSig, TypeSyntaxArgs};
use rbz_ast::{AstArena, CastKind, IdentKind, Literal, NodeId, NodeKind, ParsedFile, mk};
use rbz_common::{FileId, Loc, StrictLevel};
use rbz_core::{
    GlobalState, NameId, SymbolId, TypeId, UniqueNameKind, symbol_flags, symbols::reserved,
    well_known,
};
use rustc_hash::FxHashMap;

pub fn resolve_signatures(gs: &mut GlobalState, trees: &mut [ParsedFile]) {
    for tree in trees.iter_mut() {
        tracing::debug!(file = tree.file.0, "resolve_signatures");
        let mut walker = SignaturesWalker { gs, file: tree.file };
        let root = tree.root;
        walker.visit(&mut tree.arena, root, reserved::ROOT);
    }
}

struct SignaturesWalker<'gs> {
    gs: &'gs mut GlobalState,
    file: FileId,
}

impl SignaturesWalker<'_> {
    fn visit(&mut self, arena: &mut AstArena, id: NodeId, owner: SymbolId) {
        match arena.kind(id) {
            NodeKind::ClassDef { symbol, .. } => {
                let class_owner = *symbol;
                self.process_class_body(arena, id, class_owner);
            }
            NodeKind::MethodDef { symbol, args, body, .. } => {
                let method = *symbol;
                let children: Vec<NodeId> = args.iter().copied().chain([*body]).collect();
                for child in children {
                    self.visit(arena, child, method);
                }
            }
            NodeKind::InsSeq { .. } => {
                self.process_ins_seq(arena, id, owner);
            }
            NodeKind::Send { .. } => {
                self.visit_send_children(arena, id, owner);
                self.post_transform_send(arena, id, owner);
            }
            NodeKind::Assign { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.visit(arena, lhs, owner);
                self.visit(arena, rhs, owner);
                self.post_transform_assign(arena, id, owner);
            }
            NodeKind::Arg { default, .. } => {
                let default = *default;
                self.visit(arena, default, owner);
            }
            NodeKind::Cast { expr, .. } => {
                let expr = *expr;
                self.visit(arena, expr, owner);
            }
            NodeKind::Hash { keys, values } => {
                let children: Vec<NodeId> = keys.iter().chain(values.iter()).copied().collect();
                for child in children {
                    self.visit(arena, child, owner);
                }
            }
            NodeKind::EmptyTree
            | NodeKind::SelfRef
            | NodeKind::Literal(_)
            | NodeKind::Ident { .. }
            | NodeKind::Constant { .. }
            | NodeKind::UnresolvedConstant { .. } => {}
        }
    }

    fn visit_send_children(&mut self, arena: &mut AstArena, id: NodeId, owner: SymbolId) {
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
            self.visit(arena, child, owner);
        }
    }

    // =========================================================================
    // Statement sequences and sig buffering
    // =========================================================================

    fn process_class_body(&mut self, arena: &mut AstArena, class_id: NodeId, owner: SymbolId) {
        let NodeKind::ClassDef { body, .. } = arena.kind_mut(class_id) else {
            return;
        };
        let mut stats = std::mem::take(body);
        self.process_seq(arena, &mut stats, owner, owner);
        if let NodeKind::ClassDef { body, .. } = arena.kind_mut(class_id) {
            *body = stats;
        }
    }

    fn process_ins_seq(&mut self, arena: &mut AstArena, seq_id: NodeId, owner: SymbolId) {
        let NodeKind::InsSeq { stats, expr } = arena.kind_mut(seq_id) else {
            return;
        };
        let expr = *expr;
        let mut stats = std::mem::take(stats);
        // Statements in a sequence are checked in the context of the
        // class, not the enclosing method.
        let stmt_owner = self.gs.symbols.enclosing_class(owner);
        let mut last_sigs: Vec<NodeId> = Vec::new();
        for &stat in stats.iter() {
            self.visit(arena, stat, owner);
            self.process_statement(arena, stat, stmt_owner, &mut last_sigs);
        }
        self.visit(arena, expr, owner);
        if !arena.is_empty_tree(expr) {
            self.process_statement(arena, expr, stmt_owner, &mut last_sigs);
        }
        self.process_leftover_sigs(arena, &mut last_sigs);
        stats.retain(|&stat| !arena.is_empty_tree(stat));
        if let NodeKind::InsSeq { stats: slot, .. } = arena.kind_mut(seq_id) {
            *slot = stats;
        }
    }

    fn process_seq(
        &mut self,
        arena: &mut AstArena,
        stats: &mut Vec<NodeId>,
        visit_owner: SymbolId,
        stmt_owner: SymbolId,
    ) {
        let mut last_sigs: Vec<NodeId> = Vec::new();
        for &stat in stats.iter() {
            self.visit(arena, stat, visit_owner);
            self.process_statement(arena, stat, stmt_owner, &mut last_sigs);
        }
        self.process_leftover_sigs(arena, &mut last_sigs);
        stats.retain(|&stat| !arena.is_empty_tree(stat));
    }

    fn process_statement(
        &mut self,
        arena: &mut AstArena,
        stat: NodeId,
        owner: SymbolId,
        last_sigs: &mut Vec<NodeId>,
    ) {
        match arena.kind(stat) {
            NodeKind::Send { .. } if type_syntax::is_sig(arena, stat) => {
                if !last_sigs.is_empty() && !self.gs.files.permits_overloads(self.file) {
                    let first_loc = arena.loc(last_sigs[0]);
                    let this_loc = arena.loc(stat);
                    if let Some(mut e) =
                        self.gs.begin_error(first_loc, errors::OVERLOAD_NOT_ALLOWED)
                    {
                        e.set_header("Unused type annotation. No method def before next annotation");
                        e.add_error_line(this_loc, "Type annotation that will be used instead");
                    }
                }
                last_sigs.push(stat);
            }
            NodeKind::MethodDef { .. } => {
                self.process_method_def(arena, stat, owner, last_sigs);
            }
            _ => {}
        }
    }

    /// Force errors from sigs that never found a method definition.
    fn process_leftover_sigs(&mut self, arena: &AstArena, last_sigs: &mut Vec<NodeId>) {
        if last_sigs.is_empty() {
            return;
        }
        for &sig_send in last_sigs.iter() {
            type_syntax::parse_sig_for_errors(self.gs, arena, sig_send);
        }
        let loc = arena.loc(last_sigs[0]);
        if let Some(mut e) = self.gs.begin_error(loc, errors::INVALID_METHOD_SIGNATURE) {
            e.set_header("Malformed `sig`. No method def following it");
        }
        last_sigs.clear();
    }

    // =========================================================================
    // Method elaboration
    // =========================================================================

    fn process_method_def(
        &mut self,
        arena: &mut AstArena,
        stat: NodeId,
        owner: SymbolId,
        last_sigs: &mut Vec<NodeId>,
    ) {
        let NodeKind::MethodDef {
            symbol,
            is_self_method,
            args,
            body,
            ..
        } = arena.kind(stat)
        else {
            return;
        };
        let method = *symbol;
        let is_self_method = *is_self_method;
        let mdef_args = args.clone();
        let body = *body;

        if !last_sigs.is_empty() {
            let first_loc = arena.loc(last_sigs[0]);
            if self.gs.files.original_sigil(self.file).is_none() {
                if let Some(mut e) =
                    self.gs.begin_error(first_loc, errors::SIG_IN_FILE_WITHOUT_SIGIL)
                {
                    e.set_header(
                        "To use `sig`, this file must declare an explicit `# typed:` sigil. \
                         If you're not sure which one to use, start with `# typed: false`",
                    );
                }
            }

            let is_overloaded =
                last_sigs.len() > 1 && self.gs.files.permits_overloads(self.file);
            let original_name = self
                .gs
                .symbols
                .get(method)
                .map_or(NameId::NONE, |s| s.name);
            if is_overloaded {
                self.gs.symbols.mangle_rename_symbol(&mut self.gs.names, method);
            }

            // Sigs on a self-method describe the singleton class's method.
            let sig_owner = if is_self_method {
                self.gs.symbols.singleton_class(&mut self.gs.names, owner)
            } else {
                owner
            };

            let sig_count = last_sigs.len();
            for (i, &sig_send) in last_sigs.iter().enumerate() {
                let sig_loc = arena.loc(sig_send);
                let type_args = self.enter_sig_type_args(arena, sig_send, method);
                let sig = type_syntax::parse_sig_with_type_args(
                    self.gs, arena, sig_send, &type_args, sig_owner,
                );

                let overload_sym = if is_overloaded {
                    let args_to_keep: Vec<usize> = mdef_args
                        .iter()
                        .enumerate()
                        .filter(|&(_, &arg_node)| match arena.kind(arg_node) {
                            NodeKind::Arg { name, .. } => {
                                sig.arg_types.iter().any(|spec| spec.name == *name)
                            }
                            _ => false,
                        })
                        .map(|(pos, _)| pos)
                        .collect();
                    let is_last = i == sig_count - 1;
                    let overload = self.gs.symbols.enter_new_method_overload(
                        &mut self.gs.names,
                        sig_loc,
                        method,
                        original_name,
                        (i + 1) as u32,
                        &args_to_keep,
                        is_last,
                    );
                    if !is_last && let Some(sym) = self.gs.symbols.get_mut(overload) {
                        sym.flags |= symbol_flags::METHOD_OVERLOADED;
                    }
                    overload
                } else {
                    method
                };

                self.fill_in_info_from_sig(overload_sym, sig_loc, sig, is_overloaded);
            }

            if !is_overloaded {
                self.inject_optional_args(arena, stat, method, &mdef_args);
            }

            last_sigs.clear();
        }

        let method_flags = self.gs.symbols.get(method).map_or(0, |s| s.flags);
        if method_flags & symbol_flags::METHOD_ABSTRACT != 0 {
            if !arena.is_empty_tree(body) {
                let body_loc = arena.loc(body);
                if let Some(mut e) =
                    self.gs.begin_error(body_loc, errors::ABSTRACT_METHOD_WITH_BODY)
                {
                    e.set_header("Abstract methods must not contain any code in their body");
                    e.replace_with("Delete the body", body_loc, "");
                }
                let empty = mk::empty(arena, body_loc);
                if let NodeKind::MethodDef { body, .. } = arena.kind_mut(stat) {
                    *body = empty;
                }
            }
            let method_owner = self
                .gs
                .symbols
                .get(method)
                .map_or(SymbolId::NONE, |s| s.owner);
            let enclosing = self.gs.symbols.enclosing_class(method_owner);
            let enclosing_abstract = self
                .gs
                .symbols
                .get(enclosing)
                .is_some_and(|s| s.flags & symbol_flags::CLASS_ABSTRACT != 0);
            if !enclosing_abstract
                && let Some(mut e) = self
                    .gs
                    .begin_error(arena.loc(stat), errors::ABSTRACT_METHOD_OUTSIDE_ABSTRACT)
            {
                e.set_header(
                    "Before declaring an abstract method, you must mark your class/module \
                     as abstract using `abstract!` or `interface!`",
                );
            }
        } else {
            let method_owner = self
                .gs
                .symbols
                .get(method)
                .map_or(SymbolId::NONE, |s| s.owner);
            let enclosing = self.gs.symbols.enclosing_class(method_owner);
            let in_interface = self
                .gs
                .symbols
                .get(enclosing)
                .is_some_and(|s| s.flags & symbol_flags::CLASS_INTERFACE != 0);
            if in_interface
                && let Some(mut e) = self
                    .gs
                    .begin_error(arena.loc(stat), errors::CONCRETE_METHOD_IN_INTERFACE)
            {
                e.set_header("All methods in an interface must be declared abstract");
            }
        }
    }

    /// Enter fresh covariant type arguments for a sig's `type_parameters`
    /// declarations, keyed by their source name.
    fn enter_sig_type_args(
        &mut self,
        arena: &AstArena,
        sig_send: NodeId,
        method: SymbolId,
    ) -> FxHashMap<NameId, SymbolId> {
        let declared = type_syntax::collect_type_param_names(arena, sig_send);
        let mut map = FxHashMap::default();
        if declared.is_empty() {
            return map;
        }
        if let Some(sym) = self.gs.symbols.get_mut(method) {
            sym.flags |= symbol_flags::METHOD_GENERIC;
        }
        for (i, (name, loc)) in declared.into_iter().enumerate() {
            let fresh =
                self.gs
                    .names
                    .fresh_unique(UniqueNameKind::TypeVar, name, (i + 1) as u32);
            let type_arg = self.gs.symbols.enter_type_argument(loc, method, fresh);
            let ty = self.gs.types.intern(rbz_core::TypeKey::TypeVar(type_arg));
            if let Some(sym) = self.gs.symbols.get_mut(type_arg) {
                sym.result_type = Some(ty);
            }
            map.insert(name, type_arg);
        }
        map
    }

    fn fill_in_info_from_sig(
        &mut self,
        method: SymbolId,
        expr_loc: Loc,
        sig: ParsedSig,
        is_overloaded: bool,
    ) {
        if !sig.seen.returns && !sig.seen.void {
            if let Some(mut e) = self.gs.begin_error(expr_loc, errors::INVALID_METHOD_SIGNATURE)
            {
                e.set_header(
                    "Malformed `sig`: No return type specified. Specify one with .returns()",
                );
            }
        }
        if sig.seen.returns && sig.seen.void {
            if let Some(mut e) = self.gs.begin_error(expr_loc, errors::INVALID_METHOD_SIGNATURE)
            {
                e.set_header("Malformed `sig`: Don't use both .returns() and .void");
            }
        }

        let result_type = match sig.returns {
            Some(ty) => ty,
            None if sig.seen.void => TypeId::VOID,
            None => TypeId::UNTYPED,
        };

        {
            let Some(sym) = self.gs.symbols.get_mut(method) else {
                return;
            };
            if sig.seen.abstract_ {
                sym.flags |= symbol_flags::METHOD_ABSTRACT;
            }
            if sig.seen.override_ {
                sym.flags |= symbol_flags::METHOD_OVERRIDE;
            }
            if sig.seen.overridable {
                sym.flags |= symbol_flags::METHOD_OVERRIDABLE;
            }
            if sig.seen.final_ {
                sym.flags |= symbol_flags::METHOD_FINAL;
            }
            if sig.seen.incompatible_override {
                sym.flags |= symbol_flags::METHOD_INCOMPATIBLE_OVERRIDE;
            }
            if sig.seen.generated {
                sym.flags |= symbol_flags::METHOD_GENERATED_SIG;
            } else {
                // May carry over from a previous elaboration of this
                // symbol; make sure we reflect the sig actually present.
                sym.flags &= !symbol_flags::METHOD_GENERATED_SIG;
            }
            if sig.seen.bind {
                sym.rebind = sig.bind;
            }
            sym.result_type = Some(result_type);
        }

        let mut arguments = match self.gs.symbols.get_mut(method) {
            Some(sym) => std::mem::take(&mut sym.arguments),
            None => return,
        };
        let mut remaining = sig.arg_types;
        let mut seen_optional = false;

        for arg in arguments.iter_mut() {
            let is_kwd = arg.flags.keyword;
            let is_req = !arg.flags.block && !arg.flags.repeated && !arg.flags.default;
            if is_kwd && !is_req {
                seen_optional = true;
            } else if is_kwd && seen_optional && is_req {
                if let Some(mut e) =
                    self.gs.begin_error(arg.loc, errors::BAD_PARAMETER_ORDERING)
                {
                    let shown = self.gs.names.resolve(arg.name);
                    e.set_header(format!(
                        "Malformed `sig`. Required parameter `{shown}` must be declared before all the optional ones"
                    ));
                    e.add_error_line(expr_loc, "Signature");
                }
            }

            if let Some(pos) = remaining.iter().position(|spec| spec.name == arg.name) {
                let spec = remaining.remove(pos);
                arg.ty = spec.ty;
                arg.loc = spec.loc;
                arg.rebind = spec.rebind;
            } else if !arg.ty.exists() {
                arg.ty = TypeId::UNTYPED;
                // The synthesized block argument is exempt from the
                // missing-type complaint.
                let is_blk = arg.name == well_known::BLK_ARG;
                if !is_overloaded
                    && !is_blk
                    && (sig.seen.params || sig.seen.returns || sig.seen.void)
                    && let Some(mut e) =
                        self.gs.begin_error(arg.loc, errors::INVALID_METHOD_SIGNATURE)
                {
                    let shown = self.gs.names.resolve(arg.name);
                    e.set_header(format!(
                        "Malformed `sig`. Type not specified for argument `{shown}`"
                    ));
                    e.add_error_line(expr_loc, "Signature");
                }
            }

            if is_overloaded
                && is_kwd
                && let Some(mut e) =
                    self.gs.begin_error(arg.loc, errors::INVALID_METHOD_SIGNATURE)
            {
                let shown = self.gs.names.resolve(arg.name);
                e.set_header(format!(
                    "Malformed `sig`. Overloaded functions cannot have keyword arguments: `{shown}`"
                ));
            }
        }

        for spec in remaining {
            if let Some(mut e) = self.gs.begin_error(spec.loc, errors::INVALID_METHOD_SIGNATURE)
            {
                let shown = self.gs.names.resolve(spec.name);
                e.set_header(format!("Unknown argument name `{shown}`"));
            }
        }

        if let Some(sym) = self.gs.symbols.get_mut(method) {
            sym.arguments = arguments;
        }
    }

    /// Synthesize `T.let(<default>, <arg type>)` at the head of the body
    /// for every argument with a default, so later passes check default
    /// values against the declared types.
    fn inject_optional_args(
        &mut self,
        arena: &mut AstArena,
        mdef: NodeId,
        method: SymbolId,
        mdef_args: &[NodeId],
    ) {
        let Some(sym) = self.gs.symbols.get(method) else {
            return;
        };
        if sym.flags & symbol_flags::METHOD_ABSTRACT != 0 {
            return;
        }
        let arg_types: Vec<TypeId> = sym.arguments.iter().map(|a| a.ty).collect();

        let mut lets = Vec::new();
        for (i, &arg_node) in mdef_args.iter().enumerate() {
            let NodeKind::Arg { default, .. } = arena.kind(arg_node) else {
                continue;
            };
            let default = *default;
            if arena.is_empty_tree(default) {
                continue;
            }
            let ty = arg_types
                .get(i)
                .copied()
                .filter(TypeId::exists)
                .unwrap_or(TypeId::UNTYPED);
            // Point at the arg list so errors land on the declaration,
            // not the synthesized body statement.
            let loc = arena.loc(arg_node);
            let copy = arena.deep_copy(default);
            lets.push(mk::cast(arena, loc, CastKind::Let, ty, copy));
        }

        if lets.is_empty() {
            return;
        }
        let NodeKind::MethodDef { body, .. } = arena.kind(mdef) else {
            return;
        };
        let body = *body;
        let body_loc = arena.loc(body);
        let new_body = mk::ins_seq(arena, body_loc, lets, body);
        if let NodeKind::MethodDef { body, .. } = arena.kind_mut(mdef) {
            *body = new_body;
        }
    }

    // =========================================================================
    // Sends: casts, reveal_type, alias_method
    // =========================================================================

    fn post_transform_send(&mut self, arena: &mut AstArena, id: NodeId, owner: SymbolId) {
        let NodeKind::Send { recv, fun, args, .. } = arena.kind(id) else {
            return;
        };
        let (recv, fun) = (*recv, *fun);
        let args = args.clone();

        if arena.constant_symbol(recv) == reserved::T {
            match fun {
                well_known::LET | well_known::CAST | well_known::ASSERT_TYPE => {
                    if args.len() < 2 {
                        return;
                    }
                    let cast_kind = match fun {
                        well_known::LET => CastKind::Let,
                        well_known::CAST => CastKind::Cast,
                        _ => CastKind::AssertType,
                    };
                    let ty = type_syntax::get_result_type(
                        self.gs,
                        arena,
                        args[1],
                        &ParsedSig::default(),
                        &TypeSyntaxArgs {
                            allow_self_type: true,
                            allow_rebind: false,
                            allow_type_member: true,
                            owner: SymbolId::NONE,
                        },
                    );
                    arena.replace(
                        id,
                        NodeKind::Cast {
                            kind: cast_kind,
                            ty,
                            expr: args[0],
                        },
                    );
                }
                well_known::REVEAL_TYPE => {
                    // Only an error in untyped files; the annotation stays
                    // in the tree either way.
                    if self.gs.files.strict_level(self.file) <= StrictLevel::False
                        && let Some(mut e) = self
                            .gs
                            .begin_error(arena.loc(id), errors::REVEAL_TYPE_IN_UNTYPED_FILE)
                    {
                        e.set_header(
                            "`T.reveal_type` can only reveal types in `# typed: true` files (or higher)",
                        );
                    }
                }
                _ => {}
            }
        } else if arena.is_self_ref(recv) && fun == well_known::ALIAS_METHOD {
            self.process_alias_method(arena, id, owner, &args);
        }
    }

    fn process_alias_method(
        &mut self,
        arena: &AstArena,
        send: NodeId,
        owner: SymbolId,
        args: &[NodeId],
    ) {
        if args.len() != 2 {
            return;
        }
        let name_of = |arena: &AstArena, id: NodeId| match arena.kind(id) {
            NodeKind::Literal(Literal::Sym(name)) => Some(*name),
            _ => None,
        };
        let (Some(from_name), Some(to_name)) =
            (name_of(arena, args[0]), name_of(arena, args[1]))
        else {
            return;
        };

        let mut method_owner = self.gs.symbols.enclosing_class(owner);
        if method_owner == reserved::ROOT {
            // Top-level methods live on Object.
            method_owner = reserved::OBJECT;
        }

        let to_method = match self.gs.symbols.find_member(method_owner, to_name) {
            Some(found) => found,
            None => {
                if let Some(mut e) =
                    self.gs.begin_error(arena.loc(args[1]), errors::BAD_ALIAS_METHOD)
                {
                    let from_shown = self.gs.names.resolve(from_name);
                    let to_shown = self.gs.names.resolve(to_name);
                    e.set_header(format!(
                        "Can't make method alias from `{from_shown}` to non existing method `{to_shown}`"
                    ));
                }
                reserved::BAD_ALIAS_METHOD_STUB
            }
        };

        if let Some(from_method) = self.gs.symbols.find_member(method_owner, from_name) {
            let dealiased = self.gs.symbols.dealias(&self.gs.types, from_method);
            if dealiased != to_method {
                if let Some(mut e) =
                    self.gs.begin_error(arena.loc(send), errors::BAD_ALIAS_METHOD)
                {
                    let from_shown = self.gs.symbols.show(&self.gs.names, from_method);
                    if from_method == dealiased {
                        e.set_header(format!(
                            "Redefining the existing method `{from_shown}` as a method alias"
                        ));
                        let prev_loc = self
                            .gs
                            .symbols
                            .get(from_method)
                            .map_or(Loc::none(), |s| s.loc);
                        e.add_error_line(prev_loc, "Previous definition");
                    } else {
                        let old_shown = self.gs.symbols.show(&self.gs.names, dealiased);
                        let new_shown = self.gs.symbols.show(&self.gs.names, to_method);
                        e.set_header(format!(
                            "Redefining method alias `{from_shown}` from `{old_shown}` to `{new_shown}`"
                        ));
                    }
                }
                return;
            }
        }

        let alias =
            self.gs
                .symbols
                .enter_method_symbol(arena.loc(send), method_owner, from_name);
        let alias_ty = self.gs.types.alias(to_method);
        if let Some(sym) = self.gs.symbols.get_mut(alias) {
            sym.result_type = Some(alias_ty);
        }
    }

    // =========================================================================
    // Assignments: variable declarations and static-field types
    // =========================================================================

    fn post_transform_assign(&mut self, arena: &mut AstArena, id: NodeId, owner: SymbolId) {
        if self.handle_declaration(arena, id, owner) {
            return;
        }

        let NodeKind::Assign { lhs, rhs } = arena.kind(id) else {
            return;
        };
        let (lhs, rhs) = (*lhs, *rhs);
        let sym = arena.constant_symbol(lhs);
        if !sym.exists() {
            return;
        }
        let Some(data) = self.gs.symbols.get(sym) else {
            return;
        };
        if data.is_type_alias() || data.is_type_member() {
            return;
        }

        if data.is_static_field() && data.result_type.is_none() {
            match self.resolve_constant_type(arena, rhs) {
                Some(ty) => {
                    if let Some(sym) = self.gs.symbols.get_mut(sym) {
                        sym.result_type = Some(ty);
                    }
                }
                None => {
                    // No type to derive; hand the expression to later
                    // passes for a suggestion and move on as untyped.
                    let loc = arena.loc(rhs);
                    let magic_orig = mk::uconst(arena, loc, well_known::MAGIC);
                    let magic = mk::constant(arena, loc, reserved::MAGIC, magic_orig);
                    let wrapped =
                        mk::send(arena, loc, magic, well_known::SUGGEST_TYPE, vec![rhs]);
                    if let NodeKind::Assign { rhs: slot, .. } = arena.kind_mut(id) {
                        *slot = wrapped;
                    }
                    if let Some(sym) = self.gs.symbols.get_mut(sym) {
                        sym.result_type = Some(TypeId::UNTYPED);
                    }
                }
            }
        } else {
            // Already typed; still surface any annotation misuse on the
            // right-hand side.
            let _ = self.resolve_constant_type(arena, rhs);
        }
    }

    /// Derive the type of a constant declaration's right-hand side. Only
    /// literals and explicit casts are handled; everything else is left
    /// for inference or flagged.
    fn resolve_constant_type(&mut self, arena: &AstArena, expr: NodeId) -> Option<TypeId> {
        match arena.kind(expr) {
            NodeKind::Literal(lit) => Some(type_syntax::literal_result_type(self.gs, *lit)),
            NodeKind::Cast { kind, ty, .. } => {
                if *kind != CastKind::Let
                    && let Some(mut e) =
                        self.gs.begin_error(arena.loc(expr), errors::CONSTANT_ASSERT_TYPE)
                {
                    e.set_header("Use `T.let` to specify the type of constants");
                }
                Some(*ty)
            }
            NodeKind::InsSeq { expr: inner, .. } => {
                let inner = *inner;
                self.resolve_constant_type(arena, inner)
            }
            NodeKind::Send { recv, fun, .. } => {
                if *fun == well_known::TYPE_ALIAS && arena.constant_symbol(*recv) == reserved::T
                {
                    return None;
                }
                self.report_missing_annotation(arena.loc(expr));
                None
            }
            // Constants aliasing other constants have their types
            // inferred later; no complaint here.
            NodeKind::Constant { .. } | NodeKind::UnresolvedConstant { .. } => None,
            _ => {
                self.report_missing_annotation(arena.loc(expr));
                None
            }
        }
    }

    fn report_missing_annotation(&mut self, loc: Loc) {
        if let Some(mut e) = self.gs.begin_error(loc, errors::CONSTANT_MISSING_TYPE_ANNOTATION)
        {
            e.set_header(
                "Constants must have type annotations with `T.let` when specifying `# typed: strict`",
            );
        }
    }

    /// Type an instance- or class-variable declaration. Returns true when
    /// the assignment was such a declaration, whether or not it was valid.
    fn handle_declaration(&mut self, arena: &AstArena, id: NodeId, owner: SymbolId) -> bool {
        let NodeKind::Assign { lhs, rhs } = arena.kind(id) else {
            return false;
        };
        let (lhs, rhs) = (*lhs, *rhs);
        let (ident_kind, name) = match arena.kind(lhs) {
            NodeKind::Ident { kind, name }
                if matches!(kind, IdentKind::Instance | IdentKind::Class) =>
            {
                (*kind, *name)
            }
            _ => return false,
        };

        let mut recur = rhs;
        while let NodeKind::InsSeq { expr, .. } = arena.kind(recur) {
            recur = *expr;
        }
        let (cast_kind, cast_ty) = match arena.kind(recur) {
            NodeKind::Cast { kind, ty, .. } => (*kind, *ty),
            _ => return false,
        };
        if cast_kind != CastKind::Let
            && let Some(mut e) =
                self.gs.begin_error(arena.loc(recur), errors::CONSTANT_ASSERT_TYPE)
        {
            e.set_header("Use `T.let` to specify the type of constants");
        }

        let uid_loc = arena.loc(lhs);
        let owner_is_class = self.gs.symbols.get(owner).is_some_and(|s| s.is_class());
        if ident_kind == IdentKind::Class {
            if !owner_is_class
                && let Some(mut e) =
                    self.gs.begin_error(uid_loc, errors::INVALID_DECLARE_VARIABLES)
            {
                e.set_header("Class variables must be declared at class scope");
            }
        } else if owner_is_class {
            // Declaring a class instance variable at class top level.
        } else {
            let owner_sym = self.gs.symbols.get(owner);
            let is_initialize =
                owner_sym.is_some_and(|s| s.is_method() && s.name == well_known::INITIALIZE);
            if !is_initialize {
                let on_singleton = owner_sym
                    .is_some_and(|s| s.is_method() && self.gs.symbols.is_singleton_class(s.owner));
                if let Some(mut e) =
                    self.gs.begin_error(uid_loc, errors::INVALID_DECLARE_VARIABLES)
                {
                    if on_singleton {
                        e.set_header(
                            "Singleton instance variables must be declared inside the class body",
                        );
                    } else {
                        e.set_header("Instance variables must be declared inside `initialize`");
                    }
                }
            }
        }
        let scope = self.gs.symbols.enclosing_class(owner);

        if let Some(prior) = self.gs.symbols.find_member(scope, name) {
            if self
                .gs
                .symbols
                .get(prior)
                .is_some_and(|s| s.result_type == Some(cast_ty))
            {
                // Redeclaration with the same type is idempotent.
                return true;
            }
            if let Some(mut e) =
                self.gs.begin_error(uid_loc, errors::DUPLICATE_VARIABLE_DECLARATION)
            {
                let shown = self.gs.names.resolve(name);
                e.set_header(format!("Redeclaring variable `{shown}` with mismatching type"));
                let prev_loc = self.gs.symbols.get(prior).map_or(Loc::none(), |s| s.loc);
                e.add_error_line(prev_loc, "Previous declaration is here:");
            }
            return false;
        }

        let var = if ident_kind == IdentKind::Class {
            self.gs.symbols.enter_static_field_symbol(uid_loc, scope, name)
        } else {
            self.gs.symbols.enter_field_symbol(uid_loc, scope, name)
        };
        if let Some(sym) = self.gs.symbols.get_mut(var) {
            sym.result_type = Some(cast_ty);
        }
        true
    }
}
