//! Shared test fixtures.
//!
//! `ProgramBuilder` assembles parsed files the way the resolver expects to
//! receive them: a miniature namer enters every lexical class, module,
//! method, field, and type member as the nodes are built, so the trees
//! arrive with symbols pre-entered and constants still textual.

use crate::Resolver;
use rbz_ast::{ArgNodeFlags, AstArena, ClassKind, NodeId, NodeKind, ParsedFile, mk};
use rbz_common::{Diagnostic, Loc, StrictLevel, files::File};
use rbz_core::{
    GlobalState, NameId, SymbolId, symbol_flags, symbols::reserved, well_known,
};

pub(crate) struct ProgramBuilder {
    pub gs: GlobalState,
    pub trees: Vec<ParsedFile>,
    offsets: Vec<u32>,
    scopes: Vec<SymbolId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let mut gs = GlobalState::new();
        // A few well-known stdlib classes the annotations in tests name.
        for name in ["Integer", "String", "Symbol", "NilClass", "Kernel"] {
            let name_id = gs.names.enter(name);
            gs.symbols
                .enter_class_symbol(Loc::none(), reserved::ROOT, name_id, false);
        }
        ProgramBuilder {
            gs,
            trees: Vec::new(),
            offsets: Vec::new(),
            scopes: vec![reserved::ROOT],
        }
    }

    // =========================================================================
    // Files
    // =========================================================================

    pub fn add_file(&mut self, path: &str, strict: StrictLevel) -> usize {
        self.add_file_opts(path, strict, Some(strict), false)
    }

    pub fn add_file_opts(
        &mut self,
        path: &str,
        strict: StrictLevel,
        original_sigil: Option<StrictLevel>,
        permits_overloads: bool,
    ) -> usize {
        let file = self.gs.files.enter(File {
            path: path.to_string(),
            strict,
            original_sigil,
            is_rbi: false,
            permits_overloads,
        });
        let mut arena = AstArena::new();
        let root = arena.alloc(
            Loc::new(file, 0, 0),
            NodeKind::ClassDef {
                symbol: reserved::ROOT,
                kind: ClassKind::Module,
                ancestors: Vec::new(),
                singleton_ancestors: Vec::new(),
                body: Vec::new(),
            },
        );
        self.trees.push(ParsedFile { file, root, arena });
        self.offsets.push(1);
        self.trees.len() - 1
    }

    /// Install the top-level statements of a file.
    pub fn finish_file(&mut self, f: usize, stats: Vec<NodeId>) {
        let root = self.trees[f].root;
        if let NodeKind::ClassDef { body, .. } = self.trees[f].arena.kind_mut(root) {
            *body = stats;
        }
    }

    fn next_loc(&mut self, f: usize) -> Loc {
        let start = self.offsets[f];
        self.offsets[f] += 10;
        Loc::new(self.trees[f].file, start, start + 8)
    }

    fn arena(&mut self, f: usize) -> &mut AstArena {
        &mut self.trees[f].arena
    }

    pub fn name(&mut self, text: &str) -> NameId {
        self.gs.names.enter(text)
    }

    fn current_scope(&self) -> SymbolId {
        *self.scopes.last().expect("scope stack never empties")
    }

    // =========================================================================
    // Expression nodes
    // =========================================================================

    pub fn empty(&mut self, f: usize) -> NodeId {
        let loc = self.next_loc(f);
        mk::empty(self.arena(f), loc)
    }

    pub fn self_ref(&mut self, f: usize) -> NodeId {
        let loc = self.next_loc(f);
        mk::self_ref(self.arena(f), loc)
    }

    pub fn int(&mut self, f: usize, value: i64) -> NodeId {
        let loc = self.next_loc(f);
        mk::lit_int(self.arena(f), loc, value)
    }

    pub fn sym(&mut self, f: usize, text: &str) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        mk::lit_sym(self.arena(f), loc, name)
    }

    pub fn uconst(&mut self, f: usize, text: &str) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        mk::uconst(self.arena(f), loc, name)
    }

    pub fn uconst_in(&mut self, f: usize, scope: NodeId, text: &str) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        mk::uconst_in(self.arena(f), loc, scope, name)
    }

    pub fn send(&mut self, f: usize, recv: NodeId, fun: &str, args: Vec<NodeId>) -> NodeId {
        let fun = self.name(fun);
        let loc = self.next_loc(f);
        mk::send(self.arena(f), loc, recv, fun, args)
    }

    pub fn hash(&mut self, f: usize, pairs: Vec<(&str, NodeId)>) -> NodeId {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (key, value) in pairs {
            keys.push(self.sym(f, key));
            values.push(value);
        }
        let loc = self.next_loc(f);
        mk::hash(self.arena(f), loc, keys, values)
    }

    pub fn assign(&mut self, f: usize, lhs: NodeId, rhs: NodeId) -> NodeId {
        let loc = self.next_loc(f);
        mk::assign(self.arena(f), loc, lhs, rhs)
    }

    pub fn ivar(&mut self, f: usize, text: &str) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        mk::ident(self.arena(f), loc, rbz_ast::IdentKind::Instance, name)
    }

    pub fn cvar(&mut self, f: usize, text: &str) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        mk::ident(self.arena(f), loc, rbz_ast::IdentKind::Class, name)
    }

    /// `T.<fun>(args...)`
    pub fn t_send(&mut self, f: usize, fun: &str, args: Vec<NodeId>) -> NodeId {
        let recv = self.uconst(f, "T");
        self.send(f, recv, fun, args)
    }

    /// `T.let(expr, ty)`
    pub fn t_let(&mut self, f: usize, expr: NodeId, ty: NodeId) -> NodeId {
        self.t_send(f, "let", vec![expr, ty])
    }

    /// `sig { <chain> }`
    pub fn sig(&mut self, f: usize, chain: NodeId) -> NodeId {
        let recv = self.empty(f);
        let fun = well_known::SIG;
        let loc = self.next_loc(f);
        mk::send_with_block(self.arena(f), loc, recv, fun, Vec::new(), chain)
    }

    // =========================================================================
    // Declarations (namer-entered)
    // =========================================================================

    /// Enter a class (or module) symbol on the current scope and push it;
    /// pair with `end_class`.
    pub fn begin_class(&mut self, f: usize, text: &str, is_module: bool) -> SymbolId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        let owner = self.current_scope();
        let symbol = self.gs.symbols.enter_class_symbol(loc, owner, name, is_module);
        self.scopes.push(symbol);
        symbol
    }

    pub fn end_class(&mut self, f: usize, ancestors: Vec<NodeId>, body: Vec<NodeId>) -> NodeId {
        let symbol = self.scopes.pop().expect("end_class without begin_class");
        let kind = if self.gs.symbols.get(symbol).is_some_and(|s| s.is_module()) {
            ClassKind::Module
        } else {
            ClassKind::Class
        };
        let loc = self.next_loc(f);
        mk::class_def(self.arena(f), loc, symbol, kind, ancestors, body)
    }

    /// Whole class in one call, for bodies that don't reference the
    /// builder mid-construction.
    pub fn class(
        &mut self,
        f: usize,
        text: &str,
        ancestors: Vec<NodeId>,
        body: Vec<NodeId>,
    ) -> NodeId {
        self.begin_class(f, text, false);
        self.end_class(f, ancestors, body)
    }

    pub fn module(&mut self, f: usize, text: &str, body: Vec<NodeId>) -> NodeId {
        self.begin_class(f, text, true);
        self.end_class(f, Vec::new(), body)
    }

    pub fn mark_abstract(&mut self, symbol: SymbolId) {
        if let Some(sym) = self.gs.symbols.get_mut(symbol) {
            sym.flags |= symbol_flags::CLASS_ABSTRACT;
        }
    }

    pub fn mark_interface(&mut self, symbol: SymbolId) {
        if let Some(sym) = self.gs.symbols.get_mut(symbol) {
            sym.flags |= symbol_flags::CLASS_ABSTRACT | symbol_flags::CLASS_INTERFACE;
        }
    }

    pub fn mark_sealed(&mut self, symbol: SymbolId) {
        if let Some(sym) = self.gs.symbols.get_mut(symbol) {
            sym.flags |= symbol_flags::CLASS_SEALED;
        }
    }

    /// Enter a method on the current scope (or its singleton class for a
    /// self-method) and build its `MethodDef` node. Argument specs are
    /// `(name, flags, default)`. A synthetic block argument is appended
    /// the way the namer does.
    pub fn method(
        &mut self,
        f: usize,
        text: &str,
        args: Vec<(&str, ArgNodeFlags, Option<NodeId>)>,
        body: NodeId,
        is_self: bool,
    ) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        let lexical_owner = self.current_scope();
        let owner = if is_self {
            self.gs.symbols.singleton_class(&mut self.gs.names, lexical_owner)
        } else {
            lexical_owner
        };
        let method = self.gs.symbols.enter_method_symbol(loc, owner, name);

        let mut arg_nodes = Vec::new();
        let mut arg_infos = Vec::new();
        for (arg_text, flags, default) in args {
            let arg_name = self.name(arg_text);
            let arg_loc = self.next_loc(f);
            let node = match default {
                Some(default) => {
                    mk::arg_with_default(self.arena(f), arg_loc, arg_name, flags, default)
                }
                None => mk::arg(self.arena(f), arg_loc, arg_name, flags),
            };
            arg_nodes.push(node);
            let mut info = rbz_core::ArgInfo::new(arg_name, arg_loc, flags);
            info.flags.default |= default.is_some();
            arg_infos.push(info);
        }
        // Synthetic block argument, as the namer appends.
        let blk_loc = self.next_loc(f);
        let blk_flags = ArgNodeFlags {
            block: true,
            ..Default::default()
        };
        arg_nodes.push(mk::arg(self.arena(f), blk_loc, well_known::BLK_ARG, blk_flags));
        arg_infos.push(rbz_core::ArgInfo::new(well_known::BLK_ARG, blk_loc, blk_flags));

        if let Some(sym) = self.gs.symbols.get_mut(method) {
            sym.arguments = arg_infos;
        }

        let def_loc = self.next_loc(f);
        mk::method_def(self.arena(f), def_loc, method, name, is_self, arg_nodes, body)
    }

    /// `Name = <rhs>` with a namer-entered static field.
    pub fn static_field_assign(&mut self, f: usize, text: &str, rhs: NodeId) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        let owner = self.current_scope();
        self.gs.symbols.enter_static_field_symbol(loc, owner, name);
        let lhs = self.uconst(f, text);
        self.assign(f, lhs, rhs)
    }

    /// `Name = T.type_alias(rhs)` with the static field flagged as a type
    /// alias, as the namer marks it.
    pub fn type_alias_assign(&mut self, f: usize, text: &str, rhs: NodeId) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        let owner = self.current_scope();
        let field = self.gs.symbols.enter_static_field_symbol(loc, owner, name);
        if let Some(sym) = self.gs.symbols.get_mut(field) {
            sym.flags |= symbol_flags::TYPE_ALIAS;
        }
        let alias_rhs = self.t_send(f, "type_alias", vec![rhs]);
        let lhs = self.uconst(f, text);
        self.assign(f, lhs, alias_rhs)
    }

    /// `Name = type_member(...)` with a namer-entered type member.
    pub fn type_member_decl(&mut self, f: usize, text: &str, hash: Option<NodeId>) -> NodeId {
        let name = self.name(text);
        let loc = self.next_loc(f);
        let owner = self.current_scope();
        self.gs.symbols.enter_type_member(loc, owner, name);
        let recv = self.self_ref(f);
        let args = hash.into_iter().collect();
        let send = self.send(f, recv, "type_member", args);
        let lhs = self.uconst(f, text);
        self.assign(f, lhs, send)
    }

    // =========================================================================
    // Running
    // =========================================================================

    pub fn run(mut self, workers: usize) -> ResolvedProgram {
        let trees = std::mem::take(&mut self.trees);
        let trees = Resolver::run(&mut self.gs, trees, workers);
        ResolvedProgram { gs: self.gs, trees }
    }

    pub fn run_constant_resolution(mut self, workers: usize) -> ResolvedProgram {
        let trees = std::mem::take(&mut self.trees);
        let trees = Resolver::run_constant_resolution(&mut self.gs, trees, workers);
        ResolvedProgram { gs: self.gs, trees }
    }
}

pub(crate) struct ResolvedProgram {
    pub gs: GlobalState,
    pub trees: Vec<ParsedFile>,
}

impl ResolvedProgram {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.gs.errors.snapshot()
    }

    /// Lookup a symbol by `::`-separated path from the root.
    pub fn symbol(&self, path: &str) -> SymbolId {
        let mut cur = reserved::ROOT;
        for part in path.split("::") {
            let Some(name) = self.gs.names.lookup(part) else {
                return SymbolId::NONE;
            };
            match self.gs.symbols.find_member(cur, name) {
                Some(next) => cur = next,
                None => return SymbolId::NONE,
            }
        }
        cur
    }

    pub fn superclass_of(&self, path: &str) -> SymbolId {
        let sym = self.symbol(path);
        self.gs.symbols.get(sym).map_or(SymbolId::NONE, |s| s.superclass)
    }

    /// All `Constant` symbols in tree order for a file.
    pub fn constant_symbols(&self, f: usize) -> Vec<SymbolId> {
        let tree = &self.trees[f];
        let mut out = Vec::new();
        rbz_ast::preorder(&tree.arena, tree.root, &mut |id| {
            if let NodeKind::Constant { symbol, .. } = tree.arena.kind(id) {
                out.push(*symbol);
            }
        });
        out
    }

    /// Tree fingerprint used by determinism tests.
    pub fn fingerprint(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for tree in &self.trees {
            let _ = write!(out, "file {} ", tree.file.0);
            rbz_ast::preorder(&tree.arena, tree.root, &mut |id| {
                let _ = write!(out, "{:?};", tree.arena.kind(id));
            });
        }
        for diag in self.gs.errors.snapshot() {
            let _ = write!(out, "[{} {} {}]", diag.code, diag.loc, diag.header);
        }
        out
    }
}
