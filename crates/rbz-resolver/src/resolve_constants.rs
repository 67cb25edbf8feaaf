//! Constant resolution.
//!
//! Ancestry is expressed with constants, and constant lookup walks
//! ancestry, so the two cannot be resolved in one pass. Failed resolutions
//! are collected onto four work lists and iterated to a fixed point:
//! either everything resolves, or nothing new resolves and the remainder
//! is stubbed and reported.
//!
//! The four lists are:
//!
//! - constants waiting to be resolved
//! - ancestors waiting on those constants before they can be attached
//! - class aliases (which know the constant they alias to)
//! - type aliases (which need every constant in their right-hand side)
//!
//! Files are pre-walked in parallel; workers never touch the symbol
//! table. The fixpoint itself runs on one thread, after every list has
//! been sorted by location, so results are identical across worker
//! schedules.

use crate::errors;
use crate::type_syntax::{self, ParsedSig, TypeSyntaxArgs};
use rbz_ast::{AstArena, ClassKind, NodeId, NodeKind, ParsedFile, mk};
use rbz_common::{ErrorLine, ErrorQueue, FileId, Loc, StrictLevel};
use rbz_core::{GlobalState, SymbolId, TypeId, symbols::reserved, well_known};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Lexical nesting at some point of the walk, innermost first.
#[derive(Debug)]
pub(crate) struct NestingNode {
    pub parent: Option<Nesting>,
    pub scope: SymbolId,
}

pub(crate) type Nesting = Arc<NestingNode>;

fn nesting_root() -> Nesting {
    Arc::new(NestingNode {
        parent: None,
        scope: reserved::ROOT,
    })
}

/// Resolve a textual constant and write the winner into `out`.
#[derive(Debug)]
struct ResolutionItem {
    file: FileId,
    nesting: Nesting,
    out: NodeId,
}

/// Attach a resolved ancestor to `klass` as superclass or mixin.
#[derive(Debug)]
struct AncestorResolutionItem {
    file: FileId,
    ancestor: NodeId,
    klass: SymbolId,
    is_superclass: bool,
}

/// `Lhs = Rhs` where both sides are constants.
#[derive(Debug)]
struct ClassAliasResolutionItem {
    file: FileId,
    lhs: SymbolId,
    rhs: NodeId,
}

/// `Lhs = T.type_alias(rhs)`.
#[derive(Debug)]
struct TypeAliasResolutionItem {
    file: FileId,
    lhs: SymbolId,
    rhs: NodeId,
}

struct ResolveWalkResult {
    tree: ParsedFile,
    todo: Vec<ResolutionItem>,
    todo_ancestors: Vec<AncestorResolutionItem>,
    todo_class_aliases: Vec<ClassAliasResolutionItem>,
    todo_type_aliases: Vec<TypeAliasResolutionItem>,
    errors: ErrorQueue,
}

// =============================================================================
// Resolution primitives
// =============================================================================

fn original_of(arena: &AstArena, out: NodeId) -> Option<NodeId> {
    match arena.kind(out) {
        NodeKind::Constant { original, .. } => Some(*original),
        _ => None,
    }
}

/// Walk the nesting chain nearest-first with direct member lookups, then
/// fall back to one inheritance-aware lookup from the innermost scope.
fn resolve_lhs(gs: &GlobalState, nesting: &Nesting, name: rbz_core::NameId) -> SymbolId {
    let mut scope = Some(nesting);
    while let Some(node) = scope {
        if let Some(found) = gs.symbols.find_member(node.scope, name) {
            return found;
        }
        scope = node.parent.as_ref();
    }
    gs.symbols
        .find_member_transitive(nesting.scope, name)
        .unwrap_or(SymbolId::NONE)
}

/// Attempt to resolve the textual constant behind `out`. Returns
/// `SymbolId::NONE` when nothing matched yet; returns the reserved
/// `untyped` symbol (after reporting) for scopes that can never resolve.
fn resolve_constant(
    gs: &GlobalState,
    local_errors: &ErrorQueue,
    arena: &AstArena,
    nesting: &Nesting,
    original: NodeId,
) -> SymbolId {
    let NodeKind::UnresolvedConstant { scope, name } = arena.kind(original) else {
        return SymbolId::NONE;
    };
    let (scope, name) = (*scope, *name);

    if arena.is_empty_tree(scope) {
        return resolve_lhs(gs, nesting, name);
    }

    match arena.kind(scope) {
        NodeKind::Constant { symbol, .. } => {
            let symbol = *symbol;
            if symbol.exists()
                && gs.symbols.get(symbol).is_some_and(|s| s.is_type_alias())
            {
                if let Some(mut e) = local_errors.begin_error(
                    &gs.files,
                    arena.loc(original),
                    errors::CONSTANT_IN_TYPE_ALIAS,
                ) {
                    e.set_header("Resolving constants through type aliases is not supported");
                }
                return reserved::UNTYPED;
            }
            if !symbol.exists() {
                return SymbolId::NONE;
            }
            let resolved = gs.symbols.dealias(&gs.types, symbol);
            gs.symbols
                .find_member(resolved, name)
                .unwrap_or(SymbolId::NONE)
        }
        _ => {
            if let Some(mut e) = local_errors.begin_error(
                &gs.files,
                arena.loc(original),
                errors::DYNAMIC_CONSTANT,
            ) {
                e.set_header("Dynamic constant references are unsupported");
            }
            reserved::UNTYPED
        }
    }
}

pub(crate) fn is_already_resolved(gs: &GlobalState, arena: &AstArena, node: NodeId) -> bool {
    match arena.kind(node) {
        NodeKind::Constant { symbol, .. } => {
            if !symbol.exists() {
                return false;
            }
            match gs.symbols.get(*symbol) {
                Some(sym) if sym.is_type_alias() => sym.result_type.is_some(),
                _ => true,
            }
        }
        _ => false,
    }
}

/// Whether every constant inside `expr` has been resolved; gates handing a
/// type-alias right-hand side to the type-syntax service.
fn is_fully_resolved(gs: &GlobalState, arena: &AstArena, expr: NodeId) -> bool {
    let mut fully = true;
    rbz_ast::preorder(arena, expr, &mut |id| {
        match arena.kind(id) {
            NodeKind::Constant { .. } => fully &= is_already_resolved(gs, arena, id),
            NodeKind::UnresolvedConstant { .. } => fully = false,
            _ => {}
        }
    });
    fully
}

fn set_constant_symbol(arena: &mut AstArena, out: NodeId, resolved: SymbolId) {
    if let NodeKind::Constant { symbol, .. } = arena.kind_mut(out) {
        *symbol = resolved;
    }
}

fn resolve_job(
    gs: &GlobalState,
    local_errors: &ErrorQueue,
    arena: &mut AstArena,
    job: &ResolutionItem,
) -> bool {
    if is_already_resolved(gs, arena, job.out) {
        return true;
    }
    let Some(original) = original_of(arena, job.out) else {
        return true;
    };
    let resolved = resolve_constant(gs, local_errors, arena, &job.nesting, original);
    if !resolved.exists() {
        return false;
    }
    if gs.symbols.get(resolved).is_some_and(|s| s.is_type_alias()) {
        // Only finished once the type-alias job has populated the alias.
        if gs
            .symbols
            .get(resolved)
            .is_some_and(|s| s.result_type.is_some())
        {
            set_constant_symbol(arena, job.out, resolved);
            return true;
        }
        return false;
    }
    set_constant_symbol(arena, job.out, resolved);
    true
}

// =============================================================================
// Per-file pre-walk
// =============================================================================

struct ConstantWalker<'gs> {
    gs: &'gs GlobalState,
    file: FileId,
    nesting: Nesting,
    todo: Vec<ResolutionItem>,
    todo_ancestors: Vec<AncestorResolutionItem>,
    todo_class_aliases: Vec<ClassAliasResolutionItem>,
    todo_type_aliases: Vec<TypeAliasResolutionItem>,
    errors: ErrorQueue,
}

impl<'gs> ConstantWalker<'gs> {
    fn new(gs: &'gs GlobalState, file: FileId) -> Self {
        ConstantWalker {
            gs,
            file,
            nesting: nesting_root(),
            todo: Vec::new(),
            todo_ancestors: Vec::new(),
            todo_class_aliases: Vec::new(),
            todo_type_aliases: Vec::new(),
            errors: ErrorQueue::new(),
        }
    }

    fn walk(&mut self, arena: &mut AstArena, id: NodeId) {
        match arena.kind(id) {
            NodeKind::UnresolvedConstant { .. } => {
                self.transform_unresolved_constant(arena, id);
            }
            NodeKind::ClassDef { .. } => self.walk_class_def(arena, id),
            NodeKind::Assign { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.walk(arena, lhs);
                self.walk(arena, rhs);
                self.post_transform_assign(arena, lhs, rhs);
            }
            NodeKind::MethodDef { args, body, .. } => {
                let children: Vec<NodeId> = args.iter().copied().chain([*body]).collect();
                for child in children {
                    self.walk(arena, child);
                }
            }
            NodeKind::Send {
                recv, args, block, ..
            } => {
                let children: Vec<NodeId> =
                    [*recv].into_iter().chain(args.iter().copied()).chain([*block]).collect();
                for child in children {
                    self.walk(arena, child);
                }
            }
            NodeKind::Arg { default, .. } => {
                let default = *default;
                self.walk(arena, default);
            }
            NodeKind::Hash { keys, values } => {
                let children: Vec<NodeId> = keys.iter().chain(values.iter()).copied().collect();
                for child in children {
                    self.walk(arena, child);
                }
            }
            NodeKind::InsSeq { stats, expr } => {
                let children: Vec<NodeId> = stats.iter().copied().chain([*expr]).collect();
                for child in children {
                    self.walk(arena, child);
                }
            }
            NodeKind::Cast { expr, .. } => {
                let expr = *expr;
                self.walk(arena, expr);
            }
            NodeKind::EmptyTree
            | NodeKind::SelfRef
            | NodeKind::Literal(_)
            | NodeKind::Ident { .. }
            | NodeKind::Constant { .. } => {}
        }
    }

    /// Rewrite `UnresolvedConstant` into a `Constant` in place, resolving
    /// immediately when the pre-entered symbol state already answers.
    fn transform_unresolved_constant(&mut self, arena: &mut AstArena, id: NodeId) {
        let NodeKind::UnresolvedConstant { scope, name } = arena.kind(id) else {
            return;
        };
        let (scope, name) = (*scope, *name);
        if matches!(arena.kind(scope), NodeKind::UnresolvedConstant { .. }) {
            self.transform_unresolved_constant(arena, scope);
        }
        let loc = arena.loc(id);
        let original = arena.alloc(loc, NodeKind::UnresolvedConstant { scope, name });
        arena.replace(
            id,
            NodeKind::Constant {
                symbol: SymbolId::NONE,
                resolution_scope: SymbolId::NONE,
                original,
            },
        );
        let job = ResolutionItem {
            file: self.file,
            nesting: self.nesting.clone(),
            out: id,
        };
        if !resolve_job(self.gs, &self.errors, arena, &job) {
            self.todo.push(job);
        }
    }

    fn walk_class_def(&mut self, arena: &mut AstArena, id: NodeId) {
        let NodeKind::ClassDef {
            symbol,
            kind,
            ancestors,
            singleton_ancestors,
            body,
            ..
        } = arena.kind(id)
        else {
            return;
        };
        let klass = *symbol;
        let kind = *kind;
        let ancestors = ancestors.clone();
        let singleton_ancestors = singleton_ancestors.clone();
        let body = body.clone();

        self.nesting = Arc::new(NestingNode {
            parent: Some(self.nesting.clone()),
            scope: klass,
        });
        for stat in body {
            self.walk(arena, stat);
        }

        let is_singleton = self.gs.symbols.is_singleton_class(klass);
        for (i, &ancestor) in ancestors.iter().enumerate() {
            let is_superclass = kind == ClassKind::Class && i == 0 && !is_singleton;
            self.transform_ancestor(arena, klass, ancestor, is_superclass);
        }
        if let Some(singleton) = self.gs.symbols.lookup_singleton_class(klass) {
            for &ancestor in &singleton_ancestors {
                self.transform_ancestor(arena, singleton, ancestor, false);
            }
        }

        let parent = self.nesting.parent.clone().unwrap_or_else(nesting_root);
        self.nesting = parent;
    }

    fn transform_ancestor(
        &mut self,
        arena: &mut AstArena,
        klass: SymbolId,
        ancestor: NodeId,
        is_superclass: bool,
    ) {
        if matches!(arena.kind(ancestor), NodeKind::UnresolvedConstant { .. }) {
            // A superclass resolves in the enclosing lexical scope, not in
            // the class it introduces.
            let saved = self.nesting.clone();
            if is_superclass && let Some(parent) = saved.parent.clone() {
                self.nesting = parent;
            }
            self.transform_unresolved_constant(arena, ancestor);
            self.nesting = saved;
        }

        match arena.kind(ancestor) {
            NodeKind::Constant { symbol, .. } => {
                let symbol = *symbol;
                if symbol.exists()
                    && self.gs.symbols.get(symbol).is_some_and(|s| s.is_type_alias())
                {
                    if let Some(mut e) = self.errors.begin_error(
                        &self.gs.files,
                        arena.loc(ancestor),
                        errors::DYNAMIC_SUPERCLASS,
                    ) {
                        e.set_header("Superclasses and mixins may not be type aliases");
                    }
                    return;
                }
            }
            NodeKind::SelfRef => {
                let enclosing = self.gs.symbols.enclosing_class(klass);
                let enclosing_name = self
                    .gs
                    .symbols
                    .get(enclosing)
                    .map_or(well_known::ROOT, |s| s.name);
                let loc = arena.loc(ancestor);
                let scope = mk::empty(arena, loc);
                let original = arena.alloc(
                    loc,
                    NodeKind::UnresolvedConstant {
                        scope,
                        name: enclosing_name,
                    },
                );
                arena.replace(
                    ancestor,
                    NodeKind::Constant {
                        symbol: enclosing,
                        resolution_scope: SymbolId::NONE,
                        original,
                    },
                );
            }
            NodeKind::EmptyTree => return,
            _ => {
                debug_assert!(false, "namer should not have allowed this ancestor form");
                return;
            }
        }

        self.todo_ancestors.push(AncestorResolutionItem {
            file: self.file,
            ancestor,
            klass,
            is_superclass,
        });
    }

    fn post_transform_assign(&mut self, arena: &mut AstArena, lhs: NodeId, rhs: NodeId) {
        let lhs_symbol = arena.constant_symbol(lhs);
        if !lhs_symbol.exists()
            || !self
                .gs
                .symbols
                .get(lhs_symbol)
                .is_some_and(|s| s.is_static_field())
        {
            return;
        }

        let type_alias_arity = match arena.kind(rhs) {
            NodeKind::Send { recv, fun, args, .. }
                if *fun == well_known::TYPE_ALIAS
                    && arena.constant_symbol(*recv) == reserved::T =>
            {
                Some(args.len())
            }
            _ => None,
        };
        if let Some(arity) = type_alias_arity {
            if arity == 0 {
                // A nullary T.type_alias would leave the symbol with no
                // right-hand side at all; repair it to alias untyped so
                // end-of-pass invariants hold, and report the arity here.
                let loc = arena.loc(rhs);
                if let Some(mut e) =
                    self.errors
                        .begin_error(&self.gs.files, loc, errors::INVALID_TYPE_ALIAS)
                {
                    e.set_header("No argument given to `T.type_alias`");
                }
                let t_orig = mk::uconst(arena, loc, well_known::T);
                let t_const = mk::constant(arena, loc, reserved::T, t_orig);
                let untyped = mk::send(arena, loc, t_const, well_known::UNTYPED, Vec::new());
                if let NodeKind::Send { args, .. } = arena.kind_mut(rhs) {
                    args.push(untyped);
                }
            }
            let NodeKind::Send { args, .. } = arena.kind(rhs) else {
                return;
            };
            let alias_rhs = args[0];
            self.todo_type_aliases.push(TypeAliasResolutionItem {
                file: self.file,
                lhs: lhs_symbol,
                rhs: alias_rhs,
            });
            // Also queue the left-hand side so an unused alias whose
            // right-hand side never resolves still gets reported.
            self.todo.push(ResolutionItem {
                file: self.file,
                nesting: self.nesting.clone(),
                out: lhs,
            });
            return;
        }

        if matches!(arena.kind(rhs), NodeKind::Constant { .. }) {
            self.todo_class_aliases.push(ClassAliasResolutionItem {
                file: self.file,
                lhs: lhs_symbol,
                rhs,
            });
        }
    }
}

fn walk_file(gs: &GlobalState, mut tree: ParsedFile) -> ResolveWalkResult {
    let mut walker = ConstantWalker::new(gs, tree.file);
    let root = tree.root;
    walker.walk(&mut tree.arena, root);
    ResolveWalkResult {
        tree,
        todo: walker.todo,
        todo_ancestors: walker.todo_ancestors,
        todo_class_aliases: walker.todo_class_aliases,
        todo_type_aliases: walker.todo_type_aliases,
        errors: walker.errors,
    }
}

// =============================================================================
// Serial job resolution (mutates the symbol table)
// =============================================================================

type TreeIndex = FxHashMap<FileId, usize>;

fn arena_of<'t>(trees: &'t [ParsedFile], index: &TreeIndex, file: FileId) -> &'t AstArena {
    &trees[index[&file]].arena
}

fn arena_of_mut<'t>(
    trees: &'t mut [ParsedFile],
    index: &TreeIndex,
    file: FileId,
) -> &'t mut AstArena {
    &mut trees[index[&file]].arena
}

fn stub_symbol_for_ancestor(job: &AncestorResolutionItem) -> SymbolId {
    if job.is_superclass {
        reserved::STUB_SUPER_CLASS
    } else {
        reserved::STUB_MIXIN
    }
}

fn resolve_ancestor_job(
    gs: &mut GlobalState,
    trees: &mut [ParsedFile],
    index: &TreeIndex,
    job: &AncestorResolutionItem,
    last_run: bool,
) -> bool {
    let arena = arena_of(trees, index, job.file);
    let ancestor_sym = arena.constant_symbol(job.ancestor);
    if !ancestor_sym.exists() {
        return false;
    }
    let loc = arena.loc(job.ancestor);

    let mut resolved;
    if gs.symbols.get(ancestor_sym).is_some_and(|s| s.is_type_alias()) {
        // A later substitution cannot turn an alias into a class, but the
        // error is held to the final pass regardless.
        if !last_run {
            return false;
        }
        if let Some(mut e) = gs.begin_error(loc, errors::DYNAMIC_SUPERCLASS) {
            e.set_header("Superclasses and mixins may not be type aliases");
        }
        resolved = stub_symbol_for_ancestor(job);
    } else {
        resolved = gs.symbols.dealias(&gs.types, ancestor_sym);
    }

    if !gs.symbols.get(resolved).is_some_and(|s| s.is_class()) {
        if !last_run {
            return false;
        }
        if let Some(mut e) = gs.begin_error(loc, errors::DYNAMIC_SUPERCLASS) {
            e.set_header("Superclasses and mixins may only use class aliases like `A = Integer`");
        }
        resolved = stub_symbol_for_ancestor(job);
    }

    if resolved == job.klass {
        if let Some(mut e) = gs.begin_error(loc, errors::CIRCULAR_DEPENDENCY) {
            let shown = gs.symbols.show(&gs.names, job.klass);
            e.set_header(format!("Circular dependency: `{shown}` is a parent of itself"));
            let def_loc = gs.symbols.get(resolved).map_or(Loc::none(), |s| s.loc);
            e.add_error_line(def_loc, "Class definition");
        }
        resolved = stub_symbol_for_ancestor(job);
    } else if gs.symbols.derives_from(resolved, job.klass) {
        if let Some(mut e) = gs.begin_error(loc, errors::CIRCULAR_DEPENDENCY) {
            let klass_shown = gs.symbols.show(&gs.names, job.klass);
            let other_shown = gs.symbols.show(&gs.names, resolved);
            e.set_header(format!(
                "Circular dependency: `{klass_shown}` and `{other_shown}` are declared as parents of each other"
            ));
            let klass_loc = gs.symbols.get(job.klass).map_or(Loc::none(), |s| s.loc);
            let other_loc = gs.symbols.get(resolved).map_or(Loc::none(), |s| s.loc);
            e.add_error_line(klass_loc, "One definition");
            e.add_error_line(other_loc, "Other definition");
        }
        resolved = stub_symbol_for_ancestor(job);
    }

    if job.is_superclass {
        let current = gs.symbols.get(job.klass).map_or(SymbolId::NONE, |s| s.superclass);
        if !current.exists() || current == reserved::TODO || current == resolved {
            gs.symbols.set_super_class(job.klass, resolved);
        } else if let Some(mut e) = gs.begin_error(loc, errors::REDEFINITION_OF_PARENTS) {
            let shown = gs.symbols.show(&gs.names, job.klass);
            e.set_header(format!("Class parents redefined for class `{shown}`"));
        }
    } else {
        gs.symbols.add_mixin(job.klass, resolved);
    }

    true
}

fn try_register_sealed_subclass(
    gs: &mut GlobalState,
    trees: &[ParsedFile],
    index: &TreeIndex,
    job: &AncestorResolutionItem,
) {
    let arena = arena_of(trees, index, job.file);
    let ancestor_sym = arena.constant_symbol(job.ancestor);
    if !ancestor_sym.exists() {
        return;
    }
    let ancestor = gs.symbols.dealias(&gs.types, ancestor_sym);
    if gs
        .symbols
        .get(ancestor)
        .is_some_and(|s| s.flags & rbz_core::symbol_flags::CLASS_SEALED != 0)
    {
        gs.symbols.record_sealed_subclass(ancestor, job.klass);
    }
}

fn resolve_class_alias_job(
    gs: &mut GlobalState,
    trees: &[ParsedFile],
    index: &TreeIndex,
    job: &ClassAliasResolutionItem,
) -> bool {
    let arena = arena_of(trees, index, job.file);
    let rhs_sym = arena.constant_symbol(job.rhs);
    if !rhs_sym.exists() {
        return false;
    }
    let rhs_loc = arena.loc(job.rhs);

    if gs.symbols.get(rhs_sym).is_some_and(|s| s.is_type_alias()) {
        if let Some(mut e) = gs.begin_error(rhs_loc, errors::REASSIGNS_TYPE_ALIAS) {
            e.set_header("Reassigning a type alias is not allowed");
            let def_loc = gs.symbols.get(rhs_sym).map_or(Loc::none(), |s| s.loc);
            e.add_error_line(def_loc, "Originally defined here");
            let shown = gs.symbols.show(&gs.names, rhs_sym);
            e.replace_with("Declare as type alias", rhs_loc, format!("T.type_alias({shown})"));
        }
        if let Some(lhs) = gs.symbols.get_mut(job.lhs) {
            lhs.result_type = Some(TypeId::UNTYPED);
        }
        return true;
    }

    if gs.symbols.dealias(&gs.types, rhs_sym) != job.lhs {
        let alias = gs.types.alias(rhs_sym);
        if let Some(lhs) = gs.symbols.get_mut(job.lhs) {
            lhs.result_type = Some(alias);
        }
    } else {
        let lhs_loc = gs.symbols.get(job.lhs).map_or(Loc::none(), |s| s.loc);
        if let Some(mut e) = gs.begin_error(lhs_loc, errors::RECURSIVE_CLASS_ALIAS) {
            e.set_header("Class alias aliases to itself");
        }
        if let Some(lhs) = gs.symbols.get_mut(job.lhs) {
            lhs.result_type = Some(TypeId::UNTYPED);
        }
    }
    true
}

fn resolve_type_alias_job(
    gs: &mut GlobalState,
    trees: &[ParsedFile],
    index: &TreeIndex,
    job: &TypeAliasResolutionItem,
) -> bool {
    let arena = arena_of(trees, index, job.file);

    // Type aliases inside generic classes would capture type members with
    // no instantiation to bind them.
    let mut enclosing = gs
        .symbols
        .enclosing_class(gs.symbols.get(job.lhs).map_or(SymbolId::NONE, |s| s.owner));
    let mut enclosing_type_member = SymbolId::NONE;
    while enclosing.exists() && enclosing != reserved::ROOT {
        if let Some(sym) = gs.symbols.get(enclosing)
            && let Some(member) = sym.type_member_ids(&gs.symbols).next()
        {
            enclosing_type_member = member;
            break;
        }
        let owner = gs.symbols.get(enclosing).map_or(SymbolId::NONE, |s| s.owner);
        enclosing = gs.symbols.enclosing_class(owner);
    }
    if enclosing_type_member.exists() {
        let rhs_loc = arena.loc(job.rhs);
        if let Some(mut e) = gs.begin_error(rhs_loc, errors::TYPE_ALIAS_IN_GENERIC_CLASS) {
            e.set_header("Type aliases are not allowed in generic classes");
            let member_loc = gs
                .symbols
                .get(enclosing_type_member)
                .map_or(Loc::none(), |s| s.loc);
            e.add_error_line(member_loc, "Here is enclosing generic member");
        }
        if let Some(lhs) = gs.symbols.get_mut(job.lhs) {
            lhs.result_type = Some(TypeId::UNTYPED);
        }
        return true;
    }

    if !is_fully_resolved(gs, arena, job.rhs) {
        return false;
    }

    let ty = type_syntax::get_result_type(
        gs,
        arena,
        job.rhs,
        &ParsedSig::default(),
        &TypeSyntaxArgs {
            allow_self_type: true,
            allow_rebind: false,
            allow_type_member: true,
            owner: job.lhs,
        },
    );
    if let Some(lhs) = gs.symbols.get_mut(job.lhs) {
        lhs.result_type = Some(ty);
    }
    true
}

/// Report and stub a constant the fixpoint could not resolve.
fn constant_resolution_failed(
    gs: &mut GlobalState,
    trees: &mut [ParsedFile],
    index: &TreeIndex,
    job: &ResolutionItem,
) {
    let arena = arena_of(trees, index, job.file);
    let Some(original) = original_of(arena, job.out) else {
        return;
    };
    let out_loc = arena.loc(job.out);

    let resolved = resolve_constant(gs, &gs.errors, arena, &job.nesting, original);
    if resolved.exists() {
        if gs.symbols.get(resolved).is_some_and(|s| s.is_type_alias()) {
            if gs.symbols.get(resolved).is_some_and(|s| s.result_type.is_none()) {
                // A use-site error, reported once: the first use that gets
                // here writes the untyped result and silences the rest.
                let alias_loc = gs.symbols.get(resolved).map_or(Loc::none(), |s| s.loc);
                if let Some(mut e) = gs.begin_error(alias_loc, errors::RECURSIVE_TYPE_ALIAS) {
                    let shown = gs.symbols.show(&gs.names, resolved);
                    e.set_header(format!(
                        "Unable to resolve right hand side of type alias `{shown}`"
                    ));
                    e.add_error_line(out_loc, "Type alias used here");
                }
                if let Some(sym) = gs.symbols.get_mut(resolved) {
                    sym.result_type = Some(TypeId::UNTYPED);
                }
            }
            let arena = arena_of_mut(trees, index, job.file);
            set_constant_symbol(arena, job.out, resolved);
            return;
        }
        let arena = arena_of_mut(trees, index, job.file);
        set_constant_symbol(arena, job.out, resolved);
        return;
    }

    let arena = arena_of(trees, index, job.file);
    let (name, scope_node) = match arena.kind(original) {
        NodeKind::UnresolvedConstant { scope, name } => (*name, *scope),
        _ => return,
    };
    let mut scope = match arena.kind(scope_node) {
        NodeKind::Constant { symbol, .. } if symbol.exists() => {
            gs.symbols.dealias(&gs.types, *symbol)
        }
        _ => job.nesting.scope,
    };

    let custom_generated = name == well_known::SUBCLASSES;
    if scope != reserved::STUB_MODULE || custom_generated {
        if let Some(mut e) = gs.begin_error(out_loc, errors::STUB_CONSTANT) {
            let shown = gs.names.resolve(name);
            e.set_header(format!("Unable to resolve constant `{shown}`"));
            if custom_generated {
                e.add_error_section(vec![ErrorLine::new(
                    Loc::none(),
                    "This constant is normally generated; its source may need to be regenerated",
                )]);
            } else if gs.symbols.get(scope).is_some_and(|s| s.is_class()) {
                let mut suggested = gs.symbols.find_member_fuzzy_match(&gs.names, scope, name);
                suggested.truncate(3);
                if !suggested.is_empty() {
                    let lines = suggested
                        .into_iter()
                        .map(|(sym, _)| {
                            let shown = gs.symbols.show(&gs.names, sym);
                            let loc = gs.symbols.get(sym).map_or(Loc::none(), |s| s.loc);
                            ErrorLine::new(loc, format!("Did you mean: `{shown}`?"))
                        })
                        .collect();
                    e.add_error_section(lines);
                }
            }
        }
    }

    if scope == reserved::STUB_MODULE {
        scope = SymbolId::NONE;
    }

    let arena = arena_of_mut(trees, index, job.file);
    if let NodeKind::Constant {
        symbol,
        resolution_scope,
        ..
    } = arena.kind_mut(job.out)
    {
        *symbol = reserved::STUB_MODULE;
        *resolution_scope = scope;
    }
}

// =============================================================================
// Driver
// =============================================================================

fn loc_of_item(trees: &[ParsedFile], index: &TreeIndex, file: FileId, node: NodeId) -> Loc {
    arena_of(trees, index, file).loc(node)
}

/// `(file, begin, end)` ordering used before the fixpoint runs.
fn loc_compare(a: Loc, b: Loc) -> std::cmp::Ordering {
    a.cmp(&b)
}

/// Failure-report ordering: strictest file first, then file id, then
/// offsets. Ties (identical locations) break on constant nesting depth so
/// `A::B::Missing` reports `Missing` once, at the shallowest site.
fn failed_compare(
    gs: &GlobalState,
    a: (Loc, u32),
    b: (Loc, u32),
) -> std::cmp::Ordering {
    let (a_loc, a_depth) = a;
    let (b_loc, b_depth) = b;
    if a_loc == b_loc {
        return a_depth.cmp(&b_depth);
    }
    let a_strict = strict_of(gs, a_loc);
    let b_strict = strict_of(gs, b_loc);
    b_strict
        .cmp(&a_strict)
        .then_with(|| loc_compare(a_loc, b_loc))
}

fn strict_of(gs: &GlobalState, loc: Loc) -> StrictLevel {
    if loc.exists() {
        gs.files.strict_level(loc.file)
    } else {
        StrictLevel::Strong
    }
}

pub fn resolve_constants(
    gs: &mut GlobalState,
    trees: Vec<ParsedFile>,
    workers: usize,
) -> Vec<ParsedFile> {
    let tree_count = trees.len();
    tracing::debug!(files = tree_count, workers, "resolve_constants: pre-walk");

    let mut results: Vec<ResolveWalkResult> = {
        let gs_ref: &GlobalState = gs;
        if workers <= 1 {
            trees.into_iter().map(|tree| walk_file(gs_ref, tree)).collect()
        } else {
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(|| {
                    trees
                        .into_par_iter()
                        .map(|tree| walk_file(gs_ref, tree))
                        .collect()
                }),
                Err(_) => trees
                    .into_par_iter()
                    .map(|tree| walk_file(gs_ref, tree))
                    .collect(),
            }
        }
    };

    // Merge worker output in file order so nothing downstream can observe
    // the scheduling.
    results.sort_by_key(|r| r.tree.file);

    let mut trees: Vec<ParsedFile> = Vec::with_capacity(tree_count);
    let mut todo: Vec<ResolutionItem> = Vec::new();
    let mut todo_ancestors: Vec<AncestorResolutionItem> = Vec::new();
    let mut todo_class_aliases: Vec<ClassAliasResolutionItem> = Vec::new();
    let mut todo_type_aliases: Vec<TypeAliasResolutionItem> = Vec::new();
    for result in results {
        gs.errors.absorb(result.errors);
        todo.extend(result.todo);
        todo_ancestors.extend(result.todo_ancestors);
        todo_class_aliases.extend(result.todo_class_aliases);
        todo_type_aliases.extend(result.todo_type_aliases);
        trees.push(result.tree);
    }

    let index: TreeIndex = trees
        .iter()
        .enumerate()
        .map(|(i, tree)| (tree.file, i))
        .collect();

    todo.sort_by(|a, b| {
        loc_compare(
            loc_of_item(&trees, &index, a.file, a.out),
            loc_of_item(&trees, &index, b.file, b.out),
        )
    });
    todo_ancestors.sort_by(|a, b| {
        loc_compare(
            loc_of_item(&trees, &index, a.file, a.ancestor),
            loc_of_item(&trees, &index, b.file, b.ancestor),
        )
    });
    todo_class_aliases.sort_by(|a, b| {
        loc_compare(
            loc_of_item(&trees, &index, a.file, a.rhs),
            loc_of_item(&trees, &index, b.file, b.rhs),
        )
    });
    todo_type_aliases.sort_by(|a, b| {
        loc_compare(
            loc_of_item(&trees, &index, a.file, a.rhs),
            loc_of_item(&trees, &index, b.file, b.rhs),
        )
    });

    let mut progress = true;
    let mut first = true;
    // The first iteration must run even with empty constant lists, to give
    // class aliases and type aliases their initial chance.
    while progress && (first || !todo.is_empty() || !todo_ancestors.is_empty()) {
        first = false;
        tracing::debug!(
            constants = todo.len(),
            ancestors = todo_ancestors.len(),
            class_aliases = todo_class_aliases.len(),
            type_aliases = todo_type_aliases.len(),
            "resolve_constants: fixpoint iteration"
        );

        // Ancestors go first: attaching one typically unblocks every
        // lookup that transits the new ancestor chain.
        let before = todo_ancestors.len();
        todo_ancestors.retain(|job| {
            let done = resolve_ancestor_job(gs, &mut trees, &index, job, false);
            if done {
                try_register_sealed_subclass(gs, &trees, &index, job);
            }
            !done
        });
        progress = before != todo_ancestors.len();

        let before = todo.len();
        todo.retain(|job| {
            let arena = arena_of_mut(&mut trees, &index, job.file);
            let gs_ref: &GlobalState = &*gs;
            !resolve_job(gs_ref, &gs_ref.errors, arena, job)
        });
        progress |= before != todo.len();

        let before = todo_class_aliases.len();
        todo_class_aliases.retain(|job| !resolve_class_alias_job(gs, &trees, &index, job));
        progress |= before != todo_class_aliases.len();

        let before = todo_type_aliases.len();
        todo_type_aliases.retain(|job| !resolve_type_alias_job(gs, &trees, &index, job));
        progress |= before != todo_type_aliases.len();
    }

    // No further progress is possible; everything from here on reports.
    tracing::debug!(
        unresolved_constants = todo.len(),
        unresolved_ancestors = todo_ancestors.len(),
        "resolve_constants: fixpoint done"
    );

    todo.sort_by(|a, b| {
        let a_loc = loc_of_item(&trees, &index, a.file, a.out);
        let b_loc = loc_of_item(&trees, &index, b.file, b.out);
        let a_depth = arena_of(&trees, &index, a.file).constant_depth(a.out);
        let b_depth = arena_of(&trees, &index, b.file).constant_depth(b.out);
        failed_compare(gs, (a_loc, a_depth), (b_loc, b_depth))
    });
    todo_ancestors.sort_by(|a, b| {
        let a_loc = loc_of_item(&trees, &index, a.file, a.ancestor);
        let b_loc = loc_of_item(&trees, &index, b.file, b.ancestor);
        let a_depth = arena_of(&trees, &index, a.file).constant_depth(a.ancestor);
        let b_depth = arena_of(&trees, &index, b.file).constant_depth(b.ancestor);
        failed_compare(gs, (a_loc, a_depth), (b_loc, b_depth))
    });

    for job in &todo {
        constant_resolution_failed(gs, &mut trees, &index, job);
    }
    for job in &todo_ancestors {
        let resolved = resolve_ancestor_job(gs, &mut trees, &index, job, true);
        debug_assert!(resolved, "final ancestor run must always settle");
    }

    trees
}
