//! Symbol storage, lookup, and ancestry queries.
//!
//! Symbols are created by the namer pass, mutated by the resolver
//! (superclasses, mixins, result types, bounds, flags), and never
//! destroyed. Member tables are insertion-ordered so every iteration that
//! can leak into diagnostics is deterministic.

use crate::names::{NameId, NameInterner, UniqueNameKind, well_known};
use crate::types::TypeId;
use indexmap::IndexMap;
use rbz_common::Loc;
use rustc_hash::FxHashSet;

/// Stable symbol id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const NONE: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub const fn exists(&self) -> bool {
        self.0 != u32::MAX
    }
}

/// Reserved symbols every table starts with, in allocation order.
pub mod reserved {
    use super::SymbolId;

    pub const ROOT: SymbolId = SymbolId(0);
    pub const TODO: SymbolId = SymbolId(1);
    pub const UNTYPED: SymbolId = SymbolId(2);
    pub const STUB_MODULE: SymbolId = SymbolId(3);
    pub const STUB_SUPER_CLASS: SymbolId = SymbolId(4);
    pub const STUB_MIXIN: SymbolId = SymbolId(5);
    pub const OBJECT: SymbolId = SymbolId(6);
    pub const BASIC_OBJECT: SymbolId = SymbolId(7);
    pub const T: SymbolId = SymbolId(8);
    pub const MAGIC: SymbolId = SymbolId(9);
    pub const BAD_ALIAS_METHOD_STUB: SymbolId = SymbolId(10);

    /// First id handed to user symbols.
    pub const FIRST_USER: u32 = 11;

    /// The three sentinels written into slots that failed to resolve.
    pub const STUBS: [SymbolId; 3] = [STUB_MODULE, STUB_SUPER_CLASS, STUB_MIXIN];
}

/// Bit flags on symbols. Class and method flags share the field; a
/// symbol's kind disambiguates.
pub mod symbol_flags {
    pub const CLASS_MODULE: u32 = 1 << 0;
    pub const CLASS_ABSTRACT: u32 = 1 << 1;
    pub const CLASS_INTERFACE: u32 = 1 << 2;
    pub const CLASS_SEALED: u32 = 1 << 3;
    pub const CLASS_FINAL: u32 = 1 << 4;
    pub const CLASS_SINGLETON: u32 = 1 << 5;

    pub const METHOD_ABSTRACT: u32 = 1 << 8;
    pub const METHOD_OVERRIDE: u32 = 1 << 9;
    pub const METHOD_OVERRIDABLE: u32 = 1 << 10;
    pub const METHOD_FINAL: u32 = 1 << 11;
    pub const METHOD_INCOMPATIBLE_OVERRIDE: u32 = 1 << 12;
    pub const METHOD_GENERATED_SIG: u32 = 1 << 13;
    pub const METHOD_GENERIC: u32 = 1 << 14;
    pub const METHOD_OVERLOADED: u32 = 1 << 15;

    /// Static field declared with `T.type_alias`.
    pub const TYPE_ALIAS: u32 = 1 << 16;

    /// Type arguments materialized from a generic sig are covariant.
    pub const TYPE_ARG_COVARIANT: u32 = 1 << 17;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Method,
    StaticField,
    Field,
    TypeMember,
    TypeArgument,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArgFlags {
    pub keyword: bool,
    pub block: bool,
    pub repeated: bool,
    pub default: bool,
}

/// One argument of a method symbol.
#[derive(Clone, Debug)]
pub struct ArgInfo {
    pub name: NameId,
    pub loc: Loc,
    pub flags: ArgFlags,
    /// `TypeId::NONE` until a sig assigns one.
    pub ty: TypeId,
    pub rebind: SymbolId,
}

impl ArgInfo {
    pub fn new(name: NameId, loc: Loc, flags: ArgFlags) -> Self {
        ArgInfo {
            name,
            loc,
            flags,
            ty: TypeId::NONE,
            rebind: SymbolId::NONE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: NameId,
    pub owner: SymbolId,
    pub loc: Loc,
    pub kind: SymbolKind,
    pub flags: u32,
    /// Classes only. `reserved::TODO` until an ancestor job or
    /// `finalize_ancestors` fills it in; `SymbolId::NONE` for modules.
    pub superclass: SymbolId,
    pub mixins: Vec<SymbolId>,
    pub members: IndexMap<NameId, SymbolId>,
    pub result_type: Option<TypeId>,
    /// Type members only: `(lower, upper)`.
    pub bounds: Option<(TypeId, TypeId)>,
    pub arguments: Vec<ArgInfo>,
    pub sealed_subclasses: Vec<SymbolId>,
    /// Lazily-created singleton class of a class symbol.
    pub singleton_class: SymbolId,
    /// Method sig `bind` target.
    pub rebind: SymbolId,
}

impl Symbol {
    fn new(name: NameId, owner: SymbolId, loc: Loc, kind: SymbolKind) -> Self {
        Symbol {
            name,
            owner,
            loc,
            kind,
            flags: 0,
            superclass: if matches!(kind, SymbolKind::Class) {
                reserved::TODO
            } else {
                SymbolId::NONE
            },
            mixins: Vec::new(),
            members: IndexMap::new(),
            result_type: None,
            bounds: None,
            arguments: Vec::new(),
            sealed_subclasses: Vec::new(),
            singleton_class: SymbolId::NONE,
            rebind: SymbolId::NONE,
        }
    }

    #[inline]
    pub fn is_class(&self) -> bool {
        matches!(self.kind, SymbolKind::Class)
    }

    #[inline]
    pub fn is_module(&self) -> bool {
        self.is_class() && self.flags & symbol_flags::CLASS_MODULE != 0
    }

    #[inline]
    pub fn is_method(&self) -> bool {
        matches!(self.kind, SymbolKind::Method)
    }

    #[inline]
    pub fn is_static_field(&self) -> bool {
        matches!(self.kind, SymbolKind::StaticField)
    }

    #[inline]
    pub fn is_type_member(&self) -> bool {
        matches!(self.kind, SymbolKind::TypeMember)
    }

    #[inline]
    pub fn is_type_alias(&self) -> bool {
        self.flags & symbol_flags::TYPE_ALIAS != 0
    }

    /// Type members declared on this class, in declaration order.
    pub fn type_member_ids<'a>(
        &'a self,
        table: &'a SymbolTable,
    ) -> impl Iterator<Item = SymbolId> + 'a {
        self.members
            .values()
            .copied()
            .filter(move |&id| table.get(id).is_some_and(Symbol::is_type_member))
    }
}

/// Flat symbol arena plus ancestry queries over it.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    /// Filled by `finalize_symbols`; consulted by transitive lookups once
    /// present.
    linearizations: Vec<Option<Vec<SymbolId>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            symbols: Vec::new(),
            linearizations: Vec::new(),
        };

        let module = |table: &mut SymbolTable, name: NameId| {
            let id = table.alloc(Symbol::new(name, reserved::ROOT, Loc::none(), SymbolKind::Class));
            let sym = table.get_mut(id).unwrap();
            sym.flags |= symbol_flags::CLASS_MODULE;
            sym.superclass = SymbolId::NONE;
            id
        };

        let root = module(&mut table, well_known::ROOT);
        debug_assert_eq!(root, reserved::ROOT);
        table.get_mut(root).unwrap().owner = SymbolId::NONE;

        debug_assert_eq!(module(&mut table, well_known::TODO), reserved::TODO);
        debug_assert_eq!(module(&mut table, well_known::UNTYPED_NAME), reserved::UNTYPED);
        debug_assert_eq!(module(&mut table, well_known::STUB_MODULE), reserved::STUB_MODULE);

        let stub_super = table.alloc(Symbol::new(
            well_known::STUB_SUPER_CLASS,
            reserved::ROOT,
            Loc::none(),
            SymbolKind::Class,
        ));
        debug_assert_eq!(stub_super, reserved::STUB_SUPER_CLASS);
        table.get_mut(stub_super).unwrap().superclass = SymbolId::NONE;

        debug_assert_eq!(module(&mut table, well_known::STUB_MIXIN), reserved::STUB_MIXIN);

        let object = table.alloc(Symbol::new(
            well_known::OBJECT,
            reserved::ROOT,
            Loc::none(),
            SymbolKind::Class,
        ));
        debug_assert_eq!(object, reserved::OBJECT);
        let basic_object = table.alloc(Symbol::new(
            well_known::BASIC_OBJECT,
            reserved::ROOT,
            Loc::none(),
            SymbolKind::Class,
        ));
        debug_assert_eq!(basic_object, reserved::BASIC_OBJECT);
        table.get_mut(object).unwrap().superclass = basic_object;
        table.get_mut(basic_object).unwrap().superclass = SymbolId::NONE;

        debug_assert_eq!(module(&mut table, well_known::T), reserved::T);
        debug_assert_eq!(module(&mut table, well_known::MAGIC), reserved::MAGIC);

        let bad_alias = table.alloc(Symbol::new(
            well_known::BAD_ALIAS_METHOD_STUB,
            reserved::ROOT,
            Loc::none(),
            SymbolKind::Method,
        ));
        debug_assert_eq!(bad_alias, reserved::BAD_ALIAS_METHOD_STUB);

        // Lexically visible roots. Stubs and Magic are deliberately not
        // members of anything, so lookups can never land on them.
        for id in [object, basic_object, reserved::T] {
            let name = table.get(id).unwrap().name;
            table.get_mut(reserved::ROOT).unwrap().members.insert(name, id);
        }

        table
    }

    fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        self.linearizations.push(None);
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        if id.exists() {
            self.symbols.get(id.0 as usize)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        if !id.exists() || id.0 as usize >= self.symbols.len() {
            return None;
        }
        // Any mutation may invalidate a cached linearization.
        self.linearizations[id.0 as usize] = None;
        self.symbols.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> {
        (0..self.symbols.len() as u32).map(SymbolId)
    }

    /// Fully-qualified display name, e.g. `Outer::Inner`.
    pub fn show(&self, names: &NameInterner, id: SymbolId) -> String {
        if !id.exists() {
            return "<none>".to_string();
        }
        let mut parts = Vec::new();
        let mut cur = id;
        while cur.exists() && cur != reserved::ROOT {
            let Some(sym) = self.get(cur) else { break };
            parts.push(names.resolve(sym.name).to_string());
            cur = sym.owner;
        }
        parts.reverse();
        parts.join("::")
    }

    // =========================================================================
    // Entering symbols
    // =========================================================================

    pub fn enter_class_symbol(
        &mut self,
        loc: Loc,
        owner: SymbolId,
        name: NameId,
        is_module: bool,
    ) -> SymbolId {
        if let Some(existing) = self.find_member(owner, name)
            && self.get(existing).is_some_and(Symbol::is_class)
        {
            return existing;
        }
        let mut sym = Symbol::new(name, owner, loc, SymbolKind::Class);
        if is_module {
            sym.flags |= symbol_flags::CLASS_MODULE;
            sym.superclass = SymbolId::NONE;
        }
        let id = self.alloc(sym);
        self.add_member(owner, name, id);
        id
    }

    pub fn enter_method_symbol(&mut self, loc: Loc, owner: SymbolId, name: NameId) -> SymbolId {
        if let Some(existing) = self.find_member(owner, name)
            && self.get(existing).is_some_and(Symbol::is_method)
        {
            return existing;
        }
        let id = self.alloc(Symbol::new(name, owner, loc, SymbolKind::Method));
        self.add_member(owner, name, id);
        id
    }

    pub fn enter_field_symbol(&mut self, loc: Loc, owner: SymbolId, name: NameId) -> SymbolId {
        self.enter_plain(loc, owner, name, SymbolKind::Field)
    }

    pub fn enter_static_field_symbol(
        &mut self,
        loc: Loc,
        owner: SymbolId,
        name: NameId,
    ) -> SymbolId {
        self.enter_plain(loc, owner, name, SymbolKind::StaticField)
    }

    pub fn enter_type_member(&mut self, loc: Loc, owner: SymbolId, name: NameId) -> SymbolId {
        self.enter_plain(loc, owner, name, SymbolKind::TypeMember)
    }

    /// Fresh covariant type argument on a generic method.
    pub fn enter_type_argument(&mut self, loc: Loc, method: SymbolId, name: NameId) -> SymbolId {
        let id = self.alloc(Symbol::new(name, method, loc, SymbolKind::TypeArgument));
        if let Some(sym) = self.get_mut(id) {
            sym.flags |= symbol_flags::TYPE_ARG_COVARIANT;
        }
        self.add_member(method, name, id);
        id
    }

    fn enter_plain(
        &mut self,
        loc: Loc,
        owner: SymbolId,
        name: NameId,
        kind: SymbolKind,
    ) -> SymbolId {
        if let Some(existing) = self.find_member(owner, name)
            && self.get(existing).is_some_and(|s| s.kind == kind)
        {
            return existing;
        }
        let id = self.alloc(Symbol::new(name, owner, loc, kind));
        self.add_member(owner, name, id);
        id
    }

    fn add_member(&mut self, owner: SymbolId, name: NameId, member: SymbolId) {
        if let Some(owner_sym) = self.get_mut(owner) {
            owner_sym.members.insert(name, member);
        }
    }

    /// Rename a symbol out of the way, freeing its name slot on the owner.
    /// Used before entering overload alternatives for a method.
    pub fn mangle_rename_symbol(&mut self, names: &mut NameInterner, id: SymbolId) {
        let Some(sym) = self.get(id) else { return };
        let (owner, old_name) = (sym.owner, sym.name);
        let fresh = names.fresh_unique(UniqueNameKind::MangleRename, old_name, id.0);
        if let Some(owner_sym) = self.get_mut(owner)
            && owner_sym.members.get(&old_name) == Some(&id)
        {
            owner_sym.members.shift_remove(&old_name);
            owner_sym.members.insert(fresh, id);
        }
        if let Some(sym) = self.get_mut(id) {
            sym.name = fresh;
        }
    }

    /// Enter one overload alternative of a mangled method, keeping only the
    /// argument positions its sig mentions. The last alternative is entered
    /// under the original name so ordinary lookup still finds the method.
    pub fn enter_new_method_overload(
        &mut self,
        names: &mut NameInterner,
        loc: Loc,
        original: SymbolId,
        original_name: NameId,
        num: u32,
        args_to_keep: &[usize],
        is_last: bool,
    ) -> SymbolId {
        let owner = self.get(original).map_or(SymbolId::NONE, |s| s.owner);
        let kept: Vec<ArgInfo> = self
            .get(original)
            .map(|s| {
                s.arguments
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| args_to_keep.contains(i))
                    .map(|(_, a)| a.clone())
                    .collect()
            })
            .unwrap_or_default();

        let name = if is_last {
            original_name
        } else {
            names.fresh_unique(UniqueNameKind::Overload, original_name, num)
        };
        let id = self.alloc(Symbol::new(name, owner, loc, SymbolKind::Method));
        if let Some(sym) = self.get_mut(id) {
            sym.arguments = kept;
        }
        self.add_member(owner, name, id);
        id
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Direct member lookup, no inheritance.
    pub fn find_member(&self, scope: SymbolId, name: NameId) -> Option<SymbolId> {
        self.get(scope)?.members.get(&name).copied()
    }

    /// Member lookup through the ancestor chain: the receiver itself, then
    /// mixins from last-included to first, then the superclass, recursively.
    pub fn find_member_transitive(&self, scope: SymbolId, name: NameId) -> Option<SymbolId> {
        if let Some(Some(linear)) = self.linearizations.get(scope.0 as usize) {
            return linear
                .iter()
                .find_map(|&ancestor| self.find_member(ancestor, name));
        }
        let mut visited = FxHashSet::default();
        self.find_member_transitive_inner(scope, name, &mut visited)
    }

    fn find_member_transitive_inner(
        &self,
        scope: SymbolId,
        name: NameId,
        visited: &mut FxHashSet<SymbolId>,
    ) -> Option<SymbolId> {
        if !scope.exists() || !visited.insert(scope) {
            return None;
        }
        if let Some(found) = self.find_member(scope, name) {
            return Some(found);
        }
        let sym = self.get(scope)?;
        for &mixin in sym.mixins.iter().rev() {
            if let Some(found) = self.find_member_transitive_inner(mixin, name, visited) {
                return Some(found);
            }
        }
        if sym.superclass.exists() && sym.superclass != reserved::TODO {
            return self.find_member_transitive_inner(sym.superclass, name, visited);
        }
        None
    }

    /// Near-miss member candidates for did-you-mean suggestions: bounded
    /// edit distance over the scope's members and its ancestors', sorted by
    /// distance then name so suggestions are deterministic.
    pub fn find_member_fuzzy_match(
        &self,
        names: &NameInterner,
        scope: SymbolId,
        name: NameId,
    ) -> Vec<(SymbolId, usize)> {
        let wanted = names.resolve(name);
        let mut seen = FxHashSet::default();
        let mut out: Vec<(SymbolId, usize, &str)> = Vec::new();

        let mut scopes = vec![scope];
        let mut visited = FxHashSet::default();
        while let Some(cur) = scopes.pop() {
            if !cur.exists() || !visited.insert(cur) {
                continue;
            }
            let Some(sym) = self.get(cur) else { continue };
            for (&member_name, &member) in &sym.members {
                if !seen.insert(member) {
                    continue;
                }
                let candidate = names.resolve(member_name);
                if let Some(distance) = edit_distance_within(wanted, candidate, 2)
                    && distance > 0
                    && distance < wanted.len().max(1)
                {
                    out.push((member, distance, candidate));
                }
            }
            for &mixin in sym.mixins.iter().rev() {
                scopes.push(mixin);
            }
            if sym.superclass.exists() && sym.superclass != reserved::TODO {
                scopes.push(sym.superclass);
            }
        }

        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.2.cmp(b.2)));
        out.into_iter().map(|(id, d, _)| (id, d)).collect()
    }

    /// Follow alias result types to the symbol they name.
    pub fn dealias(&self, types: &crate::types::TypeStore, id: SymbolId) -> SymbolId {
        let mut cur = id;
        // Alias chains are short; the bound guards against cycles a
        // malformed program could otherwise introduce.
        for _ in 0..64 {
            let Some(sym) = self.get(cur) else { return cur };
            let Some(ty) = sym.result_type else { return cur };
            match types.lookup(ty) {
                Some(crate::types::TypeKey::Alias(target)) if !sym.is_type_alias() => cur = target,
                _ => return cur,
            }
        }
        cur
    }

    /// Whether `child` transitively inherits from `parent` through its
    /// superclass chain or mixins.
    pub fn derives_from(&self, child: SymbolId, parent: SymbolId) -> bool {
        let mut visited = FxHashSet::default();
        self.derives_from_inner(child, parent, &mut visited)
    }

    fn derives_from_inner(
        &self,
        child: SymbolId,
        parent: SymbolId,
        visited: &mut FxHashSet<SymbolId>,
    ) -> bool {
        if !child.exists() || !visited.insert(child) {
            return false;
        }
        let Some(sym) = self.get(child) else {
            return false;
        };
        for &mixin in &sym.mixins {
            if mixin == parent || self.derives_from_inner(mixin, parent, visited) {
                return true;
            }
        }
        if sym.superclass.exists() && sym.superclass != reserved::TODO {
            if sym.superclass == parent {
                return true;
            }
            return self.derives_from_inner(sym.superclass, parent, visited);
        }
        false
    }

    /// Nearest class symbol enclosing `id`, including `id` itself.
    pub fn enclosing_class(&self, id: SymbolId) -> SymbolId {
        let mut cur = id;
        while cur.exists() {
            let Some(sym) = self.get(cur) else {
                return SymbolId::NONE;
            };
            if sym.is_class() {
                return cur;
            }
            cur = sym.owner;
        }
        SymbolId::NONE
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    pub fn set_super_class(&mut self, id: SymbolId, superclass: SymbolId) {
        if let Some(sym) = self.get_mut(id) {
            sym.superclass = superclass;
        }
    }

    /// Re-including an already-present mixin is a no-op, as in the
    /// language itself.
    pub fn add_mixin(&mut self, id: SymbolId, mixin: SymbolId) {
        if let Some(sym) = self.get_mut(id)
            && !sym.mixins.contains(&mixin)
        {
            sym.mixins.push(mixin);
        }
    }

    pub fn record_sealed_subclass(&mut self, sealed: SymbolId, subclass: SymbolId) {
        if let Some(sym) = self.get_mut(sealed)
            && !sym.sealed_subclasses.contains(&subclass)
        {
            sym.sealed_subclasses.push(subclass);
        }
    }

    /// The singleton class of a class symbol, created on demand.
    pub fn singleton_class(&mut self, names: &mut NameInterner, of: SymbolId) -> SymbolId {
        if let Some(existing) = self.lookup_singleton_class(of) {
            return existing;
        }
        let Some(sym) = self.get(of) else {
            return SymbolId::NONE;
        };
        let (owner, loc, base_name) = (sym.owner, sym.loc, sym.name);
        let name = {
            let text = format!("<singleton>{}", names.resolve(base_name));
            names.enter(&text)
        };
        let id = self.alloc(Symbol::new(name, owner, loc, SymbolKind::Class));
        if let Some(singleton) = self.get_mut(id) {
            singleton.flags |= symbol_flags::CLASS_SINGLETON;
        }
        if let Some(sym) = self.get_mut(of) {
            sym.singleton_class = id;
        }
        id
    }

    pub fn lookup_singleton_class(&self, of: SymbolId) -> Option<SymbolId> {
        let id = self.get(of)?.singleton_class;
        id.exists().then_some(id)
    }

    /// Whether `id` is the singleton class of some class.
    pub fn is_singleton_class(&self, id: SymbolId) -> bool {
        self.get(id)
            .is_some_and(|s| s.flags & symbol_flags::CLASS_SINGLETON != 0)
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Default every user class whose superclass is still unset to
    /// `Object`, and give singleton classes their class's singleton chain.
    pub fn finalize_ancestors(&mut self) {
        for idx in reserved::FIRST_USER..self.symbols.len() as u32 {
            let id = SymbolId(idx);
            let Some(sym) = self.get(id) else { continue };
            if sym.is_class() && !sym.is_module() && sym.superclass == reserved::TODO {
                self.set_super_class(id, reserved::OBJECT);
            }
        }
    }

    /// Cache the full ancestor linearization of every class; consulted by
    /// `find_member_transitive` in the passes that follow resolution.
    pub fn finalize_symbols(&mut self) {
        for idx in 0..self.symbols.len() as u32 {
            let id = SymbolId(idx);
            if !self.get(id).is_some_and(Symbol::is_class) {
                continue;
            }
            let mut linear = Vec::new();
            let mut visited = FxHashSet::default();
            self.linearize_into(id, &mut linear, &mut visited);
            self.linearizations[idx as usize] = Some(linear);
        }
    }

    fn linearize_into(
        &self,
        id: SymbolId,
        out: &mut Vec<SymbolId>,
        visited: &mut FxHashSet<SymbolId>,
    ) {
        if !id.exists() || !visited.insert(id) {
            return;
        }
        out.push(id);
        let Some(sym) = self.get(id) else { return };
        let mixins = sym.mixins.clone();
        let superclass = sym.superclass;
        for &mixin in mixins.iter().rev() {
            self.linearize_into(mixin, out, visited);
        }
        if superclass.exists() && superclass != reserved::TODO {
            self.linearize_into(superclass, out, visited);
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Levenshtein distance, bounded: returns `None` when the distance exceeds
/// `max`.
fn edit_distance_within(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        let mut row_min = cur[0];
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
            row_min = row_min.min(cur[j + 1]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (prev[b.len()] <= max).then_some(prev[b.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameInterner;

    fn setup() -> (SymbolTable, NameInterner) {
        (SymbolTable::new(), NameInterner::new())
    }

    #[test]
    fn reserved_symbols_have_fixed_ids() {
        let (table, names) = setup();
        assert_eq!(table.show(&names, reserved::OBJECT), "Object");
        assert!(table.get(reserved::STUB_MODULE).unwrap().is_module());
        assert_eq!(
            table.find_member(reserved::ROOT, well_known::OBJECT),
            Some(reserved::OBJECT)
        );
        // Stubs are hidden from lookup.
        assert_eq!(table.find_member(reserved::ROOT, well_known::STUB_MODULE), None);
    }

    #[test]
    fn transitive_lookup_prefers_mixins_over_superclass() {
        let (mut table, mut names) = setup();
        let m = names.enter("m");
        let base = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("Base"), false);
        let mixin = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("Mix"), true);
        let child = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("Child"), false);

        let base_m = table.enter_method_symbol(Loc::none(), base, m);
        let mixin_m = table.enter_method_symbol(Loc::none(), mixin, m);
        table.set_super_class(child, base);
        table.add_mixin(child, mixin);

        assert_eq!(table.find_member_transitive(child, m), Some(mixin_m));
        table.get_mut(mixin).unwrap().members.shift_remove(&m);
        assert_eq!(table.find_member_transitive(child, m), Some(base_m));
    }

    #[test]
    fn derives_from_sees_mixins_and_superclasses() {
        let (mut table, mut names) = setup();
        let a = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("A"), false);
        let b = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("B"), false);
        let mix = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("M"), true);
        table.set_super_class(b, a);
        table.add_mixin(a, mix);
        assert!(table.derives_from(b, a));
        assert!(table.derives_from(b, mix));
        assert!(!table.derives_from(a, b));
    }

    #[test]
    fn fuzzy_match_is_sorted_and_bounded() {
        let (mut table, mut names) = setup();
        let scope = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("S"), false);
        for member in ["Foo", "Fop", "Unrelated"] {
            let name = names.enter(member);
            table.enter_class_symbol(Loc::none(), scope, name, false);
        }
        let wanted = names.enter("Fo");
        let matches = table.find_member_fuzzy_match(&names, scope, wanted);
        let shown: Vec<_> = matches
            .iter()
            .map(|(id, _)| table.show(&names, *id))
            .collect();
        assert_eq!(shown, vec!["S::Foo", "S::Fop"]);
    }

    #[test]
    fn finalize_ancestors_defaults_to_object() {
        let (mut table, mut names) = setup();
        let a = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("A"), false);
        let m = table.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("M"), true);
        table.finalize_ancestors();
        assert_eq!(table.get(a).unwrap().superclass, reserved::OBJECT);
        assert!(!table.get(m).unwrap().superclass.exists());
    }

    #[test]
    fn edit_distance_bounds() {
        assert_eq!(edit_distance_within("Fo", "Foo", 2), Some(1));
        assert_eq!(edit_distance_within("Foo", "Foo", 2), Some(0));
        assert_eq!(edit_distance_within("Foo", "Unrelated", 2), None);
    }
}
