//! Interned type storage.
//!
//! The resolver only manifests the types that annotations can denote:
//! class instances, unions/intersections, nilable sugar, literal types,
//! type variables, self types, and aliases to other symbols. Types are
//! interned behind `&self` so the store can be shared wherever the symbol
//! table is.

use crate::names::NameId;
use crate::symbols::{SymbolId, SymbolTable};
use rustc_hash::FxHashMap;
use std::sync::RwLock;

/// Interned type id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const NONE: TypeId = TypeId(u32::MAX);

    // Pre-interned by `TypeStore::new`, in this order.
    pub const UNTYPED: TypeId = TypeId(0);
    pub const TOP: TypeId = TypeId(1);
    pub const BOTTOM: TypeId = TypeId(2);
    pub const NIL: TypeId = TypeId(3);
    pub const SELF_TYPE: TypeId = TypeId(4);
    pub const VOID: TypeId = TypeId(5);

    #[inline]
    pub const fn exists(&self) -> bool {
        self.0 != u32::MAX
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Untyped,
    Top,
    Bottom,
    Nil,
    SelfType,
    /// The return "type" of `.void` sigs.
    Void,
    /// An instance of the given class or module.
    ClassInstance(SymbolId),
    /// A symbol standing for another symbol (class aliases, method
    /// aliases).
    Alias(SymbolId),
    /// Reference to a type member or a method's type argument.
    TypeVar(SymbolId),
    Or(TypeId, TypeId),
    And(TypeId, TypeId),
    LiteralInt(i64),
    LiteralSym(NameId),
    LiteralStr(NameId),
    LiteralBool(bool),
}

#[derive(Debug, Default)]
struct TypeTables {
    keys: Vec<TypeKey>,
    ids: FxHashMap<TypeKey, TypeId>,
}

/// Deduplicating type storage.
#[derive(Debug)]
pub struct TypeStore {
    inner: RwLock<TypeTables>,
}

impl TypeStore {
    pub fn new() -> Self {
        let store = TypeStore {
            inner: RwLock::new(TypeTables::default()),
        };
        debug_assert_eq!(store.intern(TypeKey::Untyped), TypeId::UNTYPED);
        debug_assert_eq!(store.intern(TypeKey::Top), TypeId::TOP);
        debug_assert_eq!(store.intern(TypeKey::Bottom), TypeId::BOTTOM);
        debug_assert_eq!(store.intern(TypeKey::Nil), TypeId::NIL);
        debug_assert_eq!(store.intern(TypeKey::SelfType), TypeId::SELF_TYPE);
        debug_assert_eq!(store.intern(TypeKey::Void), TypeId::VOID);
        store
    }

    pub fn intern(&self, key: TypeKey) -> TypeId {
        if let Some(&id) = self.inner.read().unwrap().ids.get(&key) {
            return id;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(&id) = inner.ids.get(&key) {
            return id;
        }
        let id = TypeId(inner.keys.len() as u32);
        inner.keys.push(key);
        inner.ids.insert(key, id);
        id
    }

    pub fn lookup(&self, id: TypeId) -> Option<TypeKey> {
        self.inner.read().unwrap().keys.get(id.0 as usize).copied()
    }

    pub fn alias(&self, target: SymbolId) -> TypeId {
        self.intern(TypeKey::Alias(target))
    }

    pub fn class_instance(&self, class: SymbolId) -> TypeId {
        self.intern(TypeKey::ClassInstance(class))
    }

    pub fn nilable(&self, inner: TypeId) -> TypeId {
        self.intern(TypeKey::Or(inner, TypeId::NIL))
    }

    /// The small subtype lattice needed by type-member bounds checks.
    pub fn is_subtype(&self, symbols: &SymbolTable, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup || sub == TypeId::BOTTOM || sup == TypeId::TOP {
            return true;
        }
        if sub == TypeId::UNTYPED || sup == TypeId::UNTYPED {
            return true;
        }
        let (Some(sub_key), Some(sup_key)) = (self.lookup(sub), self.lookup(sup)) else {
            return false;
        };
        // Decompose unions/intersections before leaf comparisons.
        if let TypeKey::Or(l, r) = sub_key {
            return self.is_subtype(symbols, l, sup) && self.is_subtype(symbols, r, sup);
        }
        if let TypeKey::And(l, r) = sub_key {
            return self.is_subtype(symbols, l, sup) || self.is_subtype(symbols, r, sup);
        }
        if let TypeKey::Or(l, r) = sup_key {
            return self.is_subtype(symbols, sub, l) || self.is_subtype(symbols, sub, r);
        }
        if let TypeKey::And(l, r) = sup_key {
            return self.is_subtype(symbols, sub, l) && self.is_subtype(symbols, sub, r);
        }
        match (sub_key, sup_key) {
            (TypeKey::ClassInstance(a), TypeKey::ClassInstance(b)) => {
                a == b || symbols.derives_from(a, b)
            }
            _ => false,
        }
    }

    /// Human-readable rendering for diagnostics.
    pub fn show(
        &self,
        symbols: &SymbolTable,
        names: &crate::names::NameInterner,
        id: TypeId,
    ) -> String {
        let Some(key) = self.lookup(id) else {
            return "<none>".to_string();
        };
        match key {
            TypeKey::Untyped => "T.untyped".to_string(),
            TypeKey::Top => "<top>".to_string(),
            TypeKey::Bottom => "<bottom>".to_string(),
            TypeKey::Nil => "NilClass".to_string(),
            TypeKey::SelfType => "T.self_type".to_string(),
            TypeKey::Void => "<void>".to_string(),
            TypeKey::ClassInstance(sym) => symbols.show(names, sym),
            TypeKey::Alias(sym) => format!("<alias of {}>", symbols.show(names, sym)),
            TypeKey::TypeVar(sym) => symbols.show(names, sym),
            TypeKey::Or(l, r) => format!(
                "T.any({}, {})",
                self.show(symbols, names, l),
                self.show(symbols, names, r)
            ),
            TypeKey::And(l, r) => format!(
                "T.all({}, {})",
                self.show(symbols, names, l),
                self.show(symbols, names, r)
            ),
            TypeKey::LiteralInt(v) => format!("Integer({v})"),
            TypeKey::LiteralSym(n) => format!(":{}", names.resolve(n)),
            TypeKey::LiteralStr(n) => format!("String({:?})", names.resolve(n)),
            TypeKey::LiteralBool(v) => format!("{v}"),
        }
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameInterner;
    use crate::symbols::reserved;
    use rbz_common::Loc;

    #[test]
    fn interning_deduplicates() {
        let store = TypeStore::new();
        let a = store.intern(TypeKey::ClassInstance(reserved::OBJECT));
        let b = store.class_instance(reserved::OBJECT);
        assert_eq!(a, b);
    }

    #[test]
    fn lattice_extremes() {
        let store = TypeStore::new();
        let symbols = SymbolTable::new();
        let obj = store.class_instance(reserved::OBJECT);
        assert!(store.is_subtype(&symbols, TypeId::BOTTOM, obj));
        assert!(store.is_subtype(&symbols, obj, TypeId::TOP));
        assert!(store.is_subtype(&symbols, TypeId::UNTYPED, obj));
        assert!(store.is_subtype(&symbols, obj, TypeId::UNTYPED));
        assert!(!store.is_subtype(&symbols, TypeId::TOP, obj));
    }

    #[test]
    fn class_instances_follow_inheritance() {
        let store = TypeStore::new();
        let mut symbols = SymbolTable::new();
        let mut names = NameInterner::new();
        let a = symbols.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("A"), false);
        let b = symbols.enter_class_symbol(Loc::none(), reserved::ROOT, names.enter("B"), false);
        symbols.set_super_class(b, a);
        let ta = store.class_instance(a);
        let tb = store.class_instance(b);
        assert!(store.is_subtype(&symbols, tb, ta));
        assert!(!store.is_subtype(&symbols, ta, tb));
    }

    #[test]
    fn nilable_is_a_union_with_nil() {
        let store = TypeStore::new();
        let symbols = SymbolTable::new();
        let obj = store.class_instance(reserved::OBJECT);
        let nilable = store.nilable(obj);
        assert!(store.is_subtype(&symbols, obj, nilable));
        assert!(store.is_subtype(&symbols, TypeId::NIL, nilable));
        assert!(!store.is_subtype(&symbols, nilable, obj));
    }
}
