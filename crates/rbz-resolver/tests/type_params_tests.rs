//! Type-member bounds scenarios.

use crate::errors;
use crate::test_fixtures::ProgramBuilder;
use rbz_common::StrictLevel;
use rbz_core::TypeId;

#[test]
fn unannotated_member_spans_the_lattice() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Box", false);
    let member = b.type_member_decl(f, "Elem", None);
    let c = b.end_class(f, vec![], vec![member]);
    b.finish_file(f, vec![c]);

    let p = b.run(1);
    assert!(p.diagnostics().is_empty(), "{:?}", p.diagnostics());
    let elem = p.gs.symbols.get(p.symbol("Box::Elem")).unwrap();
    assert_eq!(elem.bounds, Some((TypeId::BOTTOM, TypeId::TOP)));
}

#[test]
fn fixed_sets_both_bounds() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Box", false);
    let int_ty = b.uconst(f, "Integer");
    let hash = b.hash(f, vec![("fixed", int_ty)]);
    let member = b.type_member_decl(f, "Elem", Some(hash));
    let c = b.end_class(f, vec![], vec![member]);
    b.finish_file(f, vec![c]);

    let p = b.run(1);
    assert!(p.diagnostics().is_empty(), "{:?}", p.diagnostics());
    let elem = p.gs.symbols.get(p.symbol("Box::Elem")).unwrap();
    let int_ty = p.gs.types.class_instance(p.symbol("Integer"));
    assert_eq!(elem.bounds, Some((int_ty, int_ty)));
}

#[test]
fn lower_and_upper_set_their_bounds() {
    // Integer is declared below Object here, so the bounds are coherent.
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    let int_sym = b.gs.names.lookup("Integer").unwrap();
    let obj_sym = b.gs.names.lookup("Object").unwrap();
    {
        let int = b.gs.symbols.find_member(rbz_core::symbols::reserved::ROOT, int_sym);
        let obj = b.gs.symbols.find_member(rbz_core::symbols::reserved::ROOT, obj_sym);
        b.gs.symbols.set_super_class(int.unwrap(), obj.unwrap());
    }
    b.begin_class(f, "Box", false);
    let lower_ty = b.uconst(f, "Integer");
    let upper_ty = b.uconst(f, "Object");
    let hash = b.hash(f, vec![("lower", lower_ty), ("upper", upper_ty)]);
    let member = b.type_member_decl(f, "Elem", Some(hash));
    let c = b.end_class(f, vec![], vec![member]);
    b.finish_file(f, vec![c]);

    let p = b.run(1);
    assert!(p.diagnostics().is_empty(), "{:?}", p.diagnostics());
    let elem = p.gs.symbols.get(p.symbol("Box::Elem")).unwrap();
    let int_ty = p.gs.types.class_instance(p.symbol("Integer"));
    let obj_ty = p.gs.types.class_instance(rbz_core::symbols::reserved::OBJECT);
    assert_eq!(elem.bounds, Some((int_ty, obj_ty)));
}

#[test]
fn incoherent_bounds_error() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Box", false);
    let lower_ty = b.uconst(f, "Integer");
    let upper_ty = b.uconst(f, "String");
    let hash = b.hash(f, vec![("lower", lower_ty), ("upper", upper_ty)]);
    let member = b.type_member_decl(f, "Elem", Some(hash));
    let c = b.end_class(f, vec![], vec![member]);
    b.finish_file(f, vec![c]);

    let p = b.run(1);
    assert_eq!(p.gs.errors.count_code(errors::INVALID_TYPE_MEMBER_BOUNDS), 1);
    // Bounds are still materialized so later passes stay total.
    let elem = p.gs.symbols.get(p.symbol("Box::Elem")).unwrap();
    assert!(elem.bounds.is_some());
}

#[test]
fn child_bounds_outside_parent_bounds_error() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);

    b.begin_class(f, "Parent", false);
    let p_ty = b.uconst(f, "Integer");
    let p_hash = b.hash(f, vec![("fixed", p_ty)]);
    let p_member = b.type_member_decl(f, "Elem", Some(p_hash));
    let parent = b.end_class(f, vec![], vec![p_member]);

    let sup = b.uconst(f, "Parent");
    b.begin_class(f, "Child", false);
    let c_ty = b.uconst(f, "String");
    let c_hash = b.hash(f, vec![("fixed", c_ty)]);
    let c_member = b.type_member_decl(f, "Elem", Some(c_hash));
    let child = b.end_class(f, vec![sup], vec![c_member]);

    b.finish_file(f, vec![parent, child]);

    let p = b.run(1);
    // Both the lower and the upper direction are violated.
    assert_eq!(p.gs.errors.count_code(errors::PARENT_TYPE_BOUNDS_MISMATCH), 2);
}

#[test]
fn matching_fixed_bounds_satisfy_the_parent() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);

    b.begin_class(f, "Parent", false);
    let p_ty = b.uconst(f, "Integer");
    let p_hash = b.hash(f, vec![("fixed", p_ty)]);
    let p_member = b.type_member_decl(f, "Elem", Some(p_hash));
    let parent = b.end_class(f, vec![], vec![p_member]);

    let sup = b.uconst(f, "Parent");
    b.begin_class(f, "Child", false);
    let c_ty = b.uconst(f, "Integer");
    let c_hash = b.hash(f, vec![("fixed", c_ty)]);
    let c_member = b.type_member_decl(f, "Elem", Some(c_hash));
    let child = b.end_class(f, vec![sup], vec![c_member]);

    b.finish_file(f, vec![parent, child]);

    let p = b.run(1);
    assert!(p.diagnostics().is_empty(), "{:?}", p.diagnostics());
}

#[test]
fn parent_member_that_is_not_a_type_member_errors() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);

    b.begin_class(f, "Parent", false);
    let body = b.empty(f);
    let conflicting = b.method(f, "Elem", vec![], body, false);
    let parent = b.end_class(f, vec![], vec![conflicting]);

    let sup = b.uconst(f, "Parent");
    b.begin_class(f, "Child", false);
    let c_member = b.type_member_decl(f, "Elem", None);
    let child = b.end_class(f, vec![sup], vec![c_member]);

    b.finish_file(f, vec![parent, child]);

    let p = b.run(1);
    let mismatches: Vec<_> = p
        .diagnostics()
        .iter()
        .filter(|d| d.code == errors::PARENT_TYPE_BOUNDS_MISMATCH)
        .map(|d| d.header.clone())
        .collect();
    assert_eq!(mismatches.len(), 1, "{mismatches:?}");
    assert!(mismatches[0].contains("is not a type member"));
}
