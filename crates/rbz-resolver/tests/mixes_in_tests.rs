//! `mixes_in_class_methods` scenarios.

use crate::errors;
use crate::test_fixtures::ProgramBuilder;
use rbz_ast::NodeKind;
use rbz_common::StrictLevel;
use rbz_core::well_known;

#[test]
fn records_class_methods_target() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Mixin", true);
    let class_methods = b.module(f, "ClassMethods", vec![]);
    let recv = b.self_ref(f);
    let target = b.uconst(f, "ClassMethods");
    let declare = b.send(f, recv, "mixes_in_class_methods", vec![target]);
    let mixin = b.end_class(f, vec![], vec![class_methods, declare]);
    b.finish_file(f, vec![mixin]);

    let p = b.run(1);
    assert!(p.diagnostics().is_empty(), "{:?}", p.diagnostics());
    let mixin_sym = p.gs.symbols.get(p.symbol("Mixin")).unwrap();
    assert_eq!(
        mixin_sym.members.get(&well_known::CLASS_METHODS),
        Some(&p.symbol("Mixin::ClassMethods"))
    );

    // The annotation send was deleted and swept from the module body.
    let tree = &p.trees[0];
    let mut still_there = false;
    rbz_ast::preorder(&tree.arena, tree.root, &mut |id| {
        if let NodeKind::Send { fun, .. } = tree.arena.kind(id)
            && *fun == well_known::MIXES_IN_CLASS_METHODS
        {
            still_there = true;
        }
    });
    assert!(!still_there);
}

#[test]
fn declaring_inside_a_class_errors() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "NotAModule", false);
    let class_methods = b.module(f, "ClassMethods", vec![]);
    let recv = b.self_ref(f);
    let target = b.uconst(f, "ClassMethods");
    let declare = b.send(f, recv, "mixes_in_class_methods", vec![target]);
    let c = b.end_class(f, vec![], vec![class_methods, declare]);
    b.finish_file(f, vec![c]);

    let p = b.run(1);
    assert_eq!(p.gs.errors.count_code(errors::INVALID_MIXIN_DECLARATION), 1);
    // Processing continues: the target is still recorded.
    let c_sym = p.gs.symbols.get(p.symbol("NotAModule")).unwrap();
    assert!(c_sym.members.contains_key(&well_known::CLASS_METHODS));
}

#[test]
fn wrong_arity_errors() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Mixin", true);
    let recv = b.self_ref(f);
    let declare = b.send(f, recv, "mixes_in_class_methods", vec![]);
    let mixin = b.end_class(f, vec![], vec![declare]);
    b.finish_file(f, vec![mixin]);

    let p = b.run(1);
    let headers: Vec<_> = p
        .diagnostics()
        .iter()
        .filter(|d| d.code == errors::INVALID_MIXIN_DECLARATION)
        .map(|d| d.header.clone())
        .collect();
    assert_eq!(headers.len(), 1);
    assert!(headers[0].contains("Wrong number of arguments"));
}

#[test]
fn class_argument_errors() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Mixin", true);
    let some_class = b.class(f, "SomeClass", vec![], vec![]);
    let recv = b.self_ref(f);
    let target = b.uconst(f, "SomeClass");
    let declare = b.send(f, recv, "mixes_in_class_methods", vec![target]);
    let mixin = b.end_class(f, vec![], vec![some_class, declare]);
    b.finish_file(f, vec![mixin]);

    let p = b.run(1);
    let headers: Vec<_> = p
        .diagnostics()
        .iter()
        .filter(|d| d.code == errors::INVALID_MIXIN_DECLARATION)
        .map(|d| d.header.clone())
        .collect();
    assert_eq!(headers.len(), 1);
    assert!(headers[0].contains("is a class, not a module"));
}

#[test]
fn passing_the_module_itself_errors() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Mixin", true);
    let recv = b.self_ref(f);
    let target = b.uconst(f, "Mixin");
    let declare = b.send(f, recv, "mixes_in_class_methods", vec![target]);
    let mixin = b.end_class(f, vec![], vec![declare]);
    b.finish_file(f, vec![mixin]);

    let p = b.run(1);
    let headers: Vec<_> = p
        .diagnostics()
        .iter()
        .filter(|d| d.code == errors::INVALID_MIXIN_DECLARATION)
        .map(|d| d.header.clone())
        .collect();
    assert_eq!(headers.len(), 1);
    assert!(headers[0].contains("Must not pass your self"));
}

#[test]
fn conflicting_redeclaration_errors() {
    let mut b = ProgramBuilder::new();
    let f = b.add_file("test.rb", StrictLevel::True);
    b.begin_class(f, "Mixin", true);
    let first = b.module(f, "First", vec![]);
    let second = b.module(f, "Second", vec![]);
    let recv1 = b.self_ref(f);
    let target1 = b.uconst(f, "First");
    let declare1 = b.send(f, recv1, "mixes_in_class_methods", vec![target1]);
    let recv2 = b.self_ref(f);
    let target2 = b.uconst(f, "Second");
    let declare2 = b.send(f, recv2, "mixes_in_class_methods", vec![target2]);
    let mixin = b.end_class(f, vec![], vec![first, second, declare1, declare2]);
    b.finish_file(f, vec![mixin]);

    let p = b.run(1);
    let headers: Vec<_> = p
        .diagnostics()
        .iter()
        .filter(|d| d.code == errors::INVALID_MIXIN_DECLARATION)
        .map(|d| d.header.clone())
        .collect();
    assert_eq!(headers.len(), 1);
    assert!(headers[0].contains("Redeclaring"));
    // The first declaration wins.
    let mixin_sym = p.gs.symbols.get(p.symbol("Mixin")).unwrap();
    assert_eq!(
        mixin_sym.members.get(&well_known::CLASS_METHODS),
        Some(&p.symbol("Mixin::First"))
    );
}
