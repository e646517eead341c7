//! Cross-cutting invariants
//! Properties that must hold for every parsed tree.

use lynxconf::{parse_str, Field, Kind, Type, ValidateFlags, Value, ValueKind};

/// Walks a tree checking list homogeneity and compound key uniqueness.
fn check_invariants(value: &Value) {
    match &value.kind {
        ValueKind::List(list) => {
            if list.is_empty() {
                assert_eq!(list.elem_kind(), Kind::Invalid);
            } else {
                for item in list.items() {
                    assert_eq!(item.kind_tag(), list.elem_kind());
                    assert!(item.key.is_empty());
                    check_invariants(item);
                }
            }
        }
        ValueKind::Compound(compound) => {
            for (i, entry) in compound.entries().iter().enumerate() {
                assert!(!entry.key.is_empty());
                for later in &compound.entries()[i + 1..] {
                    assert_ne!(entry.key, later.key);
                }
                check_invariants(entry);
            }
        }
        _ => {}
    }
}

#[test]
fn parsed_trees_hold_structural_invariants() {
    let sources = [
        "a = 1 b = \"two\" c = [ 1 2 3 ]",
        "nested = { xs = [ { k = 1 } { k = 2 } ] }",
        "a = 1 a = 2 a = 3",
        "m = ( { x = 1 } { y = 2 } )",
        "sum = for n in range 0 9 ( n )",
        "empty = [ ]",
    ];
    for source in sources {
        let root = parse_str(source).unwrap();
        check_invariants(&root);
    }
}

#[test]
fn clone_mutation_does_not_leak_back() {
    let original = parse_str("xs = [ 1 2 ] c = { a = 1 }").unwrap();
    let mut copy = original.clone();

    if let ValueKind::Compound(compound) = &mut copy.kind {
        compound.add(Value::number(9.0).with_key("injected"));
    }

    let original_compound = original.as_compound().unwrap();
    assert!(original_compound.get("injected").is_none());
    assert_eq!(original_compound.len(), 2);
}

#[test]
fn type_equality_laws() {
    let shapes = [
        Type::any(),
        Type::string(),
        Type::number(),
        Type::list(Type::number()),
        Type::compound(vec![Field::new("x", Type::number())]),
        Type::function(vec![Field::new("s", Type::string())]),
    ];
    for ty in &shapes {
        // reflexivity
        assert_eq!(ty, ty);
        let copy = ty.clone();
        // symmetry
        assert!(*ty == copy && copy == *ty);
        // transitivity through a second copy
        let third = copy.clone();
        assert!(copy == third && *ty == third);
    }
    // distinct shapes never compare equal
    for (i, a) in shapes.iter().enumerate() {
        for (j, b) in shapes.iter().enumerate() {
            if i != j {
                assert_ne!(a, b);
            }
        }
    }
}

#[test]
fn validation_success_implies_shape_match() {
    let ty = Type::compound(vec![
        Field::new("host", Type::string()),
        Field::new("ports", Type::list(Type::number())),
    ]);
    let root = parse_str("cfg = { host = \"h\" ports = [ 1 2 ] }").unwrap();
    let cfg = root.as_compound().unwrap().get("cfg").unwrap();

    let mut sink = Vec::new();
    assert!(ty.validate(cfg, ValidateFlags::default(), &mut sink));
    assert!(sink.is_empty());

    // the accepted value really has the validated shape
    let compound = cfg.as_compound().unwrap();
    assert_eq!(compound.get("host").unwrap().kind_tag(), Kind::String);
    let ports = compound.get_list("ports").unwrap();
    assert_eq!(ports.elem_kind(), Kind::Number);
}

#[test]
fn reparsing_printed_output_is_stable() {
    let source = "a = { b = [ 1 2 ] c = \"text\" }\nd = 4.25";
    let first = parse_str(source).unwrap();
    let second = parse_str(&first.to_string()).unwrap();
    let third = parse_str(&second.to_string()).unwrap();
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn parser_is_reusable_after_errors() {
    let parser = lynxconf::Parser::new();
    assert!(parser.parse_source("bad.lynx", "a = missing").is_err());
    // scope bookkeeping balanced on the error path, so the next parse works
    let root = parser.parse_source("good.lynx", "a = 1").unwrap();
    assert_eq!(root.as_compound().unwrap().get_number("a"), Some(1.0));
}
