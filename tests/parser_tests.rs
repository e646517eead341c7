//! Surface-syntax tests
//! Parsing of literals, compounds, lists, declarations, and diagnostics.

use lynxconf::{parse_str, Kind, ParseError, Value};

fn root(source: &str) -> Value {
    parse_str(source).unwrap()
}

fn fail(source: &str) -> ParseError {
    parse_str(source).unwrap_err()
}

// ============================================================================
// LITERALS AND CONTAINERS
// ============================================================================

#[test]
fn scalar_assignments() {
    let root = root("name = \"lynx\" version = 4 ratio = -0.5");
    let compound = root.as_compound().unwrap();
    assert_eq!(compound.get_string("name"), Some("lynx"));
    assert_eq!(compound.get_number("version"), Some(4.0));
    assert_eq!(compound.get_number("ratio"), Some(-0.5));
}

#[test]
fn nested_compounds() {
    let root = root("a = { b = { c = 1 } }");
    let compound = root.as_compound().unwrap();
    assert_eq!(
        compound.get_by_path("a.b.c").and_then(Value::as_number),
        Some(1.0)
    );
}

#[test]
fn lists_are_homogeneous_and_keyless() {
    let root = root("xs = [ \"a\" \"b\" ]");
    let list = root.as_compound().unwrap().get_list("xs").unwrap();
    assert_eq!(list.elem_kind(), Kind::String);
    assert!(list.items().iter().all(|item| item.key.is_empty()));
}

#[test]
fn empty_list_has_invalid_tag() {
    let root = root("xs = [ ]");
    let list = root.as_compound().unwrap().get_list("xs").unwrap();
    assert!(list.is_empty());
    assert_eq!(list.elem_kind(), Kind::Invalid);
}

#[test]
fn lists_may_hold_compounds() {
    let root = root("xs = [ { a = 1 } { a = 2 } ]");
    let list = root.as_compound().unwrap().get_list("xs").unwrap();
    assert_eq!(list.elem_kind(), Kind::Compound);
    assert_eq!(list.len(), 2);
}

#[test]
fn comments_are_ignored() {
    let root = root("-- header\na = 1 -- trailing\n-- b = 2\n");
    let compound = root.as_compound().unwrap();
    assert_eq!(compound.get_number("a"), Some(1.0));
    assert!(compound.get("b").is_none());
}

// ============================================================================
// SCENARIO S6: LIST HOMOGENEITY ENFORCEMENT
// ============================================================================

#[test]
fn mixed_list_is_rejected() {
    let err = fail("xs = [ 1 \"two\" ]");
    let message = err.to_string();
    assert!(message.contains("expected Number but got String"), "{message}");
}

// ============================================================================
// TYPE DECLARATIONS
// ============================================================================

#[test]
fn declared_type_validates_assignment() {
    let root = root("port : number port = 8080");
    assert_eq!(root.as_compound().unwrap().get_number("port"), Some(8080.0));
}

// Scenario S3: typed compound validation failure cites the broken field.
#[test]
fn typed_compound_mismatch_cites_field() {
    let err = fail("point : compound { x : number y : number }\npoint = { x = 1 y = \"oops\" }");
    let message = err.to_string();
    assert!(message.contains("'y'"), "{message}");
    assert!(matches!(err, ParseError::Type { .. }));
}

#[test]
fn optional_fields_may_be_omitted() {
    let root =
        root("cfg : compound { host : string port : optional number }\ncfg = { host = \"h\" }");
    assert!(root.as_compound().unwrap().get_compound("cfg").is_some());
}

#[test]
fn missing_required_field_fails() {
    let err = fail("cfg : compound { host : string }\ncfg = { }");
    assert!(err.to_string().contains("missing property 'host'"));
}

#[test]
fn declared_type_resolves_by_path() {
    let root = root(
        "point : compound { x : number y : number }\norigin : point\norigin = { x = 0 y = 0 }",
    );
    assert!(root.as_compound().unwrap().get_compound("origin").is_some());
}

#[test]
fn list_type_checks_elements() {
    let err = fail("xs : list [ number ]\nxs = [ \"a\" ]");
    assert!(matches!(err, ParseError::Type { .. }));
}

#[test]
fn redeclaring_a_type_is_an_error() {
    let err = fail("a : number a : number");
    assert!(err.to_string().contains("already declared"));
}

#[test]
fn unknown_type_path_fails() {
    let err = fail("a : nosuchtype");
    assert!(matches!(err, ParseError::Unresolved { .. }));
}

// ============================================================================
// SPREAD AND SELF-REFERENCE
// ============================================================================

#[test]
fn spread_merges_a_compound() {
    let root = root("base = { a = 1 }\nderived = { ( base ) b = 2 }");
    let derived = root.as_compound().unwrap().get_compound("derived").unwrap();
    assert_eq!(derived.get_number("a"), Some(1.0));
    assert_eq!(derived.get_number("b"), Some(2.0));
}

#[test]
fn spread_of_non_compound_fails() {
    let err = fail("derived = { ( 1 ) }");
    assert!(err.to_string().contains("Compound"));
}

#[test]
fn self_reference_snapshots_preceding_entries() {
    let root = root("a = 1 snap = { prior = . }");
    let snap = root
        .as_compound()
        .unwrap()
        .get_by_path("snap.prior")
        .and_then(Value::as_compound)
        .unwrap();
    // `.` clones the innermost open compound, which was still empty
    assert!(snap.is_empty());
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

#[test]
fn lex_error_carries_position() {
    let err = fail("a = $");
    assert!(err.to_string().contains("<input>:1:5"), "{err}");
}

#[test]
fn unknown_identifier_names_the_path() {
    let err = fail("a = nothing.here");
    match err {
        ParseError::Unresolved { path, .. } => assert_eq!(path, "nothing.here"),
        other => panic!("expected a resolve error, got {other}"),
    }
}

#[test]
fn missing_value_after_assign_fails() {
    assert!(parse_str("a = ").is_err());
}

#[test]
fn unbalanced_braces_fail() {
    assert!(parse_str("a = { b = 1").is_err());
    assert!(parse_str("a = 1 }").is_err());
}

#[test]
fn key_without_assignment_fails() {
    assert!(parse_str("a 1").is_err());
}

// ============================================================================
// PRETTY PRINTING AND ROUND TRIPS
// ============================================================================

#[test]
fn print_format_matches_surface_syntax() {
    let root = root("title = \"hi\"\nnested = { a = 1 }\nxs = [ 1 2 ]");
    assert_eq!(
        root.to_string(),
        "title: \"hi\"\nnested: {\n  a: 1\n}\nxs: [\n  1\n  2\n]\n"
    );
}

#[test]
fn printed_trees_reparse_equal() {
    let original = root(
        "name = \"lynx\"\nlimits = { depth = 512 ratio = 1.5 }\nhosts = [ \"a\" \"b\" ]\nflags = [ 1 0 1 ]",
    );
    let reparsed = parse_str(&original.to_string()).unwrap();
    assert_eq!(original, reparsed);
}

#[test]
fn printed_escapes_reparse_equal() {
    let original = root("s = \"line\\none\\ttab \\\"quoted\\\"\"");
    let reparsed = parse_str(&original.to_string()).unwrap();
    assert_eq!(original, reparsed);
}
