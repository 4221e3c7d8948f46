//! Unit tests for the identifier interner.

use super::interner::{Interner, Name};

#[test]
fn intern_is_idempotent() {
    let mut interner = Interner::new();
    let a = interner.intern("value");
    let b = interner.intern("value");
    assert_eq!(a, b);
    assert_eq!(interner.len(), 1);
}

#[test]
fn distinct_identifiers_get_distinct_names() {
    let mut interner = Interner::new();
    let a = interner.intern("left");
    let b = interner.intern("right");
    assert_ne!(a, b);
    assert_eq!(interner.len(), 2);
}

#[test]
fn indices_are_dense_in_insertion_order() {
    let mut interner = Interner::new();
    let names: Vec<_> = ["a", "b", "c", "a", "d"]
        .iter()
        .map(|s| interner.intern(s))
        .collect();
    assert_eq!(names[0].as_u32(), 0);
    assert_eq!(names[1].as_u32(), 1);
    assert_eq!(names[2].as_u32(), 2);
    assert_eq!(names[3].as_u32(), 0);
    assert_eq!(names[4].as_u32(), 3);
}

#[test]
fn resolve_round_trips() {
    let mut interner = Interner::new();
    let name = interner.intern("loop_counter");
    assert_eq!(interner.resolve(name), "loop_counter");
    assert_eq!(interner.try_resolve(name), Some("loop_counter"));
}

#[test]
fn try_resolve_rejects_foreign_indices() {
    let mut interner = Interner::new();
    interner.intern("only");
    assert_eq!(interner.try_resolve(Name::from_raw(7)), None);
}

#[test]
fn find_does_not_intern() {
    let mut interner = Interner::new();
    assert_eq!(interner.find("missing"), None);
    let name = interner.intern("present");
    assert_eq!(interner.find("present"), Some(name));
    assert_eq!(interner.len(), 1);
}

#[test]
fn adjacent_text_stays_separate() {
    // "ab" followed by "cd" share the buffer; "abcd" must not match their
    // concatenation
    let mut interner = Interner::new();
    let ab = interner.intern("ab");
    let cd = interner.intern("cd");
    let abcd = interner.intern("abcd");
    assert_ne!(abcd, ab);
    assert_ne!(abcd, cd);
    assert_eq!(interner.resolve(ab), "ab");
    assert_eq!(interner.resolve(cd), "cd");
    assert_eq!(interner.resolve(abcd), "abcd");
}

#[test]
fn names_walk_in_insertion_order() {
    let mut interner = Interner::new();
    interner.intern("x");
    interner.intern("y");
    let collected: Vec<_> = interner.names().map(|(_, s)| s.to_owned()).collect();
    assert_eq!(collected, vec!["x", "y"]);
}
