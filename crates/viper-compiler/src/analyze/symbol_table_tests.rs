//! Unit tests for the open-addressed symbol table.

use super::symbol_table::{Symbol, SymbolTable};
use crate::pool::VarId;

fn var(n: u32) -> Symbol {
    Symbol::Variable(VarId::from_raw(n))
}

fn var_id(sym: &Symbol) -> u32 {
    match sym {
        Symbol::Variable(id) => id.index() as u32,
        _ => panic!("expected a variable symbol"),
    }
}

#[test]
fn first_insertion_wins() {
    let mut table = SymbolTable::new();
    assert!(table.put("x", var(0)));
    assert!(!table.put("x", var(1)));
    let idx = table.get("x").unwrap();
    assert_eq!(var_id(table.symbol(idx)), 0);
    assert_eq!(table.len(), 1);
}

#[test]
fn first_insertion_wins_across_growth() {
    let mut table = SymbolTable::new();
    table.put("target", var(42));
    // push well past the initial capacity to force several regrows
    for i in 0..100 {
        table.put(&format!("filler_{i}"), var(1000 + i));
    }
    assert!(!table.put("target", var(7)));
    let idx = table.get("target").unwrap();
    assert_eq!(var_id(table.symbol(idx)), 42);
}

#[test]
fn first_insertion_wins_after_finalization() {
    let mut table = SymbolTable::new();
    table.put("a", var(1));
    table.put("b", var(2));
    table.finalize();
    assert!(table.is_finalized());
    assert_eq!(var_id(table.symbol(table.get("a").unwrap())), 1);
    assert_eq!(var_id(table.symbol(table.get("b").unwrap())), 2);
}

#[test]
#[should_panic(expected = "finalization")]
fn put_after_finalize_panics() {
    let mut table = SymbolTable::new();
    table.put("a", var(1));
    table.finalize();
    table.put("b", var(2));
}

#[test]
fn missing_key_is_none() {
    let mut table = SymbolTable::new();
    assert_eq!(table.get("nothing"), None);
    table.put("something", var(0));
    assert_eq!(table.get("nothing"), None);
}

#[test]
fn insertion_order_is_preserved() {
    let mut table = SymbolTable::new();
    for (i, key) in ["c", "a", "b"].iter().enumerate() {
        table.put(key, var(i as u32));
    }
    let order: Vec<_> = table.iter().map(var_id).collect();
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn all_keys_reachable_after_growth() {
    let mut table = SymbolTable::new();
    for i in 0..200 {
        table.put(&format!("sym_{i}"), var(i));
    }
    for i in 0..200 {
        let idx = table.get(&format!("sym_{i}")).unwrap();
        assert_eq!(var_id(table.symbol(idx)), i);
    }
}
