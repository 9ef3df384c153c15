//! Test fixtures - module graphs for testing

use fallback_core::{Factory, Fallback};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

/// `a = b - c`
pub fn subtract() -> Factory {
    Factory::function(|args| {
        let b = args[0].as_i64().unwrap_or_default();
        let c = args[1].as_i64().unwrap_or_default();
        Ok(json!(b - c))
    })
}

/// Sum of every numeric argument, plus `own`
pub fn sum(own: i64) -> Factory {
    Factory::function(move |args| {
        let total: i64 = args.iter().filter_map(Value::as_i64).sum();
        Ok(json!(total + own))
    })
}

/// A factory that counts its invocations
pub fn counting(value: impl Into<Value>) -> (Factory, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let value = value.into();
    let factory = Factory::function(move |_| {
        counter.set(counter.get() + 1);
        Ok(value.clone())
    });
    (factory, calls)
}

/// Module names of a chain `m0 -> m1 -> ... -> m{depth-1}`
pub fn chain_names(depth: usize) -> Vec<String> {
    (0..depth).map(|i| format!("m{i}")).collect()
}

/// Define a chain where `m{i}` depends on `m{i+1}`; each adds one.
///
/// Requiring `m0` yields `depth`.
pub fn define_chain(fallback: &mut Fallback, depth: usize) {
    let names = chain_names(depth);
    for (i, name) in names.iter().enumerate().rev() {
        match names.get(i + 1) {
            Some(next) => fallback.define(name, sum(1), &[next.as_str()]),
            None => fallback.define(name, Factory::value(1), &[]),
        }
    }
}

/// Define `root` depending on `width` leaves `leaf0..`, each worth its index
pub fn define_wide(fallback: &mut Fallback, width: usize) {
    let leaves: Vec<String> = (0..width).map(|i| format!("leaf{i}")).collect();
    for (i, leaf) in leaves.iter().enumerate() {
        fallback.define(leaf, Factory::value(i as i64), &[]);
    }
    let dependencies: Vec<&str> = leaves.iter().map(String::as_str).collect();
    fallback.define("root", sum(0), &dependencies);
}

/// `top -> (left, right) -> bottom`, with the factory of `bottom` counted
pub fn define_diamond(fallback: &mut Fallback) -> Rc<Cell<usize>> {
    let (bottom, calls) = counting(1);
    fallback.define("bottom", bottom, &[]);
    fallback.define("left", sum(10), &["bottom"]);
    fallback.define("right", sum(100), &["bottom"]);
    fallback.define("top", sum(0), &["left", "right"]);
    calls
}
