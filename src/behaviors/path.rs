//! Dot-path access into nested values.
//!
//! A path like `options.js.0` descends one level per segment. Numeric segments
//! index sequences; every segment can also address a mapping key.
//!
//! Writes follow loose-array semantics:
//! - missing or `null` levels are created (a sequence for a numeric segment,
//!   a mapping otherwise)
//! - descending through a scalar wraps it into a one-element sequence first
//! - a numeric segment addresses an existing position or appends right after
//!   the last one; sequences are never padded
//! - any other segment applied to a sequence (a name, or a position past the
//!   end) turns it into a mapping keyed by position (`["a"]` + `b` becomes
//!   `{"0": "a", "b": ...}`, `["a"]` + `7` becomes `{"0": "a", "7": ...}`)

use serde_json::{Map, Value};

/// Path separator
pub const SEPARATOR: char = '.';

/// Resolve `path` inside `value`. `None` if any segment does not resolve.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split(SEPARATOR).try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Set `new_value` at `path` inside `target`, creating or coercing levels as needed.
pub fn set_path(target: &mut Value, path: &str, new_value: Value) {
    let mut current = target;
    for segment in path.split(SEPARATOR) {
        current = child_mut(current, segment);
    }
    *current = new_value;
}

fn child_mut<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = segment.parse::<usize>().ok();

    match *current {
        Value::Null => {
            *current = match index {
                Some(_) => Value::Array(Vec::new()),
                None => Value::Object(Map::new()),
            };
        }
        Value::Object(_) | Value::Array(_) => {}
        _ => {
            let scalar = current.take();
            *current = Value::Array(vec![scalar]);
        }
    }

    let positional = match (&*current, index) {
        (Value::Array(items), Some(index)) => index <= items.len(),
        _ => false,
    };
    if !positional {
        if let Value::Array(items) = &mut *current {
            let map = std::mem::take(items)
                .into_iter()
                .enumerate()
                .map(|(position, item)| (position.to_string(), item))
                .collect();
            *current = Value::Object(map);
        }
    }

    match (current, index) {
        (Value::Array(items), Some(index)) => {
            if index == items.len() {
                items.push(Value::Null);
            }
            &mut items[index]
        }
        (Value::Object(map), _) => map.entry(segment.to_string()).or_insert(Value::Null),
        // Levels were normalized above: only in-range sequences and mappings remain.
        (other, _) => other,
    }
}
