//! Normalization of free-form, possibly self-referencing metadata into a
//! serialization-safe JSON document.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use serde_json::{Map, Number, Value};

/// A metadata mapping. Maps are shared handles, so a map may contain itself
/// (or any other map) as a nested value.
pub type MetaMap = BTreeMap<String, MetaValue>;

/// Convenience constructor for a shared, initially empty metadata map.
pub fn new_meta_map() -> Rc<RefCell<MetaMap>> {
    Rc::new(RefCell::new(MetaMap::new()))
}

/// A metadata value: scalar leaves, lists, or nested (shared) maps.
#[derive(Debug, Clone)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<MetaValue>),
    Map(Rc<RefCell<MetaMap>>),
}

/// Flatten a metadata map into a JSON document.
///
/// Leaves become plain JSON scalars (non-finite floats have no JSON form and
/// become `null`); nested maps keep their nesting. Cycle safety: the visited
/// set is per invocation and keyed by mapping key — a key whose map value has
/// already been descended into is emitted as `null` instead of being
/// re-entered, so flattening terminates even for self-referencing maps. This
/// guard is keyed by key, not by map identity, so a key name reappearing
/// deeper in the structure is skipped as well; safety is preferred over
/// exhaustiveness here.
pub fn flatten(map: &Rc<RefCell<MetaMap>>) -> Value {
    let mut visited = HashSet::new();
    flatten_map(map, &mut visited)
}

fn flatten_map(map: &Rc<RefCell<MetaMap>>, visited: &mut HashSet<String>) -> Value {
    // Snapshot entries so recursion never holds a borrow on a shared map.
    let entries: Vec<(String, MetaValue)> = map
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut out = Map::new();
    for (key, value) in entries {
        // Both map- and list-valued keys go through the guard: lists are
        // owned and cannot cycle on their own, but a shared map reached
        // through a list element would otherwise re-enter this key forever.
        let flat = match value {
            MetaValue::Map(inner) => {
                if visited.insert(key.clone()) {
                    flatten_map(&inner, visited)
                } else {
                    Value::Null
                }
            }
            MetaValue::List(items) => {
                if visited.insert(key.clone()) {
                    flatten_list(items, visited)
                } else {
                    Value::Null
                }
            }
            leaf => flatten_leaf(leaf),
        };
        out.insert(key, flat);
    }
    Value::Object(out)
}

fn flatten_list(items: Vec<MetaValue>, visited: &mut HashSet<String>) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| match item {
                MetaValue::Map(inner) => flatten_map(&inner, visited),
                MetaValue::List(nested) => flatten_list(nested, visited),
                leaf => flatten_leaf(leaf),
            })
            .collect(),
    )
}

fn flatten_leaf(value: MetaValue) -> Value {
    match value {
        MetaValue::Null => Value::Null,
        MetaValue::Bool(b) => Value::Bool(b),
        MetaValue::Int(i) => Value::Number(Number::from(i)),
        MetaValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        MetaValue::Str(s) => Value::String(s),
        MetaValue::List(_) | MetaValue::Map(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_convert_to_json_scalars() {
        let map = new_meta_map();
        map.borrow_mut()
            .insert("count".to_string(), MetaValue::Int(3));
        map.borrow_mut()
            .insert("rate".to_string(), MetaValue::Float(2.5));
        map.borrow_mut()
            .insert("name".to_string(), MetaValue::Str("csd".to_string()));
        let doc = flatten(&map);
        assert_eq!(doc["count"], 3);
        assert_eq!(doc["rate"], 2.5);
        assert_eq!(doc["name"], "csd");
    }

    #[test]
    fn non_finite_floats_become_null() {
        let map = new_meta_map();
        map.borrow_mut()
            .insert("bad".to_string(), MetaValue::Float(f64::NAN));
        let doc = flatten(&map);
        assert_eq!(doc["bad"], Value::Null);
    }

    #[test]
    fn nested_maps_keep_their_nesting() {
        let inner = new_meta_map();
        inner
            .borrow_mut()
            .insert("order".to_string(), MetaValue::Int(2));
        let map = new_meta_map();
        map.borrow_mut()
            .insert("cfg".to_string(), MetaValue::Map(inner));
        let doc = flatten(&map);
        assert_eq!(doc["cfg"]["order"], 2);
    }

    #[test]
    fn self_reference_terminates() {
        let map = new_meta_map();
        map.borrow_mut()
            .insert("value".to_string(), MetaValue::Int(1));
        map.borrow_mut()
            .insert("self".to_string(), MetaValue::Map(map.clone()));
        let doc = flatten(&map);
        assert_eq!(doc["value"], 1);
        assert_eq!(doc["self"]["value"], 1);
        assert_eq!(doc["self"]["self"], Value::Null);
    }

    #[test]
    fn cross_reference_with_back_edge_terminates() {
        // dct["key2"]["key2.3"] = dct, as in the classic back-edge layout.
        let key1 = new_meta_map();
        key1.borrow_mut()
            .insert("key1.1".to_string(), MetaValue::Int(3));
        let root = new_meta_map();
        let key2 = new_meta_map();
        key2.borrow_mut()
            .insert("key2.1".to_string(), MetaValue::Int(4000));
        key2.borrow_mut()
            .insert("key2.2".to_string(), MetaValue::Map(key1.clone()));
        key2.borrow_mut()
            .insert("key2.3".to_string(), MetaValue::Map(root.clone()));
        root.borrow_mut()
            .insert("key1".to_string(), MetaValue::Map(key1));
        root.borrow_mut()
            .insert("key2".to_string(), MetaValue::Map(key2));
        let doc = flatten(&root);
        assert_eq!(doc["key1"]["key1.1"], 3);
        assert_eq!(doc["key2"]["key2.1"], 4000);
    }

    #[test]
    fn map_inside_list_terminates_on_cycles() {
        let root = new_meta_map();
        root.borrow_mut().insert(
            "items".to_string(),
            MetaValue::List(vec![MetaValue::Int(1), MetaValue::Map(root.clone())]),
        );
        let doc = flatten(&root);
        assert_eq!(doc["items"][0], 1);
    }
}
