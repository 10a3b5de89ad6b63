//! Pure tree operations on the JSON value tree.
//!
//! The tree never contains `null` leaves or empty object nodes: `null`
//! means "delete" at write time, and a node whose last child is removed
//! disappears itself. Callers therefore read `None`/absent rather than
//! ever observing an empty husk of a room.

use pointdeck_protocol::{Fields, StorePath, Value};
use serde_json::Map;

/// Reads the subtree at `path`.
pub fn get_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Replaces the subtree at `path`. `null` (and values that normalize to
/// nothing, like `{}`) remove it instead.
pub fn set_at(root: &mut Value, path: &StorePath, value: Value) {
    match normalize(value) {
        Some(value) => {
            let segments: Vec<&str> = path.segments().collect();
            set_rec(root, &segments, value);
        }
        None => remove_at(root, path),
    }
}

/// Removes the subtree at `path`, pruning emptied ancestors.
pub fn remove_at(root: &mut Value, path: &StorePath) {
    let segments: Vec<&str> = path.segments().collect();
    remove_rec(root, &segments);
}

/// Merges `fields` into the node at `path`. A field key containing `/`
/// addresses a nested child; a `null` field value deletes that child.
pub fn update_at(root: &mut Value, path: &StorePath, fields: &Fields) {
    for (key, value) in fields {
        let mut segments: Vec<&str> = path.segments().collect();
        segments.extend(key.split('/'));
        match normalize(value.clone()) {
            Some(value) => set_rec(root, &segments, value),
            None => remove_rec(root, &segments),
        }
    }
}

/// Strips `null` fields and empty objects, recursively. `None` means the
/// value stores as nothing at all.
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        other => Some(other),
    }
}

fn set_rec(node: &mut Value, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        // Writing below a scalar replaces it with an interior node.
        *node = Value::Object(Map::new());
    }
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    if rest.is_empty() {
        obj.insert((*first).to_string(), value);
    } else {
        let child = obj
            .entry((*first).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        set_rec(child, rest, value);
    }
}

fn remove_rec(node: &mut Value, segments: &[&str]) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        obj.remove(*first);
        return;
    }
    if let Some(child) = obj.get_mut(*first) {
        remove_rec(child, rest);
        let emptied = child.as_object().is_some_and(|m| m.is_empty());
        if emptied {
            obj.remove(*first);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).expect("valid test path")
    }

    fn empty_root() -> Value {
        Value::Object(Map::new())
    }

    #[test]
    fn test_set_at_creates_intermediate_nodes() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a/presence/u1"), json!(true));

        assert_eq!(
            get_at(&root, &path("rooms/a/presence/u1")),
            Some(&json!(true))
        );
        assert!(get_at(&root, &path("rooms/a")).is_some());
    }

    #[test]
    fn test_set_at_replaces_whole_subtree() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a"), json!({ "title": "x", "revealed": true }));
        set_at(&mut root, &path("rooms/a"), json!({ "revealed": false }));

        assert_eq!(get_at(&root, &path("rooms/a")), Some(&json!({ "revealed": false })));
        assert!(get_at(&root, &path("rooms/a/title")).is_none());
    }

    #[test]
    fn test_set_at_null_removes_subtree() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a/revealed"), json!(false));
        set_at(&mut root, &path("rooms/a/revealed"), Value::Null);

        assert!(get_at(&root, &path("rooms/a/revealed")).is_none());
        // Removing the only leaf prunes the room node too.
        assert!(get_at(&root, &path("rooms/a")).is_none());
    }

    #[test]
    fn test_set_at_strips_null_fields_from_written_object() {
        let mut root = empty_root();
        set_at(
            &mut root,
            &path("rooms/a/participants/u1"),
            json!({ "id": "u1", "name": "Alice", "selectedCard": null }),
        );

        let stored = get_at(&root, &path("rooms/a/participants/u1")).expect("written");
        assert_eq!(stored, &json!({ "id": "u1", "name": "Alice" }));
    }

    #[test]
    fn test_remove_at_prunes_emptied_ancestors() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a/presence/u1"), json!(true));
        remove_at(&mut root, &path("rooms/a/presence/u1"));

        assert!(get_at(&root, &path("rooms/a/presence")).is_none());
        assert!(get_at(&root, &path("rooms/a")).is_none());
        assert!(get_at(&root, &path("rooms")).is_none());
    }

    #[test]
    fn test_remove_at_keeps_non_empty_siblings() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a/presence/u1"), json!(true));
        set_at(&mut root, &path("rooms/a/presence/u2"), json!(true));
        remove_at(&mut root, &path("rooms/a/presence/u1"));

        assert!(get_at(&root, &path("rooms/a/presence/u2")).is_some());
        assert!(get_at(&root, &path("rooms/a")).is_some());
    }

    #[test]
    fn test_remove_at_missing_path_is_noop() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a/title"), json!("x"));
        remove_at(&mut root, &path("rooms/b/title"));

        assert_eq!(get_at(&root, &path("rooms/a/title")), Some(&json!("x")));
    }

    #[test]
    fn test_update_at_merges_and_preserves_other_fields() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a"), json!({ "title": "x", "revealed": false }));

        let mut fields = Fields::new();
        fields.insert("revealed".into(), json!(true));
        update_at(&mut root, &path("rooms/a"), &fields);

        assert_eq!(
            get_at(&root, &path("rooms/a")),
            Some(&json!({ "title": "x", "revealed": true }))
        );
    }

    #[test]
    fn test_update_at_null_field_deletes_child() {
        let mut root = empty_root();
        set_at(
            &mut root,
            &path("rooms/a/participants/u1"),
            json!({ "id": "u1", "selectedCard": "M", "isRevealed": true }),
        );

        let mut fields = Fields::new();
        fields.insert("selectedCard".into(), Value::Null);
        fields.insert("isRevealed".into(), json!(false));
        update_at(&mut root, &path("rooms/a/participants/u1"), &fields);

        assert_eq!(
            get_at(&root, &path("rooms/a/participants/u1")),
            Some(&json!({ "id": "u1", "isRevealed": false }))
        );
    }

    #[test]
    fn test_update_at_nested_field_keys_address_children() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a/participants/u1"), json!({ "isAdmin": true }));
        set_at(&mut root, &path("rooms/a/participants/u2"), json!({ "isAdmin": false }));

        // One merged update flips both flags, the shape admin transfer uses.
        let mut fields = Fields::new();
        fields.insert("u1/isAdmin".into(), json!(false));
        fields.insert("u2/isAdmin".into(), json!(true));
        update_at(&mut root, &path("rooms/a/participants"), &fields);

        assert_eq!(
            get_at(&root, &path("rooms/a/participants/u1")),
            Some(&json!({ "isAdmin": false }))
        );
        assert_eq!(
            get_at(&root, &path("rooms/a/participants/u2")),
            Some(&json!({ "isAdmin": true }))
        );
    }

    #[test]
    fn test_update_at_creates_missing_node() {
        let mut root = empty_root();
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("Alice"));
        update_at(&mut root, &path("rooms/a/participants/u1"), &fields);

        assert_eq!(
            get_at(&root, &path("rooms/a/participants/u1/name")),
            Some(&json!("Alice"))
        );
    }

    #[test]
    fn test_set_at_empty_object_stores_nothing() {
        let mut root = empty_root();
        set_at(&mut root, &path("rooms/a"), json!({}));
        assert!(get_at(&root, &path("rooms/a")).is_none());
    }
}
