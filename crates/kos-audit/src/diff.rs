//! Shallow field diff between two entity snapshots.

use serde_json::Value;

/// Computes the top-level keys that differ between two snapshots.
///
/// A key is reported when its value in `after` differs from `before`
/// (including keys that only exist in `after`), or when it exists in
/// `before` but was removed from `after`. Values are compared as whole
/// JSON values; nested changes surface only as their top-level key.
///
/// Returns `None` if either snapshot is not a JSON object.
///
/// # Examples
///
/// ```rust
/// use kos_audit::changed_fields;
/// use serde_json::json;
///
/// let before = json!({"a": 1, "b": 2});
/// let after = json!({"a": 1, "b": 3, "c": 4});
/// assert_eq!(changed_fields(&before, &after), Some(vec!["b".to_string(), "c".to_string()]));
/// ```
#[must_use]
pub fn changed_fields(before: &Value, after: &Value) -> Option<Vec<String>> {
    let before = before.as_object()?;
    let after = after.as_object()?;

    let modified = after
        .iter()
        .filter(|&(key, value)| before.get(key.as_str()) != Some(value))
        .map(|(key, _)| key.clone());

    let removed = before
        .keys()
        .filter(|key| !after.contains_key(key.as_str()))
        .cloned();

    Some(modified.chain(removed).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_modified_and_added_keys() {
        let before = json!({"a": 1, "b": 2});
        let after = json!({"a": 1, "b": 3, "c": 4});
        assert_eq!(
            changed_fields(&before, &after),
            Some(vec!["b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_removed_key() {
        let before = json!({"a": 1, "b": 2});
        let after = json!({"a": 1});
        assert_eq!(changed_fields(&before, &after), Some(vec!["b".to_string()]));
    }

    #[test]
    fn test_explicit_null_differs_from_value() {
        let before = json!({"description": "old"});
        let after = json!({"description": null});
        assert_eq!(
            changed_fields(&before, &after),
            Some(vec!["description".to_string()])
        );
    }

    #[test]
    fn test_nested_change_reports_top_level_key() {
        let before = json!({"redirectUris": ["https://a"], "enabled": true});
        let after = json!({"redirectUris": ["https://a", "https://b"], "enabled": true});
        assert_eq!(
            changed_fields(&before, &after),
            Some(vec!["redirectUris".to_string()])
        );
    }

    #[test]
    fn test_non_object_snapshot() {
        assert_eq!(changed_fields(&json!([1, 2]), &json!({"a": 1})), None);
        assert_eq!(changed_fields(&json!({"a": 1}), &json!("x")), None);
    }

    fn snapshot() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-e]", 0i64..4, 0..5).prop_map(|m| {
            Value::Object(m.into_iter().map(|(k, v)| (k, json!(v))).collect())
        })
    }

    proptest! {
        #[test]
        fn prop_identical_snapshots_have_no_changes(s in snapshot()) {
            prop_assert_eq!(changed_fields(&s, &s), Some(Vec::new()));
        }

        #[test]
        fn prop_diff_is_symmetric_as_a_set(a in snapshot(), b in snapshot()) {
            let mut forward = changed_fields(&a, &b).unwrap();
            let mut backward = changed_fields(&b, &a).unwrap();
            forward.sort();
            backward.sort();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_changed_keys_exist_in_either_snapshot(a in snapshot(), b in snapshot()) {
            for key in changed_fields(&a, &b).unwrap() {
                prop_assert!(a.get(&key).is_some() || b.get(&key).is_some());
            }
        }
    }
}
