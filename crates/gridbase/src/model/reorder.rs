//! List reordering primitives.
//!
//! Moving an entry is remove-then-insert: the element is deleted first,
//! and when the removed slot was before the target, the target index is
//! decremented by one. Containers cannot be re-inserted into a Loro list,
//! so map entries are moved by writing a cloned node at the new position.

use anyhow::Result;

use super::ext::ListExt;

/// Index to insert at after the element at `from` has been removed.
pub(crate) fn adjusted_insert_index(from: usize, to: usize) -> usize {
    if from < to { to - 1 } else { to }
}

/// Move a string entry so it sits immediately before `before`; append when
/// `before` is absent or not found. Returns false when `id` is not in the
/// list.
pub(crate) fn move_string_entry(
    list: &loro::LoroList,
    id: &str,
    before: Option<&str>,
) -> Result<bool> {
    let Some(from) = list.index_of_str(id) else {
        return Ok(false);
    };
    let to = before
        .and_then(|b| list.index_of_str(b))
        .unwrap_or_else(|| list.len());

    list.delete(from, 1)?;
    list.insert(
        adjusted_insert_index(from, to),
        loro::LoroValue::from(id),
    )?;
    Ok(true)
}

/// Move a flat map entry (one whose values are all primitives) identified
/// by its "id" key. The node is cloned into a fresh container at the
/// adjusted position.
pub(crate) fn move_flat_map_entry(
    list: &loro::LoroList,
    id: &str,
    before: Option<&str>,
) -> Result<bool> {
    let Some((from, map)) = list.find_map_by_id(id) else {
        return Ok(false);
    };

    let mut entries: Vec<(String, loro::LoroValue)> = Vec::new();
    map.for_each(|k, v| {
        if let loro::ValueOrContainer::Value(val) = v {
            entries.push((k.to_string(), val));
        }
    });

    let to = before
        .and_then(|b| list.find_map_by_id(b).map(|(index, _)| index))
        .unwrap_or_else(|| list.len());

    list.delete(from, 1)?;
    let clone = list.insert_container(adjusted_insert_index(from, to), loro::LoroMap::new())?;
    for (key, value) in entries {
        clone.insert(&key, value)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_list(items: &[&str]) -> (loro::LoroDoc, loro::LoroList) {
        let doc = loro::LoroDoc::new();
        let list = doc.get_list("items");
        for item in items {
            list.push(loro::LoroValue::from(*item)).unwrap();
        }
        (doc, list)
    }

    #[test]
    fn test_adjusted_insert_index() {
        // Removing before the target shifts the target down.
        assert_eq!(adjusted_insert_index(0, 3), 2);
        // Removing after the target leaves it alone.
        assert_eq!(adjusted_insert_index(3, 1), 1);
        assert_eq!(adjusted_insert_index(2, 2), 2);
    }

    #[test]
    fn test_move_forward_lands_before_target() {
        let (_doc, list) = string_list(&["a", "b", "c", "d"]);
        assert!(move_string_entry(&list, "a", Some("d")).unwrap());
        assert_eq!(list.collect_strings(), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_move_backward_lands_before_target() {
        let (_doc, list) = string_list(&["a", "b", "c", "d"]);
        assert!(move_string_entry(&list, "d", Some("b")).unwrap());
        assert_eq!(list.collect_strings(), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_move_without_target_appends() {
        let (_doc, list) = string_list(&["a", "b", "c"]);
        assert!(move_string_entry(&list, "a", None).unwrap());
        assert_eq!(list.collect_strings(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_move_missing_entry_is_noop() {
        let (_doc, list) = string_list(&["a", "b"]);
        assert!(!move_string_entry(&list, "zzz", Some("a")).unwrap());
        assert_eq!(list.collect_strings(), vec!["a", "b"]);
    }

    proptest::proptest! {
        /// Any valid move yields a permutation: same length, no loss or
        /// duplication, and the moved element sits immediately before the
        /// target.
        #[test]
        fn prop_move_is_a_permutation(
            len in 1usize..12,
            source in 0usize..12,
            target in 0usize..12,
        ) {
            let source = source % len;
            let target = target % len;
            let items: Vec<String> = (0..len).map(|i| format!("item-{i}")).collect();
            let refs: Vec<&str> = items.iter().map(String::as_str).collect();
            let (_doc, list) = string_list(&refs);

            let moved = items[source].clone();
            let before = items[target].clone();
            proptest::prop_assert!(
                move_string_entry(&list, &moved, Some(&before)).unwrap()
            );

            let result = list.collect_strings();
            proptest::prop_assert_eq!(result.len(), items.len());
            let mut sorted = result.clone();
            sorted.sort();
            let mut expected = items.clone();
            expected.sort();
            proptest::prop_assert_eq!(sorted, expected);

            if moved != before {
                let moved_at = result.iter().position(|x| *x == moved).unwrap();
                let target_at = result.iter().position(|x| *x == before).unwrap();
                proptest::prop_assert_eq!(moved_at + 1, target_at);
            }
        }
    }
}
