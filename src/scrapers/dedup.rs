use std::collections::HashSet;
use std::hash::Hash;

/// Keeps the first item for every key, preserving order.
pub fn unique_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins() {
        let items = vec![(1, "a"), (2, "b"), (1, "c"), (3, "d"), (2, "e")];
        assert_eq!(unique_by(items, |i| i.0), vec![(1, "a"), (2, "b"), (3, "d")]);
    }

    #[test]
    fn test_idempotent() {
        let items = vec![5, 3, 5, 1, 3, 3, 9];
        let once = unique_by(items, |i| *i);
        let twice = unique_by(once.clone(), |i| *i);
        assert_eq!(once, twice);
    }
}
