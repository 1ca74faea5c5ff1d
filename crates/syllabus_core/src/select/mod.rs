//! Latest-version selection over grouped candidates.
//!
//! # Responsibility
//! - Pick the single authoritative "latest" element per group key.
//!
//! # Invariants
//! - Single pass, O(n) in candidate count; no sorting.
//! - Ties on the time value are broken by later insertion order,
//!   deterministically across repeated runs.

use std::collections::HashMap;
use std::hash::Hash;

/// Groups `candidates` by `key_fn` and keeps, per group, the element with the
/// maximum `time_fn` value. Equal time values resolve to the later element in
/// iteration order, which for rowid-ordered inputs means the higher id wins.
pub fn select_latest<T, K, KF, TF>(
    candidates: impl IntoIterator<Item = T>,
    key_fn: KF,
    time_fn: TF,
) -> HashMap<K, T>
where
    K: Eq + Hash,
    KF: Fn(&T) -> K,
    TF: Fn(&T) -> i64,
{
    let mut best: HashMap<K, T> = HashMap::new();
    for candidate in candidates {
        let key = key_fn(&candidate);
        match best.get(&key) {
            Some(current) if time_fn(current) > time_fn(&candidate) => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::select_latest;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Doc {
        id: i64,
        code: &'static str,
        created_at: i64,
    }

    fn doc(id: i64, code: &'static str, created_at: i64) -> Doc {
        Doc {
            id,
            code,
            created_at,
        }
    }

    #[test]
    fn one_entry_per_group_with_max_time() {
        let docs = vec![
            doc(1, "CS301", 100),
            doc(2, "CS301", 300),
            doc(3, "HS101", 200),
            doc(4, "CS301", 200),
        ];
        let latest = select_latest(docs, |d| d.code, |d| d.created_at);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["CS301"].id, 2);
        assert_eq!(latest["HS101"].id, 3);
    }

    #[test]
    fn equal_timestamps_resolve_to_later_insertion() {
        let docs = vec![doc(1, "CS301", 100), doc(2, "CS301", 100)];
        let latest = select_latest(docs, |d| d.code, |d| d.created_at);
        assert_eq!(latest["CS301"].id, 2);
    }

    #[test]
    fn tie_break_is_stable_across_runs() {
        let docs = vec![
            doc(5, "A", 50),
            doc(6, "A", 50),
            doc(7, "A", 50),
            doc(8, "B", 10),
        ];
        for _ in 0..10 {
            let latest = select_latest(docs.clone(), |d| d.code, |d| d.created_at);
            assert_eq!(latest["A"].id, 7);
            assert_eq!(latest["B"].id, 8);
        }
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let latest = select_latest(Vec::<Doc>::new(), |d| d.code, |d| d.created_at);
        assert!(latest.is_empty());
    }
}
