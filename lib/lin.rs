//! Index lookup for sector bases keyed by the labels of their two halves.
//!
//! A basis sorted by `(label_a, label_b)` can often be indexed by the sum of
//! two small tables, `idx = J_a[label_a] + J_b[label_b]` (a Lin table). This
//! works whenever every block of equal `label_a` lists its `label_b` values at
//! the same offsets; when it doesn't, lookup falls back to binary search over
//! the sorted keys.

const UNSET: usize = usize::MAX;

/// Two-table index over `(label_a, label_b)` keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinTable {
    ja: Vec<usize>,
    jb: Vec<usize>,
}

impl LinTable {
    /// Build the tables for a list of keys sorted in ascending order, or
    /// return `None` if the keys don't admit a consistent decomposition.
    pub fn build(keys: &[(u64, u64)], dim_a: usize, dim_b: usize)
        -> Option<Self>
    {
        let mut ja: Vec<usize> = vec![UNSET; dim_a];
        let mut jb: Vec<usize> = vec![UNSET; dim_b];
        let mut block_start: usize = 0;
        for (idx, &(la, lb)) in keys.iter().enumerate() {
            let (la, lb) = (la as usize, lb as usize);
            if la >= dim_a || lb >= dim_b { return None; }
            if ja[la] == UNSET {
                ja[la] = idx;
                block_start = idx;
            }
            let offset = idx - block_start;
            match jb[lb] {
                UNSET => { jb[lb] = offset; },
                o if o == offset => { },
                _ => { return None; },
            }
        }
        Some(Self { ja, jb })
    }

    /// Candidate position of a key; must be checked against the key list.
    pub fn index(&self, key: (u64, u64)) -> Option<usize> {
        let a = *self.ja.get(key.0 as usize)?;
        let b = *self.jb.get(key.1 as usize)?;
        (a != UNSET && b != UNSET).then_some(a + b)
    }
}

/// Sorted keys of a sector basis, with an optional [`LinTable`] accelerating
/// lookup.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BasisIndex {
    keys: Vec<(u64, u64)>,
    lin: Option<LinTable>,
}

impl BasisIndex {
    /// Index a list of keys, which must be sorted and free of duplicates.
    pub fn new(keys: Vec<(u64, u64)>, dim_a: usize, dim_b: usize) -> Self {
        let lin = LinTable::build(&keys, dim_a, dim_b);
        if lin.is_none() && !keys.is_empty() {
            log::info!(
                "Lin table inconsistent for {} keys; using binary search",
                keys.len(),
            );
        }
        Self { keys, lin }
    }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    pub fn keys(&self) -> &[(u64, u64)] { &self.keys }

    /// Returns `true` if lookup goes through a Lin table.
    pub fn has_lin(&self) -> bool { self.lin.is_some() }

    /// Position of a key, if present.
    pub fn find(&self, key: (u64, u64)) -> Option<usize> {
        if let Some(lin) = &self.lin {
            return lin.index(key)
                .filter(|&idx| self.keys.get(idx) == Some(&key));
        }
        self.keys.binary_search(&key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_basis_uses_lin() {
        // every a-label paired with the same b-labels
        let keys: Vec<(u64, u64)>
            = [1_u64, 4, 5].iter()
            .flat_map(|&a| [0_u64, 2, 3, 7].into_iter().map(move |b| (a, b)))
            .collect();
        let index = BasisIndex::new(keys.clone(), 8, 8);
        assert!(index.has_lin());
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(index.find(k), Some(i));
        }
        assert_eq!(index.find((4, 1)), None);
        assert_eq!(index.find((2, 0)), None);
        assert_eq!(index.find((9, 0)), None);
    }

    #[test]
    fn triangular_basis_falls_back() {
        // b >= a, as for halves exchanged by a translation
        let keys: Vec<(u64, u64)>
            = (0..4_u64)
            .flat_map(|a| (a..4).map(move |b| (a, b)))
            .collect();
        let index = BasisIndex::new(keys.clone(), 4, 4);
        assert!(!index.has_lin());
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(index.find(k), Some(i));
        }
        assert_eq!(index.find((2, 1)), None);
    }

    #[test]
    fn lin_agrees_with_search() {
        // a sparse basis that still happens to be consistent
        let keys = vec![(0, 1), (0, 3), (2, 1), (2, 3), (3, 1)];
        let lin = LinTable::build(&keys, 4, 4).unwrap();
        let index = BasisIndex::new(keys.clone(), 4, 4);
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(lin.index(k), Some(i));
            assert_eq!(index.find(k), Some(i));
        }
        // (3, 3) decodes past the end of the key list
        assert_eq!(index.find((3, 3)), None);
    }
}
