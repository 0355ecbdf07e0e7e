//! Insertion-ordered, id-indexed row storage.
//!
//! A [`Table`] keeps its rows in a `Vec` and maps ids to positions with a
//! `HashMap`. Cloning copies every row and preserves both the ids and their
//! order, so a cloned grid can be mutated without touching the base grid.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{GridError, GridResult};

#[derive(Debug, Clone)]
pub struct Table<K, R> {
    ids: Vec<K>,
    rows: Vec<R>,
    index: HashMap<K, usize>,
}

impl<K, R> Default for Table<K, R> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K, R> Table<K, R>
where
    K: Copy + Eq + Hash + Ord + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. Fails when `id` is already present.
    pub fn insert(&mut self, id: K, row: R) -> GridResult<()> {
        if self.index.contains_key(&id) {
            return Err(GridError::Validation(format!("duplicate id {:?}", id)));
        }
        self.index.insert(id, self.rows.len());
        self.ids.push(id);
        self.rows.push(row);
        Ok(())
    }

    /// Append a batch of rows. Nothing is inserted if any id collides with
    /// an existing id or with another id in the batch.
    pub fn extend(&mut self, rows: Vec<(K, R)>) -> GridResult<()> {
        let mut pending = HashMap::with_capacity(rows.len());
        for (id, _) in &rows {
            if self.index.contains_key(id) || pending.insert(*id, ()).is_some() {
                return Err(GridError::Validation(format!("duplicate id {:?}", id)));
            }
        }
        for (id, row) in rows {
            self.index.insert(id, self.rows.len());
            self.ids.push(id);
            self.rows.push(row);
        }
        Ok(())
    }

    pub fn contains(&self, id: K) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: K) -> Option<&R> {
        self.index.get(&id).map(|&pos| &self.rows[pos])
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut R> {
        match self.index.get(&id) {
            Some(&pos) => self.rows.get_mut(pos),
            None => None,
        }
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &R)> {
        self.ids.iter().copied().zip(self.rows.iter())
    }

    pub fn max_id(&self) -> Option<K> {
        self.ids.iter().copied().max()
    }
}

impl<K, R> PartialEq for Table<K, R>
where
    K: PartialEq,
    R: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids && self.rows == other.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut table = Table::new();
        table.insert(7u32, "b").unwrap();
        table.insert(3u32, "a").unwrap();

        assert_eq!(table.ids(), &[7, 3]);
        assert_eq!(table.get(3), Some(&"a"));
        assert_eq!(table.max_id(), Some(7));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut table = Table::new();
        table.insert(1u32, 1.0).unwrap();
        assert!(matches!(
            table.insert(1, 2.0),
            Err(GridError::Validation(_))
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn extend_is_all_or_nothing() {
        let mut table = Table::new();
        table.insert(1u32, 1.0).unwrap();

        assert!(table.extend(vec![(2, 2.0), (2, 3.0)]).is_err());
        assert!(table.extend(vec![(3, 2.0), (1, 3.0)]).is_err());
        assert_eq!(table.len(), 1);

        table.extend(vec![(2, 2.0), (3, 3.0)]).unwrap();
        assert_eq!(table.ids(), &[1, 2, 3]);
    }

    #[test]
    fn clone_is_independent() {
        let mut base = Table::new();
        base.insert(1u32, 10.0).unwrap();

        let mut copy = base.clone();
        *copy.get_mut(1).unwrap() *= 2.0;

        assert_eq!(base.get(1), Some(&10.0));
        assert_eq!(copy.get(1), Some(&20.0));
        assert_ne!(base, copy);
    }
}
