use std::collections::hash_map::{Entry, HashMap};
use std::hash::Hash;

use ordered_float::OrderedFloat;

use crate::error::{Error, Result};
use crate::geometry::Vector3;

/// A value that can be stored in an attribute table.
///
/// Floats are not `Eq`/`Hash`, so every value maps onto a hashable key.
/// Floats go through `OrderedFloat`, so `0.0` and `-0.0` share a key and all
/// NaNs are equal. Everything else is compared exactly; there is no tolerance.
pub trait DedupKey {
    type Key: Hash + Eq;

    fn dedup_key(&self) -> Self::Key;
}

impl DedupKey for f32 {
    type Key = OrderedFloat<f32>;

    fn dedup_key(&self) -> Self::Key {
        OrderedFloat(*self)
    }
}

impl DedupKey for u32 {
    type Key = u32;

    fn dedup_key(&self) -> Self::Key {
        *self
    }
}

impl<const N: usize> DedupKey for [f32; N] {
    type Key = [OrderedFloat<f32>; N];

    fn dedup_key(&self) -> Self::Key {
        self.map(OrderedFloat)
    }
}

impl DedupKey for Vector3 {
    type Key = [OrderedFloat<f32>; 3];

    fn dedup_key(&self) -> Self::Key {
        [OrderedFloat(self.x), OrderedFloat(self.y), OrderedFloat(self.z)]
    }
}

impl DedupKey for Vec<f32> {
    type Key = Vec<OrderedFloat<f32>>;

    fn dedup_key(&self) -> Self::Key {
        self.iter().copied().map(OrderedFloat).collect()
    }
}

impl<T: DedupKey> DedupKey for Option<T> {
    type Key = Option<T::Key>;

    fn dedup_key(&self) -> Self::Key {
        self.as_ref().map(DedupKey::dedup_key)
    }
}

impl<A: DedupKey, B: DedupKey> DedupKey for (A, B) {
    type Key = (A::Key, B::Key);

    fn dedup_key(&self) -> Self::Key {
        (self.0.dedup_key(), self.1.dedup_key())
    }
}

impl<A: DedupKey, B: DedupKey, C: DedupKey> DedupKey for (A, B, C) {
    type Key = (A::Key, B::Key, C::Key);

    fn dedup_key(&self) -> Self::Key {
        (self.0.dedup_key(), self.1.dedup_key(), self.2.dedup_key())
    }
}

impl<A: DedupKey, B: DedupKey, C: DedupKey, D: DedupKey> DedupKey for (A, B, C, D) {
    type Key = (A::Key, B::Key, C::Key, D::Key);

    fn dedup_key(&self) -> Self::Key {
        (
            self.0.dedup_key(),
            self.1.dedup_key(),
            self.2.dedup_key(),
            self.3.dedup_key(),
        )
    }
}

/// Builds a table of unique values, handing out a stable index for each value
/// the first time it is seen.
///
/// Indices follow first-occurrence order, so the table is deterministic for a
/// fixed insertion order.
pub struct AttributeDeduplicator<T: DedupKey> {
    lookup: HashMap<T::Key, u32>,
    values: Vec<T>,
}

impl<T: DedupKey> AttributeDeduplicator<T> {
    pub fn new() -> Self {
        Self {
            lookup: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Returns the index of `value`, appending it to the table if it has not
    /// been seen before.
    pub fn insert(&mut self, value: T) -> u32 {
        match self.lookup.entry(value.dedup_key()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let index = self.values.len() as u32;
                e.insert(index);
                self.values.push(value);
                index
            }
        }
    }

    pub fn get(&self, value: &T) -> Option<u32> {
        self.lookup.get(&value.dedup_key()).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

impl<T: DedupKey> Default for AttributeDeduplicator<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deduplicates a sequence of values in a single pass.
///
/// Returns the unique table and, for every input value, its index into that
/// table; `table[indices[i]]` equals the `i`th input.
pub fn deduplicate<T, I>(values: I) -> (Vec<T>, Vec<u32>)
where
    T: DedupKey,
    I: IntoIterator<Item = T>,
{
    let mut dedup = AttributeDeduplicator::new();
    let indices = values.into_iter().map(|v| dedup.insert(v)).collect();
    (dedup.into_values(), indices)
}

/// Like [`deduplicate`] for untyped values that must all have `arity`
/// components.
pub fn deduplicate_slices(values: &[&[f32]], arity: usize) -> Result<(Vec<Vec<f32>>, Vec<u32>)> {
    if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| v.len() != arity) {
        return Err(Error::precondition(format!(
            "attribute value {i} has {} components, expected {arity}",
            v.len()
        )));
    }
    Ok(deduplicate(values.iter().map(|v| v.to_vec())))
}
