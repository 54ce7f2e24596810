//! Structure-of-arrays component columns.

use super::entity::MAX_ENTITIES;

/// One component array, indexed by entity slot.
///
/// Every slot always holds a value; the component mask decides whether the
/// value is meaningful.
pub struct Column<T> {
    data: Vec<T>,
}

impl<T: Default> Column<T> {
    pub(crate) fn new() -> Self {
        let mut data = Vec::with_capacity(MAX_ENTITIES);
        data.resize_with(MAX_ENTITIES, T::default);
        Self { data }
    }

    pub(crate) fn reset(&mut self, index: usize) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = T::default();
        }
    }
}

impl<T> Column<T> {
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    pub(crate) fn set(&mut self, index: usize, value: T) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = value;
        }
    }
}
