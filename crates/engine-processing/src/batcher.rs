use crate::error::ProcessingError;

/// Groups the items of an iterator into vectors of at most `size` items.
///
/// Every group but the last is full. An exhausted inner iterator yields no empty group.
#[derive(Debug)]
pub struct Batcher<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Batcher<I> {
    pub fn new(inner: I, size: usize) -> Result<Self, ProcessingError> {
        if size == 0 {
            return Err(ProcessingError::InvalidGroupSize);
        }
        Ok(Batcher { inner, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get_ref(&self) -> &I {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut I {
        &mut self.inner
    }
}

impl<I: Iterator> Iterator for Batcher<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let group: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if group.is_empty() { None } else { Some(group) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_group_may_be_short() {
        let groups: Vec<Vec<u32>> = Batcher::new(1..=10, 4).unwrap().collect();
        assert_eq!(groups, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8], vec![9, 10]]);
    }

    #[test]
    fn group_count_is_ceiling() {
        for (n, g) in [(0usize, 3usize), (1, 1), (7, 7), (8, 7), (1000, 3)] {
            let count = Batcher::new(0..n, g).unwrap().count();
            assert_eq!(count, n.div_ceil(g), "n={n} g={g}");
        }
    }

    #[test]
    fn zero_group_size_is_rejected() {
        assert!(matches!(
            Batcher::new(0..3, 0),
            Err(ProcessingError::InvalidGroupSize)
        ));
    }
}
