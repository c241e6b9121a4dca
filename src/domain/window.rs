// Bounded rolling window of samples across all keys
use std::collections::VecDeque;

/// Insertion-ordered buffer holding at most `capacity` samples.
///
/// Eviction is global FIFO: the oldest sample goes first no matter which key
/// it belongs to, so a key sampled more often can crowd out the others.
#[derive(Debug, Clone)]
pub struct SampleWindow<R> {
    capacity: usize,
    samples: VecDeque<R>,
}

impl<R: Clone> SampleWindow<R> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Appends one round's samples in order, then evicts from the front until
    /// the window fits. Returns the number of evicted samples.
    pub fn extend_round<I>(&mut self, round: I) -> usize
    where
        I: IntoIterator<Item = R>,
    {
        self.samples.extend(round);
        let overflow = self.samples.len().saturating_sub(self.capacity);
        self.samples.drain(..overflow);
        overflow
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.samples.iter()
    }

    /// Copy of the current contents, oldest first
    pub fn to_vec(&self) -> Vec<R> {
        self.samples.iter().cloned().collect()
    }
}
