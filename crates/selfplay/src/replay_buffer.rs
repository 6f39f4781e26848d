//! Bounded FIFO store of training examples.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use uzero_core::TrainingExample;

/// Capacity-bounded replay buffer.
///
/// Appends go to the back; once full, each append evicts the oldest example.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    capacity: usize,
    data: VecDeque<TrainingExample>,
    total_added: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: VecDeque::with_capacity(capacity.min(1 << 16)),
            total_added: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Examples ever appended, including evicted ones.
    pub fn total_added(&self) -> usize {
        self.total_added
    }

    pub fn push(&mut self, example: TrainingExample) {
        self.total_added += 1;
        if self.capacity == 0 {
            return;
        }
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(example);
    }

    pub fn extend<I: IntoIterator<Item = TrainingExample>>(&mut self, examples: I) {
        for example in examples {
            self.push(example);
        }
    }

    /// Oldest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &TrainingExample> {
        self.data.iter()
    }

    pub fn get(&self, index: usize) -> Option<&TrainingExample> {
        self.data.get(index)
    }

    /// One epoch of full batches drawn without replacement in shuffled order.
    ///
    /// Leftover examples that do not fill a batch are skipped; an empty
    /// vector is returned when the buffer holds fewer than `batch_size`.
    pub fn shuffled_batches<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Vec<Vec<TrainingExample>> {
        if batch_size == 0 || self.data.len() < batch_size {
            return Vec::new();
        }
        let mut order: Vec<usize> = (0..self.data.len()).collect();
        order.shuffle(rng);
        order
            .chunks_exact(batch_size)
            .map(|chunk| chunk.iter().map(|&i| self.data[i].clone()).collect())
            .collect()
    }
}
