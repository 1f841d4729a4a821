//! Wait-free sample FIFO between a producer thread and the audio callback.
//!
//! Split into halves: the producer thread owns [`SampleProducer`], the graph
//! node owns [`SampleConsumer`]. Neither side ever takes a lock.

use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapProd, HeapRb};

pub struct SampleProducer {
    inner: HeapProd<f32>,
}

pub struct SampleConsumer {
    inner: HeapCons<f32>,
}

pub fn sample_ring(capacity: usize) -> (SampleProducer, SampleConsumer) {
    let (producer, consumer) = HeapRb::<f32>::new(capacity.max(1)).split();
    (
        SampleProducer { inner: producer },
        SampleConsumer { inner: consumer },
    )
}

impl SampleProducer {
    /// Writes as many samples as fit; returns how many were taken.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.inner.push_slice(samples)
    }

    pub fn vacant_len(&self) -> usize {
        self.inner.vacant_len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

impl SampleConsumer {
    /// Fills the front of `dest`; returns how many samples were read.
    pub fn pop_slice(&mut self, dest: &mut [f32]) -> usize {
        self.inner.pop_slice(dest)
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
