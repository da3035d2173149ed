use std::sync::Arc;

use rand::prelude::*;
use tch::{Device, Kind, Tensor};

use crate::data::dataset::{Dataset, Example};
use crate::error::Result;

type Batch = (Tensor, Tensor);

/// Dataloader over a [`Dataset`].
///
/// Batches are tuples of the form (samples, targets), both tensors of size
/// `batch_size x block_size`. Targets are the samples shifted by one token.
///
/// For example, with rows [[0, 1, 2, 3], [4, 5, 6, 7], [8, 9, 10, 11]] and
/// `batch_size` 2, the loader returns, in order:
/// - batch 1: (tensor([[0, 1, 2], [4, 5, 6]]), tensor([[1, 2, 3], [5, 6, 7]]))
/// - batch 2: (tensor([[8, 9, 10]]), tensor([[9, 10, 11]]))
///
/// The last batch is dropped instead when `drop_last` is set.
#[derive(Clone)]
pub struct Loader {
    dataset: Arc<dyn Dataset + Send + Sync>,
    batch_size: usize,
    drop_last: bool,
    device: Device,
    /// The order of the samples
    order: Option<Vec<usize>>,
    /// The current position in the order
    pos: usize,
}

impl Loader {
    /// Create a new data loader
    pub fn new(dataset: Arc<dyn Dataset + Send + Sync>, batch_size: usize, device: Device) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            drop_last: false,
            device,
            order: None,
            pos: 0,
        }
    }

    /// Drop the last incomplete batch.
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Return the number of samples
    pub fn n_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Return the number of batches
    pub fn n_batches(&self) -> usize {
        if self.drop_last {
            self.n_samples() / self.batch_size
        } else {
            self.n_samples().div_ceil(self.batch_size)
        }
    }

    /// Return the batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Return the block size
    pub fn block_size(&self) -> usize {
        self.dataset.block_size()
    }

    /// Pick a random order for the samples and restart from the first batch
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.n_samples()).collect();
        order.shuffle(rng);
        self.order = Some(order);
        self.pos = 0;
    }

    /// Restart from the first batch, keeping the current order
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Returns the next batch
    /// If `shuffle` has been called, the order of the samples is random.
    /// Otherwise, the samples are returned in the order of the dataset.
    pub fn next_batch(&mut self) -> Option<Result<Batch>> {
        let remaining = self.n_samples().saturating_sub(self.pos);
        let size = remaining.min(self.batch_size);
        if size == 0 || (self.drop_last && size < self.batch_size) {
            return None;
        }

        let indices = (self.pos..self.pos + size)
            .map(|i| self.order.as_ref().map_or(i, |order| order[i]))
            .collect::<Vec<_>>();
        self.pos += size;

        Some(self.collate(&indices))
    }

    fn collate(&self, indices: &[usize]) -> Result<Batch> {
        let block_size = self.block_size() as i64;
        let mut samples = Vec::with_capacity(indices.len() * block_size as usize);
        let mut targets = Vec::with_capacity(indices.len() * block_size as usize);
        for &idx in indices {
            let Example { input, target } = self.dataset.example(idx)?;
            samples.extend(input);
            targets.extend(target);
        }

        let shape = [indices.len() as i64, block_size];
        let xs = Tensor::from_slice(&samples)
            .to_kind(Kind::Int64)
            .view(shape)
            .to(self.device);
        let ys = Tensor::from_slice(&targets)
            .to_kind(Kind::Int64)
            .view(shape)
            .to(self.device);
        Ok((xs, ys))
    }
}

/// Test the data loader
#[cfg(test)]
mod tests {
    use rand_chacha::rand_core::SeedableRng;

    use super::*;
    use crate::data::dataset::TokenedDataset;
    use crate::data::window::TokenTable;

    fn loader(n_rows: i64, batch_size: usize) -> Loader {
        // rows [4i, 4i+1, 4i+2, 4i+3]
        let data = (0..n_rows * 4).collect::<Vec<i64>>();
        let table = TokenTable::from_raw(3, data).unwrap();
        let dataset = Arc::new(TokenedDataset::new(table, Device::Cpu));
        Loader::new(dataset, batch_size, Device::Cpu)
    }

    fn to_vec(t: Tensor) -> Vec<Vec<i64>> {
        t.try_into().unwrap()
    }

    #[test]
    fn test_data_loader() {
        let mut loader = loader(3, 2);

        assert_eq!(loader.n_samples(), 3);
        assert_eq!(loader.n_batches(), 2);

        let (samples, targets) = loader.next_batch().unwrap().unwrap();
        assert_eq!(samples.size(), vec![2, 3]);
        assert_eq!(to_vec(samples), vec![vec![0, 1, 2], vec![4, 5, 6]]);
        assert_eq!(to_vec(targets), vec![vec![1, 2, 3], vec![5, 6, 7]]);
        let (samples, targets) = loader.next_batch().unwrap().unwrap();
        assert_eq!(to_vec(samples), vec![vec![8, 9, 10]]);
        assert_eq!(to_vec(targets), vec![vec![9, 10, 11]]);
        assert!(loader.next_batch().is_none());

        loader.rewind();
        assert!(loader.next_batch().is_some());
    }

    #[test]
    fn test_data_loader_drop_last() {
        let mut loader = loader(3, 2).with_drop_last(true);

        assert_eq!(loader.n_batches(), 1);
        assert!(loader.next_batch().is_some());
        assert!(loader.next_batch().is_none());
    }

    #[test]
    fn test_data_loader_shuffle() {
        let mut loader = loader(4, 2);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(123);

        loader.shuffle(&mut rng);

        let mut firsts = Vec::new();
        while let Some(batch) = loader.next_batch() {
            let (samples, targets) = batch.unwrap();
            for (s, t) in to_vec(samples).into_iter().zip(to_vec(targets)) {
                assert_eq!(s[0] + 1, t[0]);
                firsts.push(s[0]);
            }
        }
        firsts.sort();
        assert_eq!(firsts, vec![0, 4, 8, 12]);
    }
}
