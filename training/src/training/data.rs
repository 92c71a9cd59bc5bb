//! Stratified splitting and batch iteration shared by both trainers.

use candle_core::{Device, Tensor};
use phishnet_core::{PhishnetError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of a train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified train/test split over binary targets, preserving class ratios.
///
/// Each class is shuffled with a seeded RNG and `round(n_class * test_ratio)`
/// of its rows go to the test side.
///
/// # Errors
///
/// [`PhishnetError::DataQuality`] if either class is absent, and
/// [`PhishnetError::Config`] if `test_ratio` is not strictly between 0 and 1.
pub fn stratified_split(targets: &[u8], test_ratio: f64, seed: u64) -> Result<IndexSplit> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(PhishnetError::Config(format!(
            "test_ratio must be within (0, 1), got {test_ratio}"
        )));
    }

    let mut class0: Vec<usize> = Vec::new();
    let mut class1: Vec<usize> = Vec::new();
    for (i, &t) in targets.iter().enumerate() {
        if t == 0 {
            class0.push(i);
        } else {
            class1.push(i);
        }
    }
    if class0.is_empty() || class1.is_empty() {
        return Err(PhishnetError::DataQuality(format!(
            "stratified split needs both classes ({} benign, {} phishing)",
            class0.len(),
            class1.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    class0.shuffle(&mut rng);
    class1.shuffle(&mut rng);

    let test0 = (class0.len() as f64 * test_ratio).round() as usize;
    let test1 = (class1.len() as f64 * test_ratio).round() as usize;

    let test: Vec<usize> = class0[..test0]
        .iter()
        .chain(class1[..test1].iter())
        .copied()
        .collect();
    let train: Vec<usize> = class0[test0..]
        .iter()
        .chain(class1[test1..].iter())
        .copied()
        .collect();

    tracing::info!(
        train = train.len(),
        train_benign = class0.len() - test0,
        train_phishing = class1.len() - test1,
        test = test.len(),
        test_benign = test0,
        test_phishing = test1,
        "Stratified split"
    );

    Ok(IndexSplit { train, test })
}

/// Select `indices` from `items`, cloning.
pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}

/// Mini-batch iterator over pre-loaded tensors. Reshuffles indices each epoch.
pub struct BatchIterator {
    inputs: Tensor,
    targets: Tensor,
    indices: Vec<usize>,
    batch_size: usize,
    pos: usize,
}

impl BatchIterator {
    /// Fails if `inputs` and `targets` do not have the same number of rows.
    pub fn new(inputs: Tensor, targets: Tensor, batch_size: usize) -> candle_core::Result<Self> {
        let n = inputs.dim(0)?;
        let n_targets = targets.dim(0)?;
        if n != n_targets {
            candle_core::bail!("batch inputs have {n} rows but targets have {n_targets}");
        }
        Ok(Self {
            inputs,
            targets,
            indices: (0..n).collect(),
            batch_size: batch_size.max(1),
            pos: 0,
        })
    }

    /// Reshuffle for a new epoch using a seeded RNG derived from base seed + epoch.
    pub fn reshuffle(&mut self, seed: u64, epoch: usize) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch as u64));
        self.indices.shuffle(&mut rng);
        self.pos = 0;
    }

    /// Returns the next mini-batch, or `Ok(None)` once the epoch is exhausted.
    pub fn next_batch(&mut self) -> candle_core::Result<Option<(Tensor, Tensor)>> {
        let n = self.indices.len();
        if self.pos >= n {
            return Ok(None);
        }

        let end = (self.pos + self.batch_size).min(n);
        let batch_idx: Vec<u32> = self.indices[self.pos..end]
            .iter()
            .map(|&i| i as u32)
            .collect();
        self.pos = end;

        let device = self.inputs.device().clone();
        let idx_tensor = Tensor::new(batch_idx.as_slice(), &device)?;
        let batch_inputs = self.inputs.index_select(&idx_tensor, 0)?;
        let batch_targets = self.targets.index_select(&idx_tensor, 0)?;

        Ok(Some((batch_inputs, batch_targets)))
    }
}

/// Build an id tensor `[rows, max_len]` (u32) from a flat row-major buffer.
pub fn id_tensor(flat: Vec<u32>, rows: usize, max_len: usize, device: &Device) -> Result<Tensor> {
    Tensor::from_vec(flat, (rows, max_len), device)
        .map_err(|e| PhishnetError::Model(format!("Failed to build id tensor: {e}")))
}

/// Build a target tensor `[rows]` (f32) from binary targets.
pub fn target_tensor(targets: &[u8], device: &Device) -> Result<Tensor> {
    let values: Vec<f32> = targets.iter().map(|&t| f32::from(t)).collect();
    Tensor::from_vec(values, targets.len(), device)
        .map_err(|e| PhishnetError::Model(format!("Failed to build target tensor: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    #[test]
    fn test_batch_iterator_exhausts() {
        let device = Device::Cpu;
        let inputs = Tensor::zeros((10, 4), DType::U32, &device).unwrap();
        let targets = Tensor::zeros(10, DType::F32, &device).unwrap();

        let mut iter = BatchIterator::new(inputs, targets, 3).unwrap();
        iter.reshuffle(42, 0);

        let mut count = 0;
        let mut rows = 0;
        while let Some((x, _)) = iter.next_batch().unwrap() {
            count += 1;
            rows += x.dim(0).unwrap();
        }
        assert_eq!(count, 4); // ceil(10/3) = 4
        assert_eq!(rows, 10);
    }

    #[test]
    fn test_batch_iterator_rejects_row_mismatch() {
        let device = Device::Cpu;
        let inputs = Tensor::zeros((10, 4), DType::U32, &device).unwrap();
        let targets = Tensor::zeros(4, DType::F32, &device).unwrap();
        assert!(BatchIterator::new(inputs, targets, 3).is_err());
    }

    #[test]
    fn test_batch_selection_error_is_returned() {
        let device = Device::Cpu;
        let mut iter = BatchIterator {
            inputs: Tensor::zeros((10, 4), DType::U32, &device).unwrap(),
            targets: Tensor::zeros(4, DType::F32, &device).unwrap(),
            indices: (0..10).collect(),
            batch_size: 10,
            pos: 0,
        };
        assert!(iter.next_batch().is_err());
    }

    #[test]
    fn test_stratified_split_preserves_ratio() {
        let mut targets = vec![0u8; 80];
        targets.extend(vec![1u8; 20]);
        let split = stratified_split(&targets, 0.2, 42).unwrap();

        assert_eq!(split.train.len() + split.test.len(), 100);
        let test_phishing = split.test.iter().filter(|&&i| targets[i] == 1).count();
        assert_eq!(split.test.len(), 20);
        assert_eq!(test_phishing, 4);
    }

    #[test]
    fn test_stratified_split_is_disjoint_and_seeded() {
        let targets: Vec<u8> = (0..50).map(|i| (i % 3 == 0) as u8).collect();
        let a = stratified_split(&targets, 0.2, 7).unwrap();
        let b = stratified_split(&targets, 0.2, 7).unwrap();
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_split_rejects_single_class() {
        let err = stratified_split(&[1, 1, 1], 0.2, 42).unwrap_err();
        assert!(matches!(err, PhishnetError::DataQuality(_)));
        assert!(stratified_split(&[], 0.2, 42).is_err());
    }

    #[test]
    fn test_stratified_split_rejects_bad_ratio() {
        assert!(matches!(
            stratified_split(&[0, 1], 1.0, 42),
            Err(PhishnetError::Config(_))
        ));
    }
}
