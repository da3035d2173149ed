use tch::{nn, Tensor};

/// A language model: token ids of shape \[batch_size, t\] to logits of shape
/// \[batch_size, t, vocab_size\].
pub trait LanguageModel: nn::ModuleT {
    /// Return the block size which is the maximum length of the input.
    fn block_size(&self) -> usize;

    /// Forward pass returning the logits and the loss against `ys`.
    fn forward_with_loss(&self, xs: &Tensor, ys: &Tensor, train: bool) -> (Tensor, Tensor) {
        let logits = self.forward_t(xs, train);
        let loss = loss(&logits, ys);
        (logits, loss)
    }
}

/// Compute the loss
///
/// Use cross entropy loss.
pub fn loss(logits: &Tensor, targets: &Tensor) -> Tensor {
    let size = logits.size();
    let (b, t, c) = (size[0], size[1], size[2]);

    let logits = logits.to_kind(tch::Kind::Float);
    let targets = targets.to_kind(tch::Kind::Int64);

    logits
        .view([b * t, c])
        .cross_entropy_for_logits(&targets.view([b * t]))
}

#[cfg(test)]
pub(crate) mod testing {
    use tch::{nn, Tensor};

    use super::LanguageModel;

    /// Bigram model: the embedding of the current token is the logits of the
    /// next one.
    #[derive(Debug)]
    pub struct Bigram {
        embedding: nn::Embedding,
    }

    impl Bigram {
        pub fn new(vs: &nn::Path, vocab_size: i64) -> Self {
            let embedding =
                nn::embedding(vs / "embedding", vocab_size, vocab_size, Default::default());
            Self { embedding }
        }
    }

    impl nn::ModuleT for Bigram {
        fn forward_t(&self, xs: &Tensor, _train: bool) -> Tensor {
            xs.apply(&self.embedding)
        }
    }

    impl LanguageModel for Bigram {
        fn block_size(&self) -> usize {
            8
        }
    }
}

#[cfg(test)]
mod tests {
    use tch::{nn, Kind, Tensor};

    use super::testing::Bigram;
    use super::*;

    #[test]
    fn test_forward_with_loss() {
        let vs = nn::VarStore::new(tch::Device::Cpu);
        let vocab_size = 10;
        let model = Bigram::new(&vs.root(), vocab_size);

        let xs = Tensor::from_slice(&[0i64, 1, 2, 3, 4, 5]).view([2, 3]);
        let ys = Tensor::from_slice(&[1i64, 2, 3, 4, 5, 6]).view([2, 3]);
        let (logits, loss) = model.forward_with_loss(&xs, &ys, false);

        assert_eq!(logits.size(), [2, 3, vocab_size]);
        assert_eq!(loss.size(), Vec::<i64>::new());
        assert_eq!(loss.kind(), Kind::Float);
        let loss = f64::try_from(loss).unwrap();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_loss_uniform_logits() {
        let vocab_size = 4;
        let logits = Tensor::zeros([1, 2, vocab_size], (Kind::Float, tch::Device::Cpu));
        let targets = Tensor::from_slice(&[0i64, 3]).view([1, 2]);
        let loss = f64::try_from(loss(&logits, &targets)).unwrap();
        assert!((loss - (vocab_size as f64).ln()).abs() < 1e-6);
    }
}
