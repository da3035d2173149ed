//! Per-epoch checkpoints of a `VarStore` and its optimizer settings.
//!
//! Each epoch is saved to its own file, `epoch-{epoch}.ot`, holding the model
//! variables under `model.`, the optimizer hyper-parameters under
//! `optimizer.`, and the epoch number.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tch::nn::VarStore;
use tch::{Kind, Tensor};
use tracing::{debug, info};

use crate::config::OptimizerConfig;
use crate::error::{Error, Result};

const MODEL_PREFIX: &str = "model.";
const EPOCH_KEY: &str = "epoch";
const LR_KEY: &str = "optimizer.lr";
const BETA1_KEY: &str = "optimizer.beta1";
const BETA2_KEY: &str = "optimizer.beta2";
const WD_KEY: &str = "optimizer.wd";

/// Which checkpoint to load.
#[derive(Debug, Clone)]
pub enum CheckpointSource {
    /// The highest-numbered epoch in a directory
    Latest(PathBuf),
    /// An explicit file
    File(PathBuf),
}

/// What a checkpoint restores besides the model variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    /// Epoch at which the checkpoint was saved
    pub epoch: usize,
    /// Optimizer settings at that epoch
    pub optimizer: OptimizerConfig,
}

/// Path of the checkpoint file for `epoch` in `dir`.
pub fn checkpoint_path<P: AsRef<Path>>(dir: P, epoch: usize) -> PathBuf {
    dir.as_ref().join(format!("epoch-{epoch}.ot"))
}

/// Save the model variables, the optimizer settings and the epoch.
pub fn save_checkpoint<P: AsRef<Path>>(
    dir: P,
    epoch: usize,
    vs: &VarStore,
    optimizer: &OptimizerConfig,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(Error::path(dir))?;
    let path = checkpoint_path(dir, epoch);

    let mut named: Vec<(String, Tensor)> = vs
        .variables()
        .into_iter()
        .map(|(name, t)| (format!("{MODEL_PREFIX}{name}"), t))
        .collect();
    named.push((EPOCH_KEY.to_string(), Tensor::from_slice(&[epoch as i64])));
    named.push((LR_KEY.to_string(), Tensor::from_slice(&[optimizer.lr])));
    named.push((BETA1_KEY.to_string(), Tensor::from_slice(&[optimizer.beta1])));
    named.push((BETA2_KEY.to_string(), Tensor::from_slice(&[optimizer.beta2])));
    named.push((WD_KEY.to_string(), Tensor::from_slice(&[optimizer.wd])));

    Tensor::save_multi(&named, &path)?;
    info!(path = %path.display(), epoch, "saved checkpoint");
    Ok(path)
}

/// Parse the epoch out of a file name like `epoch-12.ot`.
fn epoch_of(path: &Path) -> Option<usize> {
    let stem = path.file_name()?.to_str()?.split('.').next()?;
    stem.strip_prefix("epoch-")?.parse().ok()
}

/// Return the highest epoch saved in `dir`, if any.
///
/// Files that are not named `epoch-N.*` are ignored.
pub fn last_epoch<P: AsRef<Path>>(dir: P) -> Result<Option<usize>> {
    let dir = dir.as_ref();
    let mut last = None;
    for entry in std::fs::read_dir(dir).map_err(Error::path(dir))? {
        let path = entry.map_err(Error::path(dir))?.path();
        match epoch_of(&path) {
            Some(epoch) => last = last.max(Some(epoch)),
            None => debug!(path = %path.display(), "not a checkpoint"),
        }
    }
    Ok(last)
}

fn scalar(tensors: &HashMap<String, Tensor>, path: &Path, name: &str) -> Result<f64> {
    let t = tensors.get(name).ok_or_else(|| Error::MissingTensor {
        path: path.to_path_buf(),
        name: name.to_string(),
    })?;
    Ok(t.to_kind(Kind::Double).reshape(-1).f_double_value(&[0])?)
}

/// Restore the variables of `vs` from a checkpoint.
///
/// Every variable of `vs` must be in the checkpoint with the same shape.
pub fn load_checkpoint(vs: &mut VarStore, source: &CheckpointSource) -> Result<Checkpoint> {
    let path = match source {
        CheckpointSource::Latest(dir) => {
            let epoch = last_epoch(dir)?.ok_or_else(|| Error::NoCheckpoint(dir.clone()))?;
            checkpoint_path(dir, epoch)
        }
        CheckpointSource::File(path) => {
            if !path.is_file() {
                return Err(Error::CheckpointNotFound(path.clone()));
            }
            path.clone()
        }
    };

    let tensors: HashMap<String, Tensor> =
        Tensor::load_multi_with_device(&path, vs.device())?.into_iter().collect();

    for (name, mut var) in vs.variables() {
        let key = format!("{MODEL_PREFIX}{name}");
        let saved = tensors.get(&key).ok_or_else(|| Error::MissingTensor {
            path: path.clone(),
            name: key.clone(),
        })?;
        if saved.size() != var.size() {
            return Err(Error::ShapeMismatch {
                name: key,
                expected: var.size(),
                found: saved.size(),
            });
        }
        tch::no_grad(|| var.copy_(saved));
    }

    let checkpoint = Checkpoint {
        epoch: scalar(&tensors, &path, EPOCH_KEY)? as usize,
        optimizer: OptimizerConfig {
            lr: scalar(&tensors, &path, LR_KEY)?,
            beta1: scalar(&tensors, &path, BETA1_KEY)?,
            beta2: scalar(&tensors, &path, BETA2_KEY)?,
            wd: scalar(&tensors, &path, WD_KEY)?,
        },
    };
    info!(path = %path.display(), epoch = checkpoint.epoch, "loaded checkpoint");
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tch::Device;

    use super::*;
    use crate::model::testing::Bigram;

    fn weights(vs: &VarStore) -> Vec<f32> {
        let t = vs.variables()["embedding.weight"].reshape(-1);
        t.try_into().unwrap()
    }

    #[test]
    fn test_epoch_of() {
        assert_eq!(epoch_of(Path::new("ckpt/epoch-3.ot")), Some(3));
        assert_eq!(epoch_of(Path::new("epoch-12.tar")), Some(12));
        assert_eq!(epoch_of(Path::new("epoch-x.ot")), None);
        assert_eq!(epoch_of(Path::new("notes.txt")), None);
    }

    #[test]
    #[serial]
    fn test_checkpoint_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        tch::manual_seed(1);
        let vs = VarStore::new(Device::Cpu);
        let _model = Bigram::new(&vs.root(), 8);
        let optimizer = OptimizerConfig {
            lr: 1e-3,
            ..OptimizerConfig::default()
        };

        let path = save_checkpoint(dir.path(), 2, &vs, &optimizer).unwrap();
        assert_eq!(path, dir.path().join("epoch-2.ot"));

        tch::manual_seed(2);
        let mut restored = VarStore::new(Device::Cpu);
        let _model = Bigram::new(&restored.root(), 8);
        assert_ne!(weights(&vs), weights(&restored));

        let checkpoint =
            load_checkpoint(&mut restored, &CheckpointSource::File(path.clone())).unwrap();
        assert_eq!(checkpoint.epoch, 2);
        assert_eq!(checkpoint.optimizer, optimizer);
        assert_eq!(weights(&vs), weights(&restored));
    }

    #[test]
    fn test_load_latest() {
        let dir = tempfile::tempdir().unwrap();
        let vs = VarStore::new(Device::Cpu);
        let _model = Bigram::new(&vs.root(), 4);
        let optimizer = OptimizerConfig::default();

        for epoch in [1, 10, 3] {
            save_checkpoint(dir.path(), epoch, &vs, &optimizer).unwrap();
        }
        std::fs::write(dir.path().join("README"), "not a checkpoint").unwrap();
        assert_eq!(last_epoch(dir.path()).unwrap(), Some(10));

        let mut restored = VarStore::new(Device::Cpu);
        let _model = Bigram::new(&restored.root(), 4);
        let checkpoint = load_checkpoint(
            &mut restored,
            &CheckpointSource::Latest(dir.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(checkpoint.epoch, 10);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut vs = VarStore::new(Device::Cpu);
        let _model = Bigram::new(&vs.root(), 4);

        assert_eq!(last_epoch(dir.path()).unwrap(), None);
        let err = load_checkpoint(&mut vs, &CheckpointSource::Latest(dir.path().to_path_buf()));
        assert!(matches!(err, Err(Error::NoCheckpoint(_))));

        let err = load_checkpoint(
            &mut vs,
            &CheckpointSource::File(dir.path().join("epoch-1.ot")),
        );
        assert!(matches!(err, Err(Error::CheckpointNotFound(_))));

        assert!(last_epoch(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_load_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let vs = VarStore::new(Device::Cpu);
        let _model = Bigram::new(&vs.root(), 4);
        save_checkpoint(dir.path(), 1, &vs, &OptimizerConfig::default()).unwrap();

        let mut other = VarStore::new(Device::Cpu);
        let _model = Bigram::new(&other.root(), 5);
        let err = load_checkpoint(
            &mut other,
            &CheckpointSource::Latest(dir.path().to_path_buf()),
        );
        assert!(matches!(err, Err(Error::ShapeMismatch { .. })));

        let mut other = VarStore::new(Device::Cpu);
        let _ = other.root().sub("head").zeros("weight", &[2, 2]);
        let err = load_checkpoint(
            &mut other,
            &CheckpointSource::Latest(dir.path().to_path_buf()),
        );
        assert!(matches!(err, Err(Error::MissingTensor { .. })));
    }
}
