//! Versioned MessagePack checkpoints.
//!
//! A checkpoint is a named-field map `{magic, version, config, params}`.
//! The header is decoded first so a file from a newer format version is
//! reported as such instead of as a parse failure.

use crate::{mlp::Params, MlpConfig};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uzero_core::EstimatorError;

/// Identifies a file as an MLP checkpoint.
pub const CHECKPOINT_MAGIC: &str = "uzero-mlp";

/// Current on-disk format version.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Serialize)]
struct CheckpointRef<'a> {
    magic: &'a str,
    version: u32,
    config: &'a MlpConfig,
    params: &'a Params,
}

#[derive(Deserialize)]
struct Header {
    magic: String,
    version: u32,
}

#[derive(Deserialize)]
struct Checkpoint {
    config: MlpConfig,
    params: Params,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> EstimatorError + '_ {
    move |source| EstimatorError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn corrupt(path: &Path, reason: impl ToString) -> EstimatorError {
    EstimatorError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes a checkpoint to a sibling temp file, then renames it over `path`.
pub(crate) fn write(path: &Path, config: &MlpConfig, params: &Params) -> Result<(), EstimatorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let envelope = CheckpointRef {
        magic: CHECKPOINT_MAGIC,
        version: CHECKPOINT_VERSION,
        config,
        params,
    };

    let tmp = temp_path(path);
    let file = File::create(&tmp).map_err(io_error(&tmp))?;
    let mut writer = BufWriter::new(file);
    rmp_serde::encode::write_named(&mut writer, &envelope)
        .map_err(|e| EstimatorError::Serialize(e.to_string()))?;
    writer.flush().map_err(io_error(&tmp))?;
    drop(writer);

    fs::rename(&tmp, path).map_err(io_error(path))
}

/// Reads and validates a checkpoint.
pub(crate) fn read(path: &Path) -> Result<(MlpConfig, Params), EstimatorError> {
    let bytes = fs::read(path).map_err(io_error(path))?;

    let header: Header = rmp_serde::from_slice(&bytes).map_err(|e| corrupt(path, e))?;
    if header.magic != CHECKPOINT_MAGIC {
        return Err(corrupt(path, format!("unexpected magic {:?}", header.magic)));
    }
    if header.version != CHECKPOINT_VERSION {
        return Err(EstimatorError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: header.version,
            expected: CHECKPOINT_VERSION,
        });
    }

    let checkpoint: Checkpoint = rmp_serde::from_slice(&bytes).map_err(|e| corrupt(path, e))?;
    checkpoint.params.check_shapes(&checkpoint.config)?;
    if !checkpoint.params.is_finite() {
        return Err(corrupt(path, "non-finite parameters"));
    }
    Ok((checkpoint.config, checkpoint.params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MlpEstimator;
    use tempfile::TempDir;
    use uzero_core::Estimator;

    fn small() -> MlpConfig {
        MlpConfig::default().with_hidden_size(16).with_seed(3)
    }

    #[derive(Serialize)]
    struct FakeHeader {
        magic: String,
        version: u32,
    }

    #[test]
    fn test_save_then_load_restores_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("net.msgpack");

        let original = MlpEstimator::new(small());
        original.save(&path).unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let mut restored = MlpEstimator::new(small().with_seed(99));
        restored.load(&path).unwrap();

        let obs = vec![0.25; 648];
        assert_eq!(
            original.predict(&obs).unwrap(),
            restored.predict(&obs).unwrap()
        );
    }

    #[test]
    fn test_load_adopts_checkpoint_hidden_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("net.msgpack");
        MlpEstimator::new(small()).save(&path).unwrap();

        let mut net = MlpEstimator::new(MlpConfig::default().with_hidden_size(8));
        net.load(&path).unwrap();
        assert_eq!(net.config().hidden_size, 16);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut net = MlpEstimator::new(small());
        let err = net.load(&dir.path().join("absent.msgpack")).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.is_persistence());
    }

    #[test]
    fn test_garbage_is_corrupt_and_leaves_params() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.msgpack");
        fs::write(&path, b"definitely not msgpack").unwrap();

        let mut net = MlpEstimator::new(small());
        let obs = vec![0.5; 648];
        let before = net.predict(&obs).unwrap();

        let err = net.load(&path).unwrap_err();
        assert!(matches!(err, EstimatorError::Corrupt { .. }), "{err}");
        assert_eq!(net.predict(&obs).unwrap(), before);
    }

    #[test]
    fn test_wrong_magic_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.msgpack");
        let header = FakeHeader {
            magic: "something-else".into(),
            version: CHECKPOINT_VERSION,
        };
        fs::write(&path, rmp_serde::to_vec_named(&header).unwrap()).unwrap();

        let err = read(&path).unwrap_err();
        assert!(matches!(err, EstimatorError::Corrupt { .. }));
    }

    #[test]
    fn test_future_version_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.msgpack");
        let header = FakeHeader {
            magic: CHECKPOINT_MAGIC.into(),
            version: CHECKPOINT_VERSION + 1,
        };
        fs::write(&path, rmp_serde::to_vec_named(&header).unwrap()).unwrap();

        match read(&path).unwrap_err() {
            EstimatorError::UnsupportedVersion {
                found, expected, ..
            } => {
                assert_eq!(found, CHECKPOINT_VERSION + 1);
                assert_eq!(expected, CHECKPOINT_VERSION);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_finite_weights_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nan.msgpack");
        let config = small();
        let mut params = Params::zeros(&config);
        params.bp[3] = f32::NAN;
        params.w2[[0, 1]] = f32::INFINITY;
        write(&path, &config, &params).unwrap();

        let mut net = MlpEstimator::new(small());
        let obs = vec![0.5; 648];
        let before = net.predict(&obs).unwrap();

        let err = net.load(&path).unwrap_err();
        assert!(matches!(err, EstimatorError::Corrupt { .. }), "{err}");
        assert_eq!(net.predict(&obs).unwrap(), before);
    }

    #[test]
    fn test_mismatched_input_size_is_shape_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.msgpack");
        let tiny = MlpConfig {
            input_size: 10,
            ..small()
        };
        MlpEstimator::new(tiny).save(&path).unwrap();

        let mut net = MlpEstimator::new(small());
        let err = net.load(&path).unwrap_err();
        assert!(matches!(err, EstimatorError::Shape { .. }));
        assert_eq!(net.config().input_size, 648);
    }

    #[test]
    fn test_from_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("net.msgpack");
        let original = MlpEstimator::new(small());
        original.save(&path).unwrap();

        let loaded = MlpEstimator::from_checkpoint(&path).unwrap();
        assert_eq!(loaded.config(), original.config());
    }
}
