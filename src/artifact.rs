//! Artifact persistence
//!
//! Every artifact is JSON written through a scoped writer: buffered, hashed
//! as it streams, flushed and fsynced before the record is returned. If
//! serialization or any write fails, the partial file is removed.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::label::LabeledSet;
use crate::tracking::{sha256_address, ArtifactRecord};
use crate::Result;

/// File name of the serialized model
pub const MODEL_FILE: &str = "model.json";
/// File name of the scoring sample
pub const SAMPLE_FILE: &str = "sample.json";
/// File name of the run manifest
pub const MANIFEST_FILE: &str = "run_manifest.json";

/// Writer that hashes and counts every byte passed through.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn stream_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(String, u64)> {
    let file = File::create(path)?;
    let mut writer = HashingWriter {
        inner: BufWriter::new(file),
        hasher: Sha256::new(),
        written: 0,
    };
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    writer.inner.get_ref().sync_all()?;
    Ok((sha256_address(writer.hasher), writer.written))
}

/// Serialize `value` as pretty JSON into `dir/key`.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] or [`crate::Error::Json`]; the partially
/// written file is removed first.
pub fn write_json<T: Serialize + ?Sized>(dir: &Path, key: &str, value: &T) -> Result<ArtifactRecord> {
    let path = dir.join(key);
    match stream_json(&path, value) {
        Ok((cas_hash, size_bytes)) => {
            info!(artifact = key, path = %path.display(), size_bytes, %cas_hash, "wrote artifact");
            Ok(ArtifactRecord::new(key, path, cas_hash, size_bytes))
        }
        Err(err) => {
            remove_quietly(&path);
            Err(err)
        }
    }
}

/// Remove the files of already written artifacts. Failures are logged, not
/// returned; the caller is already on an error path.
pub fn discard(artifacts: &[ArtifactRecord]) {
    for artifact in artifacts {
        remove_quietly(artifact.path());
        info!(artifact = artifact.key(), "discarded artifact of failed run");
    }
}

fn remove_quietly(path: &Path) {
    if let Err(cleanup) = fs::remove_file(path) {
        if cleanup.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %cleanup, "could not remove artifact");
        }
    }
}

/// Persist a fitted model as `dir/model.json`.
///
/// # Errors
///
/// See [`write_json`].
pub fn persist_model<M: Serialize>(model: &M, dir: &Path) -> Result<ArtifactRecord> {
    write_json(dir, MODEL_FILE, model)
}

/// Draw up to `n` rows of `test` as records-oriented JSON objects keyed by
/// feature name in column order. Rows are chosen with a seeded RNG and kept
/// in test order; labels and row keys are not included.
#[must_use]
pub fn sample_rows(test: &LabeledSet, n: usize, seed: u64) -> Vec<Map<String, Value>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, test.len(), n.min(test.len())).into_vec();
    picked.sort_unstable();

    picked
        .into_iter()
        .map(|row| {
            test.feature_names()
                .iter()
                .zip(&test.features()[row])
                .map(|(name, &value)| (name.clone(), Value::from(value)))
                .collect()
        })
        .collect()
}

/// Persist a seeded sample of test feature rows as `dir/sample.json`.
///
/// # Errors
///
/// See [`write_json`].
pub fn persist_sample(test: &LabeledSet, n: usize, seed: u64, dir: &Path) -> Result<ArtifactRecord> {
    write_json(dir, SAMPLE_FILE, &sample_rows(test, n, seed))
}
