//! Filesystem-backed source of result files.
//!
//! A results directory holds one file per model run. Files end in `.json` (the
//! evaluator's default, usually gzip-compressed despite the extension) or
//! `.json.gz`; compression is detected from the content, not the name.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::common::config::AppCfg;
use crate::common::error::{EvalError, EvalResult};

use super::domain::{RecordSource, ResultFile};
use super::service;

/// Result files stored under a single directory.
pub struct FsRecordRepo {
    root: PathBuf,
}

impl FsRecordRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.results_root)
    }

    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `file` as `<name>.json`, gzip-compressed when `compress` is set.
    pub fn put(&self, name: &str, file: &ResultFile, compress: bool) -> EvalResult<PathBuf> {
        fs::create_dir_all(&self.root).map_err(|e| EvalError::io(&self.root, e))?;
        let path = self.root.join(format!("{name}.json"));
        let handle = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| EvalError::io(&path, e))?;

        encode_into(&path, handle, file, compress)?;

        tracing::debug!(path = %path.display(), compress, "wrote result file");
        Ok(path)
    }
}

impl RecordSource for FsRecordRepo {
    fn list(&self) -> EvalResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(|e| EvalError::io(&self.root, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EvalError::io(&self.root, e))?;
            let path = entry.path();
            if path.is_file() && is_result_file(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn load(&self, path: &Path) -> EvalResult<ResultFile> {
        let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
        service::decode(path, file)
    }
}

fn encode_into<W: Write>(path: &Path, handle: W, file: &ResultFile, compress: bool) -> EvalResult<()> {
    let written = if compress {
        let mut encoder = GzEncoder::new(handle, Compression::default());
        serde_json::to_writer(&mut encoder, file).map_err(|e| encode_error(path, e))?;
        encoder.finish().map(drop)
    } else {
        let mut writer = BufWriter::new(handle);
        serde_json::to_writer_pretty(&mut writer, file).map_err(|e| encode_error(path, e))?;
        writer.flush()
    };
    written.map_err(|e| EvalError::io(path, e))
}

// serde_json reports sink failures as its own error; keep them as IO with the path.
fn encode_error(path: &Path, e: serde_json::Error) -> EvalError {
    if e.is_io() {
        EvalError::io(path, e.into())
    } else {
        EvalError::Encode(e)
    }
}

fn is_result_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".json") || name.ends_with(".json.gz"))
        .unwrap_or(false)
}
