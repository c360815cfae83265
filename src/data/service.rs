//! Decoding of raw result file bytes.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::common::error::{EvalError, EvalResult};

use super::domain::ResultFile;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decode a result file, transparently handling gzip compression.
///
/// `path` is only used for error reporting.
pub fn decode<R: Read>(path: &Path, reader: R) -> EvalResult<ResultFile> {
    let mut reader = BufReader::new(reader);
    let compressed = reader
        .fill_buf()
        .map_err(|e| EvalError::io(path, e))?
        .starts_with(&GZIP_MAGIC);

    let parsed = if compressed {
        serde_json::from_reader(BufReader::new(GzDecoder::new(reader)))
    } else {
        serde_json::from_reader(reader)
    };

    parsed.map_err(|e| {
        if e.is_io() {
            EvalError::io(path, e.into())
        } else {
            EvalError::decode(path, e)
        }
    })
}

/// Decode a result file held in memory.
pub fn decode_bytes(path: &Path, bytes: &[u8]) -> EvalResult<ResultFile> {
    decode(path, bytes)
}
