//! Writing change records to disk and reading them back.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::change::{self, Change, EncodeError, StreamError};

#[derive(Debug, Error)]
pub enum ChangeFileError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("change {seq} could not be encoded: {source}")]
    Encode {
        seq: u64,
        #[source]
        source: EncodeError,
    },
    #[error("'{path}' holds a malformed change stream: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: StreamError,
    },
}

/// Appends one record per change to `path`, in order, creating the file if
/// needed.
///
/// Each change is encoded right before it is written, so a failure leaves the
/// records of all earlier changes intact.
pub fn write_all(changes: &[Change], path: impl AsRef<Path>) -> Result<(), ChangeFileError> {
    let path = path.as_ref();
    let io_err = |source| ChangeFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;

    for change in changes {
        let record = change::encode(change).map_err(|source| ChangeFileError::Encode {
            seq: change.seq,
            source,
        })?;
        file.write_all(&record).map_err(io_err)?;
        debug!(
            "wrote change {}#{} ({} bytes) to {}",
            change.actor,
            change.seq,
            record.len(),
            path.display()
        );
    }
    file.flush().map_err(io_err)?;
    Ok(())
}

/// Reads every record stored in `path`.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Change>, ChangeFileError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| ChangeFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    change::split_records(&data).map_err(|source| {
        warn!("{}: {}", path.display(), source);
        ChangeFileError::Decode {
            path: path.to_path_buf(),
            source,
        }
    })
}
