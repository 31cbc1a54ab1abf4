use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bad line in a `.instr` patch file
    #[error("line {line}: {message}")]
    Patch { line: usize, message: String },

    #[error("audio: {0}")]
    Audio(String),

    #[error("audio thread disconnected")]
    Disconnected,

    #[error("terminal: {0}")]
    Terminal(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
