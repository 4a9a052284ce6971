use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}: top-level value must be an object keyed by user id")]
    NotAnObject(PathBuf),

    #[error("restaurant {0:?} has no label")]
    MissingLabel(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("unknown color {0:?} (expected a color name or #rrggbb)")]
    InvalidColor(String),

    #[error("failed to render figure: {0}")]
    Render(String),
}

impl From<figment::Error> for GraphError {
    fn from(err: figment::Error) -> Self {
        GraphError::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
