use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rocksdb error: {0}")]
    Backend(#[from] rocksdb::Error),

    #[error("missing column family: {0}")]
    MissingColumnFamily(&'static str),

    #[error("store holds {stored}-byte ids but this build uses {expected}-byte ids")]
    IdWidthMismatch { stored: u8, expected: u8 },

    #[error("bitmap serialization error: {0}")]
    Bitmap(String),

    #[error("corrupt store metadata: {0}")]
    CorruptMeta(String),
}
