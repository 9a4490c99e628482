use thiserror::Error;

/// Errors raised while building a [`Codec`](crate::Codec) or a mode wrapper.
///
/// Malformed per-call input (buffer or IV length) is not an error: the mode
/// methods decline with `false` and leave the buffer untouched.
#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "invalid key length {0}; must be in [{min}, {max}] bytes",
        min = crate::MIN_KEY_LEN,
        max = crate::MAX_KEY_LEN
    )]
    InvalidKeyLength(usize),

    #[error("invalid hex key: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
