//! # Blowfast
//!
//! A from-scratch implementation of the Blowfish block cipher with ECB, CBC and
//! CTR modes, streaming CTR adapters over `std::io`, and Rayon-parallel ECB/CTR.
//!
//! ## Usage Model
//! Deriving a key schedule is the expensive step (521 encipherments), so a
//! [`Codec`] is built once per key and shared behind an `Arc` by every mode that
//! needs it. Modes never write to the codec, which makes it safe to use from
//! many threads at once.
//!
//! ## Validation
//! * **Construction**: keys outside `[8, 448]` bytes fail with [`Error::InvalidKeyLength`].
//! * **Per call**: the block modes return `false` and leave the buffer untouched when
//!   the payload is empty, not block aligned (ECB/CBC), or the IV is not 8 bytes.
//!   CTR accepts a trailing partial block.
//!
//! ## Auto-Dispatch Logic
//! [`ParallelEcb`] and [`ParallelCtr`] produce exactly the same bytes as their serial
//! counterparts:
//! * **Serial Path**: payloads below [`ParallelOptions::min_parallel_len`] (4 KB by
//!   default) or a pool with a single thread.
//! * **Parallel Path**: work-stealing over fixed-size chunks; every chunk owns its
//!   scratch buffer and derives its keystream from the block index alone.
//!
//! CBC chains every block to the previous ciphertext and has no parallel variant.
//!
//! ## Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use blowfast::{Cbc, Codec, Ctr};
//!
//! let codec = Arc::new(Codec::from_hex("0123456789ABCDEFF0E1D2C3B4A59687").unwrap());
//! let iv = [0xFE, 0xDC, 0xBA, 0x98, 0x76, 0x54, 0x32, 0x10];
//!
//! let cbc = Cbc::new(codec.clone());
//! let mut data = vec![0u8; 1024]; // 1024 is a multiple of 8
//! assert!(cbc.encrypt(&mut data, &iv));
//! assert!(cbc.decrypt(&mut data, &iv));
//!
//! let ctr = Ctr::new(codec);
//! let mut text = b"any length works".to_vec();
//! assert!(ctr.crypt_or_decrypt(&mut text, &iv, 0));
//! ```

/// Implements the key based constructors shared by every mode wrapper.
macro_rules! impl_codec_constructors {
    ($name:ident) => {
        impl $name {
            /// Build the key schedule for `key` and wrap it.
            pub fn from_key(key: &[u8]) -> $crate::Result<Self> {
                Ok(Self::new(::std::sync::Arc::new($crate::Codec::new(key)?)))
            }

            /// Build the key schedule for a hex encoded key and wrap it.
            pub fn from_hex(key: &str) -> $crate::Result<Self> {
                Ok(Self::new(::std::sync::Arc::new($crate::Codec::from_hex(key)?)))
            }

            /// The shared key schedule.
            pub fn codec(&self) -> &::std::sync::Arc<$crate::Codec> {
                &self.codec
            }
        }
    };
}

pub mod cbc;
pub mod codec;
pub mod ctr;
pub mod ecb;
pub mod error;
pub mod parallel;
pub mod payload;
pub mod stream;
mod tables;

pub use cbc::Cbc;
pub use codec::Codec;
pub use ctr::Ctr;
pub use ecb::Ecb;
pub use error::{Error, Result};
pub use parallel::{ParallelCtr, ParallelEcb, ParallelOptions};
pub use stream::{CtrDecryptReader, CtrEncryptWriter};

/// Size in bytes of one cipher block.
pub const BLOCK_SIZE: usize = 8;

/// Shortest accepted key, in bytes.
pub const MIN_KEY_LEN: usize = 8;

/// Longest accepted key, in bytes.
pub const MAX_KEY_LEN: usize = 448;

/// Payloads shorter than this are processed serially by the parallel wrappers.
pub const DEFAULT_MIN_PARALLEL_LEN: usize = 4096;

/// Buffer size used by [`CtrDecryptReader::drain_into`].
pub const DEFAULT_COPY_BUFFER: usize = 4096;

/// Blocks handled per unrolled batch; must be a power of 2.
const BLOCKS_PER_BATCH: usize = 16;

/// Returns the smallest multiple of [`BLOCK_SIZE`] that is at least `len`.
pub const fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Copies `data` into a new buffer zero-filled up to the next block boundary.
///
/// This is not a padding scheme: nothing records how many bytes were added.
pub fn zero_pad(data: &[u8]) -> Vec<u8> {
    let mut padded = vec![0u8; padded_len(data.len())];
    padded[..data.len()].copy_from_slice(data);
    padded
}

/// The block modes decline empty payloads and payloads with a partial block.
#[inline]
pub(crate) fn is_empty_or_unaligned(data: &[u8]) -> bool {
    data.is_empty() || !data.len().is_multiple_of(BLOCK_SIZE)
}

#[inline(always)]
pub(crate) fn xor_in_place(data: &mut [u8], other: &[u8]) {
    data.iter_mut().zip(other).for_each(|(d, o)| *d ^= o);
}
