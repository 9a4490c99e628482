use std::sync::Arc;

use tracing::trace;

use crate::{is_empty_or_unaligned, xor_in_place, Codec, BLOCK_SIZE};

/// Blowfish in CBC (cipher block chaining) mode.
///
/// Each block depends on the previous ciphertext block, so this mode is
/// strictly sequential.
#[derive(Clone, Debug)]
pub struct Cbc {
    codec: Arc<Codec>,
}

impl_codec_constructors!(Cbc);

impl Cbc {
    pub fn new(codec: Arc<Codec>) -> Self {
        Cbc { codec }
    }

    /// Encrypts `data` in place, chaining from `iv`.
    ///
    /// Returns `false` and leaves `data` unchanged if `data` is empty or not a
    /// multiple of 8 bytes long, or if `iv` is not exactly 8 bytes.
    pub fn encrypt(&self, data: &mut [u8], iv: &[u8]) -> bool {
        if is_empty_or_unaligned(data) || iv.len() != BLOCK_SIZE {
            trace!(len = data.len(), iv_len = iv.len(), "cbc encrypt declined");
            return false;
        }

        let mut prev = [0u8; BLOCK_SIZE];
        prev.copy_from_slice(iv);
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            xor_in_place(block, &prev);
            self.codec.encrypt_block(block);
            prev.copy_from_slice(block);
        }
        true
    }

    /// Decrypts `data` in place, chaining from `iv`.
    ///
    /// Returns `false` and leaves `data` unchanged if `data` is empty or not a
    /// multiple of 8 bytes long, or if `iv` is not exactly 8 bytes.
    pub fn decrypt(&self, data: &mut [u8], iv: &[u8]) -> bool {
        if is_empty_or_unaligned(data) || iv.len() != BLOCK_SIZE {
            trace!(len = data.len(), iv_len = iv.len(), "cbc decrypt declined");
            return false;
        }

        let mut prev = [0u8; BLOCK_SIZE];
        prev.copy_from_slice(iv);
        let mut cipher = [0u8; BLOCK_SIZE];
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            cipher.copy_from_slice(block);
            self.codec.decrypt_block(block);
            xor_in_place(block, &prev);
            prev = cipher;
        }
        true
    }
}
