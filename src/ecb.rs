use std::sync::Arc;

use tracing::trace;

use crate::{is_empty_or_unaligned, Codec};

/// Blowfish in ECB (electronic codebook) mode: every block is transformed on its own.
#[derive(Clone, Debug)]
pub struct Ecb {
    codec: Arc<Codec>,
}

impl_codec_constructors!(Ecb);

impl Ecb {
    pub fn new(codec: Arc<Codec>) -> Self {
        Ecb { codec }
    }

    /// Encrypts `data` in place.
    ///
    /// Returns `false` and leaves `data` unchanged if it is empty or not a
    /// multiple of 8 bytes long.
    pub fn encrypt(&self, data: &mut [u8]) -> bool {
        if is_empty_or_unaligned(data) {
            trace!(len = data.len(), "ecb encrypt declined");
            return false;
        }
        self.codec.encrypt_blocks(data);
        true
    }

    /// Decrypts `data` in place.
    ///
    /// Returns `false` and leaves `data` unchanged if it is empty or not a
    /// multiple of 8 bytes long.
    pub fn decrypt(&self, data: &mut [u8]) -> bool {
        if is_empty_or_unaligned(data) {
            trace!(len = data.len(), "ecb decrypt declined");
            return false;
        }
        self.codec.decrypt_blocks(data);
        true
    }
}
