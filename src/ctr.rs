use std::sync::Arc;

use tracing::trace;

use crate::{xor_in_place, Codec, BLOCK_SIZE};

/// Blowfish in CTR (counter) mode.
///
/// The keystream block for counter `c` is `E(le_bytes(c) ^ iv)`. Encryption and
/// decryption are the same operation, and any payload length is accepted.
#[derive(Clone, Debug)]
pub struct Ctr {
    codec: Arc<Codec>,
}

impl_codec_constructors!(Ctr);

impl Ctr {
    pub fn new(codec: Arc<Codec>) -> Self {
        Ctr { codec }
    }

    /// Encrypts or decrypts `data` in place, starting the block counter at `counter`.
    ///
    /// Returns `false` and leaves `data` unchanged if `data` is empty or `iv`
    /// is not exactly 8 bytes.
    pub fn crypt_or_decrypt(&self, data: &mut [u8], iv: &[u8], counter: i64) -> bool {
        let Some(iv) = checked_iv(data, iv) else {
            trace!(len = data.len(), iv_len = iv.len(), "ctr declined");
            return false;
        };
        apply_keystream(&self.codec, data, iv, counter);
        true
    }
}

/// Validates the CTR call contract and narrows the IV to a block.
#[inline]
pub(crate) fn checked_iv<'a>(data: &[u8], iv: &'a [u8]) -> Option<&'a [u8; BLOCK_SIZE]> {
    if data.is_empty() {
        return None;
    }
    iv.try_into().ok()
}

/// Writes the keystream block for `counter` into `nonce`.
#[inline(always)]
fn keystream_block(
    codec: &Codec,
    iv: &[u8; BLOCK_SIZE],
    counter: i64,
    nonce: &mut [u8; BLOCK_SIZE],
) {
    *nonce = counter.to_le_bytes();
    xor_in_place(&mut nonce[..], iv);
    codec.encrypt_block(&mut nonce[..]);
}

/// XORs `data` with the keystream starting at `counter`; the last block may be partial.
///
/// Returns the counter following the last block consumed.
pub(crate) fn apply_keystream(
    codec: &Codec,
    data: &mut [u8],
    iv: &[u8; BLOCK_SIZE],
    counter: i64,
) -> i64 {
    let mut nonce = [0u8; BLOCK_SIZE];
    let mut counter = counter;
    for block in data.chunks_mut(BLOCK_SIZE) {
        keystream_block(codec, iv, counter, &mut nonce);
        xor_in_place(block, &nonce);
        counter = counter.wrapping_add(1);
    }
    counter
}
