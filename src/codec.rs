use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::tables::{P_INIT, S0_INIT, S1_INIT, S2_INIT, S3_INIT};
use crate::{BLOCKS_PER_BATCH, BLOCK_SIZE, MAX_KEY_LEN, MIN_KEY_LEN};

const ROUNDS: usize = 16;

/// Blowfish key schedule and single-block transform.
///
/// Building a `Codec` runs 521 encipherments to derive the P-array and the
/// four S-boxes, so build one per key and share it (it is `Send + Sync` and
/// never written after [`Codec::new`] returns).
#[derive(Clone)]
#[repr(C, align(64))]
pub struct Codec {
    s: [[u32; 256]; 4],
    p: [u32; ROUNDS + 2],
}

impl Codec {
    /// Derive the key schedule for `key`.
    ///
    /// Fails with [`Error::InvalidKeyLength`] unless `key.len()` is in `[8, 448]`.
    pub fn new(key: &[u8]) -> Result<Self> {
        if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&key.len()) {
            return Err(Error::InvalidKeyLength(key.len()));
        }

        let mut codec = Codec {
            s: [S0_INIT, S1_INIT, S2_INIT, S3_INIT],
            p: P_INIT,
        };
        codec.key_set(key);

        debug!(key_len = key.len(), "derived blowfish key schedule");
        Ok(codec)
    }

    /// Derive the key schedule from a hex encoded key (case-insensitive, no separators).
    pub fn from_hex(key: &str) -> Result<Self> {
        let key = hex::decode(key)?;
        Self::new(&key)
    }

    fn key_set(&mut self, key: &[u8]) {
        let mut j = 0;
        for p in self.p.iter_mut() {
            let mut word = 0u32;
            for _ in 0..4 {
                word = (word << 8) | key[j] as u32;
                j = (j + 1) % key.len();
            }
            *p ^= word;
        }

        // Every encipherment below reads the tables as updated so far, so the
        // order P, S0, S1, S2, S3 is part of the algorithm.
        let (mut xl, mut xr) = (0u32, 0u32);
        for i in (0..ROUNDS + 2).step_by(2) {
            (xl, xr) = self.encipher(xl, xr);
            self.p[i] = xl;
            self.p[i + 1] = xr;
        }

        for b in 0..4 {
            for i in (0..256).step_by(2) {
                (xl, xr) = self.encipher(xl, xr);
                self.s[b][i] = xl;
                self.s[b][i + 1] = xr;
            }
        }
    }

    #[inline(always)]
    fn round(&self, a: u32, b: u32, n: usize) -> u32 {
        let s = &self.s;
        let x = s[0][(b >> 24) as usize].wrapping_add(s[1][((b >> 16) & 0xff) as usize]);
        let x = (x ^ s[2][((b >> 8) & 0xff) as usize]).wrapping_add(s[3][(b & 0xff) as usize]);
        x ^ self.p[n] ^ a
    }

    /// Run the 16-round Feistel network forward over the halves `(xl, xr)`.
    #[inline]
    pub fn encipher(&self, mut xl: u32, mut xr: u32) -> (u32, u32) {
        xl ^= self.p[0];
        for i in (0..ROUNDS).step_by(2) {
            xr = self.round(xr, xl, i + 1);
            xl = self.round(xl, xr, i + 2);
        }
        xr ^= self.p[ROUNDS + 1];
        (xr, xl)
    }

    /// Inverse of [`Codec::encipher`].
    #[inline]
    pub fn decipher(&self, mut xl: u32, mut xr: u32) -> (u32, u32) {
        xl ^= self.p[ROUNDS + 1];
        for i in (2..=ROUNDS).rev().step_by(2) {
            xr = self.round(xr, xl, i);
            xl = self.round(xl, xr, i - 1);
        }
        xr ^= self.p[0];
        (xr, xl)
    }

    /// Encrypt the first 8 bytes of `block` in place.
    ///
    /// # Panics
    /// Panics if `block` is shorter than 8 bytes.
    #[inline]
    pub fn encrypt_block(&self, block: &mut [u8]) {
        let (xl, xr) = load(block);
        let (xl, xr) = self.encipher(xl, xr);
        store(block, xl, xr);
    }

    /// Decrypt the first 8 bytes of `block` in place.
    ///
    /// # Panics
    /// Panics if `block` is shorter than 8 bytes.
    #[inline]
    pub fn decrypt_block(&self, block: &mut [u8]) {
        let (xl, xr) = load(block);
        let (xl, xr) = self.decipher(xl, xr);
        store(block, xl, xr);
    }

    /// Encrypt every whole 8-byte block of `data` in place.
    ///
    /// Trailing bytes past the last whole block are left untouched.
    pub fn encrypt_blocks(&self, data: &mut [u8]) {
        self.dispatch::<false>(data);
    }

    /// Decrypt every whole 8-byte block of `data` in place.
    ///
    /// Trailing bytes past the last whole block are left untouched.
    pub fn decrypt_blocks(&self, data: &mut [u8]) {
        self.dispatch::<true>(data);
    }

    fn dispatch<const DECRYPT: bool>(&self, data: &mut [u8]) {
        let chunk_size = BLOCKS_PER_BATCH * BLOCK_SIZE;
        let len = data.len() / chunk_size * chunk_size;
        let (head, tail) = data.split_at_mut(len);

        head.chunks_exact_mut(chunk_size)
            .for_each(|c| self.process_chunk::<BLOCKS_PER_BATCH, DECRYPT>(c));
        tail.chunks_exact_mut(BLOCK_SIZE)
            .for_each(|c| self.process_chunk::<1, DECRYPT>(c));
    }

    /// Transform exactly `B` blocks. Loading all lanes before the rounds lets
    /// the compiler unroll and interleave the independent Feistel chains.
    #[inline]
    pub(crate) fn process_chunk<const B: usize, const DECRYPT: bool>(&self, chunk: &mut [u8]) {
        // Lets the compiler drop the bounds checks in the lane loops.
        assert!(chunk.len() == B * BLOCK_SIZE);

        let mut l = [0u32; B];
        let mut r = [0u32; B];

        for i in 0..B {
            (l[i], r[i]) = load(&chunk[i * BLOCK_SIZE..]);
        }

        for i in 0..B {
            (l[i], r[i]) = if DECRYPT {
                self.decipher(l[i], r[i])
            } else {
                self.encipher(l[i], r[i])
            };
        }

        for i in 0..B {
            store(&mut chunk[i * BLOCK_SIZE..], l[i], r[i]);
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

#[inline(always)]
fn load(block: &[u8]) -> (u32, u32) {
    let xl = ((block[0] as u32) << 24)
        | ((block[1] as u32) << 16)
        | ((block[2] as u32) << 8)
        | (block[3] as u32);
    let xr = ((block[4] as u32) << 24)
        | ((block[5] as u32) << 16)
        | ((block[6] as u32) << 8)
        | (block[7] as u32);
    (xl, xr)
}

#[inline(always)]
fn store(block: &mut [u8], xl: u32, xr: u32) {
    block[0] = (xl >> 24) as u8;
    block[1] = (xl >> 16) as u8;
    block[2] = (xl >> 8) as u8;
    block[3] = xl as u8;
    block[4] = (xr >> 24) as u8;
    block[5] = (xr >> 16) as u8;
    block[6] = (xr >> 8) as u8;
    block[7] = xr as u8;
}
