//! Rayon-parallel ECB and CTR.
//!
//! Both modes transform each block from its index alone, so splitting the
//! payload into chunks and handing them to the pool yields exactly the serial
//! output. Each chunk keeps its own lane registers or nonce buffer on the task's
//! stack; nothing mutable is shared between tasks.

use std::num::NonZeroUsize;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::trace;

use crate::ctr::{apply_keystream, checked_iv};
use crate::error::Result;
use crate::{is_empty_or_unaligned, Codec, BLOCKS_PER_BATCH, BLOCK_SIZE, DEFAULT_MIN_PARALLEL_LEN};

/// Blocks per parallel CTR task.
const CTR_BLOCKS_PER_TASK: usize = 64;

/// Tuning for the parallel wrappers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParallelOptions {
    /// Payloads shorter than this many bytes are always processed serially.
    pub min_parallel_len: usize,
    /// Upper bound on worker threads. `None` uses the global Rayon pool.
    pub max_degree: Option<NonZeroUsize>,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        ParallelOptions {
            min_parallel_len: DEFAULT_MIN_PARALLEL_LEN,
            max_degree: None,
        }
    }
}

impl ParallelOptions {
    pub fn with_min_parallel_len(mut self, len: usize) -> Self {
        self.min_parallel_len = len;
        self
    }

    pub fn with_max_degree(mut self, threads: NonZeroUsize) -> Self {
        self.max_degree = Some(threads);
        self
    }
}

/// Decides between the serial and the parallel path and owns the optional
/// dedicated pool.
#[derive(Clone, Debug)]
struct Dispatcher {
    options: ParallelOptions,
    pool: Option<Arc<ThreadPool>>,
}

impl Dispatcher {
    fn new(options: ParallelOptions) -> Result<Self> {
        let pool = match options.max_degree {
            Some(threads) => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(threads.get())
                    .thread_name(|i| format!("blowfast-{i}"))
                    .build()?,
            )),
            None => None,
        };
        Ok(Dispatcher { options, pool })
    }

    fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn parallelize(&self, len: usize) -> bool {
        let parallel = self.threads() > 1 && len >= self.options.min_parallel_len;
        trace!(len, threads = self.threads(), parallel, "dispatch");
        parallel
    }

    fn install<OP>(&self, op: OP)
    where
        OP: FnOnce() + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// ECB with parallel execution from [`ParallelOptions::min_parallel_len`] bytes up.
#[derive(Clone, Debug)]
pub struct ParallelEcb {
    codec: Arc<Codec>,
    dispatcher: Dispatcher,
}

impl_codec_constructors!(ParallelEcb);

impl ParallelEcb {
    /// Wraps `codec` with the default [`ParallelOptions`].
    pub fn new(codec: Arc<Codec>) -> Self {
        ParallelEcb {
            codec,
            dispatcher: Dispatcher {
                options: ParallelOptions::default(),
                pool: None,
            },
        }
    }

    /// Wraps `codec` with custom options; builds a dedicated pool when
    /// `options.max_degree` is set.
    pub fn with_options(codec: Arc<Codec>, options: ParallelOptions) -> Result<Self> {
        Ok(ParallelEcb {
            codec,
            dispatcher: Dispatcher::new(options)?,
        })
    }

    pub fn options(&self) -> &ParallelOptions {
        &self.dispatcher.options
    }

    /// Encrypts `data` in place.
    ///
    /// Returns `false` and leaves `data` unchanged if it is empty or not a
    /// multiple of 8 bytes long.
    pub fn encrypt(&self, data: &mut [u8]) -> bool {
        self.dispatch::<false>(data)
    }

    /// Decrypts `data` in place.
    ///
    /// Returns `false` and leaves `data` unchanged if it is empty or not a
    /// multiple of 8 bytes long.
    pub fn decrypt(&self, data: &mut [u8]) -> bool {
        self.dispatch::<true>(data)
    }

    fn dispatch<const DECRYPT: bool>(&self, data: &mut [u8]) -> bool {
        if is_empty_or_unaligned(data) {
            trace!(len = data.len(), "parallel ecb declined");
            return false;
        }

        if !self.dispatcher.parallelize(data.len()) {
            if DECRYPT {
                self.codec.decrypt_blocks(data);
            } else {
                self.codec.encrypt_blocks(data);
            }
            return true;
        }

        let codec = &*self.codec;
        self.dispatcher.install(|| {
            let chunk_size = BLOCKS_PER_BATCH * BLOCK_SIZE;
            let len = data.len() / chunk_size * chunk_size;
            let (head, tail) = data.split_at_mut(len);

            head.par_chunks_exact_mut(chunk_size)
                .for_each(|c| codec.process_chunk::<BLOCKS_PER_BATCH, DECRYPT>(c));
            tail.par_chunks_exact_mut(BLOCK_SIZE)
                .for_each(|c| codec.process_chunk::<1, DECRYPT>(c));
        });
        true
    }
}

/// CTR with parallel execution from [`ParallelOptions::min_parallel_len`] bytes up.
#[derive(Clone, Debug)]
pub struct ParallelCtr {
    codec: Arc<Codec>,
    dispatcher: Dispatcher,
}

impl_codec_constructors!(ParallelCtr);

impl ParallelCtr {
    /// Wraps `codec` with the default [`ParallelOptions`].
    pub fn new(codec: Arc<Codec>) -> Self {
        ParallelCtr {
            codec,
            dispatcher: Dispatcher {
                options: ParallelOptions::default(),
                pool: None,
            },
        }
    }

    /// Wraps `codec` with custom options; builds a dedicated pool when
    /// `options.max_degree` is set.
    pub fn with_options(codec: Arc<Codec>, options: ParallelOptions) -> Result<Self> {
        Ok(ParallelCtr {
            codec,
            dispatcher: Dispatcher::new(options)?,
        })
    }

    pub fn options(&self) -> &ParallelOptions {
        &self.dispatcher.options
    }

    /// Encrypts or decrypts `data` in place, starting the block counter at `counter`.
    ///
    /// Produces the same bytes as [`Ctr::crypt_or_decrypt`](crate::Ctr::crypt_or_decrypt),
    /// including a trailing partial block. Returns `false` and leaves `data`
    /// unchanged if `data` is empty or `iv` is not exactly 8 bytes.
    pub fn crypt_or_decrypt(&self, data: &mut [u8], iv: &[u8], counter: i64) -> bool {
        let Some(iv) = checked_iv(data, iv) else {
            trace!(len = data.len(), iv_len = iv.len(), "parallel ctr declined");
            return false;
        };

        if !self.dispatcher.parallelize(data.len()) {
            apply_keystream(&self.codec, data, iv, counter);
            return true;
        }

        let codec = &*self.codec;
        self.dispatcher.install(|| {
            data.par_chunks_mut(CTR_BLOCKS_PER_TASK * BLOCK_SIZE)
                .enumerate()
                .for_each(|(i, chunk)| {
                    let first = counter.wrapping_add((i * CTR_BLOCKS_PER_TASK) as i64);
                    apply_keystream(codec, chunk, iv, first);
                });
        });
        true
    }
}
