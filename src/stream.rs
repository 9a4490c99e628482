//! One-directional CTR adapters over `std::io`.
//!
//! [`CtrEncryptWriter`] accepts writes of any size and forwards whole keystream
//! blocks to its sink, holding back up to 7 bytes until [`CtrEncryptWriter::finish`].
//! [`CtrDecryptReader`] undoes it block by block from a source. Each adapter
//! serves a single linear stream; the counter advances once per block.
//!
//! The writer only implements [`Write`] and the reader only [`Read`]; neither
//! can seek.
//!
//! Both adapters survive recoverable I/O errors such as
//! [`io::ErrorKind::WouldBlock`]: a failed call consumes no input and leaves
//! the keystream position where it was, so the call can simply be retried.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, trace};

use crate::ctr::apply_keystream;
use crate::{Codec, BLOCK_SIZE, DEFAULT_COPY_BUFFER};

/// Encrypting CTR writer.
///
/// Call [`finish`](CtrEncryptWriter::finish) once all data is written to see
/// any error from the final block. Dropping the writer finalizes it on a best
/// effort basis and ignores errors.
pub struct CtrEncryptWriter<W: Write> {
    // Only `None` once `finish` has taken the sink.
    inner: Option<W>,
    codec: Arc<Codec>,
    iv: [u8; BLOCK_SIZE],
    counter: i64,
    pending: [u8; BLOCK_SIZE],
    pending_len: usize,
    // Ciphertext the sink has not accepted yet.
    unsent: Vec<u8>,
    written: u64,
    finished: bool,
}

impl<W: Write> CtrEncryptWriter<W> {
    /// Wraps `inner`. Without an `iv` a fresh one is drawn from the OS
    /// generator; read it back with [`iv`](CtrEncryptWriter::iv) and store it
    /// next to the ciphertext, it cannot be recovered otherwise.
    pub fn new(inner: W, codec: Arc<Codec>, iv: Option<[u8; BLOCK_SIZE]>, counter: i64) -> Self {
        let iv = iv.unwrap_or_else(|| {
            let mut iv = [0u8; BLOCK_SIZE];
            OsRng.fill_bytes(&mut iv);
            iv
        });

        CtrEncryptWriter {
            inner: Some(inner),
            codec,
            iv,
            counter,
            pending: [0u8; BLOCK_SIZE],
            pending_len: 0,
            unsent: Vec::new(),
            written: 0,
            finished: false,
        }
    }

    pub fn iv(&self) -> &[u8; BLOCK_SIZE] {
        &self.iv
    }

    /// Counter for the next block to be encrypted.
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Bytes the sink has accepted so far; excludes the pending partial block
    /// and ciphertext held back after a failed sink write.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        self.inner.as_ref().expect("sink is only taken by finish")
    }

    /// Writing to the sink directly corrupts the ciphertext stream.
    pub fn get_mut(&mut self) -> &mut W {
        self.inner.as_mut().expect("sink is only taken by finish")
    }

    /// Encrypts the pending partial block, sends everything still held back
    /// and flushes the sink, keeping the writer alive.
    ///
    /// Can be retried after a recoverable error. Once it has been called,
    /// further writes fail: a short final block ends the keystream.
    pub fn try_finish(&mut self) -> io::Result<()> {
        if !self.finished {
            if self.pending_len > 0 {
                let start = self.unsent.len();
                self.unsent.extend_from_slice(&self.pending[..self.pending_len]);
                self.counter =
                    apply_keystream(&self.codec, &mut self.unsent[start..], &self.iv, self.counter);
                self.pending_len = 0;
            }
            self.finished = true;
        }
        self.send_unsent()?;
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }

    /// Finalizes the stream like [`try_finish`](CtrEncryptWriter::try_finish)
    /// and returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.try_finish()?;
        debug!(bytes = self.written, counter = self.counter, "ctr writer finished");
        self.inner
            .take()
            .ok_or_else(|| io::Error::other("ctr writer sink already taken"))
    }

    /// Pushes held back ciphertext into the sink. Whatever the sink accepted
    /// is dropped from the buffer even when a later write fails.
    fn send_unsent(&mut self) -> io::Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(());
        };

        let mut sent = 0;
        let result = loop {
            if sent == self.unsent.len() {
                break Ok(());
            }
            match inner.write(&self.unsent[sent..]) {
                Ok(0) => {
                    break Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write the buffered ciphertext",
                    ))
                }
                Ok(n) => sent += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };

        self.unsent.drain(..sent);
        self.written += sent as u64;
        if let Err(e) = &result {
            trace!(held = self.unsent.len(), error = %e, "ctr writer sink refused ciphertext");
        }
        result
    }
}

impl<W: Write> Write for CtrEncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::other("write after the ctr stream was finished"));
        }
        // Earlier ciphertext goes first; failing here consumes nothing.
        self.send_unsent()?;

        let start = self.unsent.len();
        let mut input = buf;
        if self.pending_len > 0 {
            let take = (BLOCK_SIZE - self.pending_len).min(input.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&input[..take]);
            self.pending_len += take;
            input = &input[take..];

            if self.pending_len < BLOCK_SIZE {
                return Ok(buf.len());
            }
            self.unsent.extend_from_slice(&self.pending);
            self.pending_len = 0;
        }

        let whole = input.len() / BLOCK_SIZE * BLOCK_SIZE;
        self.unsent.extend_from_slice(&input[..whole]);
        let rest = &input[whole..];
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();

        self.counter =
            apply_keystream(&self.codec, &mut self.unsent[start..], &self.iv, self.counter);

        // The input is consumed at this point. A sink error leaves the
        // ciphertext held back and is reported by the next call.
        let _ = self.send_unsent();
        Ok(buf.len())
    }

    /// Sends held back ciphertext and flushes the sink. The pending partial
    /// block is only written when the stream is finished.
    fn flush(&mut self) -> io::Result<()> {
        self.send_unsent()?;
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for CtrEncryptWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.try_finish();
        }
    }
}

impl<W: Write> fmt::Debug for CtrEncryptWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtrEncryptWriter")
            .field("counter", &self.counter)
            .field("pending_len", &self.pending_len)
            .field("unsent_len", &self.unsent.len())
            .field("written", &self.written)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Decrypting CTR reader.
///
/// Every [`read`](Read::read) must ask for a multiple of 8 bytes; use
/// [`drain_into`](CtrDecryptReader::drain_into) to copy the whole stream.
pub struct CtrDecryptReader<R: Read> {
    inner: R,
    codec: Arc<Codec>,
    iv: [u8; BLOCK_SIZE],
    counter: i64,
    // Ciphertext of the block being assembled; survives source errors.
    partial: [u8; BLOCK_SIZE],
    partial_len: usize,
    read_total: u64,
}

impl<R: Read> CtrDecryptReader<R> {
    pub fn new(inner: R, codec: Arc<Codec>, iv: [u8; BLOCK_SIZE], counter: i64) -> Self {
        CtrDecryptReader {
            inner,
            codec,
            iv,
            counter,
            partial: [0u8; BLOCK_SIZE],
            partial_len: 0,
            read_total: 0,
        }
    }

    pub fn iv(&self) -> &[u8; BLOCK_SIZE] {
        &self.iv
    }

    /// Counter for the next block to be decrypted.
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Plaintext bytes returned so far.
    pub fn bytes_read(&self) -> u64 {
        self.read_total
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decrypts the rest of the stream into `sink` using a
    /// [`DEFAULT_COPY_BUFFER`] sized buffer. Returns the number of bytes copied.
    pub fn drain_into<W: Write + ?Sized>(&mut self, sink: &mut W) -> io::Result<u64> {
        self.drain_into_with_buffer(sink, DEFAULT_COPY_BUFFER)
    }

    /// Decrypts the rest of the stream into `sink` through a `buffer_size`
    /// byte buffer, which must be a positive multiple of 8.
    pub fn drain_into_with_buffer<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
        buffer_size: usize,
    ) -> io::Result<u64> {
        if buffer_size == 0 || !buffer_size.is_multiple_of(BLOCK_SIZE) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "`buffer_size` must be a positive multiple of {BLOCK_SIZE}, got {buffer_size}"
                ),
            ));
        }

        let mut buffer = vec![0u8; buffer_size];
        let mut total = 0u64;
        loop {
            let n = self.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            sink.write_all(&buffer[..n])?;
            total += n as u64;
        }
        Ok(total)
    }

    /// Reads into the partial block until it is full or the source is
    /// exhausted. Bytes already read stay put when the source fails.
    fn fill_block(&mut self) -> io::Result<usize> {
        while self.partial_len < BLOCK_SIZE {
            match self.inner.read(&mut self.partial[self.partial_len..]) {
                Ok(0) => break,
                Ok(n) => self.partial_len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.partial_len)
    }
}

impl<R: Read> Read for CtrDecryptReader<R> {
    /// Fails with [`io::ErrorKind::InvalidInput`] unless `buf.len()` is a
    /// multiple of 8. Returns fewer bytes when the source is exhausted, or
    /// when it fails after some blocks were already decrypted; the source
    /// reports that error again on the next call.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !buf.len().is_multiple_of(BLOCK_SIZE) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("`buf` length must be a multiple of {BLOCK_SIZE}, got {}", buf.len()),
            ));
        }

        let mut total = 0;
        for out in buf.chunks_exact_mut(BLOCK_SIZE) {
            let n = match self.fill_block() {
                Ok(n) => n,
                Err(e) if total == 0 => return Err(e),
                Err(e) => {
                    trace!(returned = total, error = %e, "ctr reader source failed mid-read");
                    break;
                }
            };
            if n == 0 {
                break;
            }

            let mut block = self.partial;
            self.partial_len = 0;
            self.counter = apply_keystream(&self.codec, &mut block[..n], &self.iv, self.counter);
            out[..n].copy_from_slice(&block[..n]);
            total += n;
            if n < BLOCK_SIZE {
                break;
            }
        }

        self.read_total += total as u64;
        Ok(total)
    }
}

impl<R: Read> fmt::Debug for CtrDecryptReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtrDecryptReader")
            .field("counter", &self.counter)
            .field("partial_len", &self.partial_len)
            .field("read_total", &self.read_total)
            .finish_non_exhaustive()
    }
}
