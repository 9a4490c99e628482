//! Plain-text test-vector files.
//!
//! ```text
//! Mode: CBC
//! Key: 0123456789ABCDEFF0E1D2C3B4A59687
//! IV: FEDCBA9876543210
//! --- plain (16) ---
//! 3736353433323120
//! 4E6F772069732074
//! --- encrypted (16) ---
//! 6B77B4D63006DEE6
//! 05B156E274039793
//! ```
//!
//! Hex lines are wrapped at a fixed number of bytes per line. An empty `IV:`
//! value means the mode takes no IV.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{Cbc, Codec, Ctr, Ecb};

/// Bytes per hex line when none is given.
pub const DEFAULT_BYTES_PER_LINE: usize = 8;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: invalid hex: {source}")]
    Hex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("unknown mode {0:?}")]
    UnknownMode(String),

    #[error(transparent)]
    Cipher(#[from] crate::Error),

    #[error("{mode} rejected the payload (wrong data or IV length)")]
    Rejected { mode: Mode },

    #[error("{mode} {direction} output does not match the recorded bytes")]
    Mismatch { mode: Mode, direction: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Block mode named by a payload file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Ecb,
    Cbc,
    Ctr,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Ecb => "ECB",
            Mode::Cbc => "CBC",
            Mode::Ctr => "CTR",
        })
    }
}

impl FromStr for Mode {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ECB" => Ok(Mode::Ecb),
            "CBC" => Ok(Mode::Cbc),
            "CTR" => Ok(Mode::Ctr),
            other => Err(PayloadError::UnknownMode(other.to_string())),
        }
    }
}

/// One recorded plaintext/ciphertext pair and the parameters that link them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub mode: Mode,
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
    pub plain: Vec<u8>,
    pub encrypted: Vec<u8>,
}

impl Payload {
    /// Encrypts `plain` under `mode` and records the result.
    pub fn generate(mode: Mode, key: &[u8], iv: &[u8], plain: &[u8]) -> Result<Self, PayloadError> {
        let codec = Arc::new(Codec::new(key)?);
        let mut encrypted = plain.to_vec();
        if !run(mode, &codec, iv, &mut encrypted, true) {
            return Err(PayloadError::Rejected { mode });
        }

        Ok(Payload {
            mode,
            key: key.to_vec(),
            iv: iv.to_vec(),
            plain: plain.to_vec(),
            encrypted,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PayloadError> {
        let path = path.as_ref();
        let payload = fs::read_to_string(path)?.parse::<Payload>()?;
        debug!(
            path = %path.display(),
            mode = %payload.mode,
            len = payload.plain.len(),
            "loaded payload"
        );
        Ok(payload)
    }

    pub fn save(&self, path: impl AsRef<Path>, bytes_per_line: usize) -> Result<(), PayloadError> {
        fs::write(path, self.to_text(bytes_per_line))?;
        Ok(())
    }

    /// Renders the file format with hex lines of at most `bytes_per_line` bytes.
    pub fn to_text(&self, bytes_per_line: usize) -> String {
        let bytes_per_line = bytes_per_line.max(1);
        let mut out = String::new();
        out.push_str(&format!("Mode: {}\n", self.mode));
        out.push_str(&format!("Key: {}\n", hex::encode_upper(&self.key)));
        out.push_str(&format!("IV: {}\n", hex::encode_upper(&self.iv)));
        for (name, data) in [("plain", &self.plain), ("encrypted", &self.encrypted)] {
            out.push_str(&format!("--- {name} ({}) ---\n", data.len()));
            for line in data.chunks(bytes_per_line) {
                out.push_str(&hex::encode_upper(line));
                out.push('\n');
            }
        }
        out
    }

    /// Runs the named mode in both directions and compares against the recorded bytes.
    pub fn verify(&self) -> Result<(), PayloadError> {
        let codec = Arc::new(Codec::new(&self.key)?);

        let mut buf = self.plain.clone();
        if !run(self.mode, &codec, &self.iv, &mut buf, true) {
            return Err(PayloadError::Rejected { mode: self.mode });
        }
        if buf != self.encrypted {
            return Err(PayloadError::Mismatch {
                mode: self.mode,
                direction: "encrypt",
            });
        }

        let mut buf = self.encrypted.clone();
        if !run(self.mode, &codec, &self.iv, &mut buf, false) {
            return Err(PayloadError::Rejected { mode: self.mode });
        }
        if buf != self.plain {
            return Err(PayloadError::Mismatch {
                mode: self.mode,
                direction: "decrypt",
            });
        }

        debug!(mode = %self.mode, len = self.plain.len(), "payload verified");
        Ok(())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(DEFAULT_BYTES_PER_LINE))
    }
}

impl FromStr for Payload {
    type Err = PayloadError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim_end()));

        let mode = field(&mut lines, "Mode:")?.1.parse::<Mode>()?;
        let (n, key) = field(&mut lines, "Key:")?;
        let key = decode(n, key)?;
        let (n, iv) = field(&mut lines, "IV:")?;
        let iv = decode(n, iv)?;

        let (n, header) = lines.next().ok_or_else(|| eof("plain header"))?;
        let plain_len = section_len(n, header, "plain")?;

        let mut plain = Vec::with_capacity(plain_len);
        let mut encrypted = None;
        for (n, line) in lines.by_ref() {
            if line.starts_with("---") {
                encrypted = Some((n, section_len(n, line, "encrypted")?));
                break;
            }
            plain.extend(decode(n, line)?);
        }
        let (enc_line, encrypted_len) = encrypted.ok_or_else(|| eof("encrypted header"))?;

        let mut encrypted = Vec::with_capacity(encrypted_len);
        for (n, line) in lines {
            if line.is_empty() {
                continue;
            }
            encrypted.extend(decode(n, line)?);
        }

        if plain.len() != plain_len {
            return Err(PayloadError::Malformed {
                line: enc_line,
                reason: format!("plain section declares {plain_len} bytes, found {}", plain.len()),
            });
        }
        if encrypted.len() != encrypted_len {
            return Err(PayloadError::Malformed {
                line: enc_line,
                reason: format!(
                    "encrypted section declares {encrypted_len} bytes, found {}",
                    encrypted.len()
                ),
            });
        }

        Ok(Payload {
            mode,
            key,
            iv,
            plain,
            encrypted,
        })
    }
}

fn run(mode: Mode, codec: &Arc<Codec>, iv: &[u8], data: &mut [u8], encrypt: bool) -> bool {
    let codec = Arc::clone(codec);
    match (mode, encrypt) {
        (Mode::Ecb, true) => Ecb::new(codec).encrypt(data),
        (Mode::Ecb, false) => Ecb::new(codec).decrypt(data),
        (Mode::Cbc, true) => Cbc::new(codec).encrypt(data, iv),
        (Mode::Cbc, false) => Cbc::new(codec).decrypt(data, iv),
        (Mode::Ctr, _) => Ctr::new(codec).crypt_or_decrypt(data, iv, 0),
    }
}

fn eof(what: &str) -> PayloadError {
    PayloadError::Malformed {
        line: 0,
        reason: format!("unexpected end of input, expected {what}"),
    }
}

fn field<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    name: &str,
) -> Result<(usize, &'a str), PayloadError> {
    let (n, line) = lines.next().ok_or_else(|| eof(name))?;
    match line.strip_prefix(name) {
        Some(value) => Ok((n, value.trim())),
        None => Err(PayloadError::Malformed {
            line: n,
            reason: format!("expected `{name}`"),
        }),
    }
}

/// Parses `--- <name> (<len>) ---`.
fn section_len(n: usize, line: &str, name: &str) -> Result<usize, PayloadError> {
    let malformed = || PayloadError::Malformed {
        line: n,
        reason: format!("expected `--- {name} (<length>) ---`"),
    };

    let len = line
        .strip_prefix("--- ")
        .and_then(|rest| rest.strip_suffix(") ---"))
        .and_then(|rest| rest.strip_prefix(name))
        .and_then(|rest| rest.strip_prefix(" ("))
        .ok_or_else(malformed)?;
    len.parse().map_err(|_| malformed())
}

fn decode(line: usize, text: &str) -> Result<Vec<u8>, PayloadError> {
    hex::decode(text).map_err(|source| PayloadError::Hex { line, source })
}
