//! Streaming digest helper over the SHA-2 family.
//!
//! Small companion utility for verifying downloaded payloads. One
//! [`Hasher`] digests incrementally from slices or readers; the one-shot
//! helpers cover the common "hash these bytes" case.

use std::io::{self, Read};

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

const READ_BUFFER_SIZE: usize = 4096;

/// Incremental hash over one of the supported algorithms.
pub struct Hasher {
    inner: Inner,
}

enum Inner {
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hasher {
    #[must_use]
    pub fn sha224() -> Self {
        Self {
            inner: Inner::Sha224(Sha224::new()),
        }
    }

    #[must_use]
    pub fn sha256() -> Self {
        Self {
            inner: Inner::Sha256(Sha256::new()),
        }
    }

    #[must_use]
    pub fn sha384() -> Self {
        Self {
            inner: Inner::Sha384(Sha384::new()),
        }
    }

    #[must_use]
    pub fn sha512() -> Self {
        Self {
            inner: Inner::Sha512(Sha512::new()),
        }
    }

    /// Feed more data into the digest.
    pub fn update(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        match &mut self.inner {
            Inner::Sha224(h) => h.update(data.as_ref()),
            Inner::Sha256(h) => h.update(data.as_ref()),
            Inner::Sha384(h) => h.update(data.as_ref()),
            Inner::Sha512(h) => h.update(data.as_ref()),
        }
        self
    }

    /// Digest everything `reader` yields; returns the byte count consumed.
    pub fn digest_reader<R: Read>(&mut self, reader: &mut R) -> io::Result<u64> {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let mut consumed = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                return Ok(consumed);
            }
            self.update(&buf[..n]);
            consumed += n as u64;
        }
    }

    /// Consume the hasher and return the lowercase hex digest.
    #[must_use]
    pub fn finalize_hex(self) -> String {
        match self.inner {
            Inner::Sha224(h) => to_hex(&h.finalize()),
            Inner::Sha256(h) => to_hex(&h.finalize()),
            Inner::Sha384(h) => to_hex(&h.finalize()),
            Inner::Sha512(h) => to_hex(&h.finalize()),
        }
    }
}

impl std::fmt::Debug for Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.inner {
            Inner::Sha224(_) => "sha224",
            Inner::Sha256(_) => "sha256",
            Inner::Sha384(_) => "sha384",
            Inner::Sha512(_) => "sha512",
        };
        f.debug_struct("Hasher").field("algorithm", &name).finish()
    }
}

/// SHA-224 of `data` as lowercase hex.
#[must_use]
pub fn sha224_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Hasher::sha224();
    hasher.update(data);
    hasher.finalize_hex()
}

/// SHA-256 of `data` as lowercase hex.
#[must_use]
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Hasher::sha256();
    hasher.update(data);
    hasher.finalize_hex()
}

/// SHA-384 of `data` as lowercase hex.
#[must_use]
pub fn sha384_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Hasher::sha384();
    hasher.update(data);
    hasher.finalize_hex()
}

/// SHA-512 of `data` as lowercase hex.
#[must_use]
pub fn sha512_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Hasher::sha512();
    hasher.update(data);
    hasher.finalize_hex()
}

fn to_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
