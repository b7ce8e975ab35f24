// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The absorbing transcript hash consumed by the key exchange

use digest::Digest;
use sha2::{Sha256, Sha512};

use crate::config::Hash;

impl Hash {
    /// The digest size, in bytes
    pub(crate) fn size(&self) -> usize {
        match self {
            Hash::Sha256 => 32,
            Hash::Sha512 => 64,
        }
    }

    /// Returns a fresh absorbing hash.
    pub(crate) fn transcript(&self) -> TranscriptHash {
        match self {
            Hash::Sha256 => TranscriptHash::Sha256(Sha256::new()),
            Hash::Sha512 => TranscriptHash::Sha512(Sha512::new()),
        }
    }

    /// One-shot digest of `input`.
    pub(crate) fn hash(&self, input: &[u8]) -> Vec<u8> {
        let mut transcript = self.transcript();
        transcript.write(input);
        transcript.sum()
    }
}

/// A running hash with Write/Sum semantics: `sum` returns the digest of
/// everything absorbed so far without disturbing the running state, so the
/// transcript can keep growing.
#[derive(Clone)]
pub(crate) enum TranscriptHash {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl TranscriptHash {
    pub(crate) fn write(&mut self, input: &[u8]) {
        match self {
            TranscriptHash::Sha256(hasher) => hasher.update(input),
            TranscriptHash::Sha512(hasher) => hasher.update(input),
        }
    }

    pub(crate) fn sum(&self) -> Vec<u8> {
        match self {
            TranscriptHash::Sha256(hasher) => hasher.clone().finalize().to_vec(),
            TranscriptHash::Sha512(hasher) => hasher.clone().finalize().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_keeps_absorbing() {
        for hash in [Hash::Sha256, Hash::Sha512] {
            let mut transcript = hash.transcript();
            transcript.write(b"first");
            let sum1 = transcript.sum();
            assert_eq!(sum1, hash.hash(b"first"));
            assert_eq!(sum1.len(), hash.size());

            transcript.write(b"second");
            assert_eq!(transcript.sum(), hash.hash(b"firstsecond"));
        }
    }
}
