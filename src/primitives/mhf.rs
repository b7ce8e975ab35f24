// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The memory-hard function applied to the OPRF output on the client

use crate::config::Mhf;
use crate::errors::ProtocolError;

/// Recommended salt length for argon2-based password hashing, substituted
/// when the caller supplies no salt.
const ARGON2_RECOMMENDED_SALT_LEN: usize = 16;

impl Mhf {
    /// Computes the memory-hard function over `input`, producing `len`
    /// output bytes. [Mhf::Identity] returns its input unchanged.
    pub(crate) fn harden(
        &self,
        input: &[u8],
        salt: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Mhf::Identity => Ok(input.to_vec()),
            Mhf::Scrypt => {
                let params = scrypt::Params::new(15, 8, 1, len)
                    .map_err(|_| ProtocolError::InvalidConfiguration)?;
                let mut output = vec![0u8; len];
                scrypt::scrypt(input, salt, &params, &mut output)
                    .map_err(|_| ProtocolError::InvalidConfiguration)?;
                Ok(output)
            }
            Mhf::Argon2id => {
                let salt: &[u8] = if salt.is_empty() {
                    &[0u8; ARGON2_RECOMMENDED_SALT_LEN]
                } else {
                    salt
                };
                let mut output = vec![0u8; len];
                argon2::Argon2::default()
                    .hash_password_into(input, salt, &mut output)
                    .map_err(|_| ProtocolError::InvalidConfiguration)?;
                Ok(output)
            }
        }
    }
}
