// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the multiplicative-blinding oblivious pseudorandom
//! function underlying the protocol

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::encoding::serialize;
use crate::errors::ProtocolError;
use crate::primitives::group::{Element, Scalar};
use crate::primitives::Parameters;

const STR_HASH_TO_GROUP: &[u8] = b"HashToGroup-";
const STR_OPRF_KEY: &[u8] = b"OprfKey";
const STR_DERIVE_KEY_PAIR: &[u8] = b"OPAQUE-DeriveKeyPair";

/// The client's blinding state: the password and the blinding factor.
pub(crate) struct Token {
    pub(crate) input: Vec<u8>,
    pub(crate) blind: Scalar,
}

impl Zeroize for Token {
    fn zeroize(&mut self) {
        self.input.zeroize();
        self.blind.zeroize();
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Computes the first step of the OPRF: maps the password to the group and
/// blinds it with a fresh scalar. The blinded element is sent to the
/// server.
pub(crate) fn blind<R: RngCore + CryptoRng>(
    parameters: &Parameters,
    password: &[u8],
    rng: &mut R,
) -> Result<(Token, Element), ProtocolError> {
    let dst = [
        STR_HASH_TO_GROUP,
        &parameters.oprf_group.context_string()?,
    ]
    .concat();
    let element = parameters.oprf_group.hash_to_group(password, &dst)?;
    if element.is_identity() {
        return Err(ProtocolError::InvalidEncoding);
    }

    let blind = parameters.oprf_group.random_nonzero_scalar(rng);
    let blinded = element.mult(&blind);

    Ok((
        Token {
            input: password.to_vec(),
            blind,
        },
        blinded,
    ))
}

/// Computes the second step of the OPRF: the server evaluates the blinded
/// element with its per-credential key.
pub(crate) fn evaluate(blinded: &Element, key: &Scalar) -> Element {
    blinded.mult(key)
}

/// Computes the third step of the OPRF: the client unblinds the server's
/// answer and hashes it together with the password into the OPRF output.
pub(crate) fn finalize(
    parameters: &Parameters,
    token: &Token,
    evaluated: &Element,
) -> Result<Vec<u8>, ProtocolError> {
    let unblinded = evaluated.mult(&token.blind.invert());
    if unblinded.is_identity() {
        return Err(ProtocolError::InvalidEncoding);
    }

    let ikm = Zeroizing::new(
        [
            serialize(&token.input, 2)?,
            serialize(&unblinded.serialize(), 2)?,
        ]
        .concat(),
    );

    Ok(parameters.hash.hash(&ikm))
}

/// Derives the server's per-credential OPRF key from its long-term seed
/// and the stable credential identifier. The determinism means no per-user
/// key is ever stored.
pub(crate) fn derive_key_pair(
    parameters: &Parameters,
    oprf_seed: &[u8],
    credential_identifier: &[u8],
) -> Result<Scalar, ProtocolError> {
    let ikm = Zeroizing::new(parameters.kdf.expand(
        oprf_seed,
        &[credential_identifier, STR_OPRF_KEY].concat(),
        parameters.oprf_group.scalar_len(),
    )?);

    parameters
        .oprf_group
        .hash_to_scalar(&ikm, STR_DERIVE_KEY_PAIR)
}
