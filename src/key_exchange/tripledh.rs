// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the Triple Diffie-Hellman key exchange protocol

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::encoding::{i2osp, serialize, xor};
use crate::errors::ProtocolError;
use crate::primitives::group::{Element, Scalar};
use crate::primitives::hash::TranscriptHash;
use crate::primitives::Parameters;

static STR_3DH: &[u8] = b"3DH";
static STR_HANDSHAKE_SECRET: &[u8] = b"HandshakeSecret";
static STR_SESSION_KEY: &[u8] = b"SessionKey";
static STR_SERVER_MAC: &[u8] = b"ServerMAC";
static STR_CLIENT_MAC: &[u8] = b"ClientMAC";
static STR_HANDSHAKE_ENCRYPT: &[u8] = b"HandshakeEncrypt";
static STR_ENCRYPT_INFO: &[u8] = b"EncryptInfo";
static STR_LABEL_PREFIX: &[u8] = b"OPAQUE-";

/// The client state produced after the first key exchange message
pub(crate) struct Ke1State {
    pub(crate) client_e_sk: Scalar,
    pub(crate) client_nonce: Vec<u8>,
}

impl Zeroize for Ke1State {
    fn zeroize(&mut self) {
        self.client_e_sk.zeroize();
        self.client_nonce.zeroize();
    }
}

impl Drop for Ke1State {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The server state produced after the second key exchange message
pub(crate) struct Ke2State {
    pub(crate) expected_client_mac: Vec<u8>,
    pub(crate) session_key: Vec<u8>,
}

impl Zeroize for Ke2State {
    fn zeroize(&mut self) {
        self.expected_client_mac.zeroize();
        self.session_key.zeroize();
    }
}

impl Drop for Ke2State {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The server's contribution to KE2, minus the credential response
pub(crate) struct Ke2Parts {
    pub(crate) server_nonce: Vec<u8>,
    pub(crate) server_e_pk: Element,
    pub(crate) einfo: Vec<u8>,
    pub(crate) server_mac: Vec<u8>,
}

/// The client's outputs after processing KE2
pub(crate) struct Ke3Result {
    pub(crate) session_key: Vec<u8>,
    pub(crate) server_info: Vec<u8>,
    pub(crate) client_mac: Vec<u8>,
}

struct HandshakeKeys {
    server_mac_key: Vec<u8>,
    client_mac_key: Vec<u8>,
    handshake_encrypt_key: Vec<u8>,
}

impl Zeroize for HandshakeKeys {
    fn zeroize(&mut self) {
        self.server_mac_key.zeroize();
        self.client_mac_key.zeroize();
        self.handshake_encrypt_key.zeroize();
    }
}

impl Drop for HandshakeKeys {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Builds the HKDF info for the structured-label convention:
/// Vec1(prefix ‖ label) ‖ Vec1(context) ‖ I2OSP(len, 2).
fn build_label(label: &[u8], context: &[u8], length: usize) -> Result<Vec<u8>, ProtocolError> {
    Ok([
        serialize(&[STR_LABEL_PREFIX, label].concat(), 1)?,
        serialize(context, 1)?,
        i2osp(length, 2)?,
    ]
    .concat())
}

fn expand_label(
    parameters: &Parameters,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let length = parameters.kdf.size();
    parameters
        .kdf
        .expand(secret, &build_label(label, context, length)?, length)
}

/// Derives the handshake keys and session key from the shared IKM and the
/// transcript hash. Identical on both sides.
fn derive_keys(
    parameters: &Parameters,
    ikm: &[u8],
    transcript_hash: &[u8],
) -> Result<(HandshakeKeys, Vec<u8>), ProtocolError> {
    let prk = Zeroizing::new(parameters.kdf.extract(b"", ikm));
    let handshake_secret = Zeroizing::new(expand_label(
        parameters,
        &prk,
        STR_HANDSHAKE_SECRET,
        transcript_hash,
    )?);
    let session_key = expand_label(parameters, &prk, STR_SESSION_KEY, transcript_hash)?;

    let keys = HandshakeKeys {
        server_mac_key: expand_label(parameters, &handshake_secret, STR_SERVER_MAC, b"")?,
        client_mac_key: expand_label(parameters, &handshake_secret, STR_CLIENT_MAC, b"")?,
        handshake_encrypt_key: expand_label(
            parameters,
            &handshake_secret,
            STR_HANDSHAKE_ENCRYPT,
            b"",
        )?,
    };

    Ok((keys, session_key))
}

/// Starts the running transcript hash, absorbing the protocol tag, both
/// identities, KE1, the credential response, and the server's nonce and
/// ephemeral public key, in this exact order.
fn transcript(
    parameters: &Parameters,
    id_u: &[u8],
    id_s: &[u8],
    serialized_ke1: &[u8],
    serialized_credential_response: &[u8],
    server_nonce: &[u8],
    server_e_pk: &[u8],
) -> TranscriptHash {
    let mut hash = parameters.hash.transcript();
    hash.write(STR_3DH);
    hash.write(id_u);
    hash.write(serialized_ke1);
    hash.write(id_s);
    hash.write(serialized_credential_response);
    hash.write(server_nonce);
    hash.write(server_e_pk);
    hash
}

/// XOR-encrypts (or decrypts) the optional application info under a pad
/// expanded from the handshake encryption key. Zero-length in, zero-length
/// out.
fn crypt_info(
    parameters: &Parameters,
    key: &[u8],
    info: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    if info.is_empty() {
        return Ok(Vec::new());
    }
    let pad = parameters.kdf.expand(key, STR_ENCRYPT_INFO, info.len())?;
    Ok(xor(&pad, info))
}

/// Generates the client's ephemeral key share and nonce for KE1.
pub(crate) fn generate_ke1<R: RngCore + CryptoRng>(
    parameters: &Parameters,
    rng: &mut R,
) -> (Ke1State, Element) {
    let client_e_sk = parameters.ake_group.random_nonzero_scalar(rng);
    let client_e_pk = parameters.ake_group.base().mult(&client_e_sk);
    let mut client_nonce = vec![0u8; parameters.nonce_len];
    rng.fill_bytes(&mut client_nonce);

    (
        Ke1State {
            client_e_sk,
            client_nonce,
        },
        client_e_pk,
    )
}

/// The server's side of the key exchange. Computes the shared IKM with the
/// server's ordering of the three Diffie-Hellman terms, runs the key
/// schedule, and produces the server MAC along with the client MAC it
/// expects in KE3.
#[allow(clippy::too_many_arguments)]
pub(crate) fn generate_ke2<R: RngCore + CryptoRng>(
    parameters: &Parameters,
    rng: &mut R,
    serialized_ke1: &[u8],
    serialized_credential_response: &[u8],
    client_e_pk: &Element,
    client_s_pk: &Element,
    server_s_sk: &Scalar,
    id_u: &[u8],
    id_s: &[u8],
    info: Option<&[u8]>,
) -> Result<(Ke2State, Ke2Parts), ProtocolError> {
    let mut server_e_sk = parameters.ake_group.random_nonzero_scalar(rng);
    let server_e_pk = parameters.ake_group.base().mult(&server_e_sk);
    let mut server_nonce = vec![0u8; parameters.nonce_len];
    rng.fill_bytes(&mut server_nonce);

    let ikm = Zeroizing::new(
        [
            client_e_pk.mult(&server_e_sk).serialize(),
            client_e_pk.mult(server_s_sk).serialize(),
            client_s_pk.mult(&server_e_sk).serialize(),
        ]
        .concat(),
    );
    server_e_sk.zeroize();

    let mut hash = transcript(
        parameters,
        id_u,
        id_s,
        serialized_ke1,
        serialized_credential_response,
        &server_nonce,
        &server_e_pk.serialize(),
    );
    let (keys, session_key) = derive_keys(parameters, &ikm, &hash.sum())?;

    let einfo = crypt_info(
        parameters,
        &keys.handshake_encrypt_key,
        info.unwrap_or(&[]),
    )?;

    hash.write(&serialize(&einfo, 2)?);
    let server_mac = parameters.mac.mac(&keys.server_mac_key, &hash.sum())?;
    hash.write(&server_mac);
    let expected_client_mac = parameters.mac.mac(&keys.client_mac_key, &hash.sum())?;

    Ok((
        Ke2State {
            expected_client_mac,
            session_key,
        },
        Ke2Parts {
            server_nonce,
            server_e_pk,
            einfo,
            server_mac,
        },
    ))
}

/// The client's side of the key exchange. Recomputes the schedule with the
/// client's ordering of the Diffie-Hellman terms, verifies the server MAC
/// in constant time, and emits the client MAC for KE3.
#[allow(clippy::too_many_arguments)]
pub(crate) fn generate_ke3(
    parameters: &Parameters,
    ke1_state: &Ke1State,
    serialized_ke1: &[u8],
    serialized_credential_response: &[u8],
    server_nonce: &[u8],
    server_e_pk: &Element,
    einfo: &[u8],
    server_mac: &[u8],
    server_s_pk: &Element,
    client_s_sk: &Scalar,
    id_u: &[u8],
    id_s: &[u8],
) -> Result<Ke3Result, ProtocolError> {
    let ikm = Zeroizing::new(
        [
            server_e_pk.mult(&ke1_state.client_e_sk).serialize(),
            server_s_pk.mult(&ke1_state.client_e_sk).serialize(),
            server_e_pk.mult(client_s_sk).serialize(),
        ]
        .concat(),
    );

    let mut hash = transcript(
        parameters,
        id_u,
        id_s,
        serialized_ke1,
        serialized_credential_response,
        server_nonce,
        &server_e_pk.serialize(),
    );
    let (keys, session_key) = derive_keys(parameters, &ikm, &hash.sum())?;

    hash.write(&serialize(einfo, 2)?);
    parameters
        .mac
        .verify(&keys.server_mac_key, &hash.sum(), server_mac)?;

    let server_info = crypt_info(parameters, &keys.handshake_encrypt_key, einfo)?;

    hash.write(server_mac);
    let client_mac = parameters.mac.mac(&keys.client_mac_key, &hash.sum())?;

    Ok(Ke3Result {
        session_key,
        server_info,
        client_mac,
    })
}

/// The server's final check of the client MAC received in KE3, in constant
/// time. On success the session key is released.
pub(crate) fn finish(ke2_state: &Ke2State, client_mac: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if bool::from(ke2_state.expected_client_mac.ct_eq(client_mac)) {
        Ok(ke2_state.session_key.clone())
    } else {
        Err(ProtocolError::InvalidCredentials)
    }
}
