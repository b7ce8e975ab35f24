// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The authenticated envelope binding the client's long-term keys to the
//! randomized password, together with the credential-response masking

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::config::Mode;
use crate::encoding::{serialize, xor};
use crate::errors::utils::check_slice_size;
use crate::errors::ProtocolError;
use crate::keypair::{KeyPair, PrivateKey, PublicKey};
use crate::primitives::Parameters;

const STR_AUTH_KEY: &[u8] = b"AuthKey";
const STR_EXPORT_KEY: &[u8] = b"ExportKey";
const STR_PRIVATE_KEY: &[u8] = b"PrivateKey";
const STR_PAD: &[u8] = b"Pad";
const STR_MASKING_KEY: &[u8] = b"MaskingKey";
const STR_CREDENTIAL_RESPONSE_PAD: &[u8] = b"CredentialResponsePad";
const STR_DERIVE_AUTH_KEY_PAIR: &[u8] = b"OPAQUE-DeriveAuthKeyPair";

/// Options for specifying custom identifiers. When absent, identities
/// default to the respective public keys.
#[derive(Clone, Debug)]
pub enum Identifiers {
    /// Supply only a client identifier
    ClientIdentifier(Vec<u8>),
    /// Supply only a server identifier
    ServerIdentifier(Vec<u8>),
    /// Supply a client and server identifier
    ClientAndServerIdentifiers(Vec<u8>, Vec<u8>),
}

/// Resolves optional identifiers against the public keys and returns both
/// identities, length-prefixed for use in MAC inputs and transcripts.
pub(crate) fn bytestrings_from_identifiers(
    ids: &Option<Identifiers>,
    client_s_pk: &[u8],
    server_s_pk: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    let (client_identity, server_identity): (Vec<u8>, Vec<u8>) = match ids {
        None => (client_s_pk.to_vec(), server_s_pk.to_vec()),
        Some(Identifiers::ClientIdentifier(id_u)) => (id_u.clone(), server_s_pk.to_vec()),
        Some(Identifiers::ServerIdentifier(id_s)) => (client_s_pk.to_vec(), id_s.clone()),
        Some(Identifiers::ClientAndServerIdentifiers(id_u, id_s)) => (id_u.clone(), id_s.clone()),
    };
    Ok((
        serialize(&client_identity, 2)?,
        serialize(&server_identity, 2)?,
    ))
}

/// The envelope. The two modes have distinct byte layouts and key
/// derivation flows, so they are distinct variants with per-variant seal
/// and open paths.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Envelope {
    /// nonce ‖ auth_tag; the client's long-term key is derived, not stored
    Internal { nonce: Vec<u8>, auth_tag: Vec<u8> },
    /// nonce ‖ masked long-term secret ‖ auth_tag
    External {
        nonce: Vec<u8>,
        inner: Vec<u8>,
        auth_tag: Vec<u8>,
    },
}

impl Zeroize for Envelope {
    fn zeroize(&mut self) {
        match self {
            Envelope::Internal { nonce, auth_tag } => {
                nonce.zeroize();
                auth_tag.zeroize();
            }
            Envelope::External {
                nonce,
                inner,
                auth_tag,
            } => {
                nonce.zeroize();
                inner.zeroize();
                auth_tag.zeroize();
            }
        }
    }
}

impl Envelope {
    fn nonce(&self) -> &[u8] {
        match self {
            Envelope::Internal { nonce, .. } => nonce,
            Envelope::External { nonce, .. } => nonce,
        }
    }

    /// Serialization into bytes
    pub(crate) fn serialize(&self) -> Vec<u8> {
        match self {
            Envelope::Internal { nonce, auth_tag } => [&nonce[..], &auth_tag[..]].concat(),
            Envelope::External {
                nonce,
                inner,
                auth_tag,
            } => [&nonce[..], &inner[..], &auth_tag[..]].concat(),
        }
    }

    /// Deserialization from bytes; the layout is dictated by the
    /// configured mode.
    pub(crate) fn deserialize(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let checked_bytes = check_slice_size(input, parameters.envelope_size(), "envelope")?;
        let nonce_len = parameters.nonce_len;

        match parameters.mode {
            Mode::Internal => Ok(Envelope::Internal {
                nonce: checked_bytes[..nonce_len].to_vec(),
                auth_tag: checked_bytes[nonce_len..].to_vec(),
            }),
            Mode::External => {
                let scalar_len = parameters.ake_group.scalar_len();
                Ok(Envelope::External {
                    nonce: checked_bytes[..nonce_len].to_vec(),
                    inner: checked_bytes[nonce_len..nonce_len + scalar_len].to_vec(),
                    auth_tag: checked_bytes[nonce_len + scalar_len..].to_vec(),
                })
            }
        }
    }

    /// An envelope that serializes to the all-zeros string, used when
    /// faking a credential response for an unknown identifier.
    pub(crate) fn zero(parameters: &Parameters) -> Self {
        match parameters.mode {
            Mode::Internal => Envelope::Internal {
                nonce: vec![0u8; parameters.nonce_len],
                auth_tag: vec![0u8; parameters.mac.size()],
            },
            Mode::External => Envelope::External {
                nonce: vec![0u8; parameters.nonce_len],
                inner: vec![0u8; parameters.ake_group.scalar_len()],
                auth_tag: vec![0u8; parameters.mac.size()],
            },
        }
    }
}

/// The outputs of sealing an envelope
pub(crate) struct SealResult {
    pub(crate) envelope: Envelope,
    pub(crate) client_keypair: KeyPair,
    pub(crate) export_key: Vec<u8>,
}

/// The outputs of opening an envelope
pub(crate) struct OpenedEnvelope {
    pub(crate) client_keypair: KeyPair,
    pub(crate) export_key: Vec<u8>,
    /// length-prefixed client identity
    pub(crate) id_u: Vec<u8>,
    /// length-prefixed server identity
    pub(crate) id_s: Vec<u8>,
}

/// Derives the client-side root secret from the OPRF output: memory-hard
/// stretch, then an extraction normalizing the length to the KDF's output
/// size.
pub(crate) fn randomized_password(
    parameters: &Parameters,
    oprf_output: &[u8],
) -> Result<Zeroizing<Vec<u8>>, ProtocolError> {
    let hardened = Zeroizing::new(parameters.mhf.harden(
        oprf_output,
        b"",
        parameters.kdf.size(),
    )?);
    Ok(Zeroizing::new(parameters.kdf.extract(b"", &hardened)))
}

/// Derives the masking key hiding the credential response.
pub(crate) fn masking_key(
    parameters: &Parameters,
    randomized_pwd: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    parameters
        .kdf
        .expand(randomized_pwd, STR_MASKING_KEY, parameters.kdf.size())
}

fn derive_auth_keys(
    parameters: &Parameters,
    randomized_pwd: &[u8],
    nonce: &[u8],
) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), ProtocolError> {
    let auth_key = Zeroizing::new(parameters.kdf.expand(
        randomized_pwd,
        &[nonce, STR_AUTH_KEY].concat(),
        parameters.kdf.size(),
    )?);
    let export_key = parameters.kdf.expand(
        randomized_pwd,
        &[nonce, STR_EXPORT_KEY].concat(),
        parameters.kdf.size(),
    )?;
    Ok((auth_key, export_key))
}

/// Derives the client's long-term key pair from the randomized password,
/// for the mode where it is never stored.
fn derive_internal_keypair(
    parameters: &Parameters,
    randomized_pwd: &[u8],
    nonce: &[u8],
) -> Result<KeyPair, ProtocolError> {
    let seed = Zeroizing::new(parameters.kdf.expand(
        randomized_pwd,
        &[nonce, STR_PRIVATE_KEY].concat(),
        parameters.ake_group.scalar_len(),
    )?);
    let scalar = parameters
        .ake_group
        .hash_to_scalar(&seed, STR_DERIVE_AUTH_KEY_PAIR)?;
    Ok(KeyPair::from_private_scalar(parameters.ake_group, scalar))
}

fn auth_tag_message(nonce: &[u8], inner: &[u8], server_s_pk: &[u8], id_s: &[u8], id_u: &[u8]) -> Vec<u8> {
    [nonce, inner, server_s_pk, id_s, id_u].concat()
}

/// Uses the randomized password to produce an envelope binding the
/// client's long-term keys to it, along with the client public key and the
/// export key. A fresh nonce is sampled for each call.
pub(crate) fn seal<R: RngCore + CryptoRng>(
    parameters: &Parameters,
    rng: &mut R,
    randomized_pwd: &[u8],
    server_s_pk: &PublicKey,
    external_key: Option<&PrivateKey>,
    ids: &Option<Identifiers>,
) -> Result<SealResult, ProtocolError> {
    let mut nonce = vec![0u8; parameters.nonce_len];
    rng.fill_bytes(&mut nonce);

    let (auth_key, export_key) = derive_auth_keys(parameters, randomized_pwd, &nonce)?;
    let server_s_pk_bytes = server_s_pk.serialize();

    let result = match parameters.mode {
        Mode::Internal => {
            if external_key.is_some() {
                return Err(ProtocolError::InvalidConfiguration);
            }
            let client_keypair = derive_internal_keypair(parameters, randomized_pwd, &nonce)?;
            let (id_u, id_s) = bytestrings_from_identifiers(
                ids,
                &client_keypair.public().serialize(),
                &server_s_pk_bytes,
            )?;
            let auth_tag = parameters.mac.mac(
                &auth_key,
                &auth_tag_message(&nonce, &[], &server_s_pk_bytes, &id_s, &id_u),
            )?;
            SealResult {
                envelope: Envelope::Internal { nonce, auth_tag },
                client_keypair,
                export_key,
            }
        }
        Mode::External => {
            let client_s_sk = external_key.ok_or(ProtocolError::InvalidConfiguration)?;
            if client_s_sk.group != parameters.ake_group {
                return Err(ProtocolError::InvalidConfiguration);
            }
            let pad = Zeroizing::new(parameters.kdf.expand(
                randomized_pwd,
                &[&nonce[..], STR_PAD].concat(),
                parameters.ake_group.scalar_len(),
            )?);
            let inner = xor(&client_s_sk.serialize(), &pad);

            let client_keypair =
                KeyPair::from_private_scalar(parameters.ake_group, client_s_sk.scalar.clone());
            let (id_u, id_s) = bytestrings_from_identifiers(
                ids,
                &client_keypair.public().serialize(),
                &server_s_pk_bytes,
            )?;
            let auth_tag = parameters.mac.mac(
                &auth_key,
                &auth_tag_message(&nonce, &inner, &server_s_pk_bytes, &id_s, &id_u),
            )?;
            SealResult {
                envelope: Envelope::External {
                    nonce,
                    inner,
                    auth_tag,
                },
                client_keypair,
                export_key,
            }
        }
    };

    Ok(result)
}

/// Attempts to open an envelope with the reconstructed randomized
/// password. Every failure collapses into the single credentials error:
/// nothing leaks which field failed.
pub(crate) fn open(
    parameters: &Parameters,
    randomized_pwd: &[u8],
    envelope: &Envelope,
    server_s_pk: &PublicKey,
    ids: &Option<Identifiers>,
) -> Result<OpenedEnvelope, ProtocolError> {
    let (auth_key, export_key) =
        derive_auth_keys(parameters, randomized_pwd, envelope.nonce())?;
    let server_s_pk_bytes = server_s_pk.serialize();

    let result = match envelope {
        Envelope::Internal { nonce, auth_tag } => {
            let client_keypair = derive_internal_keypair(parameters, randomized_pwd, nonce)?;
            let (id_u, id_s) = bytestrings_from_identifiers(
                ids,
                &client_keypair.public().serialize(),
                &server_s_pk_bytes,
            )?;
            parameters
                .mac
                .verify(
                    &auth_key,
                    &auth_tag_message(nonce, &[], &server_s_pk_bytes, &id_s, &id_u),
                    auth_tag,
                )
                .map_err(|_| ProtocolError::InvalidCredentials)?;
            OpenedEnvelope {
                client_keypair,
                export_key,
                id_u,
                id_s,
            }
        }
        Envelope::External {
            nonce,
            inner,
            auth_tag,
        } => {
            let pad = Zeroizing::new(parameters.kdf.expand(
                randomized_pwd,
                &[&nonce[..], STR_PAD].concat(),
                parameters.ake_group.scalar_len(),
            )?);
            let client_s_sk_bytes = Zeroizing::new(xor(inner, &pad));

            let scalar = parameters
                .ake_group
                .deserialize_scalar(&client_s_sk_bytes)
                .map_err(|_| ProtocolError::InvalidCredentials)?;

            let client_keypair = KeyPair::from_private_scalar(parameters.ake_group, scalar);
            let (id_u, id_s) = bytestrings_from_identifiers(
                ids,
                &client_keypair.public().serialize(),
                &server_s_pk_bytes,
            )?;
            parameters
                .mac
                .verify(
                    &auth_key,
                    &auth_tag_message(nonce, inner, &server_s_pk_bytes, &id_s, &id_u),
                    auth_tag,
                )
                .map_err(|_| ProtocolError::InvalidCredentials)?;
            OpenedEnvelope {
                client_keypair,
                export_key,
                id_u,
                id_s,
            }
        }
    };

    Ok(result)
}

/// Masks the server public key and envelope under a pad expanded from the
/// masking key and a fresh masking nonce.
pub(crate) fn mask_credential_response(
    parameters: &Parameters,
    masking_key: &[u8],
    masking_nonce: &[u8],
    server_s_pk: &PublicKey,
    envelope: &Envelope,
) -> Result<Vec<u8>, ProtocolError> {
    let pad = parameters.kdf.expand(
        masking_key,
        &[masking_nonce, STR_CREDENTIAL_RESPONSE_PAD].concat(),
        parameters.masked_response_size(),
    )?;
    let plaintext = [server_s_pk.serialize(), envelope.serialize()].concat();
    Ok(xor(&pad, &plaintext))
}

/// Unmasks the credential response, recovering the server public key and
/// envelope. Undecodable plaintext means a wrong password or a fabricated
/// response and collapses into the credentials error.
pub(crate) fn unmask_credential_response(
    parameters: &Parameters,
    masking_key: &[u8],
    masking_nonce: &[u8],
    masked_response: &[u8],
) -> Result<(PublicKey, Envelope), ProtocolError> {
    let checked_bytes = check_slice_size(
        masked_response,
        parameters.masked_response_size(),
        "masked_response",
    )?;
    let pad = parameters.kdf.expand(
        masking_key,
        &[masking_nonce, STR_CREDENTIAL_RESPONSE_PAD].concat(),
        parameters.masked_response_size(),
    )?;
    let plaintext = xor(&pad, checked_bytes);

    let element_len = parameters.ake_group.element_len();
    let server_s_pk = PublicKey::deserialize(parameters.ake_group, &plaintext[..element_len])
        .map_err(|_| ProtocolError::InvalidCredentials)?;
    let envelope = Envelope::deserialize(parameters, &plaintext[element_len..])
        .map_err(|_| ProtocolError::InvalidCredentials)?;

    Ok((server_s_pk, envelope))
}
