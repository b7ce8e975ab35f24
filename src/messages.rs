// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the messages used for OPAQUE

use zeroize::Zeroize;

use crate::config::Configuration;
use crate::encoding::{serialize, tokenize};
use crate::envelope::Envelope;
use crate::errors::utils::{check_slice_size, check_slice_size_atleast};
use crate::errors::ProtocolError;
use crate::keypair::PublicKey;
use crate::primitives::group::Element;
use crate::primitives::Parameters;

// Registration
// ============

/// The message sent by the client to the server to initiate registration
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationRequest {
    /// blinded password information
    pub(crate) blinded: Element,
}

impl RegistrationRequest {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.blinded.serialize()
    }

    /// Deserialization from bytes
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_internal(&Parameters::new(config)?, input)
    }

    pub(crate) fn deserialize_internal(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let checked_bytes = check_slice_size(
            input,
            parameters.oprf_group.element_len(),
            "registration_request",
        )?;
        let blinded = parameters.oprf_group.deserialize_element(checked_bytes)?;
        if blinded.is_identity() {
            return Err(ProtocolError::InvalidEncoding);
        }
        Ok(Self { blinded })
    }
}

/// The answer sent by the server to the client upon reception of the
/// registration request
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationResponse {
    /// the server's OPRF evaluation over the blinded element
    pub(crate) evaluated: Element,
    /// the server's static public key
    pub(crate) server_s_pk: PublicKey,
}

impl RegistrationResponse {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [self.evaluated.serialize(), self.server_s_pk.serialize()].concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_internal(&Parameters::new(config)?, input)
    }

    pub(crate) fn deserialize_internal(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let oprf_len = parameters.oprf_group.element_len();
        let checked_bytes = check_slice_size(
            input,
            oprf_len + parameters.ake_group.element_len(),
            "registration_response",
        )?;

        Ok(Self {
            evaluated: parameters
                .oprf_group
                .deserialize_element(&checked_bytes[..oprf_len])?,
            server_s_pk: PublicKey::deserialize(parameters.ake_group, &checked_bytes[oprf_len..])?,
        })
    }
}

/// The final registration message from the client, containing the public
/// key, masking key, and envelope the server persists
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationUpload {
    /// the client's long-term public key
    pub(crate) client_s_pk: PublicKey,
    /// the key hiding the credential response at login
    pub(crate) masking_key: Vec<u8>,
    /// the envelope binding the client's keys to the password
    pub(crate) envelope: Envelope,
}

impl RegistrationUpload {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            self.client_s_pk.serialize(),
            self.masking_key.clone(),
            self.envelope.serialize(),
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_internal(&Parameters::new(config)?, input)
    }

    pub(crate) fn deserialize_internal(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let element_len = parameters.ake_group.element_len();
        let masking_key_len = parameters.kdf.size();
        let checked_bytes = check_slice_size(
            input,
            element_len + masking_key_len + parameters.envelope_size(),
            "registration_upload",
        )?;

        Ok(Self {
            client_s_pk: PublicKey::deserialize(
                parameters.ake_group,
                &checked_bytes[..element_len],
            )?,
            masking_key: checked_bytes[element_len..element_len + masking_key_len].to_vec(),
            envelope: Envelope::deserialize(
                parameters,
                &checked_bytes[element_len + masking_key_len..],
            )?,
        })
    }
}

impl Zeroize for RegistrationUpload {
    fn zeroize(&mut self) {
        self.masking_key.zeroize();
        self.envelope.zeroize();
    }
}

// Login
// =====

/// The first login message, from client to server: the blinded password
/// plus the client's nonce and ephemeral key share
#[derive(Clone, Debug, PartialEq)]
pub struct Ke1 {
    /// blinded password information
    pub(crate) blinded: Element,
    /// the client's nonce
    pub(crate) client_nonce: Vec<u8>,
    /// the client's ephemeral public key
    pub(crate) client_e_pk: PublicKey,
}

impl Ke1 {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            self.blinded.serialize(),
            self.client_nonce.clone(),
            self.client_e_pk.serialize(),
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_internal(&Parameters::new(config)?, input)
    }

    pub(crate) fn deserialize_internal(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let oprf_len = parameters.oprf_group.element_len();
        let nonce_len = parameters.nonce_len;
        let checked_bytes = check_slice_size(
            input,
            oprf_len + nonce_len + parameters.ake_group.element_len(),
            "ke1",
        )?;

        let blinded = parameters
            .oprf_group
            .deserialize_element(&checked_bytes[..oprf_len])?;
        if blinded.is_identity() {
            return Err(ProtocolError::InvalidEncoding);
        }

        Ok(Self {
            blinded,
            client_nonce: checked_bytes[oprf_len..oprf_len + nonce_len].to_vec(),
            client_e_pk: PublicKey::deserialize(
                parameters.ake_group,
                &checked_bytes[oprf_len + nonce_len..],
            )?,
        })
    }
}

/// The credential-retrieval part of KE2: the OPRF evaluation and the
/// masked server public key and envelope
#[derive(Clone, Debug, PartialEq)]
pub struct CredentialResponse {
    pub(crate) evaluated: Element,
    pub(crate) masking_nonce: Vec<u8>,
    pub(crate) masked_response: Vec<u8>,
}

impl CredentialResponse {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            self.evaluated.serialize(),
            self.masking_nonce.clone(),
            self.masked_response.clone(),
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub(crate) fn deserialize_internal(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let oprf_len = parameters.oprf_group.element_len();
        let nonce_len = parameters.nonce_len;
        let checked_bytes = check_slice_size(
            input,
            oprf_len + nonce_len + parameters.masked_response_size(),
            "credential_response",
        )?;

        Ok(Self {
            evaluated: parameters
                .oprf_group
                .deserialize_element(&checked_bytes[..oprf_len])?,
            masking_nonce: checked_bytes[oprf_len..oprf_len + nonce_len].to_vec(),
            masked_response: checked_bytes[oprf_len + nonce_len..].to_vec(),
        })
    }

    pub(crate) fn size(parameters: &Parameters) -> usize {
        parameters.oprf_group.element_len()
            + parameters.nonce_len
            + parameters.masked_response_size()
    }
}

/// The second login message, from server to client
#[derive(Clone, Debug, PartialEq)]
pub struct Ke2 {
    /// the credential response
    pub(crate) credential_response: CredentialResponse,
    /// the server's nonce
    pub(crate) server_nonce: Vec<u8>,
    /// the server's ephemeral public key
    pub(crate) server_e_pk: PublicKey,
    /// encrypted application info, zero-length when unused
    pub(crate) einfo: Vec<u8>,
    /// the server's transcript MAC
    pub(crate) server_mac: Vec<u8>,
}

impl Ke2 {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        let mut output = self.credential_response.serialize();
        output.extend_from_slice(&self.server_nonce);
        output.extend_from_slice(&self.server_e_pk.serialize());
        // einfo is the only variable-length field and carries its prefix
        output.extend_from_slice(&serialize(&self.einfo, 2).unwrap_or_default());
        output.extend_from_slice(&self.server_mac);
        output
    }

    /// Deserialization from bytes
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_internal(&Parameters::new(config)?, input)
    }

    pub(crate) fn deserialize_internal(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let credential_response_size = CredentialResponse::size(parameters);
        let nonce_len = parameters.nonce_len;
        let element_len = parameters.ake_group.element_len();
        let checked_bytes = check_slice_size_atleast(
            input,
            credential_response_size + nonce_len + element_len + 2 + parameters.mac.size(),
            "ke2",
        )?;

        let credential_response =
            CredentialResponse::deserialize_internal(parameters, &checked_bytes[..credential_response_size])?;
        let remainder = &checked_bytes[credential_response_size..];
        let server_nonce = remainder[..nonce_len].to_vec();
        let server_e_pk = PublicKey::deserialize(
            parameters.ake_group,
            &remainder[nonce_len..nonce_len + element_len],
        )?;

        let (einfo, server_mac) = tokenize(&remainder[nonce_len + element_len..], 2)?;
        check_slice_size(&server_mac, parameters.mac.size(), "server_mac")?;

        Ok(Self {
            credential_response,
            server_nonce,
            server_e_pk,
            einfo,
            server_mac,
        })
    }
}

/// The third login message, from client to server
#[derive(Clone, Debug, PartialEq)]
pub struct Ke3 {
    /// the client's transcript MAC
    pub(crate) client_mac: Vec<u8>,
}

impl Ke3 {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.client_mac.clone()
    }

    /// Deserialization from bytes
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        Self::deserialize_internal(&Parameters::new(config)?, input)
    }

    pub(crate) fn deserialize_internal(
        parameters: &Parameters,
        input: &[u8],
    ) -> Result<Self, ProtocolError> {
        let checked_bytes = check_slice_size(input, parameters.mac.size(), "ke3")?;
        Ok(Self {
            client_mac: checked_bytes.to_vec(),
        })
    }
}
