// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The server side of the registration and login flows, along with the
//! server's long-term state

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::config::Configuration;
use crate::encoding::{serialize, tokenize};
use crate::envelope::{self, Envelope, Identifiers};
use crate::errors::utils::check_slice_size;
use crate::errors::ProtocolError;
use crate::key_exchange::tripledh::{self, Ke2State};
use crate::keypair::{KeyPair, PublicKey};
use crate::messages::{
    CredentialResponse, Ke1, Ke2, Ke3, RegistrationRequest, RegistrationResponse,
    RegistrationUpload,
};
use crate::oprf;
use crate::primitives::Parameters;

const STR_FAKE_MASKING_KEY: &[u8] = b"FakeMaskingKey";
const STR_FAKE_CLIENT_KEY: &[u8] = b"FakeClientKey";
const STR_DERIVE_AUTH_KEY_PAIR: &[u8] = b"OPAQUE-DeriveAuthKeyPair";

/// The long-term state the server holds across all sessions: the OPRF
/// seed and its static keypair. Read-only during protocol execution.
pub struct ServerSetup {
    pub(crate) oprf_seed: Vec<u8>,
    pub(crate) keypair: KeyPair,
}

impl ServerSetup {
    /// Generates a new instance of the server's long-term state.
    pub fn new<R: RngCore + CryptoRng>(
        config: &Configuration,
        rng: &mut R,
    ) -> Result<Self, ProtocolError> {
        let parameters = Parameters::new(config)?;
        let mut oprf_seed = vec![0u8; parameters.kdf.size()];
        rng.fill_bytes(&mut oprf_seed);

        Ok(Self {
            oprf_seed,
            keypair: KeyPair::generate_random(parameters.ake_group, rng),
        })
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [self.oprf_seed.clone(), self.keypair.private().serialize()].concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        let parameters = Parameters::new(config)?;
        let seed_len = parameters.kdf.size();
        let checked_bytes = check_slice_size(
            input,
            seed_len + parameters.ake_group.scalar_len(),
            "server_setup",
        )?;

        Ok(Self {
            oprf_seed: checked_bytes[..seed_len].to_vec(),
            keypair: KeyPair::from_private_key_slice(
                parameters.ake_group,
                &checked_bytes[seed_len..],
            )?,
        })
    }

    /// The server's static keypair
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }
}

impl Zeroize for ServerSetup {
    fn zeroize(&mut self) {
        self.oprf_seed.zeroize();
    }
}

impl Drop for ServerSetup {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The per-user row the server persists after a successful registration.
/// Mutated only by a fresh registration for the same identifier.
pub struct ClientRecord {
    /// The server-chosen, stable credential identifier
    pub credential_identifier: Vec<u8>,
    /// The client identity, when it differs from the client's public key
    pub client_identity: Option<Vec<u8>>,
    /// The registration upload produced by the client
    pub(crate) upload: RegistrationUpload,
}

impl ClientRecord {
    /// Assembles the record persisted for this credential identifier.
    pub fn new(
        credential_identifier: Vec<u8>,
        client_identity: Option<Vec<u8>>,
        upload: RegistrationUpload,
    ) -> Self {
        Self {
            credential_identifier,
            client_identity,
            upload,
        }
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok([
            serialize(&self.credential_identifier, 2)?,
            serialize(self.client_identity.as_deref().unwrap_or(&[]), 2)?,
            self.upload.serialize(),
        ]
        .concat())
    }

    /// Deserialization from bytes. An empty client identity decodes as
    /// absent.
    pub fn deserialize(config: &Configuration, input: &[u8]) -> Result<Self, ProtocolError> {
        let (credential_identifier, remainder) = tokenize(input, 2)?;
        let (client_identity, upload_bytes) = tokenize(&remainder, 2)?;

        Ok(Self {
            credential_identifier,
            client_identity: (!client_identity.is_empty()).then_some(client_identity),
            upload: RegistrationUpload::deserialize(config, &upload_bytes)?,
        })
    }
}

impl Zeroize for ClientRecord {
    fn zeroize(&mut self) {
        self.upload.zeroize();
    }
}

impl Drop for ClientRecord {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Optional parameters for the server's login start
#[derive(Clone, Debug, Default)]
pub struct ServerLoginParameters {
    /// Custom client and server identifiers
    pub identifiers: Option<Identifiers>,
    /// Application info to be encrypted under the handshake; reaches the
    /// client only after it has authenticated the server
    pub info: Option<Vec<u8>>,
}

/// A server session handle. Each handle represents one in-flight login;
/// the long-term [ServerSetup] and [ClientRecord] store are shared,
/// read-only, across handles.
pub struct Server {
    parameters: Parameters,
    ke2_state: Option<Ke2State>,
    session_key: Option<Vec<u8>>,
}

impl Server {
    /// Builds a server handle for the configuration, validating it first.
    pub fn new(config: &Configuration) -> Result<Self, ProtocolError> {
        Ok(Self {
            parameters: Parameters::new(config)?,
            ke2_state: None,
            session_key: None,
        })
    }

    /// Answers a registration request by evaluating the blinded element
    /// under the per-credential key derived from the OPRF seed. No state
    /// is created.
    pub fn registration_response(
        &self,
        setup: &ServerSetup,
        request: &RegistrationRequest,
        credential_identifier: &[u8],
    ) -> Result<RegistrationResponse, ProtocolError> {
        let key = oprf::derive_key_pair(&self.parameters, &setup.oprf_seed, credential_identifier)?;
        Ok(RegistrationResponse {
            evaluated: oprf::evaluate(&request.blinded, &key),
            server_s_pk: setup.keypair.public().clone(),
        })
    }

    /// Answers KE1 with the credential response and the server's key
    /// share. When no record exists for the identifier, a deterministic
    /// fake is substituted so the response is indistinguishable from a
    /// registered one.
    pub fn login_init<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        setup: &ServerSetup,
        ke1: &Ke1,
        record: Option<&ClientRecord>,
        credential_identifier: &[u8],
        params: &ServerLoginParameters,
    ) -> Result<Ke2, ProtocolError> {
        if let Some(info) = params.info.as_deref() {
            if info.len() > u16::MAX as usize {
                return Err(ProtocolError::InvalidEncoding);
            }
        }

        let key = oprf::derive_key_pair(&self.parameters, &setup.oprf_seed, credential_identifier)?;
        let evaluated = oprf::evaluate(&ke1.blinded, &key);

        let (client_s_pk, masking_key, sealed_envelope) = match record {
            Some(record) => (
                record.upload.client_s_pk.clone(),
                record.upload.masking_key.clone(),
                record.upload.envelope.clone(),
            ),
            None => self.fake_record(setup, credential_identifier)?,
        };

        let mut masking_nonce = vec![0u8; self.parameters.nonce_len];
        rng.fill_bytes(&mut masking_nonce);
        let masked_response = envelope::mask_credential_response(
            &self.parameters,
            &masking_key,
            &masking_nonce,
            setup.keypair.public(),
            &sealed_envelope,
        )?;

        let credential_response = CredentialResponse {
            evaluated,
            masking_nonce,
            masked_response,
        };

        let identifiers = match (&params.identifiers, record) {
            (Some(ids), _) => Some(ids.clone()),
            (None, Some(record)) => record
                .client_identity
                .clone()
                .map(Identifiers::ClientIdentifier),
            (None, None) => None,
        };
        let (id_u, id_s) = envelope::bytestrings_from_identifiers(
            &identifiers,
            &client_s_pk.serialize(),
            &setup.keypair.public().serialize(),
        )?;

        let (ke2_state, parts) = tripledh::generate_ke2(
            &self.parameters,
            rng,
            &ke1.serialize(),
            &credential_response.serialize(),
            &ke1.client_e_pk.element,
            &client_s_pk.element,
            &setup.keypair.private().scalar,
            &id_u,
            &id_s,
            params.info.as_deref(),
        )?;
        self.ke2_state = Some(ke2_state);

        Ok(Ke2 {
            credential_response,
            server_nonce: parts.server_nonce,
            server_e_pk: PublicKey {
                group: self.parameters.ake_group,
                element: parts.server_e_pk,
            },
            einfo: parts.einfo,
            server_mac: parts.server_mac,
        })
    }

    /// Checks the client's MAC and, on success, releases the session key.
    pub fn login_finish(&mut self, ke3: &Ke3) -> Result<Vec<u8>, ProtocolError> {
        let state = self.ke2_state.take().ok_or(ProtocolError::InvalidState)?;
        let session_key = tripledh::finish(&state, &ke3.client_mac)?;
        self.session_key = Some(session_key.clone());
        Ok(session_key)
    }

    /// The session key, available once login has completed.
    pub fn session_key(&self) -> Option<&[u8]> {
        self.session_key.as_deref()
    }

    // Fakes a registration record for an unknown identifier, expanded
    // deterministically from the OPRF seed so repeated probes see a
    // stable, plausible credential response.
    fn fake_record(
        &self,
        setup: &ServerSetup,
        credential_identifier: &[u8],
    ) -> Result<(PublicKey, Vec<u8>, Envelope), ProtocolError> {
        let prefixed_identifier = serialize(credential_identifier, 2)?;
        let masking_key = self.parameters.kdf.expand(
            &setup.oprf_seed,
            &[&prefixed_identifier[..], STR_FAKE_MASKING_KEY].concat(),
            self.parameters.kdf.size(),
        )?;

        let seed = Zeroizing::new(self.parameters.kdf.expand(
            &setup.oprf_seed,
            &[&prefixed_identifier[..], STR_FAKE_CLIENT_KEY].concat(),
            self.parameters.ake_group.scalar_len(),
        )?);
        let scalar = self
            .parameters
            .ake_group
            .hash_to_scalar(&seed, STR_DERIVE_AUTH_KEY_PAIR)?;
        let keypair = KeyPair::from_private_scalar(self.parameters.ake_group, scalar);

        Ok((
            keypair.public().clone(),
            masking_key,
            Envelope::zero(&self.parameters),
        ))
    }
}

impl Zeroize for Server {
    fn zeroize(&mut self) {
        if let Some(state) = self.ke2_state.as_mut() {
            state.zeroize();
        }
        if let Some(key) = self.session_key.as_mut() {
            key.zeroize();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.zeroize();
    }
}
