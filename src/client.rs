// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The client side of the registration and login flows

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::config::Configuration;
use crate::envelope::{self, Identifiers};
use crate::errors::ProtocolError;
use crate::key_exchange::tripledh::{self, Ke1State};
use crate::keypair::{PrivateKey, PublicKey};
use crate::messages::{Ke1, Ke2, Ke3, RegistrationRequest, RegistrationResponse, RegistrationUpload};
use crate::oprf;
use crate::primitives::Parameters;

/// Optional parameters for the client's registration finalization
#[derive(Clone, Debug, Default)]
pub struct ClientRegistrationFinishParameters {
    /// Custom client and server identifiers
    pub identifiers: Option<Identifiers>,
    /// The client's long-term private key; required by the envelope mode
    /// that stores it, rejected by the mode that derives it
    pub external_key: Option<PrivateKey>,
}

/// Optional parameters for the client's login finalization
#[derive(Clone, Debug, Default)]
pub struct ClientLoginFinishParameters {
    /// Custom client and server identifiers
    pub identifiers: Option<Identifiers>,
}

/// The outputs of a completed registration, from the client's perspective
pub struct ClientRegistrationFinishResult {
    /// The registration upload to send to the server for persistence
    pub message: RegistrationUpload,
    /// The export key, never transmitted
    pub export_key: Vec<u8>,
    /// The server's static public key
    pub server_s_pk: PublicKey,
}

/// The outputs of a completed login, from the client's perspective
pub struct ClientLoginFinishResult {
    /// The final message to send to the server
    pub message: Ke3,
    /// The mutually authenticated session key
    pub session_key: Vec<u8>,
    /// The export key, equal to the one returned at registration
    pub export_key: Vec<u8>,
    /// The server's static public key recovered from the envelope
    pub server_s_pk: PublicKey,
    /// Decrypted application info supplied by the server, empty when unused
    pub server_info: Vec<u8>,
}

/// A client session handle. Each handle represents one in-flight
/// registration or login and is consumed step by step; calling a finalize
/// step without its init step fails with [ProtocolError::InvalidState].
pub struct Client {
    parameters: Parameters,
    token: Option<oprf::Token>,
    ke1_state: Option<Ke1State>,
    serialized_ke1: Option<Vec<u8>>,
    session_key: Option<Vec<u8>>,
}

impl Client {
    /// Builds a client handle for the configuration, validating it first.
    pub fn new(config: &Configuration) -> Result<Self, ProtocolError> {
        Ok(Self {
            parameters: Parameters::new(config)?,
            token: None,
            ke1_state: None,
            serialized_ke1: None,
            session_key: None,
        })
    }

    /// Initiates registration: blinds the password and returns the request
    /// to send to the server.
    pub fn registration_init<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        password: &[u8],
    ) -> Result<RegistrationRequest, ProtocolError> {
        let (token, blinded) = oprf::blind(&self.parameters, password, rng)?;
        self.token = Some(token);
        Ok(RegistrationRequest { blinded })
    }

    /// Finalizes registration: unblinds the server's evaluation, hardens it
    /// into the randomized password, and seals the envelope. Returns the
    /// upload for the server to persist, along with the export key.
    pub fn registration_finalize<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        response: &RegistrationResponse,
        params: &ClientRegistrationFinishParameters,
    ) -> Result<ClientRegistrationFinishResult, ProtocolError> {
        let token = self.token.take().ok_or(ProtocolError::InvalidState)?;
        if response.server_s_pk.group != self.parameters.ake_group {
            return Err(ProtocolError::InvalidConfiguration);
        }

        let oprf_output = oprf::finalize(&self.parameters, &token, &response.evaluated)?;
        let randomized_pwd = envelope::randomized_password(&self.parameters, &oprf_output)?;
        let masking_key = envelope::masking_key(&self.parameters, &randomized_pwd)?;

        let sealed = envelope::seal(
            &self.parameters,
            rng,
            &randomized_pwd,
            &response.server_s_pk,
            params.external_key.as_ref(),
            &params.identifiers,
        )?;

        Ok(ClientRegistrationFinishResult {
            message: RegistrationUpload {
                client_s_pk: sealed.client_keypair.public().clone(),
                masking_key,
                envelope: sealed.envelope,
            },
            export_key: sealed.export_key,
            server_s_pk: response.server_s_pk.clone(),
        })
    }

    /// Initiates login: blinds the password and attaches the client's
    /// nonce and ephemeral key share.
    pub fn login_init<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        password: &[u8],
    ) -> Result<Ke1, ProtocolError> {
        let (token, blinded) = oprf::blind(&self.parameters, password, rng)?;
        let (ke1_state, client_e_pk) = tripledh::generate_ke1(&self.parameters, rng);

        let ke1 = Ke1 {
            blinded,
            client_nonce: ke1_state.client_nonce.clone(),
            client_e_pk: PublicKey {
                group: self.parameters.ake_group,
                element: client_e_pk,
            },
        };

        self.token = Some(token);
        self.serialized_ke1 = Some(ke1.serialize());
        self.ke1_state = Some(ke1_state);
        Ok(ke1)
    }

    /// Finalizes login: recovers the envelope from the masked response,
    /// opens it, and completes the key exchange. Every
    /// authentication-relevant failure collapses into
    /// [ProtocolError::InvalidCredentials].
    pub fn login_finish(
        &mut self,
        ke2: &Ke2,
        params: &ClientLoginFinishParameters,
    ) -> Result<ClientLoginFinishResult, ProtocolError> {
        let token = self.token.take().ok_or(ProtocolError::InvalidState)?;
        let ke1_state = self.ke1_state.take().ok_or(ProtocolError::InvalidState)?;
        let serialized_ke1 = self
            .serialized_ke1
            .take()
            .ok_or(ProtocolError::InvalidState)?;

        let oprf_output = oprf::finalize(
            &self.parameters,
            &token,
            &ke2.credential_response.evaluated,
        )
        .map_err(|_| ProtocolError::InvalidCredentials)?;
        let randomized_pwd = envelope::randomized_password(&self.parameters, &oprf_output)?;
        let masking_key = Zeroizing::new(envelope::masking_key(&self.parameters, &randomized_pwd)?);

        let (server_s_pk, sealed_envelope) = envelope::unmask_credential_response(
            &self.parameters,
            &masking_key,
            &ke2.credential_response.masking_nonce,
            &ke2.credential_response.masked_response,
        )?;

        let opened = envelope::open(
            &self.parameters,
            &randomized_pwd,
            &sealed_envelope,
            &server_s_pk,
            &params.identifiers,
        )?;

        let result = tripledh::generate_ke3(
            &self.parameters,
            &ke1_state,
            &serialized_ke1,
            &ke2.credential_response.serialize(),
            &ke2.server_nonce,
            &ke2.server_e_pk.element,
            &ke2.einfo,
            &ke2.server_mac,
            &server_s_pk.element,
            &opened.client_keypair.private().scalar,
            &opened.id_u,
            &opened.id_s,
        )?;

        self.session_key = Some(result.session_key.clone());
        Ok(ClientLoginFinishResult {
            message: Ke3 {
                client_mac: result.client_mac,
            },
            session_key: result.session_key,
            export_key: opened.export_key,
            server_s_pk,
            server_info: result.server_info,
        })
    }

    /// The session key, available once login has completed.
    pub fn session_key(&self) -> Option<&[u8]> {
        self.session_key.as_deref()
    }
}

impl Zeroize for Client {
    fn zeroize(&mut self) {
        if let Some(token) = self.token.as_mut() {
            token.zeroize();
        }
        if let Some(state) = self.ke1_state.as_mut() {
            state.zeroize();
        }
        if let Some(ke1) = self.serialized_ke1.as_mut() {
            ke1.zeroize();
        }
        if let Some(key) = self.session_key.as_mut() {
            key.zeroize();
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.zeroize();
    }
}
