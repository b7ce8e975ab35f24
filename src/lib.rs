// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the OPAQUE asymmetric password authenticated key
//! exchange protocol
//!
//! # Overview
//!
//! OPAQUE is a protocol between a client and a server. They must first
//! agree on a [Configuration]: the prime-order groups used for the OPRF
//! and the key exchange, the key derivation, authentication, and hash
//! functions, the memory-hard function hardening the password, the
//! envelope mode, and the nonce length. The configuration serializes to
//! eight bytes and both sides must use the same one throughout.
//!
//! The example below uses [config::Mhf::Identity] so that it executes
//! quickly. A real deployment should keep a memory-hard function, such as
//! the scrypt default.
//!
//! ## Setup
//!
//! The server generates its long-term state once and persists it. It holds
//! the OPRF seed and the server's static keypair:
//!
//! ```
//! use opaque_pake::{Configuration, ServerSetup};
//! use opaque_pake::config::Mhf;
//! use rand::rngs::OsRng;
//! # use opaque_pake::errors::ProtocolError;
//! let config = Configuration {
//!     mhf: Mhf::Identity,
//!     ..Configuration::default()
//! };
//! let mut rng = OsRng;
//! let server_setup = ServerSetup::new(&config, &mut rng)?;
//! # Ok::<(), ProtocolError>(())
//! ```
//!
//! ## Registration
//!
//! Registration is a three-message flow producing a [ClientRecord] the
//! server persists under a stable, server-chosen credential identifier.
//! The export key is returned to the client and never transmitted.
//!
//! ```
//! # use opaque_pake::{Configuration, ClientRecord, ServerSetup};
//! # use opaque_pake::config::Mhf;
//! # use rand::rngs::OsRng;
//! # use opaque_pake::errors::ProtocolError;
//! # let config = Configuration { mhf: Mhf::Identity, ..Configuration::default() };
//! # let mut rng = OsRng;
//! # let server_setup = ServerSetup::new(&config, &mut rng)?;
//! let mut client = config.client()?;
//! let server = config.server()?;
//!
//! let request = client.registration_init(&mut rng, b"hunter2")?;
//! let response = server.registration_response(&server_setup, &request, b"alice")?;
//! let registration = client.registration_finalize(&mut rng, &response, &Default::default())?;
//! let record = ClientRecord::new(b"alice".to_vec(), None, registration.message);
//! # Ok::<(), ProtocolError>(())
//! ```
//!
//! ## Login
//!
//! Login is a three-message flow yielding a mutual session key and the
//! same export key as registration:
//!
//! ```
//! # use opaque_pake::{Configuration, ClientRecord, ServerSetup};
//! # use opaque_pake::config::Mhf;
//! # use rand::rngs::OsRng;
//! # use opaque_pake::errors::ProtocolError;
//! # let config = Configuration { mhf: Mhf::Identity, ..Configuration::default() };
//! # let mut rng = OsRng;
//! # let server_setup = ServerSetup::new(&config, &mut rng)?;
//! # let mut client = config.client()?;
//! # let server = config.server()?;
//! # let request = client.registration_init(&mut rng, b"hunter2")?;
//! # let response = server.registration_response(&server_setup, &request, b"alice")?;
//! # let registration = client.registration_finalize(&mut rng, &response, &Default::default())?;
//! # let export_key = registration.export_key.clone();
//! # let record = ClientRecord::new(b"alice".to_vec(), None, registration.message);
//! let mut client = config.client()?;
//! let mut server = config.server()?;
//!
//! let ke1 = client.login_init(&mut rng, b"hunter2")?;
//! let ke2 = server.login_init(
//!     &mut rng,
//!     &server_setup,
//!     &ke1,
//!     Some(&record),
//!     b"alice",
//!     &Default::default(),
//! )?;
//! let login = client.login_finish(&ke2, &Default::default())?;
//! let session_key = server.login_finish(&login.message)?;
//!
//! assert_eq!(login.session_key, session_key);
//! assert_eq!(login.export_key, export_key);
//! # Ok::<(), ProtocolError>(())
//! ```
//!
//! A wrong password, a tampered message, or an unknown credential
//! identifier all surface as the single
//! [errors::ProtocolError::InvalidCredentials] error, with no indication
//! of which check failed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

// Error types
pub mod errors;

// The deployment parameter set
pub mod config;

// Byte-level serialization primitives
mod encoding;

// Primitive wrappers resolved from the configuration
mod primitives;

// Protocol core
mod envelope;
mod key_exchange;
mod oprf;

// Public API
pub mod client;
pub mod keypair;
pub mod messages;
pub mod server;

#[cfg(test)]
mod tests;

// Exports

pub use crate::client::{
    Client, ClientLoginFinishParameters, ClientLoginFinishResult,
    ClientRegistrationFinishParameters, ClientRegistrationFinishResult,
};
pub use crate::config::Configuration;
pub use crate::envelope::Identifiers;
pub use crate::errors::ProtocolError;
pub use crate::keypair::{KeyPair, PrivateKey, PublicKey};
pub use crate::messages::{
    Ke1, Ke2, Ke3, RegistrationRequest, RegistrationResponse, RegistrationUpload,
};
pub use crate::server::{ClientRecord, Server, ServerLoginParameters, ServerSetup};
