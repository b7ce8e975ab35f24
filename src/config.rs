// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The deployment-time parameter set selecting the protocol's primitives

use core::fmt;

use crate::client::Client;
use crate::errors::ProtocolError;
use crate::server::Server;

/// The length of the serialized configuration, in bytes: seven 1-byte
/// primitive identifiers followed by the 1-byte nonce length.
pub const CONFIGURATION_LENGTH: usize = 8;

/// Identifies a prime-order group with hash-to-curve capability, used for
/// the OPRF and for the AKE.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Group {
    /// The Ristretto255 group, paired with SHA-512 for input expansion
    Ristretto255 = 1,
    /// The NIST P-256 group, paired with SHA-256 for input expansion
    P256 = 3,
}

impl TryFrom<u8> for Group {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Group::Ristretto255),
            3 => Ok(Group::P256),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// Identifies the key derivation function.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Kdf {
    /// HKDF instantiated over SHA-256
    HkdfSha256 = 1,
    /// HKDF instantiated over SHA-512
    HkdfSha512 = 2,
}

impl TryFrom<u8> for Kdf {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Kdf::HkdfSha256),
            2 => Ok(Kdf::HkdfSha512),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// Identifies the message authentication function.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Mac {
    /// HMAC instantiated over SHA-256
    HmacSha256 = 1,
    /// HMAC instantiated over SHA-512
    HmacSha512 = 2,
}

impl TryFrom<u8> for Mac {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Mac::HmacSha256),
            2 => Ok(Mac::HmacSha512),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// Identifies the transcript hash function.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Hash {
    /// SHA-256
    Sha256 = 1,
    /// SHA-512
    Sha512 = 2,
}

impl TryFrom<u8> for Hash {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Hash::Sha256),
            2 => Ok(Hash::Sha512),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// Identifies the memory-hard function applied to the OPRF output on the
/// client.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Mhf {
    /// No stretching; returns its input. Only suitable for testing or for
    /// deployments layering their own hardening.
    Identity = 1,
    /// scrypt with N = 2^15, r = 8, p = 1
    Scrypt = 2,
    /// Argon2id with the library's default parameters
    Argon2id = 3,
}

impl TryFrom<u8> for Mhf {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Mhf::Identity),
            2 => Ok(Mhf::Scrypt),
            3 => Ok(Mhf::Argon2id),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// Designates the envelope mode.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Mode {
    /// The client's long-term key pair is derived from the randomized
    /// password and never stored.
    Internal = 1,
    /// The client supplies a long-term private key, carried in the envelope
    /// masked by a password-derived pad.
    External = 2,
}

impl TryFrom<u8> for Mode {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Mode::Internal),
            2 => Ok(Mode::External),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// An immutable parameter set chosen at deployment. Client and server must
/// agree on it ahead of protocol execution.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Configuration {
    /// The OPRF group
    pub oprf_group: Group,
    /// The key derivation function
    pub kdf: Kdf,
    /// The message authentication function
    pub mac: Mac,
    /// The transcript hash function
    pub hash: Hash,
    /// The memory-hard function
    pub mhf: Mhf,
    /// The envelope mode
    pub mode: Mode,
    /// The AKE group
    pub ake_group: Group,
    /// The nonce length; 32 is the recommended value
    pub nonce_len: usize,
}

impl Configuration {
    /// Returns the byte encoding of the configuration.
    pub fn serialize(&self) -> Result<[u8; CONFIGURATION_LENGTH], ProtocolError> {
        if self.nonce_len == 0 || self.nonce_len > u8::MAX as usize {
            return Err(ProtocolError::InvalidConfiguration);
        }
        Ok([
            self.oprf_group as u8,
            self.kdf as u8,
            self.mac as u8,
            self.hash as u8,
            self.mhf as u8,
            self.mode as u8,
            self.ake_group as u8,
            self.nonce_len as u8,
        ])
    }

    /// Decodes a configuration, validating every primitive identifier.
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() != CONFIGURATION_LENGTH {
            return Err(ProtocolError::InvalidLength {
                name: "configuration",
                len: CONFIGURATION_LENGTH,
                actual_len: input.len(),
            });
        }

        Ok(Self {
            oprf_group: Group::try_from(input[0])?,
            kdf: Kdf::try_from(input[1])?,
            mac: Mac::try_from(input[2])?,
            hash: Hash::try_from(input[3])?,
            mhf: Mhf::try_from(input[4])?,
            mode: Mode::try_from(input[5])?,
            ake_group: Group::try_from(input[6])?,
            nonce_len: input[7] as usize,
        })
    }

    /// Returns a newly instantiated client session handle for this
    /// configuration.
    pub fn client(&self) -> Result<Client, ProtocolError> {
        Client::new(self)
    }

    /// Returns a newly instantiated server session handle for this
    /// configuration.
    pub fn server(&self) -> Result<Server, ProtocolError> {
        Server::new(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            oprf_group: Group::Ristretto255,
            kdf: Kdf::HkdfSha512,
            mac: Mac::HmacSha512,
            hash: Hash::Sha512,
            mhf: Mhf::Scrypt,
            mode: Mode::Internal,
            ake_group: Group::Ristretto255,
            nonce_len: 32,
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}-{:?}-{:?}-{:?}-{:?}-{:?}-{:?}-{}",
            self.oprf_group,
            self.kdf,
            self.mac,
            self.hash,
            self.mhf,
            self.mode,
            self.ake_group,
            self.nonce_len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_configurations() -> Vec<Configuration> {
        let mut out = Vec::new();
        for &oprf_group in &[Group::Ristretto255, Group::P256] {
            for &ake_group in &[Group::Ristretto255, Group::P256] {
                for &mode in &[Mode::Internal, Mode::External] {
                    for &(kdf, mac, hash) in &[
                        (Kdf::HkdfSha256, Mac::HmacSha256, Hash::Sha256),
                        (Kdf::HkdfSha512, Mac::HmacSha512, Hash::Sha512),
                    ] {
                        out.push(Configuration {
                            oprf_group,
                            kdf,
                            mac,
                            hash,
                            mhf: Mhf::Identity,
                            mode,
                            ake_group,
                            nonce_len: 32,
                        });
                    }
                }
            }
        }
        out
    }

    #[test]
    fn configuration_roundtrip() {
        for config in all_configurations() {
            let encoded = config.serialize().unwrap();
            assert_eq!(encoded.len(), CONFIGURATION_LENGTH);
            assert_eq!(Configuration::deserialize(&encoded).unwrap(), config);
        }
    }

    #[test]
    fn unknown_identifier_rejected() {
        let mut encoded = Configuration::default().serialize().unwrap();
        encoded[0] = 0x7f;
        assert_eq!(
            Configuration::deserialize(&encoded),
            Err(ProtocolError::InvalidConfiguration)
        );
    }

    #[test]
    fn bad_length_rejected() {
        let encoded = Configuration::default().serialize().unwrap();
        assert!(matches!(
            Configuration::deserialize(&encoded[..7]),
            Err(ProtocolError::InvalidLength { .. })
        ));
    }
}
