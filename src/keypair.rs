// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the keypair types that must be supplied for the OPAQUE API

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::config::Group;
use crate::errors::ProtocolError;
use crate::primitives::group::{Element, Scalar};

/// A public key: a group element together with its group.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    pub(crate) group: Group,
    pub(crate) element: Element,
}

impl PublicKey {
    /// Serialization into fixed-length bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.element.serialize()
    }

    /// Deserialization from fixed-length bytes. Rejects encodings that do
    /// not decode to a valid group element, and the identity element.
    pub fn deserialize(group: Group, input: &[u8]) -> Result<Self, ProtocolError> {
        let element = group.deserialize_element(input)?;
        if element.is_identity() {
            return Err(ProtocolError::InvalidEncoding);
        }
        Ok(Self { group, element })
    }
}

/// A private key: a scalar together with its group. Zeroed on drop.
#[derive(Clone, Debug, PartialEq)]
pub struct PrivateKey {
    pub(crate) group: Group,
    pub(crate) scalar: Scalar,
}

impl PrivateKey {
    /// Serialization into fixed-length bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.scalar.serialize()
    }

    /// Deserialization from fixed-length canonical bytes
    pub fn deserialize(group: Group, input: &[u8]) -> Result<Self, ProtocolError> {
        let scalar = group.deserialize_scalar(input)?;
        Ok(Self { group, scalar })
    }

    /// Computes the Diffie-Hellman function on a peer public key.
    pub(crate) fn diffie_hellman(&self, peer: &Element) -> Vec<u8> {
        peer.mult(&self.scalar).serialize()
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.scalar.zeroize();
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// A keypair over the configured group
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPair {
    pk: PublicKey,
    sk: PrivateKey,
}

impl KeyPair {
    /// The public key component
    pub fn public(&self) -> &PublicKey {
        &self.pk
    }

    /// The private key component
    pub fn private(&self) -> &PrivateKey {
        &self.sk
    }

    /// Generating a random key pair given a cryptographic rng
    pub fn generate_random<R: RngCore + CryptoRng>(group: Group, rng: &mut R) -> Self {
        let scalar = group.random_nonzero_scalar(rng);
        Self::from_private_scalar(group, scalar)
    }

    /// Obtains a KeyPair from a slice representing the private key
    pub fn from_private_key_slice(group: Group, input: &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self::from_private_scalar(
            group,
            group.deserialize_scalar(input)?,
        ))
    }

    pub(crate) fn from_private_scalar(group: Group, scalar: Scalar) -> Self {
        let element = group.base().mult(&scalar);
        Self {
            pk: PublicKey { group, element },
            sk: PrivateKey { group, scalar },
        }
    }
}
