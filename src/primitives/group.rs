// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime-dispatched prime-order group arithmetic over the supported
//! curves

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar as DalekScalar;
use curve25519_dalek::traits::Identity;
use generic_array::GenericArray;
use p256::elliptic_curve::group::Group as _;
use p256::elliptic_curve::hash2curve::{ExpandMsgXmd, GroupDigest};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::elliptic_curve::{Field, PrimeField};
use p256::{AffinePoint, EncodedPoint, NistP256, ProjectivePoint, Scalar as P256Scalar};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::config::Group;
use crate::encoding::i2osp;
use crate::errors::utils::check_slice_size;
use crate::errors::ProtocolError;
use crate::primitives::expand::expand_message_xmd;

/// A group element. Both variants carry the point representation of their
/// curve; arithmetic never crosses variants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Element {
    Ristretto(RistrettoPoint),
    P256(ProjectivePoint),
}

/// A scalar of the group's prime-order field.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Scalar {
    Ristretto(DalekScalar),
    P256(P256Scalar),
}

impl Group {
    /// The ciphersuite identifier as dictated by
    /// <https://www.ietf.org/archive/id/draft-irtf-cfrg-voprf-05.txt>
    fn suite_id(&self) -> usize {
        match self {
            Group::Ristretto255 => 0x0001,
            Group::P256 => 0x0003,
        }
    }

    /// The byte length necessary to represent group elements
    pub(crate) fn element_len(&self) -> usize {
        match self {
            Group::Ristretto255 => 32,
            Group::P256 => 33,
        }
    }

    /// The byte length necessary to represent scalars
    pub(crate) fn scalar_len(&self) -> usize {
        32
    }

    /// Generates the contextString parameter used for domain separation,
    /// in base (multiplicative) mode.
    pub(crate) fn context_string(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok([i2osp(0, 1)?, i2osp(self.suite_id(), 2)?].concat())
    }

    /// Transforms an input and domain separation tag into a group element.
    pub(crate) fn hash_to_group(&self, input: &[u8], dst: &[u8]) -> Result<Element, ProtocolError> {
        match self {
            Group::Ristretto255 => {
                let uniform_bytes = expand_message_xmd::<sha2::Sha512>(input, dst, 64)?;
                let mut bits = [0u8; 64];
                bits.copy_from_slice(&uniform_bytes);
                Ok(Element::Ristretto(RistrettoPoint::from_uniform_bytes(
                    &bits,
                )))
            }
            Group::P256 => NistP256::hash_from_bytes::<ExpandMsgXmd<sha2::Sha256>>(&[input], &[dst])
                .map(Element::P256)
                .map_err(|_| ProtocolError::InvalidEncoding),
        }
    }

    /// Hashes an input and domain separation tag to a scalar.
    pub(crate) fn hash_to_scalar(&self, input: &[u8], dst: &[u8]) -> Result<Scalar, ProtocolError> {
        match self {
            Group::Ristretto255 => {
                let uniform_bytes = expand_message_xmd::<sha2::Sha512>(input, dst, 64)?;
                let mut bits = [0u8; 64];
                bits.copy_from_slice(&uniform_bytes);
                Ok(Scalar::Ristretto(DalekScalar::from_bytes_mod_order_wide(
                    &bits,
                )))
            }
            Group::P256 => {
                <NistP256 as GroupDigest>::hash_to_scalar::<ExpandMsgXmd<sha2::Sha256>>(
                    &[input],
                    &[dst],
                )
                .map(Scalar::P256)
                .map_err(|_| ProtocolError::InvalidEncoding)
            }
        }
    }

    /// Picks a scalar at random, never zero.
    pub(crate) fn random_nonzero_scalar<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Scalar {
        match self {
            Group::Ristretto255 => loop {
                let mut scalar_bytes = [0u8; 64];
                rng.fill_bytes(&mut scalar_bytes);
                let scalar = DalekScalar::from_bytes_mod_order_wide(&scalar_bytes);
                if scalar != DalekScalar::ZERO {
                    break Scalar::Ristretto(scalar);
                }
            },
            Group::P256 => Scalar::P256(P256Scalar::random(&mut *rng)),
        }
    }

    /// The base point of the group
    pub(crate) fn base(&self) -> Element {
        match self {
            Group::Ristretto255 => Element::Ristretto(RISTRETTO_BASEPOINT_POINT),
            Group::P256 => Element::P256(ProjectivePoint::GENERATOR),
        }
    }

    /// Returns an element from its fixed-length bytes representation.
    pub(crate) fn deserialize_element(&self, bytes: &[u8]) -> Result<Element, ProtocolError> {
        let checked_bytes = check_slice_size(bytes, self.element_len(), "group_element")?;
        match self {
            Group::Ristretto255 => CompressedRistretto::from_slice(checked_bytes)
                .map_err(|_| ProtocolError::InvalidEncoding)?
                .decompress()
                .map(Element::Ristretto)
                .ok_or(ProtocolError::InvalidEncoding),
            Group::P256 => {
                let encoded = EncodedPoint::from_bytes(checked_bytes)
                    .map_err(|_| ProtocolError::InvalidEncoding)?;
                Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
                    .map(|affine| Element::P256(ProjectivePoint::from(affine)))
                    .ok_or(ProtocolError::InvalidEncoding)
            }
        }
    }

    /// Returns a scalar from its fixed-length canonical bytes
    /// representation.
    pub(crate) fn deserialize_scalar(&self, bytes: &[u8]) -> Result<Scalar, ProtocolError> {
        let checked_bytes = check_slice_size(bytes, self.scalar_len(), "group_scalar")?;
        match self {
            Group::Ristretto255 => {
                let mut bits = [0u8; 32];
                bits.copy_from_slice(checked_bytes);
                Option::<DalekScalar>::from(DalekScalar::from_canonical_bytes(bits))
                    .map(Scalar::Ristretto)
                    .ok_or(ProtocolError::InvalidEncoding)
            }
            Group::P256 => Option::<P256Scalar>::from(P256Scalar::from_repr(
                *GenericArray::from_slice(checked_bytes),
            ))
            .map(Scalar::P256)
            .ok_or(ProtocolError::InvalidEncoding),
        }
    }
}

impl Element {
    /// Serializes the group element to its fixed-length representation.
    pub(crate) fn serialize(&self) -> Vec<u8> {
        match self {
            Element::Ristretto(point) => point.compress().to_bytes().to_vec(),
            Element::P256(point) => point.to_affine().to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// Returns whether the element is the identity (1).
    pub(crate) fn is_identity(&self) -> bool {
        match self {
            Element::Ristretto(point) => point == &RistrettoPoint::identity(),
            Element::P256(point) => bool::from(point.is_identity()),
        }
    }

    /// Multiplies the element by a scalar of the same group.
    pub(crate) fn mult(&self, scalar: &Scalar) -> Element {
        match (self, scalar) {
            (Element::Ristretto(point), Scalar::Ristretto(scalar)) => {
                Element::Ristretto(point * scalar)
            }
            (Element::P256(point), Scalar::P256(scalar)) => Element::P256(point * scalar),
            _ => unreachable!("group arithmetic across mismatched groups"),
        }
    }
}

impl Scalar {
    /// Serializes the scalar to its fixed-length representation.
    pub(crate) fn serialize(&self) -> Vec<u8> {
        match self {
            Scalar::Ristretto(scalar) => scalar.to_bytes().to_vec(),
            Scalar::P256(scalar) => scalar.to_repr().to_vec(),
        }
    }

    /// The multiplicative inverse of this scalar
    pub(crate) fn invert(&self) -> Scalar {
        match self {
            Scalar::Ristretto(scalar) => Scalar::Ristretto(scalar.invert()),
            Scalar::P256(scalar) => {
                Scalar::P256(scalar.invert().unwrap_or(<P256Scalar as Field>::ZERO))
            }
        }
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        match self {
            Scalar::Ristretto(scalar) => scalar.zeroize(),
            Scalar::P256(scalar) => *scalar = <P256Scalar as Field>::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn element_roundtrip() {
        let mut rng = OsRng;
        for group in [Group::Ristretto255, Group::P256] {
            let scalar = group.random_nonzero_scalar(&mut rng);
            let element = group.base().mult(&scalar);
            let bytes = element.serialize();
            assert_eq!(bytes.len(), group.element_len());
            assert_eq!(group.deserialize_element(&bytes).unwrap(), element);
        }
    }

    #[test]
    fn scalar_roundtrip() {
        let mut rng = OsRng;
        for group in [Group::Ristretto255, Group::P256] {
            let scalar = group.random_nonzero_scalar(&mut rng);
            let bytes = scalar.serialize();
            assert_eq!(bytes.len(), group.scalar_len());
            assert_eq!(group.deserialize_scalar(&bytes).unwrap(), scalar);
        }
    }

    #[test]
    fn scalar_inversion_cancels() {
        let mut rng = OsRng;
        for group in [Group::Ristretto255, Group::P256] {
            let scalar = group.random_nonzero_scalar(&mut rng);
            let element = group.base().mult(&group.random_nonzero_scalar(&mut rng));
            let there_and_back = element.mult(&scalar).mult(&scalar.invert());
            assert_eq!(there_and_back, element);
        }
    }

    #[test]
    fn malformed_element_rejected() {
        for group in [Group::Ristretto255, Group::P256] {
            let garbage = vec![0xffu8; group.element_len()];
            assert_eq!(
                group.deserialize_element(&garbage),
                Err(ProtocolError::InvalidEncoding)
            );
            assert!(matches!(
                group.deserialize_element(&garbage[1..]),
                Err(ProtocolError::InvalidLength { .. })
            ));
        }
    }

    #[test]
    fn hash_to_group_differs_by_input() {
        for group in [Group::Ristretto255, Group::P256] {
            let dst = [b"HashToGroup-".as_slice(), &group.context_string().unwrap()].concat();
            let e1 = group.hash_to_group(b"password", &dst).unwrap();
            let e2 = group.hash_to_group(b"passworc", &dst).unwrap();
            assert_ne!(e1.serialize(), e2.serialize());
        }
    }
}
