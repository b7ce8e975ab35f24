// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The `expand_message_xmd` function from the hash-to-curve specification,
//! used to stretch an input into uniform bytes before mapping to a group

use digest::core_api::BlockSizeUser;
use digest::Digest;
use generic_array::typenum::Unsigned;

use crate::errors::ProtocolError;

/// Implements `expand_message_xmd` from
/// <https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-hash-to-curve-11#section-5.4.1>
pub(crate) fn expand_message_xmd<D: Digest + BlockSizeUser>(
    msg: &[u8],
    dst: &[u8],
    len_in_bytes: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let b_in_bytes = <D as Digest>::output_size();
    let r_in_bytes = <D as BlockSizeUser>::BlockSize::USIZE;

    let ell = (len_in_bytes + b_in_bytes - 1) / b_in_bytes;
    if len_in_bytes == 0 || ell > 255 || dst.len() > 255 {
        return Err(ProtocolError::InvalidEncoding);
    }

    let dst_prime = [dst, &[dst.len() as u8]].concat();
    let l_i_b_str = [(len_in_bytes >> 8) as u8, len_in_bytes as u8];

    // b_0 = H(Z_pad || msg || l_i_b_str || 0x00 || DST_prime)
    let mut hasher = D::new();
    hasher.update(vec![0u8; r_in_bytes]);
    hasher.update(msg);
    hasher.update(l_i_b_str);
    hasher.update([0u8]);
    hasher.update(&dst_prime);
    let b_0 = hasher.finalize();

    // b_1 = H(b_0 || 0x01 || DST_prime)
    let mut hasher = D::new();
    hasher.update(&b_0);
    hasher.update([1u8]);
    hasher.update(&dst_prime);
    let mut b_i = hasher.finalize();

    let mut uniform_bytes = b_i.to_vec();
    for i in 2..=ell {
        // b_i = H(strxor(b_0, b_(i - 1)) || I2OSP(i, 1) || DST_prime)
        let mut hasher = D::new();
        hasher.update(
            b_0.iter()
                .zip(b_i.iter())
                .map(|(&x1, &x2)| x1 ^ x2)
                .collect::<Vec<u8>>(),
        );
        hasher.update([i as u8]);
        hasher.update(&dst_prime);
        b_i = hasher.finalize();
        uniform_bytes.extend_from_slice(&b_i);
    }

    uniform_bytes.truncate(len_in_bytes);
    Ok(uniform_bytes)
}
