// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Byte-level serialization primitives: integer encodings and
//! length-prefixed vectors

use crate::errors::ProtocolError;

/// Computes I2OSP(n, length): the big-endian encoding of `n` over exactly
/// `length` bytes. Fails if `n` does not fit.
pub(crate) fn i2osp(n: usize, length: usize) -> Result<Vec<u8>, ProtocolError> {
    const SIZEOF_USIZE: usize = core::mem::size_of::<usize>();
    if length > SIZEOF_USIZE || (length < SIZEOF_USIZE && n >= (1 << (8 * length))) {
        return Err(ProtocolError::InvalidEncoding);
    }
    Ok(n.to_be_bytes()[SIZEOF_USIZE - length..].to_vec())
}

/// Computes OS2IP(b): the integer read from a big-endian byte string.
pub(crate) fn os2ip(bytes: &[u8]) -> Result<usize, ProtocolError> {
    if bytes.len() > core::mem::size_of::<usize>() {
        return Err(ProtocolError::InvalidEncoding);
    }
    let mut buf = [0u8; core::mem::size_of::<usize>()];
    buf[core::mem::size_of::<usize>() - bytes.len()..].copy_from_slice(bytes);
    Ok(usize::from_be_bytes(buf))
}

/// Prepends the length of `input` over `len_bytes` bytes, big-endian.
/// `len_bytes` is 1 or 2 everywhere on the wire.
pub(crate) fn serialize(input: &[u8], len_bytes: usize) -> Result<Vec<u8>, ProtocolError> {
    Ok([&i2osp(input.len(), len_bytes)?, input].concat())
}

/// Splits a length-prefixed vector off the front of `input`, returning the
/// body and the remainder. Fails on truncation.
pub(crate) fn tokenize(input: &[u8], len_bytes: usize) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    if input.len() < len_bytes {
        return Err(ProtocolError::InvalidLength {
            name: "vector_length_prefix",
            len: len_bytes,
            actual_len: input.len(),
        });
    }

    let size = os2ip(&input[..len_bytes])?;
    if len_bytes + size > input.len() {
        return Err(ProtocolError::InvalidLength {
            name: "vector_body",
            len: size,
            actual_len: input.len() - len_bytes,
        });
    }

    Ok((
        input[len_bytes..len_bytes + size].to_vec(),
        input[len_bytes + size..].to_vec(),
    ))
}

/// Constant-time-agnostic XOR of two equal-length byte strings. Callers
/// guarantee matching lengths.
pub(crate) fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&x1, &x2)| x1 ^ x2).collect()
}
