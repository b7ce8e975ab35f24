// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A list of error types which are produced during an execution of the protocol

use displaydoc::Display;
use thiserror::Error;

/// Represents an error occurring during protocol execution
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ProtocolError {
    /// Invalid length for {name}: expected {len}, but is actually {actual_len}.
    InvalidLength {
        /// name of the checked field
        name: &'static str,
        /// expected length
        len: usize,
        /// actual length
        actual_len: usize,
    },
    /// Could not decode a group element or scalar.
    InvalidEncoding,
    /// Error in validating credentials.
    InvalidCredentials,
    /// Protocol message or operation out of sequence.
    InvalidState,
    /// Unsupported or inconsistent configuration identifier.
    InvalidConfiguration,
}

pub(crate) mod utils {
    use super::*;

    pub fn check_slice_size<'a>(
        slice: &'a [u8],
        expected_len: usize,
        arg_name: &'static str,
    ) -> Result<&'a [u8], ProtocolError> {
        if slice.len() != expected_len {
            return Err(ProtocolError::InvalidLength {
                name: arg_name,
                len: expected_len,
                actual_len: slice.len(),
            });
        }
        Ok(slice)
    }

    pub fn check_slice_size_atleast<'a>(
        slice: &'a [u8],
        expected_len: usize,
        arg_name: &'static str,
    ) -> Result<&'a [u8], ProtocolError> {
        if slice.len() < expected_len {
            return Err(ProtocolError::InvalidLength {
                name: arg_name,
                len: expected_len,
                actual_len: slice.len(),
            });
        }
        Ok(slice)
    }
}
