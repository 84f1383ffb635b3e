//! Multicall encoding
//!
//! A batch of calls travels as a flat list of descriptors plus one shared
//! calldata buffer. Each descriptor points at its slice of the buffer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Felt;

/// Errors raised while decoding a batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MulticallError {
    #[error("Call {index} spans {offset}..{offset}+{len} past calldata of length {buffer_len}")]
    SpanOutOfBounds {
        index: usize,
        offset: u64,
        len: u64,
        buffer_len: usize,
    },
    #[error("Call {index} starts at offset {found}, expected {expected}")]
    OffsetMismatch {
        index: usize,
        expected: u64,
        found: u64,
    },
    #[error("Calldata has {buffer_len} words but descriptors only cover {used}")]
    TrailingCalldata { used: u64, buffer_len: usize },
}

/// A single call: target, entry point, arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub to: Felt,
    pub selector: Felt,
    pub calldata: Vec<Felt>,
}

impl Call {
    pub fn new(to: Felt, selector: Felt, calldata: Vec<Felt>) -> Self {
        Self {
            to,
            selector,
            calldata,
        }
    }
}

/// Wire form of a call, referencing the shared calldata buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDescriptor {
    pub to: Felt,
    pub selector: Felt,
    pub data_offset: u64,
    pub data_len: u64,
}

/// Pack calls into descriptors and one flat calldata buffer
///
/// Offsets are the running sum of the preceding calls' lengths.
pub fn encode(calls: &[Call]) -> (Vec<CallDescriptor>, Vec<Felt>) {
    let total: usize = calls.iter().map(|c| c.calldata.len()).sum();
    let mut descriptors = Vec::with_capacity(calls.len());
    let mut flat = Vec::with_capacity(total);

    for call in calls {
        descriptors.push(CallDescriptor {
            to: call.to,
            selector: call.selector,
            data_offset: flat.len() as u64,
            data_len: call.calldata.len() as u64,
        });
        flat.extend_from_slice(&call.calldata);
    }

    (descriptors, flat)
}

/// Unpack descriptors and calldata back into calls
///
/// Descriptors must tile the buffer exactly: each offset equals the sum of
/// the previous lengths and together they cover every word.
pub fn decode(descriptors: &[CallDescriptor], calldata: &[Felt]) -> Result<Vec<Call>, MulticallError> {
    let mut calls = Vec::with_capacity(descriptors.len());
    let mut expected_offset = 0u64;

    for (index, desc) in descriptors.iter().enumerate() {
        if desc.data_offset != expected_offset {
            return Err(MulticallError::OffsetMismatch {
                index,
                expected: expected_offset,
                found: desc.data_offset,
            });
        }

        let out_of_bounds = MulticallError::SpanOutOfBounds {
            index,
            offset: desc.data_offset,
            len: desc.data_len,
            buffer_len: calldata.len(),
        };
        let end = desc
            .data_offset
            .checked_add(desc.data_len)
            .ok_or_else(|| out_of_bounds.clone())?;
        if end > calldata.len() as u64 {
            return Err(out_of_bounds);
        }

        let slice = &calldata[desc.data_offset as usize..end as usize];
        calls.push(Call::new(desc.to, desc.selector, slice.to_vec()));
        expected_offset = end;
    }

    if expected_offset != calldata.len() as u64 {
        return Err(MulticallError::TrailingCalldata {
            used: expected_offset,
            buffer_len: calldata.len(),
        });
    }

    Ok(calls)
}
