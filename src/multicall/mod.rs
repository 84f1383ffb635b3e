//! Multicall batches
//!
//! Packs N independent calls into one descriptor list plus a shared
//! calldata buffer, and unpacks them again.
//!
//! # Example
//!
//! ```rust
//! use quorum_relay::multicall::{decode, encode, Call};
//!
//! let calls = vec![Call::new(1, 2, vec![8]), Call::new(1, 3, vec![])];
//! let (descriptors, calldata) = encode(&calls);
//! assert_eq!(decode(&descriptors, &calldata).unwrap(), calls);
//! ```

pub mod codec;

pub use codec::{decode, encode, Call, CallDescriptor, MulticallError};
