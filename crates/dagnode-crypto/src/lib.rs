//! Cryptographic primitives for dagnode.
//!
//! Provides the digest functions behind content identifiers and the Ed25519
//! key pairs held by the keystore.
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod keys;

pub use hasher::{ContentHasher, HasherError};
pub use keys::{KeyError, KeyPair, PublicKey};
