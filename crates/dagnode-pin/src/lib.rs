//! Pin set and retention verification for dagnode.
//!
//! A pin keeps an object from being collected. Direct pins retain one object;
//! recursive pins retain an object and everything its links reach. Only
//! direct and recursive entries are stored. Indirect pins are derived on
//! demand by walking the closure of each recursive root against the current
//! node store, so they never go stale after a mutation.
//!
//! # Key Types
//!
//! - [`PinSet`] / [`Pinner`] -- add, remove, update, and list pins
//! - [`PinStorage`] -- durable entry set ([`InMemoryPinStorage`], [`FilePinStorage`])
//! - [`Verifier`] / [`PinVerifier`] -- stream of [`PinStatus`] records over a bounded channel
//!
//! # Design Rules
//!
//! 1. An identifier appears at most once among direct and recursive entries.
//! 2. Mutations are serialized and persisted before they become visible.
//! 3. A recursive add validates the whole closure and pins nothing on failure.
//! 4. Update swaps roots without traversing either closure.
//! 5. Verification never fails as a whole because one node is bad.

pub mod error;
pub mod pinner;
pub mod storage;
pub mod types;
pub mod verify;

pub use error::{PinError, PinResult};
pub use pinner::{PinSet, Pinner};
pub use storage::{FilePinStorage, InMemoryPinStorage, PinMap, PinStorage};
pub use types::{
    PinAddOptions, PinEntry, PinKind, PinLsOptions, PinStatus, PinType, PinUpdateOptions,
};
pub use verify::{PinStatusStream, PinVerifier, Verifier, DEFAULT_CHANNEL_CAPACITY};
