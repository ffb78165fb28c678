//! Chain state identifier resolution.
//!
//! Resolution order: keyword (`head`, `genesis`, `finalized`, `justified`),
//! then a `0x` 32-byte state root looked up in the head state's bounded
//! root history, then a decimal slot no later than the head slot.

pub mod resolver;

pub use crate::ports::{ChainStateProvider, StateSnapshot};
pub use resolver::{StateFetchError, StateId, StateResolver};
