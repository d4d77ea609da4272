//! Pure bookkeeping state for the Carelink chat client.
//!
//! Everything in this crate is sans-io: plain values mutated by the session
//! layer, with no transport or backend dependencies. The session confines all
//! mutation to a single task, so none of these types carry locks.
//!
//! # Components
//!
//! - [`SubscriptionRegistry`]: at-most-one live subscription per destination
//! - [`UnseenCounterStore`]: server snapshot merged with live increments
//! - [`ChatDirectory`]: the chats the user belongs to, replaced wholesale

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod directory;
mod registry;
mod unseen;

pub use directory::ChatDirectory;
pub use registry::{SubscriptionHandle, SubscriptionRegistry};
pub use unseen::UnseenCounterStore;
