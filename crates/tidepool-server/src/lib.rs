//! Tidepool server core — chat state and coordination, no network code.
//!
//! The gateway crate owns the transport; everything here is driven through
//! [`chat::coordinator::CoordinatorHandle`].

pub mod chat;
