//! # Scanner Kit
//!
//! Device-side pieces of the attendance check-in flow. A check-in device (a
//! student's phone, a lecture-hall tablet) lives with connectivity that comes
//! and goes; this crate makes that safe without moving any authority onto the
//! device.
//!
//! ## Key Concepts
//! - **Capture**: a scanned QR payload is decoded and either submitted live
//!   or stored as an offline intent, decided by a connectivity probe.
//! - **Offline queue**: a durable JSON file of captured intents that survives
//!   process restarts; nothing is lost between scan and sync.
//! - **Reconcile**: once connectivity returns, queued intents replay through
//!   the same server admission path a live scan uses, original scan time
//!   attached. The server stays the sole arbiter of duplicates and expiry;
//!   the kit never pre-judges a check-in it can still deliver.

pub mod api;
pub mod error;
pub mod queue;
pub mod reconcile;
