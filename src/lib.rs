//! Analytics engine and Firestore data access for MacroTrack nutrition logs.
//!
//! The heart of the crate is [`engine`]: a pure, synchronous derivation
//! pass from a raw per-user record (meal entries, weight measurements,
//! profile goals) to everything the dashboard renders: daily aggregates,
//! trailing averages, goal comparisons, the macro split, and the 365-day
//! consistency heatmap.
//!
//! Around it sit the I/O collaborators: [`firestore`] and [`client`] fetch
//! and write the record by opaque user id, and [`pairing`] implements the
//! QR-style device handshake that resolves that id in the first place.

pub mod client;
pub mod engine;
pub mod error;
pub mod firestore;
pub mod models;
pub mod pairing;

pub use client::MacroTrackClient;
pub use engine::derive_dashboard;
pub use error::{PairingError, StoreError};
pub use models::{Dashboard, TimeRange, UserRecord};
