//! flux-capture library
//!
//! Durable, arrival-ordered storage for data collected by the browser
//! extension. Producers hand events to a [`capture::CaptureStore`]; a single
//! writer appends accepted payloads to the `fluxCollections` collection.

pub mod capture;
pub mod config;
