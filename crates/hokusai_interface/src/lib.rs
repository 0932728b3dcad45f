//! Trait definitions for the Hokusai generative backend.
//!
//! This crate provides the driver trait that decouples the fidelity
//! pipeline from any concrete model provider.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::HokusaiDriver;
