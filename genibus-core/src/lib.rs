//! Core types and utilities for the GENIBus protocol
//!
//! This crate provides the closed protocol vocabulary (APDU classes, operation
//! specifiers, acknowledgements, the class capability matrix), the 1-byte bus
//! address type, byte helpers and the error taxonomy shared by every layer.

pub mod address;
pub mod byteops;
pub mod constants;
pub mod error;
pub mod items;

pub use address::Address;
pub use constants::{Access, Ack, ApduClass, Operation, StartDelimiter, ValueFormat};
pub use error::{FrameError, GeniError, GeniResult, ValidationError};
