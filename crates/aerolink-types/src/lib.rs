//! Core types for the aerolink SDK.
//!
//! This crate is the leaf of the aerolink workspace. It provides the
//! identifier newtypes, the parameter value model, and the unified
//! error-code interface shared by every other crate:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  aerolink-session  : scheduler, cache, transport     │
//! ├──────────────────────────────────────────────────────┤
//! │  aerolink-expect   : expectation combinator algebra  │
//! ├──────────────────────────────────────────────────────┤
//! │  aerolink-catalog  : message schemas and patterns    │
//! ├──────────────────────────────────────────────────────┤
//! │  aerolink-types    : ids, values, ErrorCode ◄── HERE │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Structure
//!
//! - [`MessageId`], [`TreeId`], [`SendSeq`] - identifiers
//! - [`ParamValue`], [`DEFAULT_FLOAT_TOL`] - parameter values with
//!   normalized comparison
//! - [`Policy`] - check / wait / check_wait satisfaction policies
//! - [`ErrorCode`] - machine-readable error codes

mod error;
mod id;
mod policy;
mod value;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{MessageId, SendSeq, TreeId};
pub use policy::Policy;
pub use value::{ParamValue, DEFAULT_FLOAT_TOL};
