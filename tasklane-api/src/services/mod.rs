//! Service Layer
//!
//! Business rules shared by several route modules, kept out of the
//! handlers and the response types.

mod membership;

pub use membership::*;
