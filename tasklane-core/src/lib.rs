//! Tasklane Core - Entity Types
//!
//! Pure data structures shared by every other crate: identifiers, enums,
//! entities, composite association keys, and the error taxonomy.
//! This crate contains no I/O.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod keys;

pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use keys::*;
