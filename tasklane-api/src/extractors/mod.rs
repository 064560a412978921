//! Custom request extractors.

mod actor;

pub use actor::{Actor, ActorExtractor, USER_ID_HEADER};
