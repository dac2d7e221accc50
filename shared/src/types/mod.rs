//! Query job request and snapshot types

pub mod query;
pub mod result;
