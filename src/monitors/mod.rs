//! Building blocks shared by discovery and monitoring

pub mod liveness;
pub mod probe;
pub mod subnet;
