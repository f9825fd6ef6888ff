//! Gateway implementations

mod builder;
mod space;

pub use builder::{Heimdall, HeimdallBuilder};
pub use space::SpaceGateway;
