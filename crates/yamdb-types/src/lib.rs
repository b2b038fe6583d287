pub mod claim;
pub mod config;
pub mod general;
pub mod policy;

pub use claim::{Actor, Authorization, Role};
pub use policy::{authorize, Decision, DenyReason, Resource, Verb};
