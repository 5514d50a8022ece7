//! Shared types for the adm workspace

mod json;
mod secret;

pub use json::to_pretty_json;
pub use secret::Secret;
