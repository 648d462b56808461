//! Caller roles.

pub mod role;

pub use role::UserRole;
