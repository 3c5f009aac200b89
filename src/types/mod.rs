//! Decaf type domain

mod type_system;

pub use type_system::Type;
