//! Contract bindings for the token contracts the explorer talks to.
//!
//! Bindings are generated using alloy's `sol!` macro.

pub mod token;
