//! Configuration types for the token explorer.
//!
//! This crate provides:
//! - Network presets (mainnet, Sepolia, local node)
//! - A registry of networks the wallet may switch between
//! - Block explorer links for observed transactions

pub mod network;

pub use network::{
    NetworkConfig, NetworkConfigBuilder, NetworkRegistry, NetworkType, UnknownNetwork,
    SEPOLIA_CHAIN_ID,
};
