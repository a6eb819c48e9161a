pub mod bindings; // Solidity interfaces (ERC-20, WPHRS, position manager, router)
pub mod evm;      // Alloy chain client


pub use evm::{EvmChainClient, EvmClientConfig};
