//! # Adapters Layer
//!
//! Implementations of the wallet and contract ports.

mod abi;
mod json_rpc_contracts;
mod json_rpc_wallet;
mod memory_chain;
mod memory_wallet;
mod rpc;

pub use json_rpc_contracts::{JsonRpcConnector, JsonRpcContracts, JsonRpcContractsConfig};
pub use json_rpc_wallet::{JsonRpcWallet, JsonRpcWalletConfig};
pub use memory_chain::{ChainView, InMemoryChain, ReadFault};
pub use memory_wallet::{InMemoryWallet, WalletCall};
