//! # Ports Layer
//!
//! - [`wallet`]: the local wallet provider (driven)
//! - [`contracts`]: registry, escrow, token, confirmation and handle
//!   construction (driven)

pub mod contracts;
pub mod wallet;

pub use contracts::{
    ContractConnector, ContractEvent, ContractHandles, ContractResult, ContractTopic, Escrow,
    EventSource, Listener, ListenerId, Registry, Token, TxConfirmer, TxReceipt,
};
pub use wallet::{codes, WalletError, WalletEvent, WalletProvider};
