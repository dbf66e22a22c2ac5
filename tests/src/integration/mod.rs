//! Integration flows.

pub mod support;

mod gateway_flows;
mod registration;
mod session_flows;
mod sync_flows;
