pub mod chain_data;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod deployment;
pub mod models;
pub mod revoke;
pub mod risk;
pub mod rpc;
pub mod scanner;

#[cfg(test)]
pub(crate) mod testing;
