//! Rotor - multi-chain micro arbitrage with Thompson Sampling chain rotation
//!
//! Leaves first:
//! - `chains`, `routes`: static chain and route catalogues
//! - `simulator`, `gas_oracle`, `executor`, `store`: collaborators behind traits
//! - `brain`: scanner, validator and the chain-selecting bandit
//! - `worker`: one chain's scan → validate → execute → record tick
//! - `controller`: the single loop tying the bandit to the workers

pub mod brain;
pub mod chains;
pub mod config;
pub mod controller;
pub mod executor;
pub mod gas_oracle;
pub mod routes;
pub mod rpc;
pub mod simulator;
pub mod store;
pub mod worker;

#[cfg(test)]
mod test_support;
