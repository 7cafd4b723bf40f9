//! lotlab core — single-asset backtesting engine.
//!
//! This crate contains:
//! - Domain types (bars, actions, ledger rows, run ids)
//! - Signal-driven stock engine with T0/T1/T2 settlement and lot sizing
//! - Buy-and-hold benchmark tracking
//! - Ledger finalization with step and cumulative returns
//! - FIFO lot allocation under a minimum holding period
//! - Vectorized PnL and fee accounting for stock and derivatives positions
//! - The `Strategy` trait and signal construction helpers

pub mod accounting;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod ledger;
pub mod lots;
pub mod strategy;

pub use error::EngineError;
