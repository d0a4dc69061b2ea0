//! Business methods exposed over RPC

pub mod calculator;
