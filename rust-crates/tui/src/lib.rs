pub mod character;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod state;
pub mod ui;
pub mod wallets;
