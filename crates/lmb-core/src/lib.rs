//! Core domain + application logic for the caption relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `ChatPlatform` and `MessagingPort` ports implemented in the adapter crate.

pub mod caption;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod index;
pub mod links;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod relay;
pub mod run;
pub mod scan;
pub mod security;
pub mod state;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
