//! Mensa Gateway - HTTP runtime for the menu dialogue engine
//!
//! The gateway owns everything the core leaves to its surroundings: the
//! session store, provider client configuration, the HTTP surface and the
//! periodic sweep of idle sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Mensa Gateway                   │
//! ├──────────────────────────────────────────────────┤
//! │   POST /turn   DELETE /sessions/:id   GET /status│
//! │        │               │                         │
//! │  ┌─────▼───────────────▼─────┐   ┌────────────┐  │
//! │  │      DialogueEngine       ├──►│ HTTP       │  │
//! │  └─────────────┬─────────────┘   │ provider   │  │
//! │                │                 └────────────┘  │
//! │  ┌─────────────▼─────────────┐                   │
//! │  │ SessionStore (+ sweeper)  │                   │
//! │  └───────────────────────────┘                   │
//! └──────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod gateway;

pub use config::{GatewayConfig, ProviderSettings, SessionSettings};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayState, TurnRequest, TurnResponse};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 18790;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";
