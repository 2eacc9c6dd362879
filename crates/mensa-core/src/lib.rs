//! Mensa Core - Dialogue and retrieval engine for canteen menu conversations
//!
//! Mensa Core answers "what's on the menu" across several turns. It resolves
//! canteen and date slots from loose user input, fetches and parses the
//! provider's daily menu, caches it per session and walks the user through
//! the menu categories.
//!
//! # Architecture
//!
//! ```text
//!   TurnInput (intent + entities)
//!          │
//!  ┌───────▼────────┐   checkout/put   ┌───────────────┐
//!  │ DialogueEngine │◄────────────────►│ SessionStore  │
//!  └──┬──────┬──────┘                  └───────────────┘
//!     │      │ cache miss
//!     │  ┌───▼──────────┐   raw HTML   ┌───────────────┐
//!     │  │ MenuFetcher  ├─────────────►│  MenuParser   │
//!     │  └──────────────┘              └───────────────┘
//!  ┌──▼───────────────┐
//!  │ CanteenRegistry  │  DateResolver
//!  └──────────────────┘
//!          │
//!   TurnOutcome (session + responses)
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mensa_core::{DialogueEngine, HttpMenuFetcher, SessionId, SessionStore, TurnInput};
//!
//! # async fn run() -> mensa_core::Result<()> {
//! let fetcher = HttpMenuFetcher::with_defaults()?;
//! let engine = DialogueEngine::new(Arc::new(fetcher));
//! let store = SessionStore::default();
//! let session = SessionId::new();
//! let today = chrono::Local::now().date_naive();
//!
//! let outcome = engine
//!     .process_turn(&store, &session, &TurnInput::new("ask_menu").with_canteen("vegan"), today)
//!     .await;
//! for line in outcome.rendered() {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod annotations;
pub mod canteen;
pub mod date;
pub mod dialogue;
pub mod error;
pub mod fetcher;
pub mod menu;
pub mod parser;
pub mod session;

// Re-export commonly used types for convenience
pub use canteen::{Canteen, CanteenId, CanteenRegistry};
pub use date::DateResolver;
pub use dialogue::{DialogueEngine, Entities, Intent, Response, TurnInput, TurnOutcome};
pub use error::{
    FetchError, FetchErrorKind, MensaError, ParseError, ResolveError, Result, ResultExt,
};
pub use fetcher::{HttpMenuFetcher, MenuFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_PROVIDER_URL};
pub use menu::{Category, Menu, MenuItem, MenuQuery, PriceTier};
pub use parser::MenuParser;
pub use session::{DialogueState, Session, SessionId, SessionLease, SessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
