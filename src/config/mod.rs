//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! proxy options (TOML file or code)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → settings.rs (layer over host defaults, pick resolver, check TLS)
//!     → ProxySettings (validated, immutable)
//!     → shared via Arc with the handler
//! ```
//!
//! # Design Decisions
//! - Invalid combinations fail at setup, never per request
//! - All fields are optional so plugin defaults can be layered underneath
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    handler_defaults, BindContext, MaxSockets, PayloadOutput, PayloadSettings, Protocol,
    ProxyOptions, Redirects, RouteSettings, TtlMode,
};
pub use settings::ProxySettings;
pub use validation::ValidationError;
