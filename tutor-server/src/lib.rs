//! REST surface for the Tutor engine.
//!
//! Thin by design: handlers translate HTTP to [`tutor_engine::TutorEngine`]
//! calls and map the error taxonomy to user-facing responses. All policy
//! lives below this crate.

pub mod config;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
