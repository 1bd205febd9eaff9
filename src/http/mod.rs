//! HTTP hosting subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace / request ID / timeout layers)
//!     → ProcessingContext (context path, composed entry point)
//!     → Send to client
//! ```

pub mod server;

pub use server::{HttpServer, ServerError};
