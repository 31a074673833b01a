//! Client for the Fizzle design API: the streaming chat endpoint and the
//! one-shot generate endpoint.

pub mod client;
pub mod config;
pub mod error;

pub use client::{ChatClient, abortable, parse_generate_response, read_reply};
pub use config::{ApiConfig, Timeouts};
pub use error::AiError;
pub use futures::future::{AbortHandle, AbortRegistration};
