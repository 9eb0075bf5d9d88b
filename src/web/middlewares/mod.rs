mod auth;
pub use auth::{AUTH_HEADER_SCHEME, extract_context_fn};
