mod password;
pub use password::{hash_password, verify_password};
mod jwt;
pub use jwt::{TokenKind, UserClaims, generate_token, process_token};
mod error;
pub use error::{CryptError, CryptResult};
pub mod validate;
