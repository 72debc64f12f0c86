//! Authentication for Grove
//!
//! Provides:
//! - JWT token generation and validation
//! - Bearer / `x-auth-token` extraction
//! - The identity gate every profile operation passes through

pub mod gate;
pub mod jwt;

pub use gate::{authenticate, Identity};
pub use jwt::{
    extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult, UserClaim,
};
