//! Password and token authentication for shoplist.
//!
//! This crate provides:
//! - Argon2 password hashing and verification
//! - HS256 JWT issuance and validation
//! - The registration and login flow over a user repository

mod config;
mod error;
mod password;
mod service;
mod token;

pub use config::TokenConfig;
pub use error::{auth_error_to_status_code, AuthError};
pub use password::{hash_password, validate_password, verify_password, MIN_PASSWORD_LENGTH};
pub use service::{AuthResponse, AuthService, LoginRequest, RegisterRequest};
pub use token::{Claims, TokenService};
