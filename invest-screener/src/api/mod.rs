//! Backend API access.

pub mod auth;
pub mod client;
pub mod error;
pub mod screener;

pub use auth::{AuthService, LoginResponse, RegisterRequest, RegisteredUser, User};
pub use client::{Anonymous, ApiClient, AuthProvider, TRACE_ID_HEADER};
pub use error::ApiError;
pub use screener::{HttpScreeningService, ScreeningService};
