//! Caller identity propagated by the upstream gateway.
//!
//! Authentication itself is owned elsewhere; this service only consumes
//! the resolved role and email from trusted headers, the same way tenant
//! context travels between the platform services.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Response,
};

pub const CALLER_ROLE_HEADER: &str = "x-caller-role";
pub const CALLER_EMAIL_HEADER: &str = "x-caller-email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRole {
    Admin,
    Teacher,
    /// Self-service: visibility restricted to the caller's own records.
    Student,
}

impl CallerRole {
    /// Parse a role header value. Unrecognized values get the most
    /// restricted role; only the absence of the header implies a
    /// trusted internal caller.
    pub fn from_header(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "admin" => CallerRole::Admin,
            "teacher" => CallerRole::Teacher,
            _ => CallerRole::Student,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub role: CallerRole,
    pub email: Option<String>,
}

impl CallerIdentity {
    pub fn is_self_service(&self) -> bool {
        self.role == CallerRole::Student
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = parts
            .headers
            .get(CALLER_ROLE_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(CallerRole::from_header)
            .unwrap_or(CallerRole::Admin);

        let email = parts
            .headers
            .get(CALLER_EMAIL_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(CallerIdentity { role, email })
    }
}
