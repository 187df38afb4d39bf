// src/web/bearer.rs
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use tracing::warn;

use super::types::ServerConfig;

/// Request carried the sandbox server's bearer token
pub struct BearerAuth {
    pub token: String,
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    Misconfigured,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token required",
            AuthError::InvalidToken => "Invalid or expired authorization token",
            AuthError::Misconfigured => "Server configuration missing",
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerAuth {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<ServerConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error((status, _)) => return Outcome::Error((status, AuthError::Misconfigured)),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        match req.headers().get_one("Authorization") {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header[7..].trim();
                if token == config.api_token {
                    Outcome::Success(BearerAuth {
                        token: token.to_string(),
                    })
                } else {
                    warn!("Rejected bearer token on {}", req.uri());
                    Outcome::Error((Status::Unauthorized, AuthError::InvalidToken))
                }
            }
            Some(_) => {
                warn!("Invalid Authorization header format");
                Outcome::Error((Status::Unauthorized, AuthError::InvalidToken))
            }
            None => Outcome::Error((Status::Unauthorized, AuthError::MissingToken)),
        }
    }
}
