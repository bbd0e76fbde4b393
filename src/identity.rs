// src/identity.rs
//! Request-side identity: the session cookie and the extractor that turns it
//! into the current user.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use http::{header, HeaderMap, HeaderValue};

use crate::error::AppError;
use crate::gate::{authorize, Capability};
use crate::models::User;
use crate::session::SessionToken;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "poll_session";

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    parse_cookie(headers, SESSION_COOKIE)
        .filter(|value| !value.is_empty())
        .map(SessionToken::from)
}

pub fn set_session_cookie(token: &SessionToken, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/{secure}",
        token.as_str()
    ))
    .ok()
}

pub fn clear_session_cookie(secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/{secure}"
    ))
    .ok()
}

/// The user behind the request's session cookie, or `None` for anonymous.
/// Never rejects: a bad or stale cookie simply means anonymous.
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(CurrentUser(None));
        };
        Ok(CurrentUser(state.sessions.resolve(&token).await))
    }
}

/// A user allowed to create polls. Anonymous requests are rejected with the
/// gate's redirect while extracting parts, so the body is never read.
pub struct PollCreator(pub User);

impl FromRequestParts<AppState> for PollCreator {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(user)) => user,
            Err(never) => match never {},
        };
        authorize(user.as_ref(), Capability::CreatePoll)?;
        user.map(PollCreator).ok_or(AppError::Unauthorized)
    }
}
