// src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use http::{header, HeaderMap};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, Entity};
use crate::gate::{authorize, Capability, LOGIN_PATH};
use crate::identity::{
    clear_session_cookie, session_token, set_session_cookie, CurrentUser, PollCreator,
};
use crate::models::{CreatePollForm, CredentialsForm, LoginQuery, Poll, VoteForm};
use crate::poll::{self, NewPoll};
use crate::state::AppState;
use crate::vote::{self, OptionIndex};

pub const LOGIN_FAILED_MESSAGE: &str = "Incorrect username or password.";

#[derive(Serialize)]
struct PollView<'a> {
    #[serde(flatten)]
    poll: &'a Poll,
    total_votes: u64,
}

impl<'a> From<&'a Poll> for PollView<'a> {
    fn from(poll: &'a Poll) -> Self {
        PollView {
            poll,
            total_votes: poll.total_votes(),
        }
    }
}

/// List all polls with the current identity
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    authorize(user.as_ref(), Capability::ViewPolls)?;
    let polls = poll::list_polls(state.polls.as_ref()).await?;
    let polls: Vec<PollView> = polls.iter().map(PollView::from).collect();
    Ok(state
        .renderer
        .render("index", json!({ "polls": polls, "user": user })))
}

pub async fn create_form(State(state): State<AppState>, _creator: PollCreator) -> Response {
    state.renderer.render("create", json!({}))
}

/// `PollCreator` runs before `Form`, so anonymous requests are redirected
/// whatever their body looks like.
pub async fn create_poll(
    State(state): State<AppState>,
    PollCreator(user): PollCreator,
    Form(form): Form<CreatePollForm>,
) -> Result<Redirect, AppError> {
    info!(user_id = %user.id, "creating poll");
    let new_poll = NewPoll::from_form(&form.question, &form.options)?;
    poll::create_poll(state.polls.as_ref(), new_poll).await?;
    Ok(Redirect::to("/"))
}

/// Vote on a poll. Anonymous; the selector is validated before anything is touched.
pub async fn vote(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<VoteForm>,
) -> Result<Redirect, AppError> {
    authorize(user.as_ref(), Capability::Vote)?;
    let poll_id = Uuid::parse_str(&id).map_err(|_| AppError::NotFound(Entity::Poll))?;
    let index = OptionIndex::parse(form.option_index.as_deref())?;
    vote::cast_vote(state.polls.as_ref(), poll_id, index).await?;
    Ok(Redirect::to("/"))
}

pub async fn register_form(State(state): State<AppState>) -> Response {
    state.renderer.render("register", json!({}))
}

/// Register, then send the user to log in. A taken username is not revealed.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, AppError> {
    match state.credentials.register(&form.username, &form.password).await {
        Ok(_) => {}
        Err(AppError::DuplicateIdentifier) => {
            info!("registration with existing username ignored");
        }
        Err(e) => return Err(e),
    }
    Ok(Redirect::to(LOGIN_PATH))
}

pub async fn login_form(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Response {
    let message = query.error.map(|_| LOGIN_FAILED_MESSAGE);
    state.renderer.render("login", json!({ "message": message }))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let user = match state.credentials.verify(&form.username, &form.password).await {
        Ok(user) => user,
        Err(e) if e.is_credential_failure() => {
            warn!("login failed");
            return Ok(Redirect::to("/login?error=1").into_response());
        }
        Err(e) => return Err(e),
    };

    if let Some(previous) = session_token(&headers) {
        state.sessions.destroy(&previous);
    }
    let token = state.sessions.create(&user);
    let cookie = set_session_cookie(&token, state.config.cookie_secure)
        .ok_or_else(|| AppError::Internal("session token is not a valid header value".into()))?;

    info!(user_id = %user.id, "login succeeded");
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.destroy(&token);
    }
    let mut response = Redirect::to("/").into_response();
    if let Some(cookie) = clear_session_cookie(state.config.cookie_secure) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

pub async fn healthz() -> &'static str {
    "ok"
}
