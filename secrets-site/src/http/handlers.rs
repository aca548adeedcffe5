use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::FormRejection;
use axum::extract::{Query, Request, State};
use axum::http::HeaderName;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::accounts::{AccountError, Registration};
use crate::serve_files::serve_inline;

use super::auth::{end_session, require_user, resolve_session, start_session};
use super::error::AppError;
use super::flash::{set_flash, take_flash};
use super::state::AppState;
use super::views::{self, GATED_PATH};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub const DUPLICATE_EMAIL_MESSAGE: &str =
    "You already signed up with that email. Log in instead!";
pub const UNKNOWN_EMAIL_MESSAGE: &str = "That email does not exist, please try again.";
pub const BAD_PASSWORD_MESSAGE: &str = "Password incorrect, please try again.";

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub users: i64,
}

pub fn router(state: AppState) -> anyhow::Result<Router> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(20)
            .burst_size(50)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .context("invalid rate limit configuration")?,
    );

    Ok(Router::new()
        .route("/", get(home))
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/secrets", get(secrets))
        .route("/logout", get(logout))
        .route("/download", get(download))
        .route("/health", get(health))
        .layer(GovernorLayer::new(governor_conf))
        // Outermost last: the id is set first, traced, then copied onto the response.
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            REQUEST_ID_HEADER,
            MakeRequestUuid::default(),
        ))
        .with_state(state))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let users = state.accounts.users().count().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        users,
    }))
}

async fn home(State(state): State<AppState>, jar: SignedCookieJar) -> impl IntoResponse {
    let signed_in = resolve_session(&state, &jar).await.is_authenticated();
    let (jar, flash) = take_flash(jar);
    (jar, Html(views::render_home(signed_in, flash.as_deref())))
}

async fn register_page(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    if resolve_session(&state, &jar).await.is_authenticated() {
        return Redirect::to(GATED_PATH).into_response();
    }
    let (jar, flash) = take_flash(jar);
    (jar, Html(views::render_register(flash.as_deref()))).into_response()
}

/// Creates the account and shows the confirmation page. The new user is not
/// signed in; they still have to log in.
async fn register(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Result<Response, AppError> {
    if resolve_session(&state, &jar).await.is_authenticated() {
        return Ok(Redirect::to(GATED_PATH).into_response());
    }
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let registration = Registration {
        name: form.name,
        email: form.email,
        password: form.password,
    };

    match state.accounts.register(registration).await {
        Ok(user) => Ok(Html(views::render_secrets(&user.name, false)).into_response()),
        Err(AccountError::DuplicateEmail) => Ok((
            set_flash(jar, DUPLICATE_EMAIL_MESSAGE),
            Redirect::to(&views::login_url(None)),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: SignedCookieJar,
) -> Response {
    if resolve_session(&state, &jar).await.is_authenticated() {
        return Redirect::to(GATED_PATH).into_response();
    }
    let (jar, flash) = take_flash(jar);
    let page = views::render_login(flash.as_deref(), query.next.as_deref());
    (jar, Html(page)).into_response()
}

async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: SignedCookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    if resolve_session(&state, &jar).await.is_authenticated() {
        return Ok(Redirect::to(GATED_PATH).into_response());
    }
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let next = query.next.as_deref();
    match state.accounts.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            let destination = views::safe_next(next);
            debug!(user_id = user.id, destination, "session established");
            let jar = start_session(&state, jar, &user);
            Ok((jar, Redirect::to(destination)).into_response())
        }
        Err(AccountError::UnknownAccount) => {
            let page = views::render_login(Some(UNKNOWN_EMAIL_MESSAGE), next);
            Ok((jar, Html(page)).into_response())
        }
        Err(AccountError::BadCredentials) => Ok((
            set_flash(jar, BAD_PASSWORD_MESSAGE),
            Redirect::to(&views::login_url(next)),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

async fn secrets(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Html<String>, AppError> {
    let user = require_user(&state, &jar, GATED_PATH).await?;
    Ok(Html(views::render_secrets(&user.name, true)))
}

async fn logout(jar: SignedCookieJar) -> impl IntoResponse {
    (end_session(jar), Redirect::to("/"))
}

async fn download(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    request: Request,
) -> Result<Response, AppError> {
    let user = require_user(&state, &jar, "/download").await?;

    let path = state.static_dir.join(&state.download_file);
    let response = serve_inline(&path, request).await?;
    info!(
        user_id = user.id,
        path = %state.download_file.display(),
        status = %response.status(),
        "download served"
    );
    Ok(response)
}
