//! Login, broker callback and onboarding endpoints

use crate::errors::AuthError;
use crate::matcher::MatchOutcome;
use crate::models::OnboardingSubmission;
use crate::openapi::ACCOUNT_TAG;
use crate::session::{random_token, Session, SessionData};
use crate::state::AppState;
use crate::tokens::TokenPurpose;
use axum::{
    extract::{rejection::FormRejection, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SignedCookieJar};
use http::{header::LOCATION, StatusCode};
use log::{debug, info, warn};
use serde::Deserialize;
use utoipa::IntoParams;

/// Script-readable cookie holding the pending identity's display name
pub const PENDING_NAME_COOKIE: &str = "gaia_n";

const LOGIN_STATE_BYTES: usize = 16;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct AuthenticateQuery {
    /// Anti-CSRF state issued by `/login`
    state: Option<String>,
    /// Authorization code
    code: Option<String>,
}

/// Starts a login attempt and sends the browser to the broker
#[utoipa::path(
    get,
    path = "/login",
    tag = ACCOUNT_TAG,
    responses(
        (status = 303, description = "Redirect to the broker's authorize endpoint"),
        (status = 500, description = "Session store failure")
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let login_state = random_token(LOGIN_STATE_BYTES);
    let jar = state
        .sessions
        .rotate(
            jar,
            &SessionData::LoginStarted {
                state: login_state.clone(),
            },
        )
        .await?;
    let authorize_url = state.broker.authorize_url(&login_state);
    Ok((jar, Redirect::to(authorize_url.as_str())))
}

/// Broker callback: exchanges the code and resolves the identity
#[utoipa::path(
    get,
    path = "/authenticate",
    tag = ACCOUNT_TAG,
    params(AuthenticateQuery),
    responses(
        (status = 302, description = "Identity matched, redirect to the dashboard"),
        (status = 307, description = "Identity unknown, redirect to onboarding"),
        (status = 400, description = "State mismatch or missing code", body = String),
        (status = 500, description = "Broker or matcher failure", body = String)
    )
)]
pub(crate) async fn authenticate(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    cookies: CookieJar,
    Query(query): Query<AuthenticateQuery>,
) -> Result<Response, AuthError> {
    let session = state.sessions.load(&jar).await?;
    let session_id = match (session, query.state.as_deref()) {
        (
            Some(Session {
                id,
                data: SessionData::LoginStarted { state: expected },
            }),
            Some(returned),
        ) if !expected.is_empty() && expected == returned => id,
        _ => return Err(AuthError::StateMismatch),
    };
    // A login state is good for one callback only
    state.sessions.remove(&session_id).await?;

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or(AuthError::MissingCode)?;
    let tokens = state
        .broker
        .exchange_code(&code)
        .await
        .map_err(AuthError::BrokerExchange)?;
    let identity = state
        .broker
        .fetch_user_info(&tokens.access_token)
        .await
        .map_err(AuthError::BrokerUserInfo)?;

    match state.matcher.match_identity(&identity, None).await? {
        MatchOutcome::Matched(local) => {
            let jar = confirm(&state, jar, &local.gaia_id).await?;
            info!("Login completed for a matched identity");
            Ok((
                StatusCode::FOUND,
                jar,
                [(LOCATION, state.config.redirect.post_login.clone())],
            )
                .into_response())
        }
        MatchOutcome::NotFound => {
            debug!("Identity {} needs onboarding", identity.id);
            let name_cookie = Cookie::build((PENDING_NAME_COOKIE, identity.name.clone()))
                .path("/")
                .max_age(time::Duration::hours(1))
                .http_only(false)
                .build();
            let jar = state
                .sessions
                .save(jar, &SessionData::Pending { identity })
                .await?;
            Ok((
                jar,
                cookies.add(name_cookie),
                Redirect::temporary(&state.config.redirect.onboarding),
            )
                .into_response())
        }
    }
}

/// Completes a pending login with the address the user typed in
#[utoipa::path(
    post,
    path = "/onboarding",
    tag = ACCOUNT_TAG,
    request_body(
        content = OnboardingSubmission,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 303, description = "Identity matched, redirect to the dashboard"),
        (status = 400, description = "Form is incomplete or unreadable", body = String),
        (status = 500, description = "Session integrity violation or matcher failure", body = String)
    )
)]
pub(crate) async fn onboarding(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    cookies: CookieJar,
    form: Result<Form<OnboardingSubmission>, FormRejection>,
) -> Response {
    let submission = form
        .map(|Form(submission)| submission)
        .map_err(|rejection| AuthError::OnboardingFormInvalid(rejection.body_text()));

    let session = match state.sessions.load(&jar).await {
        Ok(session) => session,
        Err(err) => return AuthError::from(err).into_response(),
    };

    match complete_onboarding(&state, jar, session.as_ref(), &cookies, submission).await {
        Ok(jar) => {
            info!("Onboarding completed");
            (
                jar,
                cookies.remove(name_cookie_removal()),
                Redirect::to(&state.config.redirect.post_login),
            )
                .into_response()
        }
        Err(err) => {
            if let Some(Session {
                id,
                data: SessionData::Pending { .. },
            }) = &session
            {
                if let Err(e) = state.sessions.remove(id).await {
                    warn!("Failed to clear pending session: {}", e);
                }
            }
            (cookies.remove(name_cookie_removal()), err).into_response()
        }
    }
}

async fn complete_onboarding(
    state: &AppState,
    jar: SignedCookieJar,
    session: Option<&Session>,
    cookies: &CookieJar,
    submission: Result<OnboardingSubmission, AuthError>,
) -> Result<SignedCookieJar, AuthError> {
    let submission = submission?;
    if !submission.is_complete() {
        return Err(AuthError::OnboardingIncomplete);
    }

    let identity = match session {
        Some(Session {
            data: SessionData::Pending { identity },
            ..
        }) => identity,
        _ => return Err(AuthError::OnboardingSessionInvalid),
    };

    let shown_name = cookies.get(PENDING_NAME_COOKIE).map(|cookie| cookie.value());
    if shown_name != Some(identity.name.as_str()) {
        warn!("Onboarding name cookie does not match the pending identity");
        return Err(AuthError::OnboardingTamperDetected);
    }

    match state
        .matcher
        .match_identity(identity, Some(&submission))
        .await?
    {
        MatchOutcome::Matched(local) => confirm(state, jar, &local.gaia_id).await,
        MatchOutcome::NotFound => Err(AuthError::OnboardingMatchFailed),
    }
}

/// Issues the full-access token for `local_id` and stores it under a new session id
async fn confirm(
    state: &AppState,
    jar: SignedCookieJar,
    local_id: &str,
) -> Result<SignedCookieJar, AuthError> {
    let token = state
        .tokens
        .issue(TokenPurpose::FullAccess, local_id)
        .map_err(AuthError::TokenIssue)?;
    Ok(state
        .sessions
        .rotate(jar, &SessionData::Confirmed { token })
        .await?)
}

fn name_cookie_removal() -> Cookie<'static> {
    Cookie::build(PENDING_NAME_COOKIE).path("/").build()
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/authenticate", get(authenticate))
        .route("/onboarding", post(onboarding))
}
