use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Method, Request, Response, StatusCode, Uri},
    response::IntoResponse,
};
use axum_extra::extract::cookie::SignedCookieJar;
use http::header::{self, HeaderName};
use std::error::Error as StdError;
use url::Url;

use crate::errors::AuthError;
use crate::session::SessionData;
use crate::state::AppState;

/// Headers that describe a single connection and are never forwarded
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Request path resolved the way the origin will read it
#[derive(Debug, PartialEq, Eq)]
struct OriginTarget {
    /// Percent-decoded path the prefix check runs on
    decoded_path: String,
    /// Path without dot segments plus the untouched query
    path_and_query: String,
}

impl OriginTarget {
    fn from_uri(uri: &Uri) -> Result<Self, AuthError> {
        let mut url = Url::parse("http://origin.invalid/").map_err(|_| AuthError::UnsafePath)?;
        // Resolves `..`, `.` and their `%2e` spellings
        url.set_path(uri.path());

        let decoded_path = urlencoding::decode(url.path())
            .map_err(|_| AuthError::UnsafePath)?
            .into_owned();
        // Decoding must not reveal new separators or dot segments
        if decoded_path.contains("//")
            || decoded_path.contains('\\')
            || decoded_path
                .split('/')
                .any(|segment| segment == "." || segment == "..")
        {
            log::warn!("Rejected non-canonical path {}", uri.path());
            return Err(AuthError::UnsafePath);
        }

        let path_and_query = match uri.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok(Self {
            decoded_path,
            path_and_query,
        })
    }
}

/// Gate for every request no route claimed: protected prefixes need a
/// confirmed session, everything else is forwarded unchecked.
pub(super) async fn forward_to_origin(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    req: Request<Body>,
) -> Response<Body> {
    let target = match OriginTarget::from_uri(req.uri()) {
        Ok(target) => target,
        Err(err) => return err.into_response(),
    };
    if state.config.origin.is_protected(&target.decoded_path) {
        if let Err(err) = authorize(&state, &jar).await {
            return err.into_response();
        }
    }
    forward(&state, req, &target.path_and_query).await
}

async fn authorize(state: &AppState, jar: &SignedCookieJar) -> Result<(), AuthError> {
    let session = state
        .sessions
        .load(jar)
        .await?
        .ok_or(AuthError::MissingSession)?;

    let token = match session.data {
        SessionData::Confirmed { token } if !token.is_empty() => token,
        _ => return Err(AuthError::MissingToken),
    };

    if state
        .tokens
        .verify(&token)
        .map_err(AuthError::MalformedToken)?
    {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}

async fn forward(state: &AppState, req: Request<Body>, path_and_query: &str) -> Response<Body> {
    let method = match *req.method() {
        Method::CONNECT | Method::TRACE => {
            log::error!("Unsupported HTTP method: {}", req.method());
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                format!("Unsupported HTTP method: {}", req.method()),
            )
                .into_response();
        }
        ref method => method.clone(),
    };

    let url = state.config.origin.get_url(path_and_query);
    log::debug!("Forwarding request to origin: {} {}", method, url);
    let mut req_builder = state.origin_client.request(method, &url);

    for (key, value) in req.headers() {
        if key == header::HOST || key == header::CONTENT_LENGTH || is_hop_by_hop(key) {
            continue;
        }
        req_builder = req_builder.header(key, value);
    }

    let body_bytes = match to_bytes(req.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::BAD_GATEWAY, "Failed to read request body").into_response(),
    };
    if !body_bytes.is_empty() {
        req_builder = req_builder.body(body_bytes);
    }

    match req_builder.send().await {
        Ok(response) => {
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::error!("Failed to read origin response body: {}", e);
                    return (
                        StatusCode::BAD_GATEWAY,
                        format!("Failed to read response body: {}", e),
                    )
                        .into_response();
                }
            };

            let mut resp = Response::new(Body::from(bytes));
            *resp.status_mut() = status;
            for (key, value) in headers.iter() {
                if !is_hop_by_hop(key) {
                    resp.headers_mut().append(key.clone(), value.clone());
                }
            }
            resp
        }
        Err(e) => {
            log::error!(
                "Failed to forward request to {}: {} (source: {:?})",
                url,
                e,
                e.source()
            );

            let error_message = if e.is_timeout() {
                format!("Request timed out while connecting to origin server: {}", e)
            } else if e.is_connect() {
                format!("Connection error occurred while connecting to origin server: {}", e)
            } else {
                format!("Failed to send request: {}", e)
            };
            (StatusCode::BAD_GATEWAY, error_message).into_response()
        }
    }
}
