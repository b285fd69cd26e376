use crate::config::GatewayConfig;
use crate::create_app;
use crate::session::{cookie_key, SessionData, SessionStore, SESSION_COOKIE};
use crate::state::AppState;
use axum::body::{Body, Bytes};
use axum::response::IntoResponse;
use axum::Router;
use axum_extra::extract::cookie::SignedCookieJar;
use http::header::{COOKIE, LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

/// Test fixture for driving the gateway router against mocked upstreams.
///
/// Three wiremock servers stand in for the broker, the identity matcher and
/// the origin. Requests go through the real router with `oneshot`, so cookies
/// have to be carried between calls by the test (see [`TestResponse::cookie`]).
///
/// ```rust
/// let fixture = TestFixture::new().await;
/// fixture.mock_broker("the-code", "ext-1", "Bruno Latour").await;
/// fixture.mock_matcher(404, json!({})).await;
///
/// let login = fixture.get("/login").await;
/// let session = login.cookie("gaia").unwrap();
/// let state = login.login_state();
/// let response = fixture
///     .get_with_cookies(format!("/authenticate?state={state}&code=the-code"), &[&session])
///     .await;
/// response.assert_status(StatusCode::TEMPORARY_REDIRECT);
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    pub state: AppState,
    pub config: GatewayConfig,
    pub broker_mock: MockServer,
    pub matcher_mock: MockServer,
    pub origin_mock: MockServer,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Creates a fixture after letting `customize` adjust the generated configuration
    pub async fn with_config(customize: impl FnOnce(&mut GatewayConfig)) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let broker_mock = MockServer::start().await;
        let matcher_mock = MockServer::start().await;
        let origin_mock = MockServer::start().await;

        let mut config =
            GatewayConfig::for_test_with_mocks(&broker_mock, &matcher_mock, &origin_mock);
        customize(&mut config);

        let state = AppState::for_testing(&config);
        let app = create_app(state.clone()).await;

        Self {
            app,
            state,
            config,
            broker_mock,
            matcher_mock,
            origin_mock,
        }
    }

    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    pub fn request_builder(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        cookies: &[&str],
    ) -> http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri.as_ref());
        if !cookies.is_empty() {
            builder = builder.header(COOKIE, cookies.join("; "));
        }
        builder
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        self.get_with_cookies(uri, &[]).await
    }

    pub async fn get_with_cookies(&self, uri: impl AsRef<str>, cookies: &[&str]) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri, cookies)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends an url-encoded form
    pub async fn post_form(
        &self,
        uri: impl AsRef<str>,
        form: &[(&str, &str)],
        cookies: &[&str],
    ) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let request = self
            .request_builder(Method::POST, uri, cookies)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Stores `data` as a fresh session and returns the matching `gaia=...` cookie
    pub async fn session_cookie(&self, data: &SessionData) -> String {
        let jar = SignedCookieJar::new(cookie_key(&self.config.session.key));
        let jar = self
            .state
            .sessions
            .save(jar, data)
            .await
            .expect("Failed to save session");
        let response = TestResponse {
            status: StatusCode::OK,
            headers: jar.into_response().headers().clone(),
            body: Bytes::new(),
        };
        response
            .cookie(SESSION_COOKIE)
            .expect("Session cookie was not set")
    }

    /// Reads the server-side record behind a `gaia=...` cookie
    pub async fn session(&self, cookie: &str) -> Option<SessionData> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie.parse().expect("Invalid cookie"));
        let jar = SignedCookieJar::from_headers(&headers, cookie_key(&self.config.session.key));
        self.state
            .sessions
            .load(&jar)
            .await
            .expect("Failed to load session")
            .map(|session| session.data)
    }

    pub fn session_id(&self, cookie: &str) -> Option<String> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie.parse().expect("Invalid cookie"));
        let jar = SignedCookieJar::from_headers(&headers, cookie_key(&self.config.session.key));
        SessionStore::session_id(&jar)
    }

    /// Mounts a successful code exchange and user-info lookup for one identity
    pub async fn mock_broker(&self, code: &str, external_id: &str, name: &str) {
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/op/connect/token"))
            .and(matchers::body_string_contains(format!("code={}", code)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "broker-id-token",
                "access_token": "broker-access-token"
            })))
            .mount(&self.broker_mock)
            .await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/op/connect/userinfo"))
            .and(matchers::header("authorization", "Bearer broker-access-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "mitid.uuid": external_id,
                "mitid.identity_name": name
            })))
            .mount(&self.broker_mock)
            .await;
    }

    /// Mounts a `POST /match` answer on the matcher mock
    pub async fn mock_matcher(&self, status: u16, body: Value) {
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/match"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.matcher_mock)
            .await;
    }
}

/// Response from a test request with access to status, headers and raw body.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(name)
            .unwrap_or_else(|| panic!("Missing header {}", name));
        assert_eq!(actual.to_str().unwrap_or_default(), expected);
        self
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|_| json!({}))
    }

    pub fn location(&self) -> String {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Full `Set-Cookie` header for `name`
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(&prefix))
            .map(str::to_string)
    }

    /// `name=value` pair of a cookie set by this response, ready to be sent back
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookie(name)
            .and_then(|header| header.split(';').next().map(str::to_string))
    }

    /// `state` query parameter of the broker redirect issued by `/login`
    pub fn login_state(&self) -> String {
        let location = url::Url::parse(&self.location()).expect("Location is not a URL");
        location
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("Missing state parameter")
    }
}
