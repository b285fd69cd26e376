//! Full login flows against a running identity matcher

use crate::session::SessionData;
use crate::test_utils::{TestFixture, TestResponse};
use http::StatusCode;
use identity_matcher::config::MatcherServiceConfig;
use wiremock::{matchers, Mock, ResponseTemplate};

const EXTERNAL_ID: &str = "7f1c2a9e-mitid";
const NAME: &str = "Bruno Latour";

/// Serves a fresh identity matcher on an ephemeral port and returns its base url
async fn spawn_matcher(signing_key: &str) -> String {
    let config = MatcherServiceConfig {
        port: 0,
        signing_key: signing_key.to_string(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind matcher");
    let addr = listener.local_addr().expect("Matcher has no address");
    let app = identity_matcher::app(&config);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Matcher failed");
    });
    format!("http://{}", addr)
}

async fn fixture_with_matcher() -> TestFixture {
    let matcher_url = spawn_matcher("test-signing-key").await;
    let fixture = TestFixture::with_config(|config| config.matcher.url = matcher_url).await;
    fixture.mock_broker("the-code", EXTERNAL_ID, NAME).await;
    fixture
}

async fn login(fixture: &TestFixture) -> (String, TestResponse) {
    let login = fixture.get("/login").await;
    login.assert_status(StatusCode::SEE_OTHER);
    let session = login.cookie("gaia").expect("No session cookie");
    let response = fixture
        .get_with_cookies(
            format!("/authenticate?state={}&code=the-code", login.login_state()),
            &[&session],
        )
        .await;
    (session, response)
}

fn subject(fixture: &TestFixture, data: Option<SessionData>) -> String {
    let Some(SessionData::Confirmed { token }) = data else {
        panic!("expected a confirmed session, got {:?}", data);
    };
    let claims = fixture
        .state
        .tokens
        .decode(&token)
        .expect("Token is malformed")
        .expect("Token did not verify");
    assert_eq!(claims.scope, "crm:write data:read invoice:read");
    assert_eq!(claims.iss, "Gaia");
    claims.sub
}

#[tokio::test]
async fn test_first_login_onboards_then_reaches_protected_content() {
    let fixture = fixture_with_matcher().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/secret/report"))
        .respond_with(ResponseTemplate::new(200).set_body_string("quarterly numbers"))
        .mount(&fixture.origin_mock)
        .await;

    let (session, response) = login(&fixture).await;
    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.location(), "/onboarding.html");
    let name_cookie = response.cookie("gaia_n").expect("No name cookie");

    let blocked = fixture
        .get_with_cookies("/secret/report", &[&session])
        .await;
    blocked.assert_status(StatusCode::UNAUTHORIZED);

    let onboarded = fixture
        .post_form(
            "/onboarding",
            &[
                ("address", "Landgreven 10, 1301 København K"),
                ("darid", "0a3f50a0-4660-32b8-e044-0003ba298018"),
            ],
            &[&session, &name_cookie],
        )
        .await;
    onboarded.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(onboarded.location(), "/gaia/dashboard.html");

    let confirmed = onboarded.cookie("gaia").expect("No rotated session cookie");
    let gaia_id = subject(&fixture, fixture.session(&confirmed).await);
    assert!(!gaia_id.is_empty());

    let stale = fixture
        .get_with_cookies("/secret/report", &[&session])
        .await;
    stale.assert_status(StatusCode::UNAUTHORIZED);

    let content = fixture
        .get_with_cookies("/secret/report", &[&confirmed])
        .await;
    content.assert_status(StatusCode::OK);
    assert_eq!(content.text(), "quarterly numbers");
}

#[tokio::test]
async fn test_returning_user_matches_without_onboarding() {
    let fixture = fixture_with_matcher().await;

    let (first_session, response) = login(&fixture).await;
    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    let name_cookie = response.cookie("gaia_n").expect("No name cookie");
    let onboarded = fixture
        .post_form(
            "/onboarding",
            &[
                ("address", "Landgreven 10, 1301 København K"),
                ("darid", "0a3f50a0-4660-32b8-e044-0003ba298018"),
            ],
            &[&first_session, &name_cookie],
        )
        .await;
    onboarded.assert_status(StatusCode::SEE_OTHER);
    let first_confirmed = onboarded.cookie("gaia").expect("No rotated session cookie");
    let first = subject(&fixture, fixture.session(&first_confirmed).await);

    let (second_session, response) = login(&fixture).await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.location(), "/gaia/dashboard.html");
    assert_ne!(first_session, second_session);

    let second_confirmed = response.cookie("gaia").expect("No rotated session cookie");
    assert_ne!(first_confirmed, second_confirmed);
    let second = subject(&fixture, fixture.session(&second_confirmed).await);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_matcher_rejects_gateway_with_other_key() {
    let matcher_url = spawn_matcher("a-different-key").await;
    let fixture = TestFixture::with_config(|config| config.matcher.url = matcher_url).await;
    fixture.mock_broker("the-code", EXTERNAL_ID, NAME).await;

    let (session, response) = login(&fixture).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().starts_with("UpstreamRejected"));
    assert_eq!(fixture.session(&session).await, None);
}
