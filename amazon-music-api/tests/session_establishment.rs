//! Login-handshake tests against a stub portal.
//!
//! The client is blocking, so the mock server runs on a manually held
//! tokio runtime; background workers keep it serving while the test
//! thread drives the client.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use amazon_music_api::{AmazonMusicError, Connector, CredentialSource, Credentials};
use amazon_music_api::cookies::CookieJar;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn start_server() -> (tokio::runtime::Runtime, MockServer) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    (rt, server)
}

fn mount(rt: &tokio::runtime::Runtime, server: &MockServer, mock: Mock) {
    rt.block_on(mock.mount(server));
}

fn config_page(server_uri: &str) -> String {
    format!(
        r#"<html><head><script type="text/javascript">
        var amznMusic = amznMusic || {{}};
        amznMusic.appConfig = {{
            "isRecognizedCustomer": 1,
            "customerId": "cust1",
            "deviceId": "dev1",
            "deviceType": "A16ZV8BU3SN1N3",
            "musicTerritory": "GB",
            "realm": "EUAmazon",
            "i18n": {{"locale": "en_GB"}},
            "serverInfo": {{"returnUrlServer": "{server_uri}"}},
            "CSRFTokenConfig": {{
                "csrf_token": "abc123",
                "csrf_ts": "1700000000",
                "csrf_rnd": "rnd1"
            }}
        }};
        </script></head><body>player</body></html>"#
    )
}

fn login_form_page() -> &'static str {
    r#"<html><body><form name="signIn" method="post" action="/ap/signin">
        <input type="hidden" name="appActionToken" value="tok123"/>
        <input type="email" name="email"/>
        <input type="password" name="password"/>
    </form></body></html>"#
}

#[test]
fn full_login_flow_assembles_session() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("GET")).and(path("/")).respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/ap/signin?openid.mode=checkid_setup")
                .insert_header("Set-Cookie", "session-id=s-1; Path=/"),
        ),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/ap/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_form_page())),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/ap/signin"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/home")
                    .insert_header("Set-Cookie", "at-main=token-1; Path=/"),
            ),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/home"))
            .respond_with(ResponseTemplate::new(200).set_body_string(config_page(&server.uri()))),
    );

    let dir = tempfile::tempdir().unwrap();
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let credentials = CredentialSource::deferred(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Credentials::new("foo@example.com", "xyzzy")
    });

    let client = Connector::new()
        .front_door(server.uri())
        .cookie_path(dir.path().join("cookies.json"))
        .connect(&credentials)
        .unwrap();

    let session = client.session();
    assert_eq!(session.region, "EU");
    assert_eq!(session.region_prefix(), "/EU/");
    assert_eq!(session.csrf_token, "abc123");
    assert_eq!(session.device_id, "dev1");
    assert_eq!(session.customer_id, "cust1");
    assert_eq!(session.base_url, server.uri());

    // Provider invoked exactly once for the whole attempt.
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    // The regional target and the portal cookies were persisted.
    let jar = CookieJar::load(&dir.path().join("cookies.json")).unwrap();
    assert_eq!(jar.region_target(), Some(server.uri().as_str()));
    assert!(jar.get("127.0.0.1", "at-main").is_some());
}

#[test]
fn cached_region_target_skips_login_entirely() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(config_page(&server.uri()))),
    );

    let dir = tempfile::tempdir().unwrap();
    let cookie_path = dir.path().join("cookies.json");
    let mut jar = CookieJar::load(&cookie_path).unwrap();
    jar.set_region_target(&server.uri());
    jar.save().unwrap();

    let credentials = CredentialSource::deferred(|| {
        panic!("credentials must not be resolved on the fast path")
    });

    // Front door is unreachable on purpose; only the cached target is hit.
    let client = Connector::new()
        .front_door("http://front-door.invalid")
        .cookie_path(&cookie_path)
        .connect(&credentials)
        .unwrap();
    assert_eq!(client.session().region, "EU");

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

#[test]
fn rejected_credentials_fail_with_authentication() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("GET")).and(path("/")).respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/ap/signin"),
        ),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/ap/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_form_page())),
    );
    let error_page = format!(
        r#"<html><body><div id="auth-error-message-box">
           There was a problem: your password is incorrect</div>{}</body></html>"#,
        login_form_page()
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/ap/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_string(error_page)),
    );

    let dir = tempfile::tempdir().unwrap();
    let credentials = CredentialSource::fixed("foo@example.com", "wrong-password");
    let err = Connector::new()
        .front_door(server.uri())
        .cookie_path(dir.path().join("cookies.json"))
        .connect(&credentials)
        .unwrap_err();

    assert!(
        matches!(err, AmazonMusicError::Authentication),
        "expected Authentication, got {err:?}"
    );
}

#[test]
fn captcha_challenge_is_distinguished() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("GET")).and(path("/")).respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/ap/signin"),
        ),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/ap/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_form_page())),
    );
    let captcha_page = r#"<html><body>
        <audio id="audio-captcha"><source src="challenge.mp3"/></audio>
        <form action="/ap/cvf"><input type="hidden" name="token" value="1"/></form>
    </body></html>"#;
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/ap/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_string(captcha_page)),
    );

    let dir = tempfile::tempdir().unwrap();
    let credentials = CredentialSource::fixed("foo@example.com", "xyzzy");
    let err = Connector::new()
        .front_door(server.uri())
        .cookie_path(dir.path().join("cookies.json"))
        .connect(&credentials)
        .unwrap_err();

    assert!(
        matches!(err, AmazonMusicError::ChallengeRequired),
        "expected ChallengeRequired, got {err:?}"
    );
}

#[test]
fn region_redirect_without_login_resolves_session() {
    // Already-authenticated cookies: the front door bounces straight to
    // the regional home page, no sign-in involved.
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/EU/")),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/EU/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(config_page(&server.uri()))),
    );

    let dir = tempfile::tempdir().unwrap();
    let credentials = CredentialSource::deferred(|| {
        panic!("no credentials needed when the session is still live")
    });
    let client = Connector::new()
        .front_door(server.uri())
        .cookie_path(dir.path().join("cookies.json"))
        .connect(&credentials)
        .unwrap();

    let session = client.session();
    assert_eq!(session.region, "EU");
    assert_eq!(session.csrf_token, "abc123");
    assert_eq!(session.device_id, "dev1");
    assert_eq!(session.customer_id, "cust1");
}

#[test]
fn missing_config_is_region_resolution() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>no config here</body></html>"),
            ),
    );

    let dir = tempfile::tempdir().unwrap();
    let credentials = CredentialSource::fixed("foo@example.com", "xyzzy");
    let err = Connector::new()
        .front_door(server.uri())
        .cookie_path(dir.path().join("cookies.json"))
        .connect(&credentials)
        .unwrap_err();

    assert!(
        matches!(err, AmazonMusicError::RegionResolution(_)),
        "expected RegionResolution, got {err:?}"
    );
}
