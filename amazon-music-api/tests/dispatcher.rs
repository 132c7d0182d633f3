//! Dispatcher tests: signing headers, encodings, pagination, and
//! session-expiry detection, against a stub API server.

use amazon_music_api::auth::Session;
use amazon_music_api::{AmazonMusic, AmazonMusicError, action};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn start_server() -> (tokio::runtime::Runtime, MockServer) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    (rt, server)
}

fn mount(rt: &tokio::runtime::Runtime, server: &MockServer, mock: Mock) {
    rt.block_on(mock.mount(server));
}

fn test_client(base_url: &str) -> AmazonMusic {
    let session = Session {
        region: "EU".to_owned(),
        base_url: base_url.to_owned(),
        csrf_token: "abc123".to_owned(),
        csrf_ts: "1700000000".to_owned(),
        csrf_rnd: "rnd1".to_owned(),
        device_id: "dev1".to_owned(),
        device_type: "A16ZV8BU3SN1N3".to_owned(),
        customer_id: "cust1".to_owned(),
        territory: "GB".to_owned(),
        locale: "en_GB".to_owned(),
    };
    AmazonMusic::with_session(session).unwrap()
}

#[test]
fn call_signs_and_decodes() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/muse/legacy/lookup"))
            .and(header("X-Amz-Target", action::LOOKUP))
            .and(header("csrf-token", "abc123"))
            .and(header("csrf-rnd", "rnd1"))
            .and(header("csrf-ts", "1700000000"))
            .and(header("Content-Encoding", "amz-1.0"))
            .and(header("X-Requested-With", "XMLHttpRequest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "albumList": [{"asin": "B00J9AEZ7G", "title": "x"}]
            }))),
    );

    let client = test_client(&server.uri());
    let resp = client
        .call(action::LOOKUP, &json!({"asins": ["B00J9AEZ7G"]}))
        .unwrap();
    assert_eq!(resp["albumList"][0]["asin"], "B00J9AEZ7G");
}

#[test]
fn unknown_action_makes_no_request() {
    let (rt, server) = start_server();
    let client = test_client(&server.uri());

    let err = client
        .call("com.example.NoSuchService.frobnicate", &json!({}))
        .unwrap_err();
    assert!(matches!(err, AmazonMusicError::UnknownAction(_)));

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert!(requests.is_empty());
}

#[test]
fn paginate_threads_cursor_until_exhausted() {
    let (rt, server) = start_server();
    let queue_path = "/EU/api/mpqs/voiceenabled/getNextTracks";

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path(queue_path))
            .and(body_string_contains(r#""pageToken":"p1""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1, "nextPageToken": "p2"
            }))),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path(queue_path))
            .and(body_string_contains(r#""pageToken":"p2""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 2, "nextPageToken": "p3"
            }))),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path(queue_path))
            .and(body_string_contains(r#""pageToken":"p3""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 3, "nextPageToken": null
            }))),
    );

    let client = test_client(&server.uri());
    let pages: Vec<Value> = client
        .paginate(action::GET_NEXT_TRACKS, &json!({"pageToken": "p1"}))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["page"], 1);
    assert_eq!(pages[2]["page"], 3);

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 3);
}

#[test]
fn cirrus_actions_use_form_encoding() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/cirrus/"))
            .and(header("Content-Type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("Operation=searchLibrary"))
            .and(body_string_contains("maxResults=100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "searchLibraryResponse": {
                    "searchLibraryResult": {"searchReturnItemList": []}
                }
            }))),
    );

    let client = test_client(&server.uri());
    let resp = client
        .call(
            action::SEARCH_LIBRARY,
            &json!({"Operation": "searchLibrary", "maxResults": 100}),
        )
        .unwrap();
    assert!(resp["searchLibraryResponse"].is_object());
}

#[test]
fn redirect_to_signin_is_session_expired() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/muse/legacy/lookup"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "https://www.amazon.com/ap/signin?openid.mode=x"),
            ),
    );

    let client = test_client(&server.uri());
    let err = client
        .call(action::LOOKUP, &json!({"asins": ["B00J9AEZ7G"]}))
        .unwrap_err();
    assert!(matches!(err, AmazonMusicError::SessionExpired));
}

#[test]
fn login_page_body_is_session_expired() {
    let (rt, server) = start_server();

    let login_page = r#"<html><body><form method="post" action="/ap/signin">
        <input type="email" name="email"/>
        <input type="password" name="password"/>
    </form></body></html>"#;
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/search/v1_1/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_page)),
    );

    let client = test_client(&server.uri());
    let err = client.call(action::SEARCH, &json!({})).unwrap_err();
    assert!(matches!(err, AmazonMusicError::SessionExpired));
}

#[test]
fn non_json_body_is_malformed_response() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/search/v1_1/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html>service unavailable</html>"),
            ),
    );

    let client = test_client(&server.uri());
    let err = client.call(action::SEARCH, &json!({})).unwrap_err();
    assert!(
        matches!(err, AmazonMusicError::MalformedResponse { ref body } if body.contains("unavailable")),
        "got {err:?}"
    );
}

#[test]
fn error_documents_are_returned_not_raised() {
    // The service reports failures as JSON documents, sometimes with
    // non-2xx status; the dispatcher decodes them all the same and
    // leaves interpretation to the caller.
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/muse/legacy/lookup"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "com.amazon.musicensembleservice#InvalidParameterException",
                "message": "asin list empty"
            }))),
    );

    let client = test_client(&server.uri());
    let resp = client.call(action::LOOKUP, &json!({"asins": []})).unwrap();
    assert_eq!(
        resp["__type"],
        "com.amazon.musicensembleservice#InvalidParameterException"
    );
}

#[test]
fn rotated_cookies_are_sent_on_later_calls() {
    let (rt, server) = start_server();

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/muse/legacy/lookup"))
            .and(body_string_contains("first"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "music-session=zzz; Path=/")
                    .set_body_json(json!({"ok": 1})),
            ),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/EU/api/muse/legacy/lookup"))
            .and(body_string_contains("second"))
            .and(header("Cookie", "music-session=zzz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 2}))),
    );

    let client = test_client(&server.uri());
    client.call(action::LOOKUP, &json!({"asins": ["first"]})).unwrap();
    // Fails with MalformedResponse if the rotated cookie is not echoed.
    let resp = client
        .call(action::LOOKUP, &json!({"asins": ["second"]}))
        .unwrap();
    assert_eq!(resp["ok"], 2);
}
