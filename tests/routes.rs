use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use poll_server::poll::{self, NewPoll};
use poll_server::render::JsonRenderer;
use poll_server::store::{MemoryStore, UserStore};
use poll_server::{create_routes, AppState, Config};

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::in_memory(Config::default());
        Self {
            router: create_routes(state.clone()),
            state,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn index(&self, cookie: Option<&str>) -> Value {
        let response = self.get("/", cookie).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["view"], "index");
        body["data"].clone()
    }

    /// Registers and logs in, returning the `Cookie` header value.
    async fn login_as(&self, username: &str, password: &str) -> String {
        let body = format!("username={username}&password={password}");
        self.post_form("/register", &body, None).await;
        let response = self.post_form("/login", &body, None).await;
        assert_eq!(location(&response), "/");
        session_cookie(&response)
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn votes(poll: &Value) -> Vec<u64> {
    poll["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["votes"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_anonymous_index() {
    let app = TestApp::new();
    let data = app.index(None).await;
    assert_eq!(data["polls"], Value::Array(vec![]));
    assert!(data["user"].is_null());
}

#[tokio::test]
async fn test_create_requires_login() {
    let app = TestApp::new();

    let response = app.get("/create", None).await;
    assert_eq!(location(&response), "/login");

    let response = app
        .post_form("/create", "question=Color%3F&options=Red%2CBlue", None)
        .await;
    assert_eq!(location(&response), "/login");

    assert!(app.index(None).await["polls"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_anonymous_create_redirects_before_body_is_read() {
    let app = TestApp::new();

    // missing `options` field would otherwise be a form rejection
    let response = app.post_form("/create", "question=Q", None).await;
    assert_eq!(location(&response), "/login");

    let request = Request::builder()
        .method("POST")
        .uri("/create")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(location(&response), "/login");

    let request = Request::builder()
        .method("POST")
        .uri("/create")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(location(&response), "/login");

    assert!(app.index(None).await["polls"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_cookie_is_anonymous() {
    let app = TestApp::new();
    let response = app.get("/create", Some("poll_session=forged")).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_register_and_duplicate_redirect_to_login() {
    let app = TestApp::new();

    let response = app.post_form("/register", "username=alice&password=pw1", None).await;
    assert_eq!(location(&response), "/login");

    let response = app.post_form("/register", "username=alice&password=pw2", None).await;
    assert_eq!(location(&response), "/login");

    // original password still works, the second one doesn't
    let response = app.post_form("/login", "username=alice&password=pw1", None).await;
    assert_eq!(location(&response), "/");
    let response = app.post_form("/login", "username=alice&password=pw2", None).await;
    assert_eq!(location(&response), "/login?error=1");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.post_form("/register", "username=alice&password=pw", None).await;

    let wrong_secret = app.post_form("/login", "username=alice&password=nope", None).await;
    let unknown_user = app.post_form("/login", "username=bob&password=pw", None).await;

    assert_eq!(location(&wrong_secret), location(&unknown_user));
    assert!(wrong_secret.headers().get(header::SET_COOKIE).is_none());
    assert!(unknown_user.headers().get(header::SET_COOKIE).is_none());

    let body = json_body(app.get("/login?error=1", None).await).await;
    assert_eq!(body["view"], "login");
    assert_eq!(body["data"]["message"], "Incorrect username or password.");

    let body = json_body(app.get("/login", None).await).await;
    assert!(body["data"]["message"].is_null());
}

#[tokio::test]
async fn test_end_to_end_poll_flow() {
    let app = TestApp::new();
    let cookie = app.login_as("alice", "pw").await;

    let data = app.index(Some(&cookie)).await;
    assert_eq!(data["user"]["username"], "alice");
    assert!(data["user"].get("password_hash").is_none());

    let response = app.get("/create", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form("/create", "question=Color%3F&options=Red%2C+Blue", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/");

    let data = app.index(None).await;
    let polls = data["polls"].as_array().unwrap();
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0]["question"], "Color?");
    assert_eq!(polls[0]["options"][0]["label"], "Red");
    assert_eq!(polls[0]["options"][1]["label"], "Blue");
    assert_eq!(votes(&polls[0]), vec![0, 0]);
    assert_eq!(polls[0]["total_votes"], 0);
    let id = polls[0]["id"].as_str().unwrap().to_string();

    // voting is anonymous
    let response = app.post_form(&format!("/vote/{id}"), "optionIndex=1", None).await;
    assert_eq!(location(&response), "/");
    let data = app.index(None).await;
    assert_eq!(votes(&data["polls"][0]), vec![0, 1]);
    assert_eq!(data["polls"][0]["total_votes"], 1);

    for bad in ["optionIndex=5", "optionIndex=-1", "optionIndex=abc", ""] {
        let response = app.post_form(&format!("/vote/{id}"), bad, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {bad:?}");
    }
    assert_eq!(votes(&app.index(None).await["polls"][0]), vec![0, 1]);
}

#[tokio::test]
async fn test_create_rejects_blank_input() {
    let app = TestApp::new();
    let cookie = app.login_as("alice", "pw").await;

    let response = app
        .post_form("/create", "question=&options=a%2Cb", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form("/create", "question=Q&options=+%2C+", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.index(None).await["polls"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_vote_on_unknown_poll() {
    let app = TestApp::new();

    let response = app.post_form("/vote/not-a-uuid", "optionIndex=0", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_form(
            "/vote/00000000-0000-4000-8000-000000000000",
            "optionIndex=0",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let app = TestApp::new();
    let cookie = app.login_as("alice", "pw").await;

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(location(&response), "/");
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("poll_session=; Max-Age=0"));
    assert!(!cleared.contains("Secure"));

    let response = app.get("/create", Some(&cookie)).await;
    assert_eq!(location(&response), "/login");

    // logging out again is harmless
    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(location(&response), "/");
    let response = app.get("/logout", None).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_relogin_rotates_session() {
    let app = TestApp::new();
    let first = app.login_as("alice", "pw").await;

    let response = app
        .post_form("/login", "username=alice&password=pw", Some(&first))
        .await;
    let second = session_cookie(&response);

    assert_ne!(first, second);
    assert_eq!(location(&app.get("/create", Some(&first)).await), "/login");
    assert_eq!(app.get("/create", Some(&second)).await.status(), StatusCode::OK);
    assert_eq!(app.state.sessions.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_over_http() {
    const K: u64 = 100;

    let app = Arc::new(TestApp::new());
    let id = poll::create_poll(
        app.state.polls.as_ref(),
        NewPoll::from_form("Q", "a,b").unwrap(),
    )
    .await
    .unwrap();

    let tasks: Vec<_> = (0..K)
        .map(|_| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let response = app.post_form(&format!("/vote/{id}"), "optionIndex=0", None).await;
                assert_eq!(response.status(), StatusCode::SEE_OTHER);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let poll = poll::get_poll(app.state.polls.as_ref(), id).await.unwrap();
    assert_eq!(poll.options[0].votes, K);
    assert_eq!(poll.options[1].votes, 0);
}

#[tokio::test]
async fn test_session_of_removed_user_fails_closed() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        Config::default(),
        store.clone(),
        store.clone(),
        Arc::new(JsonRenderer),
    );
    let app = TestApp {
        router: create_routes(state.clone()),
        state,
    };
    let cookie = app.login_as("alice", "pw").await;

    let user = store.find_by_username("alice").await.unwrap().unwrap();
    store.delete_user(user.id).await.unwrap();

    assert!(app.index(Some(&cookie)).await["user"].is_null());
    assert_eq!(location(&app.get("/create", Some(&cookie)).await), "/login");
}

#[tokio::test]
async fn test_secure_cookies_when_configured() {
    let config = Config {
        cookie_secure: true,
        ..Config::default()
    };
    let state = AppState::in_memory(config);
    let app = TestApp {
        router: create_routes(state.clone()),
        state,
    };

    let body = "username=alice&password=pw";
    app.post_form("/register", body, None).await;
    let response = app.post_form("/login", body, None).await;
    let set = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set.ends_with("; Secure"));

    let cookie = session_cookie(&response);
    let response = app.get("/logout", Some(&cookie)).await;
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("poll_session=;"));
    assert!(cleared.ends_with("; Secure"));
}

#[tokio::test]
async fn test_healthz() {
    let app = TestApp::new();
    let response = app.get("/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
