//! End-to-end cookie handling against a local HTTP backend.
//!
//! The backend issues `access_token` / `refresh_token` cookies the way the
//! real back office does. Nothing in the client reads them; these tests prove
//! the transport's cookie jar carries them through login, refresh, retry and
//! logout.

use backoffice_config::Config;
use session_auth::{ApiClient, ApiError, Method, SessionStatus};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct Backend {
    base_url: String,
    seen: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl Backend {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, log).await;
                });
            }
        });

        Self {
            base_url,
            seen,
            task,
        }
    }

    fn count(&self, line: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| seen.as_str() == line)
            .count()
    }

    fn client(&self) -> ApiClient {
        let config = Config {
            api_base_url: self.base_url.clone(),
            proactive_refresh_secs: None,
            ..Config::default()
        };
        ApiClient::from_config(&config).unwrap()
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut socket: TcpStream, seen: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut cookies = String::new();
    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).await?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "cookie" => cookies = value.trim().to_string(),
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                _ => {}
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    seen.lock().unwrap().push(format!("{method} {path}"));
    let has = |cookie: &str| cookies.split("; ").any(|pair| pair == cookie);
    let has_name = |name: &str| {
        cookies
            .split("; ")
            .any(|pair| pair.starts_with(&format!("{name}=")) && pair.len() > name.len() + 1)
    };

    let (status, set_cookies, payload): (&str, Vec<&str>, &str) =
        match (method.as_str(), path.as_str()) {
            ("POST", "/api/login/") => (
                "200 OK",
                vec![
                    "access_token=stale; Path=/; HttpOnly",
                    "refresh_token=r1; Path=/; HttpOnly",
                ],
                r#"{"message":"Login successful"}"#,
            ),
            ("GET", "/me/") if has_name("access_token") => (
                "200 OK",
                vec![],
                r#"{"username":"alice","email":"a@x.com","id":1}"#,
            ),
            ("GET", "/api/orders/orders/") if has("access_token=fresh") => {
                ("200 OK", vec![], r#"[{"id":1,"status":"pending"}]"#)
            }
            ("POST", "/api/token/refresh/") if has("refresh_token=r1") => (
                "200 OK",
                vec!["access_token=fresh; Path=/; HttpOnly"],
                r#"{"message":"Token refreshed"}"#,
            ),
            ("POST", "/api/logout/") => (
                "200 OK",
                vec![
                    "access_token=; Path=/; Max-Age=0",
                    "refresh_token=; Path=/; Max-Age=0",
                ],
                r#"{"message":"Logged out"}"#,
            ),
            ("GET", _) | ("POST", _) if path.starts_with("/api/") || path == "/me/" => (
                "401 Unauthorized",
                vec![],
                r#"{"detail":"Authentication credentials were not provided."}"#,
            ),
            _ => ("404 Not Found", vec![], "{}"),
        };

    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        payload.len()
    );
    for cookie in set_cookies {
        response.push_str(&format!("Set-Cookie: {cookie}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(payload);

    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[tokio::test]
async fn test_login_refresh_retry_and_logout_over_http() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let backend = Backend::start().await;
    let client = backend.client();

    let session = client.fetch_session().await;
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.error.is_none());

    let session = client.login("alice", "s3cret").await.unwrap();
    assert_eq!(session.user.unwrap().username, "alice");

    // Access cookie from login is stale, so this goes 401 -> refresh -> retry.
    let orders: serde_json::Value = client
        .request_json("/api/orders/orders/", Method::Get, None)
        .await
        .unwrap();
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(backend.count("POST /api/token/refresh/"), 1);
    assert_eq!(backend.count("GET /api/orders/orders/"), 2);

    // Fresh cookie now in the jar: no further refresh.
    client
        .request("/api/orders/orders/", Method::Get, None)
        .await
        .unwrap();
    assert_eq!(backend.count("POST /api/token/refresh/"), 1);

    client.logout().await;
    assert!(client.session().user().is_none());
    assert_eq!(backend.count("POST /api/logout/"), 1);

    // Logout expired both cookies, so the refresh is refused.
    let err = client
        .request("/api/orders/orders/", Method::Get, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(backend.count("POST /api/token/refresh/"), 2);
}

#[tokio::test]
async fn test_unreachable_backend_sets_session_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config {
        api_base_url: format!("http://{addr}"),
        proactive_refresh_secs: None,
        ..Config::default()
    };
    let client = ApiClient::from_config(&config).unwrap();

    let session = client.fetch_session().await;
    assert!(session.user.is_none());
    assert!(!session.loading);
    assert!(session.error.is_some());

    let err = client
        .request("/api/products/products/", Method::Get, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NetworkUnavailable));
    assert!(err.is_transient());
}
