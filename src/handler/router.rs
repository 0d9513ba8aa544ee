//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: health checks, the front page,
//! body limits and form decoding, then hands off to the page dispatcher.

use crate::config::AppState;
use crate::handler::request::{WikiRequest, WikiResponse};
use crate::http::{self, cache};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, Operation};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, IF_NONE_MATCH, SERVER};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: Option<SocketAddr>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let mut entry = state.access_log_enabled().then(|| {
        AccessLogEntry::start(
            peer_addr,
            req.method(),
            req.uri(),
            req.version(),
            req.headers(),
        )
    });

    let mut response = route_request(req, Arc::clone(&state)).await;

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if let Some(entry) = entry.as_mut() {
        let body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path();
    let is_head = req.method() == Method::HEAD;

    // 0. Health check endpoints (highest priority, always fast)
    let health = &state.config.health;
    if health.enabled && (path == health.liveness_path || path == health.readiness_path) {
        return http::build_health_response("ok");
    }

    // 1. Front page
    if path == "/" {
        if let Some(front) = &state.front_page {
            if matches!(*req.method(), Method::GET | Method::HEAD) {
                return http::build_redirect_response(&Operation::View.path_for(front));
            }
            return http::build_405_response("GET, HEAD");
        }
    }

    // 2. Paths outside the grammar are not found, whatever the body says
    if let Err(e) = routing::validate(path, state.config.wiki.grammar) {
        tracing::debug!(error = %e, "rejected request path");
        return http::build_404_response();
    }

    // 3. Check body size up front when the client announces it
    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&req, max_body_size) {
        return resp;
    }

    let if_none_match = header_string(&req, IF_NONE_MATCH);
    let wiki_req = match read_wiki_request(req, max_body_size).await {
        Ok(wiki_req) => wiki_req,
        Err(resp) => return resp,
    };

    // 4. Page operations touch the disk; keep them off the connection thread
    let outcome = match tokio::task::spawn_blocking(move || {
        state.dispatcher.dispatch(&wiki_req, &state.page_context())
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            logger::log_error(&format!("Page operation task failed: {e}"));
            return http::build_500_response();
        }
    };
    into_http_response(outcome, is_head, if_none_match.as_deref())
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size_str = req.headers().get(CONTENT_LENGTH)?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Ok(_) => None,
        Err(_) => {
            logger::log_warning(&format!("Invalid Content-Length value: '{size_str}'"));
            Some(http::build_400_response())
        }
    }
}

fn header_string<B>(req: &Request<B>, name: hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Collect the body (bounded) and decode it into a `WikiRequest`
async fn read_wiki_request<B>(
    req: Request<B>,
    max_body_size: u64,
) -> Result<WikiRequest, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                logger::log_warning(&format!("Request body exceeded {max_body_size} bytes"));
                return Err(http::build_413_response());
            }
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return Err(http::build_400_response());
        }
    };

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    Ok(WikiRequest::from_parts(
        parts.method.clone(),
        parts.uri.path(),
        parts.uri.query(),
        content_type,
        &body,
    ))
}

/// Convert a page outcome into the wire response
fn into_http_response(
    outcome: WikiResponse,
    is_head: bool,
    if_none_match: Option<&str>,
) -> Response<Full<Bytes>> {
    match outcome {
        WikiResponse::Html(html) => {
            let etag = cache::generate_etag(html.as_bytes());
            if cache::check_etag_match(if_none_match, &etag) {
                return http::build_304_response(&etag);
            }
            http::build_html_response(html, &etag, is_head)
        }
        WikiResponse::Redirect(target) => http::build_redirect_response(&target),
        WikiResponse::NotFound => http::build_404_response(),
        WikiResponse::MethodNotAllowed(allow) => http::build_405_response(&allow),
        WikiResponse::UnsupportedMediaType => http::build_415_response(),
        WikiResponse::ServerError(_) => http::build_500_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::render::TemplateSet;
    use crate::storage::{FileStore, PageStore, Title};
    use tempfile::TempDir;

    fn test_state(dir: &TempDir, edit: impl FnOnce(&mut Config)) -> Arc<AppState> {
        let mut config = Config::load_from(dir.path().join("none").to_str().unwrap()).unwrap();
        config.logging.access_log = false;
        config.storage.data_dir = dir.path().to_path_buf();
        edit(&mut config);
        let store = Arc::new(FileStore::new(dir.path()));
        let renderer = Arc::new(TemplateSet::builtin().unwrap());
        Arc::new(AppState::with_parts(&config, store, renderer).unwrap())
    }

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn form_post(uri: &str, form: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(form.to_string())))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        handle_request(req, Arc::clone(state), None).await.unwrap()
    }

    async fn body_text(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_path_is_404() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});
        for uri in ["/view/..%2Fetc", "/view/", "/delete/Foo", "/"] {
            let resp = send(&state, request(Method::GET, uri)).await;
            assert_eq!(resp.status(), 404, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_view_missing_redirects_to_edit() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});
        let resp = send(&state, request(Method::GET, "/view/Missing")).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()["Location"], "/edit/Missing");
    }

    #[tokio::test]
    async fn test_save_then_view_round_trip() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});

        let resp = send(&state, form_post("/save/TestPage", "body=Updated+text")).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()["Location"], "/view/TestPage");

        let stored = state.store.load(&Title::parse("TestPage").unwrap()).unwrap();
        assert_eq!(stored.body(), b"Updated text");

        let resp = send(&state, request(Method::GET, "/view/TestPage")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[SERVER], "tinywiki");
        assert!(body_text(resp).await.contains("Updated text"));
    }

    #[tokio::test]
    async fn test_etag_revalidation() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});
        send(&state, form_post("/save/Cached", "body=v1")).await;

        let first = send(&state, request(Method::GET, "/view/Cached")).await;
        let etag = first.headers()["ETag"].to_str().unwrap().to_string();

        let conditional = Request::builder()
            .uri("/view/Cached")
            .header(IF_NONE_MATCH, &etag)
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(send(&state, conditional).await.status(), 304);

        send(&state, form_post("/save/Cached", "body=v2")).await;
        let conditional = Request::builder()
            .uri("/view/Cached")
            .header(IF_NONE_MATCH, &etag)
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(send(&state, conditional).await.status(), 200);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});
        let resp = send(&state, request(Method::HEAD, "/edit/NewPage")).await;
        assert_eq!(resp.status(), 200);
        assert!(body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});
        let resp = send(&state, request(Method::GET, "/save/Foo")).await;
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["Allow"], "POST");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |c| c.http.max_body_size = 8);

        let resp = send(&state, form_post("/save/Big", "body=far+too+long")).await;
        assert_eq!(resp.status(), 413);
        assert!(state.store.load(&Title::parse("Big").unwrap()).is_err());
    }

    /// Remembers which thread served the last load
    struct ThreadRecordingStore {
        inner: FileStore,
        load_thread: std::sync::Mutex<Option<std::thread::ThreadId>>,
    }

    impl PageStore for ThreadRecordingStore {
        fn key(&self, title: &Title) -> std::path::PathBuf {
            self.inner.key(title)
        }

        fn load(&self, title: &Title) -> crate::error::Result<crate::storage::Page> {
            *self.load_thread.lock().unwrap() = Some(std::thread::current().id());
            self.inner.load(title)
        }

        fn save(&self, page: &crate::storage::Page) -> crate::error::Result<()> {
            self.inner.save(page)
        }
    }

    #[tokio::test]
    async fn test_page_io_runs_off_the_request_thread() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path().join("none").to_str().unwrap()).unwrap();
        config.logging.access_log = false;
        let store = Arc::new(ThreadRecordingStore {
            inner: FileStore::new(dir.path()),
            load_thread: std::sync::Mutex::new(None),
        });
        let renderer = Arc::new(TemplateSet::builtin().unwrap());
        let state = Arc::new(
            AppState::with_parts(&config, Arc::clone(&store) as Arc<dyn PageStore>, renderer)
                .unwrap(),
        );

        let resp = send(&state, request(Method::GET, "/edit/Anything")).await;
        assert_eq!(resp.status(), 200);

        let load_thread = store.load_thread.lock().unwrap().expect("store was read");
        assert_ne!(load_thread, std::thread::current().id());
    }

    #[tokio::test]
    async fn test_save_keeps_binary_body() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});

        let resp = send(&state, form_post("/save/Bin", "body=%FF%00ok")).await;
        assert_eq!(resp.status(), 302);
        let stored = state.store.load(&Title::parse("Bin").unwrap()).unwrap();
        assert_eq!(stored.body(), &[0xFF, 0x00, b'o', b'k']);
    }

    #[tokio::test]
    async fn test_save_multipart_is_refused() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});
        send(&state, form_post("/save/Kept", "body=original")).await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/save/Kept")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=x")
            .body(Full::new(Bytes::from_static(
                b"--x\r\nContent-Disposition: form-data; name=\"body\"\r\n\r\nnew\r\n--x--\r\n",
            )))
            .unwrap();
        assert_eq!(send(&state, req).await.status(), 415);

        let stored = state.store.load(&Title::parse("Kept").unwrap()).unwrap();
        assert_eq!(stored.body(), b"original");
    }

    #[tokio::test]
    async fn test_invalid_path_wins_over_body_checks() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |c| c.http.max_body_size = 4);

        let oversized = form_post("/view/../x", "body=far+too+long");
        assert_eq!(send(&state, oversized).await.status(), 404);

        let bad_length = Request::builder()
            .method(Method::POST)
            .uri("/save/a-b")
            .header(CONTENT_LENGTH, "lots")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(send(&state, bad_length).await.status(), 404);
    }

    #[tokio::test]
    async fn test_health_and_front_page() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |c| c.wiki.front_page = Some("FrontPage".to_string()));

        let resp = send(&state, request(Method::GET, "/healthz")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_text(resp).await, "ok");

        let resp = send(&state, request(Method::GET, "/")).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers()["Location"], "/view/FrontPage");
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, |_| {});
        // A directory where the page file should go makes the write fail
        std::fs::create_dir(state.store.key(&Title::parse("Blocked").unwrap())).unwrap();

        let resp = send(&state, form_post("/save/Blocked", "body=x")).await;
        assert_eq!(resp.status(), 500);
        assert_eq!(body_text(resp).await, "500 Internal Server Error");
    }
}
