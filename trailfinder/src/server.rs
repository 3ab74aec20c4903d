/// HTTP surface: `GET /trails?restrooms=yes&picnic=yes`.
///
/// Each query parameter is the lowercase name of a trail attribute; missing or
/// empty parameters leave that attribute unconstrained. Responses:
///
/// | Outcome                 | Status | Body                                          |
/// |-------------------------|--------|-----------------------------------------------|
/// | matches                 | 200    | JSON array of trails                          |
/// | no matches              | 404    | JSON string `"No trails found matching the criteria."` |
/// | source or parse failure | 500    | error message                                 |
///
/// Requests are served by a fixed set of worker threads, each running the
/// whole pipeline for its request.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

use crate::engine::TrailFinder;
use crate::errors::{TrailError, TrailResult};
use crate::filters::Criteria;
use crate::trail::{Field, Trail};

/// Path of the only endpoint
pub const TRAILS_PATH: &str = "/trails";

/// Message for an empty result, on the CLI and in 404 bodies
pub const NO_MATCHES_MESSAGE: &str = "No trails found matching the criteria.";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Consecutive receive errors after which a worker exits
const MAX_RECV_FAILURES: u32 = 5;
const RECV_RETRY_DELAY: Duration = Duration::from_millis(50);

/// A response before it is written to the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpReply {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE,
            body,
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE,
            body: body.into(),
        }
    }
}

/// Builds criteria from a raw query string, one entry per known attribute.
/// A repeated parameter keeps its first value.
pub fn criteria_from_query(query: &str) -> Criteria {
    let pairs = url::form_urlencoded::parse(query.as_bytes());
    let mut params: HashMap<String, String> = HashMap::new();
    for (key, value) in pairs.into_owned() {
        params.entry(key).or_insert(value);
    }

    Criteria::from_query_pairs(Field::ALL.into_iter().map(|field| {
        let key = field.query_key();
        let value = params.get(&key).cloned().unwrap_or_default();
        (key, value)
    }))
}

/// Renders a finished lookup the way the endpoint reports it
pub fn reply_for(result: TrailResult<Vec<Trail>>) -> HttpReply {
    let trails = match result {
        Ok(trails) => trails,
        Err(e) => return HttpReply::text(500, e.to_string()),
    };

    let encoded = if trails.is_empty() {
        serde_json::to_string(NO_MATCHES_MESSAGE).map(|body| (404, body))
    } else {
        serde_json::to_string(&trails).map(|body| (200, body))
    };

    match encoded {
        Ok((status, body)) => HttpReply::json(status, body),
        Err(e) => HttpReply::text(500, TrailError::from(e).to_string()),
    }
}

/// Routes one request and runs the lookup for `/trails`
pub fn handle_trails(finder: &TrailFinder, method: &Method, url: &str) -> HttpReply {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    if path != TRAILS_PATH {
        return HttpReply::text(404, "404 page not found");
    }
    if *method != Method::Get {
        return HttpReply::text(405, "405 method not allowed");
    }

    let criteria = criteria_from_query(query);
    debug!("Criteria: {:?}", criteria);
    reply_for(finder.find(&criteria))
}

/// Blocking HTTP server around a shared [`TrailFinder`]
pub struct TrailServer {
    server: Server,
    finder: TrailFinder,
    shutting_down: AtomicBool,
}

impl TrailServer {
    /// Binds to the finder's configured `bind_address:port`
    pub fn bind(finder: TrailFinder) -> TrailResult<Self> {
        let address = finder.config().listen_address();
        let server = Server::http(&address)
            .map_err(|e| TrailError::server_error(format!("failed to bind {}: {}", address, e)))?;

        Ok(Self {
            server,
            finder,
            shutting_down: AtomicBool::new(false),
        })
    }

    /// The bound socket address; useful when binding port 0
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serves requests until [`TrailServer::shutdown`] is called
    pub fn run(&self) -> TrailResult<()> {
        let workers = self.finder.config().server_workers.get();
        match self.local_addr() {
            Some(addr) => info!("Server is running on {} ({} workers)", addr, workers),
            None => info!("Server is running ({} workers)", workers),
        }

        thread::scope(|scope| {
            for i in 0..workers {
                let spawned = thread::Builder::new()
                    .name(format!("http-worker-{}", i))
                    .spawn_scoped(scope, || self.worker_loop());
                if let Err(e) = spawned {
                    // Workers already running would keep the scope open
                    self.shutdown();
                    return Err(e);
                }
            }
            Ok::<(), std::io::Error>(())
        })?;

        info!("Server stopped");
        Ok(())
    }

    /// Stops every worker after its current request
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        for _ in 0..self.finder.config().server_workers.get() {
            self.server.unblock();
        }
    }

    pub fn finder(&self) -> &TrailFinder {
        &self.finder
    }

    fn worker_loop(&self) {
        let mut failures = 0;
        loop {
            match self.server.recv() {
                Ok(request) => {
                    failures = 0;
                    self.respond(request);
                }
                Err(e) => {
                    if self.shutting_down.load(Ordering::SeqCst) {
                        break;
                    }
                    failures += 1;
                    if failures >= MAX_RECV_FAILURES {
                        error!("Worker stopping after {} failed receives: {}", failures, e);
                        break;
                    }
                    warn!("Failed to receive request: {}", e);
                    thread::sleep(RECV_RETRY_DELAY * failures);
                }
            }
        }
    }

    fn respond(&self, request: Request) {
        let reply = handle_trails(&self.finder, request.method(), request.url());
        debug!(
            "{:?} {} -> {}",
            request.method(),
            request.url(),
            reply.status
        );

        let mut response =
            Response::from_string(reply.body).with_status_code(StatusCode(reply.status));
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        {
            response = response.with_header(header);
        }

        if let Err(e) = request.respond(response) {
            error!("Failed to write response: {}", e);
        }
    }
}
