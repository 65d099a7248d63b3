//! HTTP front end: `POST` goes to the proxy, `GET`/`HEAD` to static files.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::{field, info, info_span, warn, Instrument};

use crate::proxy::{ClientProvider, Dispatcher, Envelope, ProxyRequest};
use crate::static_files::StaticFiles;
use crate::REGION_HEADER;

/// Everything a request handler needs.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub clients: Arc<dyn ClientProvider>,
    pub files: StaticFiles,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, clients: Arc<dyn ClientProvider>, files: StaticFiles) -> Self {
        Self {
            dispatcher,
            clients,
            files,
        }
    }
}

fn json_response(status: StatusCode, envelope: &Envelope) -> Response<Body> {
    let body = serde_json::to_vec(envelope).unwrap_or_else(|_| br#"{"err":"internal"}"#.to_vec());
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn plain_response(status: StatusCode, text: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(text));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

async fn proxy(state: &AppState, req: Request<Body>) -> Response<Body> {
    let region = req
        .headers()
        .get(REGION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match hyper::body::to_bytes(req.into_body()).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return json_response(
                StatusCode::BAD_REQUEST,
                &Envelope::error("SerializationException", e.to_string()),
            );
        }
    };

    let request = match ProxyRequest::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &Envelope::error("SerializationException", e.to_string()),
            );
        }
    };

    let client = state.clients.client(region.as_deref());
    let envelope = state
        .dispatcher
        .dispatch(client.as_ref(), request)
        .instrument(info_span!("proxy", region = ?region))
        .await;
    json_response(StatusCode::OK, &envelope)
}

async fn assets(state: &AppState, method: &Method, path: &str) -> Response<Body> {
    let file = state.files.serve(path).await;
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(file.body)
    };

    let mut response = Response::new(body);
    *response.status_mut() = file.status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(file.content_type));
    response
}

pub async fn handle(
    state: Arc<AppState>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let span = info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        status = field::Empty
    );

    async move {
        let response = match *req.method() {
            Method::POST => proxy(&state, req).await,
            Method::GET | Method::HEAD => {
                let path = req.uri().path().to_string();
                assets(&state, req.method(), &path).await
            }
            _ => plain_response(StatusCode::METHOD_NOT_ALLOWED, "405 - Method Not Allowed"),
        };
        tracing::Span::current().record("status", response.status().as_u16());
        Ok(response)
    }
    .instrument(span)
    .await
}

/// Serves on an already-bound listener until `shutdown` resolves.
pub async fn run<F>(
    listener: std::net::TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    listener.set_nonblocking(true)?;
    let addr: SocketAddr = listener.local_addr()?;

    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| handle(state.clone(), req)))
        }
    });

    let server = hyper::Server::from_tcp(listener)?
        .serve(make_svc)
        .with_graceful_shutdown(shutdown);

    info!(%addr, "Console listening");
    server.await?;
    info!("Server stopped");
    Ok(())
}
