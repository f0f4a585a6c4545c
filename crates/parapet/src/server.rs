//! HTTP/1 server loop.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parapet_core::RouteRequest;
use tokio::net::TcpListener;

use crate::app::App;

/// Errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Bind `addr` and serve `app` until the task is dropped.
pub async fn serve(app: Arc<App>, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_listener(app, listener).await
}

/// Serve `app` on an already bound listener.
pub async fn serve_listener(app: Arc<App>, listener: TcpListener) -> Result<(), ServerError> {
    let local = listener.local_addr().map_err(ServerError::LocalAddr)?;
    parapet_telemetry::log_listening!(
        addr = %local,
        mode = %app.pipeline().mode(),
        "listening"
    );

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };

        let app = Arc::clone(&app);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let app = Arc::clone(&app);
                async move { Ok::<_, Infallible>(handle_http(&app, req, Some(peer)).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!(peer = %peer, error = %e, "connection error");
            }
        });
    }
}

/// Convert a hyper request, render it and convert the response back.
///
/// The peer address becomes the request's client address.
pub async fn handle_http<B>(
    app: &App,
    req: Request<B>,
    peer: Option<SocketAddr>,
) -> http::Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            return bad_request("failed to read request body");
        }
    };

    let request = match RouteRequest::new(Request::from_parts(parts, body)) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "invalid request URL");
            return bad_request("invalid request URL");
        }
    };
    if let Some(peer) = peer {
        request.set_client_address(peer.ip().to_string());
    }

    app.handle(request).await.map(Full::new)
}

fn bad_request(message: &'static str) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{ResolvedRoute, RouteResolver};
    use parapet_core::{
        endpoint_fn, ApiContext, ComponentInstance, EndpointOutput, Environment, Pipeline,
        RouteData,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    struct Echo;

    impl RouteResolver for Echo {
        fn resolve(&self, _request: &RouteRequest) -> Option<ResolvedRoute> {
            Some(ResolvedRoute::new(
                RouteData::endpoint("/echo.txt"),
                ComponentInstance::Endpoint(endpoint_fn(|ctx: ApiContext| async move {
                    let body = String::from_utf8_lossy(ctx.request().body()).into_owned();
                    let address = ctx.client_address()?;
                    Ok(EndpointOutput::text(format!("{address} {body}")).into())
                })),
            ))
        }
    }

    fn app() -> App {
        App::new(Pipeline::ssr(Arc::new(Environment::basic())), Arc::new(Echo))
    }

    #[tokio::test]
    async fn tags_peer_and_collects_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/echo.txt")
            .header("host", "localhost")
            .body(Full::new(Bytes::from("ping")))
            .unwrap();
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();

        let response = handle_http(&app(), req, Some(peer)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("127.0.0.1 ping"));
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_listener(Arc::new(app()), listener));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"POST /echo.txt HTTP/1.1\r\nHost: localhost\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi",
            )
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let raw = String::from_utf8(raw).unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.to_ascii_lowercase().contains("content-type: text/plain;charset=utf-8"));
        assert!(raw.ends_with("127.0.0.1 hi"));

        server.abort();
    }
}
