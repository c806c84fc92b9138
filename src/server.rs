//! HTTP/1.1 transport.
//!
//! One request per connection: the request line, headers and a
//! `Content-Length` body are read, the request is dispatched, and the
//! response is written with `Connection: close`.

use crate::app::Dispatcher;
use crate::http::response::reason_phrase;
use crate::http::{Method, Request, Response};
use serde_json::json;
use std::future::Future;
use std::io::{self, Error};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error as ThisError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub const MAX_BODY_BYTES: usize = 1024 * 1024;
const MAX_HEADERS: usize = 100;

/// Why a request could not be read off the connection.
#[derive(Debug, ThisError)]
enum ReadError {
    #[error("{0}")]
    Malformed(&'static str),
    #[error("request body too large")]
    TooLarge,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    max_connections: usize,
}

impl Server {
    pub async fn bind(addr: &str, dispatcher: Dispatcher) -> Result<Server, Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Server {
            listener,
            dispatcher: Arc::new(dispatcher),
            max_connections: 256,
        })
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener.local_addr()
    }

    pub async fn serve(self) -> Result<(), Error> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!(%addr, max_connections = self.max_connections, "server listening");

        let permits = Arc::new(Semaphore::new(self.max_connections));
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(&dispatcher, stream).await {
                    debug!(%peer, error = %e, "connection error");
                }
                drop(permit);
            });
        }

        info!("server stopped accepting connections");
        Ok(())
    }
}

async fn handle_connection(dispatcher: &Dispatcher, mut stream: TcpStream) -> Result<(), Error> {
    let response = match read_request(dispatcher, &mut stream).await {
        Ok(Some(mut request)) => {
            let mut response = Response::new();
            dispatcher.dispatch(&mut request, &mut response).await;
            response
        }
        Ok(None) => return Ok(()),
        Err(err) => rejection(err)?,
    };

    write_response(&mut stream, &response).await
}

/// The response for a request that could not be read. Transport failures
/// are passed back: there is nobody left to answer.
fn rejection(err: ReadError) -> Result<Response, Error> {
    let (status, message) = match err {
        ReadError::Malformed(message) => (400, message),
        ReadError::TooLarge => (413, "request body too large"),
        // non-UTF-8 request line or header
        ReadError::Io(e) if e.kind() == io::ErrorKind::InvalidData => (400, "invalid request"),
        ReadError::Io(e) => return Err(e),
    };
    debug!(status, error = message, "rejecting request");
    let mut response = Response::new();
    response.status(status).send(json!({ "error": message }));
    Ok(response)
}

/// Reads one request. `Ok(None)` means the peer closed before sending anything.
async fn read_request<S>(dispatcher: &Dispatcher, stream: &mut S) -> Result<Option<Request>, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut buf_reader = BufReader::new(stream);
    let mut request_line = String::new();
    buf_reader.read_line(&mut request_line).await?;

    if request_line.is_empty() {
        return Ok(None);
    }

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or(ReadError::Malformed("invalid request line"))?;
    let method = Method::from_string(method).ok_or(ReadError::Malformed("unsupported method"))?;
    let target = parts
        .next()
        .ok_or(ReadError::Malformed("invalid request line"))?;

    let mut request = dispatcher.request(method, target);

    let mut header_count = 0;
    loop {
        let mut line = String::new();
        if buf_reader.read_line(&mut line).await? == 0 || line.trim().is_empty() {
            break;
        }
        header_count += 1;
        if header_count > MAX_HEADERS {
            return Err(ReadError::Malformed("too many headers"));
        }
        if let Some((key, value)) = line.trim().split_once(':') {
            request
                .headers
                .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    if let Some(content_length) = request.get_header("content-length") {
        let length: usize = content_length
            .parse()
            .map_err(|_| ReadError::Malformed("invalid content-length"))?;
        if length > MAX_BODY_BYTES {
            return Err(ReadError::TooLarge);
        }
        let mut body = Vec::with_capacity(length);
        buf_reader.take(length as u64).read_to_end(&mut body).await?;
        request.raw_body = body;
    }

    Ok(Some(request))
}

async fn write_response<S>(stream: &mut S, response: &Response) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    let status = response.status_code();
    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
    for (name, value) in response.headers() {
        head += &format!("{}: {}\r\n", name, value);
    }
    head += &format!("Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now()));
    head += &format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body().len()
    );

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(response.body().as_bytes()).await?;
    stream.flush().await.map_err(|e| {
        error!(error = %e, "failed to flush response");
        e
    })
}
