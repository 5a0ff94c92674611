//! Loopback redirect listener
//!
//! A temporary local HTTP server standing in for the page the provider
//! redirects back to. It answers the browser and hands the full callback
//! address to the caller, which then treats it as a fresh page load.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use crate::Result;
use crate::error::Error;

/// Default loopback port
pub const DEFAULT_PORT: u16 = 8085;

const SIGNED_IN_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>octoauth | Signed in</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; margin-top: 20vh">
    <h1>GitHub sign-in received</h1>
    <p>You can close this window and return to your terminal.</p>
</body>
</html>"#;

const FAILED_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>octoauth | Sign-in failed</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; margin-top: 20vh">
    <h1>GitHub sign-in did not complete</h1>
    <p>Check your terminal for details.</p>
</body>
</html>"#;

/// Root of the loopback listener, usable as the redirect URI
pub fn loopback_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/", port)
}

/// Claim the loopback port
///
/// Done before the browser is sent away, so a busy port fails fast.
pub async fn bind_loopback(port: u16) -> Result<TcpListener> {
    let addr = format!("127.0.0.1:{}", port);
    TcpListener::bind(&addr).await
        .map_err(|e| Error::Config(format!("Failed to listen on {}: {}", addr, e)))
}

/// Wait for the provider to redirect the browser back to the bound port
///
/// Requests that carry neither `code` nor `error` (favicon and the like)
/// get a 404 and the listener keeps waiting.
pub async fn wait_for_redirect(listener: TcpListener) -> Result<Url> {
    let port = listener.local_addr()?.port();
    tracing::info!("Waiting for GitHub redirect on http://127.0.0.1:{}", port);

    loop {
        let (mut socket, _) = listener.accept().await?;

        let mut buffer = vec![0u8; 8192];
        let n = socket.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..n]);

        let callback = match parse_request_target(&request, port) {
            Some(url) if is_callback(&url) => url,
            _ => {
                let _ = respond(&mut socket, "404 Not Found", "").await;
                continue;
            }
        };

        let failed = callback.query_pairs().any(|(key, _)| key == "error");
        let (status, body) = if failed {
            ("400 Bad Request", FAILED_HTML)
        } else {
            ("200 OK", SIGNED_IN_HTML)
        };
        let _ = respond(&mut socket, status, body).await;

        return Ok(callback);
    }
}

async fn respond(socket: &mut tokio::net::TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// Rebuild the absolute address from `GET /path?query HTTP/1.1`
fn parse_request_target(request: &str, port: u16) -> Option<Url> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();

    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    if !target.starts_with('/') {
        return None;
    }

    Url::parse(&format!("http://127.0.0.1:{}{}", port, target)).ok()
}

fn is_callback(url: &Url) -> bool {
    url.query_pairs()
        .any(|(key, value)| (key == "code" || key == "error") && !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_target() {
        let request = "GET /?code=abc123&state=xyz789 HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";
        let url = parse_request_target(request, 8085).unwrap();

        assert_eq!(url.as_str(), "http://127.0.0.1:8085/?code=abc123&state=xyz789");
        assert!(is_callback(&url));
    }

    #[test]
    fn test_parse_error_target() {
        let request = "GET /?error=access_denied&error_description=User+denied HTTP/1.1\r\n\r\n";
        let url = parse_request_target(request, 8085).unwrap();
        assert!(is_callback(&url));
    }

    #[test]
    fn test_ignores_other_requests() {
        let favicon = parse_request_target("GET /favicon.ico HTTP/1.1\r\n\r\n", 8085).unwrap();
        assert!(!is_callback(&favicon));

        assert!(parse_request_target("POST /?code=x HTTP/1.1\r\n\r\n", 8085).is_none());
        assert!(parse_request_target("", 8085).is_none());
    }

    #[test]
    fn test_loopback_url() {
        assert_eq!(loopback_url(8085), "http://127.0.0.1:8085/");
    }

    #[tokio::test]
    async fn test_receives_redirect() {
        let listener = bind_loopback(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(wait_for_redirect(listener));

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"GET /?code=abc123&state=s1 HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));

        let url = server.await.unwrap().unwrap();
        assert_eq!(url.query(), Some("code=abc123&state=s1"));
        assert_eq!(url.port(), Some(port));
    }

    #[tokio::test]
    async fn test_busy_port_fails_to_bind() {
        let taken = bind_loopback(0).await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = bind_loopback(port).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(&port.to_string()));
    }
}
