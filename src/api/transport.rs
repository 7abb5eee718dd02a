use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// A GET request ready to be sent
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
}

/// Raw response: status code and body bytes
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy for non-UTF-8 payloads
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes GET requests. Anything that is not an HTTP response is a `TransportError`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport. `request_timeout` bounds each wait for data from the
    /// server, `resource_timeout` the whole exchange.
    pub fn new(request_timeout: Duration, resource_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .read_timeout(request_timeout)
            .timeout(resource_timeout)
            .user_agent(concat!("forkly/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.get(request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_get_returns_status_and_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("accept", "application/json")
            .with_status(418)
            .with_body("teapot")
            .create_async()
            .await;

        let transport =
            ReqwestTransport::new(Duration::from_secs(5), Duration::from_secs(10)).unwrap();
        let url = Url::parse(&format!("{}/ping", server.url())).unwrap();
        let response = transport
            .get(HttpRequest {
                url,
                headers: vec![("Accept", "application/json".to_string())],
            })
            .await
            .unwrap();

        assert_eq!(response.status, 418);
        assert!(!response.is_success());
        assert_eq!(response.text(), "teapot");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let transport =
            ReqwestTransport::new(Duration::from_secs(1), Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is expected to refuse connections
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = transport
            .get(HttpRequest {
                url,
                headers: Vec::new(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_silent_server_hits_read_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept, then never answer
        std::thread::spawn(move || {
            let _conn = listener.accept();
            std::thread::sleep(std::time::Duration::from_secs(5));
        });

        let transport =
            ReqwestTransport::new(Duration::from_millis(200), Duration::from_secs(60)).unwrap();
        let url = Url::parse(&format!("http://{}/slow", addr)).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(3),
            transport.get(HttpRequest {
                url,
                headers: Vec::new(),
            }),
        )
        .await
        .expect("read timeout did not fire before the resource timeout");

        assert_eq!(result.unwrap_err(), TransportError::Timeout);
    }
}
