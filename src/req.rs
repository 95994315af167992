use log::debug;
use reqwest::{Client, Response};

/// Outcome of a request that did not produce a 2xx response. Callers turn this
/// into the error variant that fits the step they are performing.
#[derive(Debug)]
pub(crate) enum RequestFailure {
    Transport(String),
    Status { status_code: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub base_url: String,
}

async fn parse_response(response: Response) -> Result<String, RequestFailure> {
    let status_code = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| RequestFailure::Transport(e.to_string()))?;

    if (200..300).contains(&status_code) {
        return Ok(text);
    }

    debug!("Request failed with status {status_code}: {text}");
    Err(RequestFailure::Status {
        status_code,
        body: text,
    })
}

impl HttpClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        HttpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) async fn get(&self, url_path: &str) -> Result<String, RequestFailure> {
        let full_url = format!("{}{url_path}", self.base_url);
        let request = self
            .client
            .get(full_url)
            .build()
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        let result = self
            .client
            .execute(request)
            .await
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        parse_response(result).await
    }

    pub(crate) async fn post(&self, url_path: &str, data: String) -> Result<String, RequestFailure> {
        let full_url = format!("{}{url_path}", self.base_url);
        let request = self
            .client
            .post(full_url)
            .header("Content-Type", "application/json")
            .body(data)
            .build()
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        let result = self
            .client
            .execute(request)
            .await
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        parse_response(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_trailing_slash_is_trimmed() {
        let client = HttpClient::new(Client::new(), "http://localhost:5050/");
        assert_eq!(client.base_url, "http://localhost:5050");
    }

    #[tokio::test]
    async fn test_post_sends_json_content_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/create")
            .match_header("content-type", "application/json")
            .match_body(r#"{"a":1}"#)
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), server.url());
        let body = client.post("/create", r#"{"a":1}"#.to_string()).await.unwrap();
        assert_eq!(body, "{}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_returns_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), server.url());
        match client.get("/missing").await {
            Err(RequestFailure::Status { status_code, body }) => {
                assert_eq!(status_code, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("Expected status failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        // Nothing listens on port 1.
        let client = HttpClient::new(Client::new(), "http://127.0.0.1:1");
        assert!(matches!(
            client.get("/anything").await,
            Err(RequestFailure::Transport(_))
        ));
    }
}
