use log::{debug, info};

use super::{SchemaResponse, SigningSchema};
use crate::config::{ActionClientConfig, PrimaryTypeRule};
use crate::prelude::Result;
use crate::req::{HttpClient, RequestFailure};
use crate::Error;

/// Reads signing schemas from the Action Schema Service.
///
/// Every call hits the service. Schemas are never cached: a signature must be
/// made under the domain and types the server currently serves.
#[derive(Debug, Clone)]
pub struct SchemaFetcher {
    http_client: HttpClient,
    schema_path: String,
    primary_type: PrimaryTypeRule,
}

impl SchemaFetcher {
    pub fn new(http_client: HttpClient, config: &ActionClientConfig) -> Self {
        SchemaFetcher {
            http_client,
            schema_path: config.schema_path(),
            primary_type: config.primary_type.clone(),
        }
    }

    pub async fn fetch(&self, action_name: &str) -> Result<SigningSchema> {
        validate_action_name(action_name)?;

        let url_path = format!("{}/{action_name}", self.schema_path);
        debug!("Fetching signing schema from {url_path}");

        let body = self
            .http_client
            .get(&url_path)
            .await
            .map_err(|failure| match failure {
                RequestFailure::Transport(reason) => Error::SchemaUnavailable {
                    action: action_name.to_string(),
                    status: None,
                    reason,
                },
                RequestFailure::Status { status_code, body } => Error::SchemaUnavailable {
                    action: action_name.to_string(),
                    status: Some(status_code),
                    reason: body,
                },
            })?;

        let response: SchemaResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedSchema(format!("{action_name}: {e}")))?;
        let schema = response.into_schema(self.primary_type.primary_type_for(action_name))?;

        info!(
            "Fetched signing schema for {action_name}: primary type {}, {} type(s)",
            schema.primary_type(),
            schema.types().len()
        );
        Ok(schema)
    }
}

/// Action names are interpolated into URL paths, so they must be a single
/// non-empty path segment.
pub(crate) fn validate_action_name(action_name: &str) -> Result<()> {
    let valid = !action_name.is_empty()
        && action_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidActionName(action_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::sample_schema;
    use ethers::types::U256;
    use mockito::Server;
    use serde_json::json;

    fn fetcher_for(url: String) -> SchemaFetcher {
        let config = ActionClientConfig::default().with_base_url(url.clone());
        SchemaFetcher::new(HttpClient::new(reqwest::Client::new(), url), &config)
    }

    fn create_schema_body() -> String {
        json!({
            "eip712Types": {
                "createAccount": [{ "name": "address", "type": "address" }]
            },
            "domain": {
                "name": "App",
                "version": "1",
                "chainId": 11155111,
                "verifyingContract": "0x0000000000000000000000000000000000000001"
            }
        })
        .to_string()
    }

    #[test]
    fn test_action_name_validation() {
        assert!(validate_action_name("create").is_ok());
        assert!(validate_action_name("create_v2-beta").is_ok());
        assert!(matches!(validate_action_name(""), Err(Error::InvalidActionName(_))));
        assert!(validate_action_name("../admin").is_err());
        assert!(validate_action_name("create?x=1").is_err());
    }

    #[tokio::test]
    async fn test_fetch_schema() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/getEIP712Types/create")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(create_schema_body())
            .expect(1)
            .create_async()
            .await;

        let schema = fetcher_for(server.url()).fetch("create").await.unwrap();
        assert_eq!(schema, sample_schema());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_is_never_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/getEIP712Types/create")
            .with_status(200)
            .with_body(create_schema_body())
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher_for(server.url());
        fetcher.fetch("create").await.unwrap();
        fetcher.fetch("create").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_schema_unavailable() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/getEIP712Types/create")
            .with_status(500)
            .with_body("Internal Server Error")
            .expect(1)
            .create_async()
            .await;

        match fetcher_for(server.url()).fetch("create").await {
            Err(Error::SchemaUnavailable {
                action,
                status,
                reason,
            }) => {
                assert_eq!(action, "create");
                assert_eq!(status, Some(500));
                assert_eq!(reason, "Internal Server Error");
            }
            other => panic!("Expected SchemaUnavailable, got {other:?}"),
        }
        // No retry at this layer.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_service_is_schema_unavailable() {
        let err = fetcher_for("http://127.0.0.1:1".to_string())
            .fetch("create")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SchemaUnavailable { status: None, .. }));
    }

    #[tokio::test]
    async fn test_malformed_bodies() {
        let bodies = [
            "not json".to_string(),
            json!({ "domain": { "name": "App" } }).to_string(),
            json!({ "eip712Types": { "createAccount": [] } }).to_string(),
            json!({
                "eip712Types": { "somethingElse": [] },
                "domain": { "name": "App" }
            })
            .to_string(),
            json!({
                "eip712Types": { "createAccount": "address" },
                "domain": { "name": "App" }
            })
            .to_string(),
        ];

        for body in bodies {
            let mut server = Server::new_async().await;
            let _mock = server
                .mock("GET", "/getEIP712Types/create")
                .with_status(200)
                .with_body(body.clone())
                .create_async()
                .await;

            let result = fetcher_for(server.url()).fetch("create").await;
            assert!(
                matches!(result, Err(Error::MalformedSchema(_))),
                "body {body} gave {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_custom_schema_path_and_primary_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/types/create")
            .with_status(200)
            .with_body(
                json!({
                    "eip712Types": { "Create": [{ "name": "address", "type": "address" }] },
                    "domain": { "name": "App", "chainId": 11155111 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let config = ActionClientConfig::default()
            .with_base_url(server.url())
            .with_schema_path("/v2/types/")
            .with_primary_type(PrimaryTypeRule::Fixed("Create".to_string()));
        let fetcher = SchemaFetcher::new(HttpClient::new(reqwest::Client::new(), server.url()), &config);

        let schema = fetcher.fetch("create").await.unwrap();
        assert_eq!(schema.primary_type(), "Create");
        assert_eq!(schema.domain().chain_id, Some(U256::from(11155111u64)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_action_name_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = fetcher_for(server.url()).fetch("").await.unwrap_err();
        assert!(matches!(err, Error::InvalidActionName(_)));
        mock.assert_async().await;
    }
}
