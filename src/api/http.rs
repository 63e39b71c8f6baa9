//! HTTP implementation of the orchestrator client
//!
//! Plain REST against the platform's resource API under
//! `/apis/gamenet.io/v1`. Watch is a JSON-lines stream on the collection
//! endpoint with `?watch=true`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;

use super::resources::{Exposure, GameServer, ResourceList, WatchEvent};
use super::{ApiError, OrchestratorClient, WatchStream};

/// REST client for the orchestration platform
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn collection_url(&self, resource: &str, namespace: Option<&str>) -> String {
        let base = self.base_url.trim_end_matches('/');
        match namespace {
            Some(ns) => format!("{}/apis/gamenet.io/v1/namespaces/{}/{}", base, ns, resource),
            None => format!("{}/apis/gamenet.io/v1/{}", base, resource),
        }
    }

    fn object_url(&self, resource: &str, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.collection_url(resource, Some(namespace)), name)
    }

    /// Map a response to a decoded body, translating status codes
    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<T, ApiError> {
        let response = Self::check(response, kind, namespace, name).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn check(
        response: reqwest::Response,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status.as_u16() {
            404 => Err(ApiError::not_found(kind, namespace, name)),
            409 => Err(ApiError::already_exists(kind, namespace, name)),
            code => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".to_string());
                Err(ApiError::Status {
                    status: code,
                    message,
                })
            }
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        request
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))
    }
}

#[async_trait]
impl OrchestratorClient for HttpClient {
    async fn list_exposures(&self, namespace: Option<&str>) -> Result<Vec<Exposure>, ApiError> {
        let url = self.collection_url("exposures", namespace);
        let response = self.send(self.client.get(&url)).await?;
        let list: ResourceList<Exposure> =
            Self::decode(response, "ExposureList", namespace.unwrap_or(""), "").await?;
        Ok(list.items)
    }

    async fn get_exposure(&self, namespace: &str, name: &str) -> Result<Exposure, ApiError> {
        let url = self.object_url("exposures", namespace, name);
        let response = self.send(self.client.get(&url)).await?;
        Self::decode(response, "Exposure", namespace, name).await
    }

    async fn create_exposure(&self, exposure: &Exposure) -> Result<Exposure, ApiError> {
        let url = self.collection_url("exposures", Some(&exposure.metadata.namespace));
        let response = self.send(self.client.post(&url).json(exposure)).await?;
        Self::decode(
            response,
            "Exposure",
            &exposure.metadata.namespace,
            &exposure.metadata.name,
        )
        .await
    }

    async fn update_exposure(&self, exposure: &Exposure) -> Result<Exposure, ApiError> {
        let url = self.object_url(
            "exposures",
            &exposure.metadata.namespace,
            &exposure.metadata.name,
        );
        let response = self.send(self.client.put(&url).json(exposure)).await?;
        Self::decode(
            response,
            "Exposure",
            &exposure.metadata.namespace,
            &exposure.metadata.name,
        )
        .await
    }

    async fn delete_exposure(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
        let url = self.object_url("exposures", namespace, name);
        let response = self.send(self.client.delete(&url)).await?;
        Self::check(response, "Exposure", namespace, name).await?;
        Ok(())
    }

    async fn update_game_server(&self, gs: &GameServer) -> Result<GameServer, ApiError> {
        let url = self.object_url("gameservers", gs.namespace(), gs.name());
        let response = self.send(self.client.put(&url).json(gs)).await?;
        Self::decode(response, "GameServer", gs.namespace(), gs.name()).await
    }

    async fn watch_game_servers(&self, namespace: Option<&str>) -> Result<WatchStream, ApiError> {
        let url = format!("{}?watch=true", self.collection_url("gameservers", namespace));
        let response = self.send(self.client.get(&url)).await?;
        let response =
            Self::check(response, "GameServerList", namespace.unwrap_or(""), "").await?;

        // JSON-lines framing: one WatchEvent per newline-delimited chunk.
        let body = Box::pin(response.bytes_stream());
        let stream = futures::stream::try_unfold(
            (body, Vec::<u8>::new()),
            |(mut body, mut buffer)| async move {
                loop {
                    if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=pos).collect();
                        let line = &line[..line.len() - 1];
                        if line.is_empty() {
                            continue;
                        }
                        let event: WatchEvent<GameServer> = serde_json::from_slice(line)
                            .map_err(|e| ApiError::Decode(e.to_string()))?;
                        return Ok(Some((event, (body, buffer))));
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                        Some(Err(e)) => return Err(ApiError::Http(e.to_string())),
                        None => return Ok(None),
                    }
                }
            },
        );
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve one canned HTTP response on an ephemeral local port
    async fn serve_response(status_line: &'static str, body: String) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_missing_object_maps_to_not_found() {
        let base = serve_response("404 Not Found", String::new()).await;
        let client = HttpClient::new(base);

        let err = client.get_exposure("default", "gs-0").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_conflict_maps_to_already_exists() {
        let base = serve_response("409 Conflict", String::new()).await;
        let client = HttpClient::new(base);

        let err = client
            .create_exposure(&Exposure::new("gs-0", "default"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_other_status_carries_code_and_body() {
        let base = serve_response("500 Internal Server Error", "boom".to_string()).await;
        let client = HttpClient::new(base);

        let err = client.get_exposure("default", "gs-0").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Status {
                status: 500,
                ref message
            } if message == "boom"
        ));
    }

    #[tokio::test]
    async fn test_success_decodes_object() {
        let body = serde_json::to_string(&Exposure::new("gs-0", "default")).unwrap();
        let base = serve_response("200 OK", body).await;
        let client = HttpClient::new(base);

        let exposure = client.get_exposure("default", "gs-0").await.unwrap();
        assert_eq!(exposure.metadata.name, "gs-0");
    }

    #[test]
    fn test_collection_url() {
        let client = HttpClient::new("http://localhost:8181/");
        assert_eq!(
            client.collection_url("exposures", Some("default")),
            "http://localhost:8181/apis/gamenet.io/v1/namespaces/default/exposures"
        );
        assert_eq!(
            client.collection_url("exposures", None),
            "http://localhost:8181/apis/gamenet.io/v1/exposures"
        );
    }

    #[test]
    fn test_object_url() {
        let client = HttpClient::new("http://localhost:8181");
        assert_eq!(
            client.object_url("gameservers", "default", "gs-0"),
            "http://localhost:8181/apis/gamenet.io/v1/namespaces/default/gameservers/gs-0"
        );
    }
}
