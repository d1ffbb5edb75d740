//! HTTP client for the RAG backend. The backend owns retrieval, indexing
//! and agent execution; this side only speaks its REST surface and decodes
//! its event stream.

use async_trait::async_trait;
use reqwest::Client;
use std::pin::Pin;


use crate::core::error::ClientError;
use crate::protocol::{FrameDecoder, Framing, StreamEvent};

pub type EventStream =
    Pin<Box<dyn futures_core::Stream<Item = Result<StreamEvent, ClientError>> + Send>>;

/// Seam for the backend so the render loop and tests can run against a
/// scripted event source.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stream the answer for a query as decoded protocol events. The last
    /// event of a successful turn is always `final`.
    async fn stream_query(&self, rag: &str, query: &str) -> Result<EventStream, ClientError>;

    /// Non-streaming variant: the whole answer as one string.
    async fn query(&self, rag: &str, query: &str) -> Result<String, ClientError>;

    async fn list_rags(&self) -> Result<Vec<String>, ClientError>;

    /// (Re)build the index for `rag` from its uploaded documents.
    async fn create_rag(&self, rag: &str) -> Result<(), ClientError>;

    async fn delete_rag(&self, rag: &str) -> Result<(), ClientError>;

    async fn list_files(&self, rag: &str) -> Result<Vec<String>, ClientError>;

    async fn upload_file(
        &self,
        rag: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError>;

    async fn delete_file(&self, rag: &str, filename: &str) -> Result<(), ClientError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    framing: Framing,
}

impl HttpBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            framing: Framing::Ndjson,
        }
    }

    /// Legacy backends stream plain answer text instead of records.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Map a non-2xx response to an API error carrying the body text.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status().as_u16();
    if resp.status().is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(ClientError::Api { status, message })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn stream_query(&self, rag: &str, query: &str) -> Result<EventStream, ClientError> {
        let resp = self
            .client
            .post(self.url(&format!("/rag/{rag}/stream")))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let resp = check(resp).await?;

        let byte_stream = resp.bytes_stream();
        let framing = self.framing;

        let stream = async_stream::stream! {
            use tokio_stream::StreamExt;

            let mut byte_stream = Box::pin(byte_stream);
            let mut decoder = FrameDecoder::new(framing);

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(ClientError::Stream(e.to_string()));
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    yield Ok(event);
                }
            }

            if let Some(event) = decoder.finish() {
                yield Ok(event);
            }
        };

        Ok(Box::pin(stream))
    }

    async fn query(&self, rag: &str, query: &str) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(self.url(&format!("/rag/{rag}/query")))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))
    }

    async fn list_rags(&self) -> Result<Vec<String>, ClientError> {
        let resp = self
            .client
            .get(self.url("/rag"))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))
    }

    async fn create_rag(&self, rag: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url(&format!("/rag/{rag}")))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        check(resp).await?;
        Ok(())
    }

    async fn delete_rag(&self, rag: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/rag/{rag}")))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        check(resp).await?;
        Ok(())
    }

    async fn list_files(&self, rag: &str) -> Result<Vec<String>, ClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/rag/{rag}/files")))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))
    }

    async fn upload_file(
        &self,
        rag: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url(&format!("/rag/{rag}/files")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        check(resp).await?;
        Ok(())
    }

    async fn delete_file(&self, rag: &str, filename: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/rag/{rag}/files/{filename}")))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        check(resp).await?;
        Ok(())
    }
}
