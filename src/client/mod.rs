use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use url::Url;
use crate::core::{
    ContentRecord,
    InitializeRequest,
    Result,
    TokenProvider,
    UploadApi,
    UploadError,
};

const INITIALIZE_PATH: &str = "api/upload/initialize";
const CHUNK_PATH: &str = "api/upload/chunk";
const FINALIZE_PATH: &str = "api/upload/finalize";
const CONTENT_CREATE_PATH: &str = "api/content/create";

/// 基于 reqwest 的远端上传接口
#[derive(Clone)]
pub struct HttpUploadApi {
    client: Client,
    base: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpUploadApi {
    pub fn new(endpoint: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::with_client(Client::new(), endpoint, tokens)
    }

    pub fn with_client(client: Client, endpoint: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        // join 会替换掉最后一段路径，这里保证以 / 结尾
        let mut endpoint = endpoint.trim().to_string();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let base = Url::parse(&endpoint)?;

        Ok(Self {
            client,
            base,
            tokens,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn check(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            format!("{} failed", action)
        } else {
            format!("{} failed: {}", action, body)
        };

        Err(UploadError::server_error(status.as_u16(), message))
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T, action: &str) -> Result<serde_json::Value> {
        let request = self.client.post(self.url(path)?).json(body);
        let response = self.authorized(request).await?.send().await?;
        let response = Self::check(response, action).await?;

        Ok(response.json().await?)
    }

    fn string_field(value: &serde_json::Value, field: &str) -> Result<String> {
        match &value[field] {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            _ => Err(UploadError::invalid_response(format!("No {} in response", field))),
        }
    }
}

#[async_trait]
impl UploadApi for HttpUploadApi {
    async fn initialize(&self, request: &InitializeRequest) -> Result<String> {
        let result = self.post_json(INITIALIZE_PATH, request, "Initialize upload").await?;
        Self::string_field(&result, "uploadId")
    }

    async fn upload_chunk(&self, upload_id: &str, chunk_index: usize, chunk: Bytes) -> Result<()> {
        let part = Part::bytes(chunk.to_vec())
            .file_name(format!("chunk-{}", chunk_index))
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("uploadId", upload_id.to_string())
            .text("chunkIndex", chunk_index.to_string())
            .part("chunk", part);

        let request = self.client.post(self.url(CHUNK_PATH)?).multipart(form);
        let response = self.authorized(request).await?.send().await?;
        Self::check(response, &format!("Upload chunk {}", chunk_index)).await?;

        Ok(())
    }

    async fn finalize(&self, upload_id: &str) -> Result<String> {
        let body = serde_json::json!({ "uploadId": upload_id });
        let result = self.post_json(FINALIZE_PATH, &body, "Finalize upload").await?;
        Self::string_field(&result, "fileUrl")
    }

    async fn create_content(&self, record: &ContentRecord) -> Result<String> {
        let result = self.post_json(CONTENT_CREATE_PATH, record, "Create content").await?;
        Self::string_field(&result, "contentId")
    }
}
