//! DashScope (Alibaba Cloud) client implementation

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::response_handling::ensure_success;
use crate::types::{GenerationPayload, MessagesInput};
use crate::{
    relay, ChatParams, FragmentStream, GenerationClient, ImageParams, ProviderConfig,
    ProviderError, ProviderResult, TextParams,
};

const TEXT_GENERATION_PATH: &str = "/services/aigc/text-generation/generation";
const IMAGE_GENERATION_PATH: &str = "/services/aigc/image-generation/generation";

/// Toggles SSE framing of the response body.
const SSE_HEADER: &str = "X-DashScope-SSE";

const TEXT_RESULT_POINTER: &str = "/output/choices/0/message/content";
const IMAGE_RESULT_POINTER: &str = "/output/results/0/url";

/// DashScope API client
pub struct DashScopeClient {
    client: Client,
    config: ProviderConfig,
}

impl DashScopeClient {
    /// Builds the HTTP client. A missing API key is not an error here; it
    /// surfaces on the first call so the server can still start.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        config.validate().map_err(ProviderError::Configuration)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Only the connect phase is bounded globally. Streams may run as long
        // as the model keeps talking; one-shot calls set their own timeout.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self { client, config })
    }

    fn api_key(&self) -> ProviderResult<&SecretString> {
        self.config
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| ProviderError::Configuration("AliCloud API key not configured".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url_trimmed(), path)
    }

    fn request(&self, path: &str, stream: bool) -> ProviderResult<RequestBuilder> {
        let api_key = self.api_key()?;
        let sse = if stream { "enable" } else { "disable" };

        Ok(self
            .client
            .post(self.url(path))
            .header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
            .header(SSE_HEADER, sse))
    }

    async fn fetch_json(&self, request: RequestBuilder) -> ProviderResult<Value> {
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

fn extract_string(data: &Value, pointer: &str) -> ProviderResult<String> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("unexpected response format: {}", data)))
}

#[async_trait]
impl GenerationClient for DashScopeClient {
    fn ensure_configured(&self) -> ProviderResult<()> {
        self.api_key().map(|_| ())
    }

    async fn chat_stream(&self, params: ChatParams) -> ProviderResult<FragmentStream> {
        let request = self
            .request(TEXT_GENERATION_PATH, true)?
            .header(ACCEPT, "text/event-stream")
            .json(&params.payload());

        debug!(
            model = %params.model,
            messages = params.messages.len(),
            "opening DashScope chat stream"
        );

        let response = ensure_success(request.send().await?).await?;
        Ok(Box::pin(relay::fragments(response.bytes_stream())))
    }

    async fn generate_text(&self, params: TextParams) -> ProviderResult<String> {
        let messages = params.messages();
        let payload = GenerationPayload {
            model: &params.model,
            input: MessagesInput {
                messages: &messages,
            },
            parameters: params.parameters(),
        };
        let request = self
            .request(TEXT_GENERATION_PATH, false)?
            .timeout(self.config.text_timeout())
            .json(&payload);

        debug!(model = %params.model, max_tokens = params.max_tokens, "generating text");
        let data = self.fetch_json(request).await?;
        extract_string(&data, TEXT_RESULT_POINTER)
    }

    async fn generate_image(&self, params: ImageParams) -> ProviderResult<String> {
        let request = self
            .request(IMAGE_GENERATION_PATH, false)?
            .timeout(self.config.image_timeout())
            .json(&params.payload());

        debug!(model = %params.model, size = %params.size(), "generating image");
        let data = self.fetch_json(request).await?;
        extract_string(&data, IMAGE_RESULT_POINTER)
    }

    fn provider(&self) -> &str {
        "dashscope"
    }
}
