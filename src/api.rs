use anyhow::Result;
use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, NetworkConfig};
use crate::error::LookupError;
use crate::models::WordEntry;

// 与浏览器 encodeURIComponent 保持一致的保留字符
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

/// 单次 HTTP GET，超时由调用方给出
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(concat!("lexicruxx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, TransportError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e.to_string())
            }
        };

        let response = self.client
            .get(url)
            .header("Accept", "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(TransportResponse { status, body })
    }
}

// 单次请求的失败原因
enum AttemptFailure {
    Fatal(LookupError),
    Retryable { reason: String, timed_out: bool },
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    network: NetworkConfig,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        ApiClient {
            transport,
            base_url: config.api.base_url.clone(),
            network: config.network.clone(),
        }
    }

    pub fn definition_url(&self, word: &str) -> String {
        let encoded = utf8_percent_encode(&word.to_lowercase(), COMPONENT).to_string();
        format!("{}{}", self.base_url, encoded)
    }

    /// 查询单词释义，带超时与固定间隔重试
    pub async fn fetch_definition(&self, word: &str) -> Result<Vec<WordEntry>, LookupError> {
        self.fetch_definition_from(word, 0).await
    }

    /// 从第 `first_attempt` 次尝试开始；404 与响应格式错误立即失败，其余错误等待固定间隔后重试
    pub async fn fetch_definition_from(
        &self,
        word: &str,
        first_attempt: u32,
    ) -> Result<Vec<WordEntry>, LookupError> {
        let word = word.to_lowercase();
        let url = self.definition_url(&word);
        let max_retries = self.network.max_retries;

        let mut attempt = first_attempt;
        loop {
            if attempt > first_attempt {
                let delay = self.network.retry_delay();
                info!(word = %word, attempt, max_retries, ?delay, "retrying lookup");
                sleep(delay).await;
            }

            match self.attempt(&word, &url).await {
                Ok(entries) => {
                    if attempt > first_attempt {
                        info!(word = %word, attempt, "retry succeeded");
                    }
                    return Ok(entries);
                }
                Err(AttemptFailure::Fatal(error)) => {
                    warn!(word = %word, attempt = attempt + 1, error = %error, "lookup failed");
                    return Err(error);
                }
                Err(AttemptFailure::Retryable { reason, timed_out }) => {
                    warn!(word = %word, attempt = attempt + 1, reason = %reason, "fetch attempt failed");

                    if attempt >= max_retries {
                        let attempts = attempt - first_attempt + 1;
                        return Err(if timed_out {
                            LookupError::Aborted { word, attempts }
                        } else {
                            LookupError::Transient { word, attempts, reason }
                        });
                    }
                }
            }

            attempt += 1;
        }
    }

    async fn attempt(&self, word: &str, url: &str) -> Result<Vec<WordEntry>, AttemptFailure> {
        debug!(url, "GET");
        let response = match self.transport.get(url, self.network.request_timeout()).await {
            Ok(response) => response,
            Err(TransportError::Timeout) => {
                return Err(AttemptFailure::Retryable {
                    reason: TransportError::Timeout.to_string(),
                    timed_out: true,
                });
            }
            Err(e) => {
                return Err(AttemptFailure::Retryable {
                    reason: e.to_string(),
                    timed_out: false,
                });
            }
        };

        if response.status == 404 {
            return Err(AttemptFailure::Fatal(LookupError::NotFound {
                word: word.to_string(),
            }));
        }

        if !(200..300).contains(&response.status) {
            return Err(AttemptFailure::Retryable {
                reason: format!("API error: {}", response.status),
                timed_out: false,
            });
        }

        parse_entries(word, &response.body)
    }
}

/// 校验响应结构：必须是非空的词条数组
///
/// 响应体不是 JSON（例如代理返回的错误页面）视为暂时性错误，可以重试；
/// JSON 合法但结构不对则立即失败。
fn parse_entries(word: &str, body: &str) -> Result<Vec<WordEntry>, AttemptFailure> {
    let entries: Vec<WordEntry> = serde_json::from_str(body).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            AttemptFailure::Retryable {
                reason: format!("response is not JSON: {}", e),
                timed_out: false,
            }
        } else {
            AttemptFailure::Fatal(LookupError::MalformedResponse {
                word: word.to_string(),
                reason: e.to_string(),
            })
        }
    })?;

    if entries.is_empty() {
        return Err(AttemptFailure::Fatal(LookupError::MalformedResponse {
            word: word.to_string(),
            reason: "empty entry list".to_string(),
        }));
    }

    Ok(entries)
}
