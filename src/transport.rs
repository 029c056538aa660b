//! reqwest-backed HTTP transport

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::core::{Error, ResponseEnvelope, Result, SignedRequest, Transport, TransportOptions};

/// HTTP transport over a pooled `reqwest::Client`
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let base_url = parse_base_uri(&options.base_uri)?;

        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = options.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if options.no_proxy {
            builder = builder.no_proxy();
        }
        if let Some(proxy) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        if let Some(agent) = &options.user_agent {
            builder = builder.user_agent(agent);
        }
        if options.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an action path against the API root.
    ///
    /// Standard relative-URL resolution: absolute URLs and `../` segments are
    /// not confined to the base.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("invalid action path {}: {}", path, e)))
    }
}

/// Parse the API root, forcing a trailing slash so `join` appends
fn parse_base_uri(base_uri: &str) -> Result<Url> {
    let mut url = Url::parse(base_uri)
        .map_err(|e| Error::Config(format!("invalid base_uri {}: {}", base_uri, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("base_uri {} cannot be a base", base_uri)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &SignedRequest) -> Result<ResponseEnvelope> {
        let url = self.endpoint(&request.path)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in request.headers.pairs() {
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("invalid {} header: {}", name, e)))?;
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let resp = self
            .client
            .post(url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();

        Ok(ResponseEnvelope { status, body })
    }
}
