//! High-level client: base URL, deadline, cookies and default headers on
//! top of [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use tokio::sync::Mutex;
use url::Url;

use crate::cookie::CookieJar;
use crate::error::{Error, Result};
use crate::fingerprint::ClientHello;
use crate::proxy::parse_proxies;
use crate::request::Request;
use crate::response::Response;
use crate::transport::connector::TlsOptions;
use crate::transport::Transport;

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration, validated once by [`Client::new`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relative request URLs are resolved against this.
    pub base_url: Option<String>,
    /// Deadline for a whole request; `None` disables it.
    pub timeout: Option<Duration>,
    /// `host:port` or `host:port:username:password`.
    pub proxies: Vec<String>,
    pub client_hello: ClientHello,
    /// Keep cookies between requests.
    pub cookie_store: bool,
    /// Send the identity's User-Agent when the request has none.
    pub default_user_agent: bool,
    pub tls: TlsOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Some(DEFAULT_TIMEOUT),
            proxies: Vec::new(),
            client_hello: ClientHello::default(),
            cookie_store: true,
            default_user_agent: true,
            tls: TlsOptions::danger_accept_invalid_certs(),
        }
    }
}

struct ClientInner {
    transport: Transport,
    base_url: Option<Url>,
    timeout: Option<Duration>,
    default_user_agent: bool,
    cookies: Option<Mutex<CookieJar>>,
}

/// HTTP client with a fingerprinting transport. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

/// Builder for HTTP requests.
pub struct RequestBuilder<'a> {
    client: &'a Client,
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

/// Builder for creating HTTP clients.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Validate `config` and create the client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let proxies = parse_proxies(&config.proxies)?;
        let base_url = config.base_url.as_deref().map(Url::parse).transpose()?;
        if config.timeout == Some(Duration::ZERO) {
            return Err(Error::config("timeout must be non-zero"));
        }

        let transport = Transport::with_tls_options(config.client_hello, proxies, config.tls);
        Ok(Self {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                timeout: config.timeout,
                default_user_agent: config.default_user_agent,
                cookies: config.cookie_store.then(|| Mutex::new(CookieJar::new())),
            }),
        })
    }

    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::POST, url)
    }

    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            url: url.into(),
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// Swap the Client Hello identity for subsequent requests.
    pub async fn set_client_hello(&self, client_hello: ClientHello) {
        self.inner.transport.set_client_hello(client_hello).await;
    }

    /// Snapshot of stored cookies, if the cookie store is enabled.
    pub async fn cookies(&self) -> Option<CookieJar> {
        match &self.inner.cookies {
            Some(jar) => Some(jar.lock().await.clone()),
            None => None,
        }
    }

    /// Resolve `url` against the base URL, if one is set.
    fn resolve(&self, url: &str) -> Result<Url> {
        match &self.inner.base_url {
            Some(base) => Ok(base.join(url)?),
            None => Ok(Url::parse(url)?),
        }
    }

    /// Send `request` with client defaults applied, under the deadline.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let url = Url::parse(&request.uri().to_string())?;

        if self.inner.default_user_agent && !request.has_header("user-agent") {
            let ua = self.inner.transport.client_hello().await.user_agent();
            request.headers_mut().push(("User-Agent".into(), ua.into()));
        }
        if let Some(jar) = &self.inner.cookies {
            if !request.has_header("cookie") {
                if let Some(cookie) = jar.lock().await.build_cookie_header(&url) {
                    request.headers_mut().push(("Cookie".into(), cookie));
                }
            }
        }

        let round_trip = self.inner.transport.round_trip(request);
        let response = match self.inner.timeout {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => round_trip.await,
        }?;

        if let Some(jar) = &self.inner.cookies {
            jar.lock().await.store_from_headers(&response.headers, &url);
        }
        Ok(response.with_url(url.as_str()))
    }
}

impl<'a> RequestBuilder<'a> {
    /// Add a header to the request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set all headers (replaces existing headers).
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Send the request and return the response.
    pub async fn send(self) -> Result<Response> {
        let url = self.client.resolve(&self.url)?;
        let mut request = Request::parse(self.method, url.as_str())?;
        *request.headers_mut() = self.headers;
        if let Some(body) = self.body {
            request = request.body(body);
        }
        self.client.execute(request).await
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the whole-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable the whole-request deadline.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Proxy strings; validated at [`build`](Self::build).
    pub fn proxies<S: Into<String>>(mut self, proxies: impl IntoIterator<Item = S>) -> Self {
        self.config.proxies = proxies.into_iter().map(Into::into).collect();
        self
    }

    pub fn client_hello(mut self, client_hello: ClientHello) -> Self {
        self.config.client_hello = client_hello;
        self
    }

    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.config.cookie_store = enabled;
        self
    }

    pub fn default_user_agent(mut self, enabled: bool) -> Self {
        self.config.default_user_agent = enabled;
        self
    }

    /// Trust any server certificate. On by default.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.tls.danger_accept_invalid_certs = accept;
        self
    }

    /// Add a trust anchor used when certificate verification is on.
    pub fn add_root_certificate(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.config.tls.root_certs.push(cert.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        Client::new(self.config)
    }
}
