//! ThunderDrive API session.
//!
//! Async HTTP client using `reqwest` with a shared cookie jar. Mutating calls
//! echo the `XSRF-TOKEN` cookie back as the `X-XSRF-TOKEN` header.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use percent_encoding::percent_decode_str;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Proxy, RequestBuilder, Url, multipart};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::types::{
    EntriesPage, EntryQuery, FoldersResponse, LoginResponse, RemoteFolder, SpaceUsage,
};

pub const DEFAULT_BASE_URL: &str = "https://app.thunderdrive.io/secure/";

/// Text the server embeds in an otherwise successful page when a call failed.
pub const FAILURE_SENTINEL: &str = "Whoops, looks like something went wrong.";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:68.0) Gecko/20100101 Firefox/68.0";
const XSRF_COOKIE: &str = "XSRF-TOKEN";
const XSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Streaming download body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// Streaming upload body.
pub type UploadStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync>>;

/// Transport options for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    /// Timeout for listing, login and folder calls.
    pub metadata_timeout: Duration,
    /// Timeout for upload and download bodies.
    pub transfer_timeout: Duration,
    pub https_proxy: Option<String>,
    pub http_proxy: Option<String>,
    pub verify_tls: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            metadata_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(12 * 60 * 60),
            https_proxy: None,
            http_proxy: None,
            verify_tls: true,
        }
    }
}

/// Account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A download response whose status has already been checked.
pub struct Download {
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

/// Authenticated ThunderDrive session.
pub struct Session {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    config: SessionConfig,
    user_id: u64,
    user_name: String,
}

impl Session {
    /// Builds the HTTP client and logs in.
    ///
    /// The user id comes from the login response when present, otherwise
    /// from the owner of the first root entry.
    pub async fn connect(config: SessionConfig, credentials: &Credentials) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let http = build_http(&config, &jar)?;
        let base_url = parse_base_url(&config.base_url)?;

        if config.https_proxy.is_some() || config.http_proxy.is_some() {
            info!(verify_tls = config.verify_tls, "proxy enabled");
        }

        let mut session = Self {
            http,
            jar,
            base_url,
            config,
            user_id: 0,
            user_name: credentials.username.clone(),
        };

        let login = session.login(credentials).await?;
        session.user_id = match login.user {
            Some(user) if user.id != 0 => user.id,
            _ => session.discover_user_id().await?,
        };

        info!(user = %session.user_name, user_id = session.user_id, "logged in");
        Ok(session)
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Fetches one page of entries.
    pub async fn list_entries(&self, query: &EntryQuery, page: u32) -> Result<EntriesPage, ApiError> {
        self.get_json("drive/entries", &query.params(page)).await
    }

    /// Fetches the user's complete folder list, in server order.
    pub async fn list_folders(&self) -> Result<Vec<RemoteFolder>, ApiError> {
        let endpoint = format!("drive/users/{}/folders", self.user_id);
        let resp: FoldersResponse = self.get_json(&endpoint, &[]).await?;
        Ok(resp.folders)
    }

    /// Creates a folder. An empty `parent_id` creates it at the root.
    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "name": name,
            "parent_id": parent_id_value(parent_id),
        });
        let req = self
            .http
            .post(self.url("drive/folders")?)
            .header(XSRF_HEADER, self.xsrf_token()?)
            .json(&body)
            .timeout(self.config.metadata_timeout);
        self.send_checked(req).await?;
        debug!(name, parent_id, "folder created");
        Ok(())
    }

    /// Uploads `stream` (exactly `len` bytes) as `file_name` into `parent_id`.
    pub async fn upload(
        &self,
        parent_id: &str,
        file_name: &str,
        len: u64,
        stream: UploadStream,
    ) -> Result<(), ApiError> {
        let part = multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), len)
            .file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("parentId", parent_id.to_string())
            .part("file", part);

        let req = self
            .http
            .post(self.url("uploads")?)
            .header(XSRF_HEADER, self.xsrf_token()?)
            .multipart(form)
            .timeout(self.config.transfer_timeout);
        self.send_checked(req).await?;
        Ok(())
    }

    /// Starts downloading the file with content hash `hash`.
    pub async fn download(&self, hash: &str) -> Result<Download, ApiError> {
        let resp = self
            .http
            .get(self.url("uploads/download")?)
            .query(&[("hashes", hash)])
            .timeout(self.config.transfer_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Download {
            content_length: resp.content_length(),
            body: resp.bytes_stream().map_err(ApiError::from).boxed(),
        })
    }

    /// Returns used and available bytes.
    pub async fn space_usage(&self) -> Result<SpaceUsage, ApiError> {
        self.get_json("drive/user/space-usage", &[]).await
    }

    /// Ends the server-side session.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let req = self
            .http
            .post(self.url("auth/logout")?)
            .header(XSRF_HEADER, self.xsrf_token()?)
            .timeout(self.config.metadata_timeout);
        self.send_checked(req).await?;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let form = [
            ("email", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let req = self
            .http
            .post(self.url("auth/login")?)
            .form(&form)
            .timeout(self.config.metadata_timeout);
        let body = self.send_checked(req).await?;

        let resp: LoginResponse = serde_json::from_str(&body)?;
        if resp.status != "success" {
            let reason = resp
                .message
                .clone()
                .unwrap_or_else(|| format!("login status {:?}", resp.status));
            return Err(ApiError::Rejected(reason));
        }
        Ok(resp)
    }

    async fn discover_user_id(&self) -> Result<u64, ApiError> {
        let page = self.list_entries(&EntryQuery::Root, 1).await?;
        page.data
            .first()
            .and_then(|e| e.users.first())
            .map(|u| u.id)
            .ok_or_else(|| ApiError::Unexpected("cannot determine user id from root listing".into()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let req = self
            .http
            .get(self.url(endpoint)?)
            .query(params)
            .timeout(self.config.metadata_timeout);
        let body = self.send_checked(req).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Sends a request and returns its body, failing on non-2xx statuses and
    /// on bodies carrying the failure sentinel.
    async fn send_checked(&self, req: RequestBuilder) -> Result<String, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.contains(FAILURE_SENTINEL) {
            return Err(ApiError::Rejected(FAILURE_SENTINEL.into()));
        }
        Ok(body)
    }

    fn url(&self, endpoint: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| ApiError::Unexpected(format!("invalid endpoint {endpoint}: {e}")))
    }

    fn xsrf_token(&self) -> Result<HeaderValue, ApiError> {
        let cookies = self
            .jar
            .cookies(&self.base_url)
            .ok_or(ApiError::MissingXsrfToken)?;
        let cookies = cookies
            .to_str()
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        let raw = find_cookie(cookies, XSRF_COOKIE).ok_or(ApiError::MissingXsrfToken)?;
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        HeaderValue::from_str(&decoded).map_err(|e| ApiError::InvalidHeader(e.to_string()))
    }
}

fn build_http(config: &SessionConfig, jar: &Arc<Jar>) -> Result<reqwest::Client, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .cookie_provider(Arc::clone(jar))
        .danger_accept_invalid_certs(!config.verify_tls);
    if let Some(proxy) = &config.https_proxy {
        builder = builder.proxy(Proxy::https(proxy)?);
    }
    if let Some(proxy) = &config.http_proxy {
        builder = builder.proxy(Proxy::http(proxy)?);
    }
    Ok(builder.build()?)
}

/// Parses the base URL, forcing a trailing slash so endpoints join under it.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).map_err(|e| ApiError::Unexpected(format!("invalid base URL {raw}: {e}")))
}

/// Finds `name` in a `Cookie` header value (`a=1; b=2`).
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

/// Folder ids are numeric on the server; the root is `null`.
fn parent_id_value(parent_id: &str) -> serde_json::Value {
    if parent_id.is_empty() {
        serde_json::Value::Null
    } else if let Ok(id) = parent_id.parse::<u64>() {
        serde_json::Value::from(id)
    } else {
        serde_json::Value::from(parent_id)
    }
}
