//! Signed HTTP client for the remote comic API.
//!
//! [`ApiClient`] owns the connection pool and signing material. Logging in
//! produces an immutable [`Session`]; pairing the two yields a
//! [`SignedCatalog`], the authenticated [`Catalog`] the orchestrator uses.
//!
//! # Example
//!
//! ```no_run
//! use archiver_core::catalog::{ApiClient, Catalog, SignedCatalog};
//! use archiver_core::config::ApiSettings;
//!
//! # async fn example(settings: ApiSettings) -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(&settings)?;
//! let session = client.login("reader@example.com", "password").await?;
//! let catalog = SignedCatalog::new(client, session);
//! let first_page = catalog.list_favorites(1).await?;
//! println!("{} favorite pages", first_page.pages);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};
use url::Url;

use super::signing::sign_request;
use super::types::{ComicDetail, ComicPage, EpisodePage, PageImage};
use super::{Catalog, CatalogError};
use crate::config::ApiSettings;

const ACCEPT: &str = "application/vnd.picacomic.com.v1+json";
const APP_CHANNEL: &str = "1";
const APP_VERSION: &str = "2.2.1.2.3.3";
const APP_UUID: &str = "defaultUuid";
const APP_PLATFORM: &str = "android";
const APP_BUILD_VERSION: &str = "45";
const CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const USER_AGENT: &str = "okhttp/3.8.1";

const SIGN_IN_ENDPOINT: &str = "auth/sign-in";

/// Authenticated session returned by [`ApiClient::login`].
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    /// Wraps an existing token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Token sent in the `authorization` header.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct SignInData {
    token: Option<String>,
}

#[derive(Deserialize)]
struct ComicsData {
    comics: ComicPage,
}

#[derive(Deserialize)]
struct EpsData {
    eps: EpisodePage,
}

#[derive(Deserialize)]
struct PagesData {
    pages: PagesDocs,
}

#[derive(Deserialize)]
struct PagesDocs {
    #[serde(default)]
    docs: Vec<PageDoc>,
}

#[derive(Deserialize)]
struct PageDoc {
    media: Media,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Media {
    file_server: String,
    path: String,
}

impl Media {
    fn image_url(&self) -> String {
        format!("{}/static/{}", self.file_server.trim_end_matches('/'), self.path)
    }
}

#[derive(Deserialize)]
struct ComicData {
    comic: ComicDetail,
}

/// HTTP client that signs every request for the remote API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    settings: ApiSettings,
}

impl ApiClient {
    /// Builds a client from API settings.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidUrl`] for a malformed base URL and
    /// [`CatalogError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(settings: &ApiSettings) -> Result<Self, CatalogError> {
        let mut raw_base = settings.base_url.clone();
        if !raw_base.ends_with('/') {
            raw_base.push('/');
        }
        let base_url = Url::parse(&raw_base).map_err(|source| CatalogError::InvalidUrl {
            endpoint: raw_base.clone(),
            source,
        })?;
        let http = Client::builder()
            .timeout(settings.timeout())
            .gzip(true)
            .build()
            .map_err(CatalogError::ClientBuild)?;
        Ok(Self {
            http,
            base_url,
            settings: settings.clone(),
        })
    }

    /// Signs in and returns a session token.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Auth`] if the server rejects the credentials or
    /// the response carries no token. Transport failures keep their own variants.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, CatalogError> {
        let body = json!({ "email": email, "password": password });
        let data: SignInData = self
            .request(Method::POST, SIGN_IN_ENDPOINT, Some(&body), None)
            .await
            .map_err(|error| match error {
                CatalogError::Api { message, code, .. } => CatalogError::Auth {
                    message: format!("code {code}: {message}"),
                },
                CatalogError::HttpStatus { status, .. } => CatalogError::Auth {
                    message: format!("HTTP {status}"),
                },
                other => other,
            })?;

        match data.token.filter(|token| !token.is_empty()) {
            Some(token) => {
                info!("login succeeded");
                Ok(Session::new(token))
            }
            None => Err(CatalogError::Auth {
                message: "sign-in response carried no token".to_string(),
            }),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        session: Option<&Session>,
    ) -> Result<T, CatalogError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|source| CatalogError::InvalidUrl {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_request(
            endpoint,
            &timestamp,
            &self.settings.nonce,
            method.as_str(),
            &self.settings.api_key,
            &self.settings.secret_key,
        )?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("api-key", &self.settings.api_key)
            .header("accept", ACCEPT)
            .header("app-channel", APP_CHANNEL)
            .header("time", &timestamp)
            .header("nonce", &self.settings.nonce)
            .header("signature", signature)
            .header("app-version", APP_VERSION)
            .header("app-uuid", APP_UUID)
            .header("app-platform", APP_PLATFORM)
            .header("app-build-version", APP_BUILD_VERSION)
            .header("Content-Type", CONTENT_TYPE)
            .header("User-Agent", USER_AGENT)
            .header("image-quality", &self.settings.image_quality);
        if let Some(session) = session {
            request = request.header("authorization", session.token());
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        debug!(%method, endpoint, "calling catalog");
        let response = request
            .send()
            .await
            .map_err(|source| CatalogError::Network {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| CatalogError::Network {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if status == StatusCode::UNAUTHORIZED && session.is_some() {
            return Err(CatalogError::Auth {
                message: format!("session rejected calling {endpoint}"),
            });
        }

        let envelope: ApiEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(CatalogError::HttpStatus {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                });
            }
            Err(source) => {
                return Err(CatalogError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }
        };

        if envelope.code != 200 {
            return Err(CatalogError::Api {
                endpoint: endpoint.to_string(),
                code: envelope.code,
                message: envelope.message,
            });
        }

        serde_json::from_value(envelope.data.unwrap_or(Value::Null)).map_err(|source| {
            CatalogError::Decode {
                endpoint: endpoint.to_string(),
                source,
            }
        })
    }
}

/// [`Catalog`] backed by an [`ApiClient`] and a logged-in [`Session`].
#[derive(Debug, Clone)]
pub struct SignedCatalog {
    client: ApiClient,
    session: Session,
}

impl SignedCatalog {
    /// Pairs a client with its session.
    #[must_use]
    pub fn new(client: ApiClient, session: Session) -> Self {
        Self { client, session }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, CatalogError> {
        self.client
            .request(Method::GET, endpoint, None, Some(&self.session))
            .await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, CatalogError> {
        self.client
            .request(Method::POST, endpoint, Some(body), Some(&self.session))
            .await
    }
}

#[async_trait]
impl Catalog for SignedCatalog {
    #[instrument(skip(self))]
    async fn list_favorites(&self, page: u32) -> Result<ComicPage, CatalogError> {
        let data: ComicsData = self.get(&format!("users/favourite?page={page}")).await?;
        Ok(data.comics)
    }

    #[instrument(skip(self))]
    async fn search_comics(&self, keyword: &str, page: u32) -> Result<ComicPage, CatalogError> {
        let body = json!({ "keyword": keyword, "sort": "dd" });
        let data: ComicsData = self
            .post(&format!("comics/advanced-search?page={page}"), &body)
            .await?;
        Ok(data.comics)
    }

    #[instrument(skip(self))]
    async fn list_episodes(&self, comic_id: &str, page: u32) -> Result<EpisodePage, CatalogError> {
        let data: EpsData = self
            .get(&format!("comics/{comic_id}/eps?page={page}"))
            .await?;
        Ok(data.eps)
    }

    #[instrument(skip(self))]
    async fn list_page_images(
        &self,
        comic_id: &str,
        order: u32,
        page: u32,
    ) -> Result<Vec<PageImage>, CatalogError> {
        let data: PagesData = self
            .get(&format!("comics/{comic_id}/order/{order}/pages?page={page}"))
            .await?;
        Ok(data
            .pages
            .docs
            .iter()
            .map(|doc| PageImage {
                url: doc.media.image_url(),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn fetch_comic_metadata(&self, comic_id: &str) -> Result<ComicDetail, CatalogError> {
        let data: ComicData = self.get(&format!("comics/{comic_id}")).await?;
        Ok(data.comic)
    }

    #[instrument(skip(self))]
    async fn set_favorite(&self, comic_id: &str) -> Result<(), CatalogError> {
        let _: Value = self
            .post(&format!("comics/{comic_id}/favourite"), &json!({}))
            .await?;
        Ok(())
    }
}
