//! vCenter REST client.
//!
//! The client owns one session per API surface (`/api` and the CIS tagging surface
//! under `/rest/com/vmware/cis`). A session is created on first use and reused for
//! the lifetime of the client. When a call is answered with `401` the session is
//! dropped, created again, and the call retried once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use url::Url;

use crate::error::SourceError;
use crate::model::{
    CustomFieldDef, FOLDER, ManagedRef, ParentEntity, TagInfo, VmDetails, VmSummary,
};
use crate::source::SourceApi;

const SESSION_HEADER: &str = "vmware-api-session-id";
const CIS_PREFIX: &str = "/rest/com/vmware/cis";

/// Connection settings for [`RestClient`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Host name, `host:port`, or a full base URL.
    pub address: String,
    pub username: String,
    pub password: String,
    /// Reject invalid TLS certificates (default: false).
    pub verify_ssl: bool,
    /// Per-call timeout (default: 30 seconds).
    pub timeout: Duration,
}

impl RestConfig {
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            verify_ssl: false,
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Api,
    Cis,
}

#[derive(Deserialize)]
struct CisValue<T> {
    value: T,
}

#[derive(Deserialize)]
struct FolderSummary {
    folder: String,
    name: String,
}

/// [`SourceApi`] over the vCenter REST API.
///
/// Custom values cannot be written through REST; `set_custom_value` returns
/// [`SourceError::Unsupported`].
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    endpoint: String,
    username: String,
    password: String,
    api_session: Mutex<Option<String>>,
    cis_session: Mutex<Option<String>>,
}

impl RestClient {
    pub fn new(config: RestConfig) -> Result<Self, SourceError> {
        let url = base_url(&config.address)?;
        let endpoint = url
            .host_str()
            .map(str::to_string)
            .unwrap_or_else(|| config.address.clone());

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(SourceError::connection)?;

        Ok(Self {
            http,
            base_url: url.as_str().trim_end_matches('/').to_string(),
            endpoint,
            username: config.username,
            password: config.password,
            api_session: Mutex::new(None),
            cis_session: Mutex::new(None),
        })
    }

    fn slot(&self, scope: Scope) -> &Mutex<Option<String>> {
        match scope {
            Scope::Api => &self.api_session,
            Scope::Cis => &self.cis_session,
        }
    }

    async fn session(&self, scope: Scope) -> Result<String, SourceError> {
        let mut slot = self.slot(scope).lock().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }
        let id = self.login(scope).await?;
        tracing::debug!(endpoint = %self.endpoint, scope = ?scope, "session established");
        *slot = Some(id.clone());
        Ok(id)
    }

    async fn login(&self, scope: Scope) -> Result<String, SourceError> {
        let path = match scope {
            Scope::Api => "/api/session".to_string(),
            Scope::Cis => format!("{CIS_PREFIX}/session"),
        };
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(transport_error)?;

        match scope {
            Scope::Api => read_json::<String>(response, "session").await,
            Scope::Cis => Ok(read_json::<CisValue<String>>(response, "session")
                .await?
                .value),
        }
    }

    async fn send_once(
        &self,
        scope: Scope,
        method: Method,
        url: &str,
    ) -> Result<reqwest::Response, SourceError> {
        let session = self.session(scope).await?;
        self.http
            .request(method, url)
            .header(SESSION_HEADER, session)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport_error)
    }

    async fn send(
        &self,
        scope: Scope,
        method: Method,
        path: &str,
    ) -> Result<reqwest::Response, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.send_once(scope, method.clone(), &url).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(endpoint = %self.endpoint, path, "session rejected, re-authenticating");
        *self.slot(scope).lock().await = None;
        self.send_once(scope, method, &url).await
    }
}

#[async_trait]
impl SourceApi for RestClient {
    async fn list_objects(&self) -> Result<Vec<VmSummary>, SourceError> {
        let response = self.send(Scope::Api, Method::GET, "/api/vcenter/vm").await?;
        let vms: Vec<VmSummary> = read_json(response, "vm list").await?;
        tracing::info!(endpoint = %self.endpoint, count = vms.len(), "listed VMs");
        Ok(vms)
    }

    async fn object_details(&self, vm: &ManagedRef) -> Result<VmDetails, SourceError> {
        let path = format!("/api/vcenter/vm/{}", vm.id);
        let response = self.send(Scope::Api, Method::GET, &path).await?;
        read_json(response, &vm.to_string()).await
    }

    async fn parent_of(&self, entity: &ManagedRef) -> Result<Option<ParentEntity>, SourceError> {
        // Folder filtering by VM only resolves one level.
        if !entity.is_vm() {
            return Ok(None);
        }
        let path = format!("/api/vcenter/folder?vms={}", entity.id);
        let response = self.send(Scope::Api, Method::GET, &path).await?;
        let folders: Vec<FolderSummary> = read_json(response, "folder").await?;
        Ok(folders.into_iter().next().map(|folder| ParentEntity {
            reference: ManagedRef::new(FOLDER, folder.folder),
            name: folder.name,
        }))
    }

    async fn custom_field_catalog(&self) -> Result<Vec<CustomFieldDef>, SourceError> {
        tracing::debug!(endpoint = %self.endpoint, "custom field catalog is not exposed over REST");
        Ok(Vec::new())
    }

    async fn list_tags(&self) -> Result<Vec<String>, SourceError> {
        let path = format!("{CIS_PREFIX}/tagging/tag");
        let response = self.send(Scope::Cis, Method::GET, &path).await?;
        Ok(read_json::<CisValue<Vec<String>>>(response, "tag list")
            .await?
            .value)
    }

    async fn tag_attachments(&self, tag_id: &str) -> Result<Vec<ManagedRef>, SourceError> {
        let path = format!(
            "{CIS_PREFIX}/tagging/tag-association/id:{tag_id}?~action=list-attached-objects"
        );
        let response = self.send(Scope::Cis, Method::POST, &path).await?;
        Ok(read_json::<CisValue<Vec<ManagedRef>>>(response, tag_id)
            .await?
            .value)
    }

    async fn tag_info(&self, tag_id: &str) -> Result<TagInfo, SourceError> {
        let path = format!("{CIS_PREFIX}/tagging/tag/id:{tag_id}");
        let response = self.send(Scope::Cis, Method::GET, &path).await?;
        Ok(read_json::<CisValue<TagInfo>>(response, tag_id).await?.value)
    }

    async fn set_custom_value(
        &self,
        _vm: &ManagedRef,
        _name: &str,
        _value: &str,
    ) -> Result<(), SourceError> {
        Err(SourceError::unsupported(
            "custom values cannot be written through the REST API",
        ))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check_connection(&self) -> Result<(), SourceError> {
        self.session(Scope::Api).await.map(|_| ())
    }
}

fn base_url(address: &str) -> Result<Url, SourceError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(SourceError::connection("address must not be empty"));
    }
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{address}")
    };
    Url::parse(&candidate).map_err(|e| SourceError::connection(format!("invalid address {address}: {e}")))
}

fn transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::connection(format!("request timed out: {err}"))
    } else {
        SourceError::connection(err)
    }
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, SourceError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::not_found(what));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::authentication(format!("HTTP {status}")));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SourceError::Http {
            status: status.as_u16(),
            message,
        });
    }
    response.json::<T>().await.map_err(SourceError::decode)
}
