//! HTTP implementation of the platform capabilities.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clients::{
    CatalogKind, ClientPayload, FindingPayload, ImportClient, ReportPayload, TemplateCandidate,
    TemplateCatalog,
};
use crate::errors::AppError;

/// Authenticated session against one platform instance.
///
/// Created once at start-up and passed explicitly to the clients that need it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub base_url: String,
    pub tenant_id: String,
    token: String,
}

impl AuthSession {
    pub fn new(base_url: impl Into<String>, tenant_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Serialize)]
struct AuthenticateRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    tenant_id: Option<serde_json::Value>,
    #[serde(default)]
    mfa_enabled: bool,
}

/// Log in with username and password and return a session.
///
/// MFA-enabled accounts are rejected; token refresh is not handled.
pub async fn authenticate(
    http: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<AuthSession, AppError> {
    let base_url = base_url.trim_end_matches('/');
    let response: AuthenticateResponse = http
        .post(format!("{base_url}/api/v1/authenticate"))
        .json(&AuthenticateRequest { username, password })
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if response.mfa_enabled {
        return Err(AppError::Config(
            "MFA-enabled accounts are not supported; use an API user".to_string(),
        ));
    }
    if response.status.as_deref() != Some("success") {
        return Err(AppError::Validation("Authentication failed".to_string()));
    }
    let token = response
        .token
        .ok_or_else(|| AppError::Validation("Authentication response has no token".to_string()))?;
    let tenant_id = response.tenant_id.map(id_to_string).unwrap_or_default();

    tracing::info!(base_url = %base_url, tenant_id = %tenant_id, "Authenticated");
    Ok(AuthSession::new(base_url, tenant_id, token))
}

/// Platform client over HTTP.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    session: AuthSession,
}

impl PlatformClient {
    pub fn new(http: reqwest::Client, session: AuthSession) -> Self {
        Self { http, session }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let value = self
            .http
            .get(self.session.url(path))
            .bearer_auth(&self.session.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }

    /// POST a payload and pull the created entity's id out of `id_field`.
    ///
    /// Every failure, transport included, is reported as `RemoteCreateFailed`.
    async fn create<B: Serialize + Sync>(
        &self,
        entity: &str,
        path: &str,
        body: &B,
        id_field: &str,
    ) -> Result<String, AppError> {
        let failed = |message: String| AppError::RemoteCreateFailed {
            entity: entity.to_string(),
            message,
        };

        let response = self
            .http
            .post(self.session.url(path))
            .bearer_auth(&self.session.token)
            .json(body)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(failed(format!("{status}: {message}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid response body: {e}")))?;
        json.get(id_field)
            .cloned()
            .map(id_to_string)
            .ok_or_else(|| failed(format!("response has no '{id_field}'")))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    data: CatalogEntryData,
}

#[derive(Debug, Deserialize)]
struct CatalogEntryData {
    template_name: String,
    doc_id: serde_json::Value,
}

#[async_trait]
impl TemplateCatalog for PlatformClient {
    async fn list_templates(&self, kind: CatalogKind) -> Result<Vec<TemplateCandidate>, AppError> {
        let path = match kind {
            CatalogKind::ReportTemplate => {
                format!("/api/v1/tenant/{}/report-templates", self.session.tenant_id)
            }
            CatalogKind::FindingsLayout => "/api/v1/field-templates".to_string(),
        };

        let body: serde_json::Value = self.get(&path).await?;
        if !body.is_array() {
            tracing::warn!(kind = %kind, "Template listing was not a list; treating as empty");
            return Ok(vec![]);
        }
        let entries: Vec<CatalogEntry> = serde_json::from_value(body)?;

        Ok(entries
            .into_iter()
            .map(|entry| TemplateCandidate {
                name: entry.data.template_name,
                id: id_to_string(entry.data.doc_id),
            })
            .collect())
    }
}

#[async_trait]
impl ImportClient for PlatformClient {
    async fn create_client(&self, client: &ClientPayload) -> Result<String, AppError> {
        self.create(
            &format!("client '{}'", client.name),
            "/api/v1/client/create",
            client,
            "client_id",
        )
        .await
    }

    async fn create_report(
        &self,
        client_id: &str,
        report: &ReportPayload,
    ) -> Result<String, AppError> {
        self.create(
            &format!("report '{}'", report.name),
            &format!("/api/v1/client/{client_id}/report/create"),
            report,
            "report_id",
        )
        .await
    }

    async fn create_finding(
        &self,
        client_id: &str,
        report_id: &str,
        finding: &FindingPayload,
    ) -> Result<String, AppError> {
        self.create(
            &format!("finding '{}'", finding.title),
            &format!("/api/v1/client/{client_id}/report/{report_id}/flaw/create"),
            finding,
            "flaw_id",
        )
        .await
    }
}

/// Ids come back as strings or numbers depending on the endpoint.
fn id_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids() {
        assert_eq!(id_to_string(serde_json::json!(42)), "42");
        assert_eq!(id_to_string(serde_json::json!("abc")), "abc");
    }

    #[test]
    fn session_trims_trailing_slash() {
        let session = AuthSession::new("https://example.test/", "7", "token");
        assert_eq!(
            session.url("/api/v1/client/create"),
            "https://example.test/api/v1/client/create"
        );
    }

    #[test]
    fn catalog_entry_shape() {
        let entries: Vec<CatalogEntry> = serde_json::from_value(serde_json::json!([
            {"data": {"template_name": "Standard", "doc_id": 12}},
            {"data": {"template_name": "Light", "doc_id": "tmpl-9"}}
        ]))
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].data.template_name, "Standard");
        assert_eq!(id_to_string(entries[1].data.doc_id.clone()), "tmpl-9");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_create_failure() {
        let session = AuthSession::new("http://127.0.0.1:1", "7", "token");
        let client = PlatformClient::new(reqwest::Client::new(), session);
        let payload = ClientPayload {
            name: "Acme".to_string(),
            poc: String::new(),
            poc_email: String::new(),
            description: String::new(),
            tags: vec![],
        };

        let err = client.create_client(&payload).await.unwrap_err();
        assert_eq!(err.code(), "REMOTE_CREATE_FAILED");
        assert!(err.to_string().contains("client 'Acme'"));
    }
}
