//! Destination registry open-API client.
//!
//! Every call is a `POST` of a JSON body carrying an `Action` discriminator.
//! Responses share the envelope
//! `{"Response": {"Error": {"Code", "Message"} | null, "Data": {...}}}`,
//! which [`DestinationClient::execute`] decodes once for all actions.

use crate::credentials::Credentials;
use crate::error::{DestinationError, MigrationError, Result};
use crate::types::RepositoryType;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Build the HTTP client shared by listers, index queries and transfers.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!(
        "carrier-migrate/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| MigrationError::HttpClient(e.to_string()))
}

/// Credential key of a registry: `host[:port]`, default ports omitted.
///
/// Accepts a bare host (`acme.example.com:8443`) or a full URL; bare hosts
/// are read as `https`.
pub fn registry_host(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MigrationError::InvalidConfig(
            "registry host must not be empty".to_string(),
        ));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = url::Url::parse(&with_scheme)
        .map_err(|e| MigrationError::InvalidConfig(format!("invalid registry {raw}: {e}")))?;
    if url.host_str().is_none() {
        return Err(MigrationError::InvalidConfig(format!(
            "registry {raw} has no host"
        )));
    }
    Ok(host_key(&url))
}

fn host_key(url: &url::Url) -> String {
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    format!("{}{port}", url.host_str().unwrap_or_default())
}

/// A parsed destination repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTarget {
    /// Registry host (with port), used for credential lookup.
    pub host: String,
    /// Open API endpoint derived from the registry host.
    pub open_api_url: String,
    pub project: String,
    pub repository: String,
    /// Upload root, always ending in `/`.
    pub upload_root: String,
}

impl DestinationTarget {
    /// Parse a destination URL.
    ///
    /// Generic repositories use `/{project}/{repository}`, Maven repositories
    /// `/repository/{project}/{repository}`. The open API lives on the team
    /// host: `{team}-{type}.pkg.{domain}` becomes `{team}.{domain}`.
    pub fn parse(destination: &str, repository_type: RepositoryType) -> Result<Self> {
        let url = url::Url::parse(destination.trim()).map_err(|e| {
            MigrationError::InvalidConfig(format!("failed to parse dst url {destination}: {e}"))
        })?;
        let host_name = url.host_str().ok_or_else(|| {
            MigrationError::InvalidConfig(format!("dst url {destination} has no host"))
        })?;

        let mut segments: Vec<&str> = url
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match repository_type {
            RepositoryType::Maven => {
                if segments.len() != 3 {
                    return Err(MigrationError::InvalidConfig(
                        "dst url path format must match /repository/{project}/{repository}"
                            .to_string(),
                    ));
                }
                segments.remove(0);
            }
            RepositoryType::Generic => {
                if segments.len() != 2 {
                    return Err(MigrationError::InvalidConfig(
                        "dst url path format must match /{project}/{repository}".to_string(),
                    ));
                }
            }
        }

        let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
        let api_host = host_name
            .replace(".pkg.", ".")
            .replace(&format!("-{}", repository_type.as_str()), "");

        Ok(Self {
            host: host_key(&url),
            open_api_url: format!("{}://{api_host}{port}/open-api", url.scheme()),
            project: segments[0].to_string(),
            repository: segments[1].to_lowercase(),
            upload_root: format!("{}/", destination.trim().trim_end_matches('/')),
        })
    }
}

/// A typed open-API action.
pub trait Action: Serialize {
    /// Value of the `Action` discriminator.
    const NAME: &'static str;
    /// Shape of `Response.Data`.
    type Data: DeserializeOwned + Default;
    /// Whether a success envelope must carry `Data`.
    const REQUIRES_DATA: bool = true;
}

#[derive(Serialize)]
struct ActionRequest<'a, A: Serialize> {
    #[serde(rename = "Action")]
    action: &'static str,
    #[serde(flatten)]
    body: &'a A,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope<D> {
    response: EnvelopeBody<D>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvelopeBody<D> {
    error: Option<ApiErrorBody>,
    data: Option<D>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// `DescribeTeamArtifacts`: numbered pages of package versions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTeamArtifacts {
    pub page_number: u64,
    pub page_size: u64,
    pub rule: TeamArtifactsRule,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamArtifactsRule {
    pub project_name: Vec<String>,
    pub repository: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TeamArtifactsData {
    pub total_count: u64,
    pub instance_set: Vec<ArtifactInstance>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ArtifactInstance {
    pub package: String,
    pub package_version: String,
}

impl Action for DescribeTeamArtifacts {
    const NAME: &'static str = "DescribeTeamArtifacts";
    type Data = TeamArtifactsData;
}

/// `DescribeArtifactRepositoryFileList`: continuation pages of file paths.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeRepositoryFileList {
    pub page_size: u64,
    pub project: String,
    pub repository: String,
    pub continuation_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RepositoryFileListData {
    pub instance_set: Vec<FileInstance>,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileInstance {
    pub path: String,
}

impl Action for DescribeRepositoryFileList {
    const NAME: &'static str = "DescribeArtifactRepositoryFileList";
    type Data = RepositoryFileListData;
}

/// `CreateArtifactProperties`: attach name/value pairs to a package version.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateArtifactProperties {
    pub project_name: String,
    pub repository: String,
    pub package: String,
    pub package_version: String,
    pub property_set: Vec<Property>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Action for CreateArtifactProperties {
    const NAME: &'static str = "CreateArtifactProperties";
    type Data = serde_json::Value;
    const REQUIRES_DATA: bool = false;
}

/// Client for the destination registry's open API.
pub struct DestinationClient {
    client: Client,
    target: DestinationTarget,
    credentials: Credentials,
}

impl DestinationClient {
    pub fn new(client: Client, target: DestinationTarget, credentials: Credentials) -> Self {
        Self {
            client,
            target,
            credentials,
        }
    }

    pub fn target(&self) -> &DestinationTarget {
        &self.target
    }

    /// Execute one action and decode its envelope.
    pub async fn execute<A: Action>(
        &self,
        action: &A,
    ) -> std::result::Result<A::Data, DestinationError> {
        let request = ActionRequest {
            action: A::NAME,
            body: action,
        };

        let response = self
            .client
            .post(&self.target.open_api_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| DestinationError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DestinationError::Network(e.to_string()))?;

        let envelope: Envelope<A::Data> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(DestinationError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            Err(e) => {
                debug!(action = A::NAME, body = %body, "Failed to decode open API response");
                return Err(DestinationError::Decode(e.to_string()));
            }
        };

        if let Some(error) = envelope.response.error {
            return Err(DestinationError::Api {
                code: error.code,
                message: error.message,
            });
        }

        // A well-formed envelope does not make a non-success status an answer.
        if !status.is_success() {
            return Err(DestinationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match envelope.response.data {
            Some(data) => Ok(data),
            None if A::REQUIRES_DATA => Err(DestinationError::Decode(format!(
                "{} response carries no Data",
                A::NAME
            ))),
            None => Ok(A::Data::default()),
        }
    }

    /// Fetch one page of package versions.
    pub async fn describe_team_artifacts(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> std::result::Result<TeamArtifactsData, DestinationError> {
        self.execute(&DescribeTeamArtifacts {
            page_number,
            page_size,
            rule: TeamArtifactsRule {
                project_name: vec![self.target.project.clone()],
                repository: vec![self.target.repository.clone()],
            },
        })
        .await
    }

    /// Fetch one page of repository file paths.
    pub async fn describe_file_list(
        &self,
        continuation_token: &str,
        page_size: u64,
    ) -> std::result::Result<RepositoryFileListData, DestinationError> {
        self.execute(&DescribeRepositoryFileList {
            page_size,
            project: self.target.project.clone(),
            repository: self.target.repository.clone(),
            continuation_token: continuation_token.to_string(),
        })
        .await
    }

    /// Attach properties to a package version.
    pub async fn add_properties(
        &self,
        package: &str,
        version: &str,
        properties: &[(String, String)],
    ) -> std::result::Result<(), DestinationError> {
        let _: serde_json::Value = self
            .execute(&CreateArtifactProperties {
                project_name: self.target.project.clone(),
                repository: self.target.repository.clone(),
                package: package.to_string(),
                package_version: version.to_string(),
                property_set: properties
                    .iter()
                    .map(|(name, value)| Property {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DestinationClient {
        let target =
            DestinationTarget::parse(&format!("{}/demo/Releases", server.uri()), RepositoryType::Generic)
                .unwrap();
        DestinationClient::new(
            build_http_client(None).unwrap(),
            target,
            Credentials::new("user", "pass"),
        )
    }

    #[test]
    fn test_parse_generic_destination() {
        let target = DestinationTarget::parse(
            "https://acme-generic.pkg.coding.net/demo/Releases/",
            RepositoryType::Generic,
        )
        .unwrap();

        assert_eq!(target.host, "acme-generic.pkg.coding.net");
        assert_eq!(target.open_api_url, "https://acme.coding.net/open-api");
        assert_eq!(target.project, "demo");
        assert_eq!(target.repository, "releases");
        assert_eq!(
            target.upload_root,
            "https://acme-generic.pkg.coding.net/demo/Releases/"
        );
    }

    #[test]
    fn test_parse_maven_destination() {
        let target = DestinationTarget::parse(
            "http://acme-maven.example.com:8081/repository/demo/libs",
            RepositoryType::Maven,
        )
        .unwrap();

        assert_eq!(target.host, "acme-maven.example.com:8081");
        assert_eq!(target.open_api_url, "http://acme.example.com:8081/open-api");
        assert_eq!(target.project, "demo");
        assert_eq!(target.repository, "libs");
    }

    #[test]
    fn test_parse_rejects_wrong_layout() {
        let err = DestinationTarget::parse("https://acme.example.com/demo", RepositoryType::Generic)
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidConfig(_)));

        let err =
            DestinationTarget::parse("https://acme.example.com/demo/libs", RepositoryType::Maven)
                .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_execute_sends_action_and_decodes_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/open-api"))
            .and(basic_auth("user", "pass"))
            .and(body_partial_json(serde_json::json!({
                "Action": "DescribeTeamArtifacts",
                "PageNumber": 2,
                "Rule": { "ProjectName": ["demo"], "Repository": ["releases"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Response": {
                    "Data": {
                        "TotalCount": 1,
                        "InstanceSet": [{ "Package": "a.jar", "PackageVersion": "latest" }]
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let data = client_for(&server)
            .describe_team_artifacts(2, 1000)
            .await
            .unwrap();
        assert_eq!(data.total_count, 1);
        assert_eq!(data.instance_set[0].package, "a.jar");
    }

    #[tokio::test]
    async fn test_execute_surfaces_envelope_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/open-api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Response": {
                    "Error": { "Code": "ResourceNotFound", "Message": "no such repository" }
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_file_list("", 1000)
            .await
            .unwrap_err();
        match err {
            DestinationError::Api { code, message } => {
                assert_eq!(code, "ResourceNotFound");
                assert_eq!(message, "no such repository");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_reports_http_status_for_non_envelope_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/open-api"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_team_artifacts(1, 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, DestinationError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_add_properties_request_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/open-api"))
            .and(body_partial_json(serde_json::json!({
                "Action": "CreateArtifactProperties",
                "Package": "dist/app.zip",
                "PackageVersion": "latest",
                "PropertySet": [{ "Name": "origin", "Value": "nexus" }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Response": { "Error": null } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .add_properties(
                "dist/app.zip",
                "latest",
                &[("origin".to_string(), "nexus".to_string())],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_with_envelope_is_not_an_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/open-api"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(serde_json::json!({ "Response": { "RequestId": "x" } })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_team_artifacts(1, 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, DestinationError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_describe_without_data_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/open-api"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Response": { "RequestId": "x" } })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_file_list("", 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, DestinationError::Decode(_)));
    }

    #[test]
    fn test_registry_host_matches_destination_host() {
        for dst in [
            "https://acme-generic.pkg.example.com:443/demo/files",
            "https://acme-generic.pkg.example.com/demo/files/",
            "https://user@acme-generic.pkg.example.com/demo/files",
        ] {
            let target = DestinationTarget::parse(dst, RepositoryType::Generic).unwrap();
            assert_eq!(registry_host(dst).unwrap(), target.host);
            assert_eq!(target.host, "acme-generic.pkg.example.com");
        }

        assert_eq!(
            registry_host("acme-generic.pkg.example.com").unwrap(),
            "acme-generic.pkg.example.com"
        );
        assert_eq!(
            registry_host("http://127.0.0.1:8081/repository/demo/libs").unwrap(),
            "127.0.0.1:8081"
        );
        assert!(registry_host("  ").is_err());
        assert!(registry_host("https://").is_err());
    }
}
