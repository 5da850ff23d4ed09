use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ArtifactLocation, ArtifactQuery, ArtifactSearch, ArtifactStore};
use crate::config::ArtifactConfig;
use crate::error::ArtifactError;

/// Response envelope shared by the repository API.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    result: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl Envelope {
    fn is_success(&self) -> bool {
        self.result == Some(true) || self.code.unwrap_or(0) == 0
    }

    fn into_data(self) -> Result<Value, ArtifactError> {
        if self.is_success() {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(ArtifactError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| format!("code {}", self.code.unwrap_or_default())),
            })
        }
    }
}

/// Builds the node-search body: exact match on project, repo, folder and name,
/// folders first, newest first.
pub fn search_body(query: &ArtifactQuery, page_size: u32) -> Value {
    json!({
        "page": { "pageNumber": 1, "pageSize": page_size },
        "sort": {
            "properties": ["folder", "lastModifiedDate"],
            "direction": "DESC"
        },
        "rule": {
            "rules": [
                { "field": "projectId", "value": query.project, "operation": "EQ" },
                { "field": "repoName", "value": query.repo, "operation": "EQ" },
                { "field": "path", "value": query.path, "operation": "EQ" },
                { "field": "name", "value": query.file_name, "operation": "EQ" }
            ],
            "relation": "AND"
        }
    })
}

/// Generic-repository client authenticated with basic auth.
pub struct HttpArtifactStore {
    client: Client,
    root_url: String,
    username: String,
    password: Option<SecretString>,
    page_size: u32,
}

impl HttpArtifactStore {
    pub fn new(config: &ArtifactConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ArtifactError::Transport)?;

        Ok(Self {
            client,
            root_url: config.root_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.resolve_optional()?,
            page_size: config.page_size,
        })
    }

    pub fn search_url(&self) -> String {
        format!("{}/repository/api/node/search", self.root_url)
    }

    /// Download link for a stored file. Every path segment is percent-encoded.
    pub fn download_url(&self, location: &ArtifactLocation) -> Result<Url, ArtifactError> {
        let invalid = |reason: String| ArtifactError::InvalidUrl {
            url: self.root_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.root_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["generic", location.project.as_str(), location.repo.as_str()])
            .extend(location.path.split('/').filter(|segment| !segment.is_empty()));
        url.query_pairs_mut().append_pair("download", "true");
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(
            &self.username,
            self.password.as_ref().map(|p| p.expose_secret()),
        )
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn search(&self, query: &ArtifactQuery) -> Result<ArtifactSearch, ArtifactError> {
        let body = search_body(query, self.page_size);
        let response = self
            .authorize(self.client.post(self.search_url()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::Status {
                status: status.as_u16(),
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| ArtifactError::Parse(e.to_string()))?;
        let data = envelope.into_data()?;
        if data.is_null() {
            return Ok(ArtifactSearch::default());
        }

        let search: ArtifactSearch =
            serde_json::from_value(data).map_err(|e| ArtifactError::Parse(e.to_string()))?;
        log::debug!(
            "Artifact search for '{}' matched {} node(s)",
            query.file_name,
            search.count
        );
        Ok(search)
    }

    async fn download(&self, location: &ArtifactLocation) -> Result<Vec<u8>, ArtifactError> {
        let response = self
            .authorize(self.client.get(self.download_url(location)?))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        log::info!(
            "Downloaded artifact {}/{}/{} ({} bytes)",
            location.project,
            location.repo,
            location.path,
            bytes.len()
        );
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpArtifactStore {
        let config: ArtifactConfig = serde_json::from_value(json!({
            "rootUrl": "http://repo.local/",
            "username": "bot",
            "password": { "value": "pw" },
            "pageSize": 50
        }))
        .unwrap();
        HttpArtifactStore::new(&config).unwrap()
    }

    fn query() -> ArtifactQuery {
        ArtifactQuery {
            project: "opsbot2".to_string(),
            repo: "translate".to_string(),
            path: "/target/".to_string(),
            file_name: "report.xlsx".to_string(),
        }
    }

    #[test]
    fn test_urls() {
        let store = store();
        assert_eq!(store.search_url(), "http://repo.local/repository/api/node/search");
        assert_eq!(
            store.download_url(&query().location()).unwrap().as_str(),
            "http://repo.local/generic/opsbot2/translate/target/report.xlsx?download=true"
        );
    }

    #[test]
    fn test_download_url_encodes_segments() {
        let store = store();
        let location = ArtifactQuery {
            file_name: "plan #2?.xlsx".to_string(),
            ..query()
        }
        .location();

        let url = store.download_url(&location).unwrap();
        assert_eq!(
            url.as_str(),
            "http://repo.local/generic/opsbot2/translate/target/plan%20%232%3F.xlsx?download=true"
        );
        assert_eq!(url.path_segments().unwrap().last(), Some("plan%20%232%3F.xlsx"));
        assert_eq!(url.query(), Some("download=true"));
    }

    #[test]
    fn test_download_url_under_a_base_path() {
        let config: ArtifactConfig =
            serde_json::from_value(json!({ "rootUrl": "https://gw.example.com/repo/" })).unwrap();
        let store = HttpArtifactStore::new(&config).unwrap();
        assert_eq!(
            store.download_url(&query().location()).unwrap().as_str(),
            "https://gw.example.com/repo/generic/opsbot2/translate/target/report.xlsx?download=true"
        );
    }

    #[test]
    fn test_download_url_rejects_bad_root() {
        let config: ArtifactConfig =
            serde_json::from_value(json!({ "rootUrl": "not a url" })).unwrap();
        let store = HttpArtifactStore::new(&config).unwrap();
        assert!(matches!(
            store.download_url(&query().location()),
            Err(ArtifactError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_search_body() {
        let body = search_body(&query(), 50);
        assert_eq!(body["page"]["pageSize"], 50);
        assert_eq!(body["sort"]["direction"], "DESC");
        assert_eq!(body["rule"]["relation"], "AND");
        let rules = body["rule"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[2]["value"], "/target/");
        assert_eq!(rules[3]["field"], "name");
        assert_eq!(rules[3]["value"], "report.xlsx");
    }

    #[test]
    fn test_envelope_success_rules() {
        let ok: Envelope =
            serde_json::from_value(json!({"code": 0, "data": {"count": 1}})).unwrap();
        assert!(ok.is_success());

        let ok_by_result: Envelope =
            serde_json::from_value(json!({"code": 250, "result": true, "data": null})).unwrap();
        assert!(ok_by_result.into_data().unwrap().is_null());

        let rejected: Envelope = serde_json::from_value(
            json!({"code": 250101, "result": false, "message": "project not found"}),
        )
        .unwrap();
        match rejected.into_data() {
            Err(ArtifactError::Rejected { message }) => assert_eq!(message, "project not found"),
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        let config: ArtifactConfig =
            serde_json::from_value(json!({ "rootUrl": "http://127.0.0.1:9" })).unwrap();
        let store = HttpArtifactStore::new(&config).unwrap();
        let result = store.search(&query()).await;
        assert!(matches!(result, Err(ArtifactError::Transport(_))));
    }
}
