//! Open-data catalog client (Socrata SODA API).
//!
//! - `GET https://<domain>/resource/<id>.json?$limit=..&$offset=..` returns an
//!   array of flat JSON records, which map one-to-one onto rows.
//! - `GET https://<domain>/api/catalog/v1?q=..&domains=<domain>` searches the
//!   catalog (discovery API).
//! - `GET https://<domain>/api/views/<id>.json` describes one dataset.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::dataset::Row;
use shared::settings::CatalogSettings;
use url::Url;

/// One fetch request against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub dataset_id: String,
    /// SoQL filter, e.g. `departamento = 'ANTIOQUIA'`
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default, deserialize_with = "shared::params::opt_count")]
    pub limit: Option<usize>,
    #[serde(default, deserialize_with = "shared::params::count")]
    pub offset: usize,
}

impl CatalogQuery {
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            ..Default::default()
        }
    }
}

/// Search hits returned per catalog query
pub const SEARCH_LIMIT: usize = 10;

/// One catalog search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// SoQL field names, usable in `select`/`where`/`order`
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Dataset description from `/api/views/<id>.json`. Unknown fields are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub rows_updated_at: Option<i64>,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    pub field_name: String,
    #[serde(default)]
    pub data_type_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Discovery API envelope
#[derive(Deserialize)]
struct DiscoveryResponse {
    #[serde(default)]
    results: Vec<DiscoveryResult>,
}

#[derive(Deserialize)]
struct DiscoveryResult {
    resource: DiscoveryResource,
    #[serde(default)]
    permalink: Option<String>,
}

#[derive(Deserialize)]
struct DiscoveryResource {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "updatedAt")]
    updated_at: Option<String>,
    #[serde(default)]
    columns_field_name: Vec<String>,
}

impl From<DiscoveryResult> for CatalogEntry {
    fn from(hit: DiscoveryResult) -> Self {
        let resource = hit.resource;
        Self {
            id: resource.id,
            name: resource.name,
            description: resource.description.filter(|d| !d.trim().is_empty()),
            updated_at: resource.updated_at,
            columns: resource.columns_field_name,
            link: hit.permalink,
        }
    }
}

/// The open-data catalog. The host talks to this trait so tests can
/// substitute a canned catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Records of one dataset.
    async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<Row>>;

    /// Datasets matching a free-text query, best match first.
    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>>;

    /// Name, description and column schema of one dataset.
    async fn metadata(&self, dataset_id: &str) -> Result<DatasetMetadata>;
}

pub struct SocrataClient {
    http: Client,
    domain: String,
    app_token: Option<String>,
    default_limit: usize,
}

impl SocrataClient {
    pub fn new(settings: &CatalogSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            domain: settings
                .domain
                .trim_start_matches("https://")
                .trim_end_matches('/')
                .to_string(),
            app_token: settings.app_token.clone().filter(|t| !t.trim().is_empty()),
            default_limit: settings.fetch_limit,
        })
    }

    /// Resource URL with the SoQL parameters of `query`.
    pub fn resource_url(&self, query: &CatalogQuery) -> Result<Url> {
        let id = query.dataset_id.trim();
        if id.is_empty() {
            return Err(anyhow!("catalog dataset id is empty"));
        }

        let mut url = Url::parse(&format!("https://{}/resource/{}.json", self.domain, id))
            .with_context(|| format!("invalid catalog url for {id}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("$limit", &query.limit.unwrap_or(self.default_limit).to_string());
            pairs.append_pair("$offset", &query.offset.to_string());
            if let Some(clause) = non_empty(&query.where_clause) {
                pairs.append_pair("$where", clause);
            }
            if let Some(select) = non_empty(&query.select) {
                pairs.append_pair("$select", select);
            }
            if let Some(order) = non_empty(&query.order) {
                pairs.append_pair("$order", order);
            }
        }
        Ok(url)
    }
}

impl SocrataClient {
    /// Discovery API URL restricted to the configured domain.
    pub fn search_url(&self, query: &str) -> Result<Url> {
        let q = query.trim();
        if q.is_empty() {
            return Err(anyhow!("catalog search query is empty"));
        }

        let mut url = Url::parse(&format!("https://{}/api/catalog/v1", self.domain))
            .context("invalid catalog search url")?;
        url.query_pairs_mut()
            .append_pair("q", q)
            .append_pair("domains", &self.domain)
            .append_pair("limit", &SEARCH_LIMIT.to_string());
        Ok(url)
    }

    pub fn metadata_url(&self, dataset_id: &str) -> Result<Url> {
        let id = dataset_id.trim();
        if id.is_empty() {
            return Err(anyhow!("catalog dataset id is empty"));
        }
        Url::parse(&format!("https://{}/api/views/{}.json", self.domain, id))
            .with_context(|| format!("invalid metadata url for {id}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Catalog API error: {} - {}", status, body));
        }
        Ok(response.json().await?)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[async_trait]
impl CatalogClient for SocrataClient {
    async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<Row>> {
        let url = self.resource_url(query)?;
        tracing::info!(dataset_id = %query.dataset_id, %url, "fetching catalog dataset");

        let rows: Vec<Row> = self
            .get_json(url)
            .await
            .context("catalog response is not an array of records")?;
        tracing::debug!(dataset_id = %query.dataset_id, rows = rows.len(), "catalog fetch complete");
        Ok(rows)
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let url = self.search_url(query)?;
        tracing::info!(query, %url, "searching catalog");

        let response: DiscoveryResponse = self
            .get_json(url)
            .await
            .context("unexpected catalog search response")?;
        Ok(response.results.into_iter().map(CatalogEntry::from).collect())
    }

    async fn metadata(&self, dataset_id: &str) -> Result<DatasetMetadata> {
        let url = self.metadata_url(dataset_id)?;
        tracing::info!(dataset_id, %url, "fetching catalog metadata");

        self.get_json(url)
            .await
            .with_context(|| format!("unexpected metadata response for {}", dataset_id.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SocrataClient {
        SocrataClient::new(&CatalogSettings::default()).unwrap()
    }

    #[test]
    fn test_resource_url_defaults() {
        let url = client().resource_url(&CatalogQuery::new("abcd-1234")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.datos.gov.co/resource/abcd-1234.json?%24limit=10000&%24offset=0"
        );
    }

    #[test]
    fn test_resource_url_with_filters() {
        let query = CatalogQuery {
            dataset_id: "abcd-1234".into(),
            where_clause: Some("year > 2020".into()),
            select: Some("city, amt".into()),
            order: Some(" ".into()),
            limit: Some(50),
            offset: 100,
        };
        let url = client().resource_url(&query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(
            pairs,
            vec![
                ("$limit".to_string(), "50".to_string()),
                ("$offset".to_string(), "100".to_string()),
                ("$where".to_string(), "year > 2020".to_string()),
                ("$select".to_string(), "city, amt".to_string()),
            ]
        );
    }

    #[test]
    fn test_domain_is_normalized() {
        let settings = CatalogSettings {
            domain: "https://data.example.org/".into(),
            app_token: Some("  ".into()),
            fetch_limit: 5,
        };
        let client = SocrataClient::new(&settings).unwrap();
        assert!(client.app_token.is_none());
        let url = client.resource_url(&CatalogQuery::new("x")).unwrap();
        assert_eq!(url.host_str(), Some("data.example.org"));
    }

    #[test]
    fn test_empty_id_is_rejected() {
        assert!(client().resource_url(&CatalogQuery::new(" ")).is_err());
    }

    #[test]
    fn test_query_accepts_float_counts() {
        let query: CatalogQuery =
            serde_json::from_value(serde_json::json!({"dataset_id": "x", "limit": 25.0, "offset": "10"}))
                .unwrap();
        assert_eq!(query.limit, Some(25));
        assert_eq!(query.offset, 10);
    }

    #[test]
    fn test_search_url() {
        let url = client().search_url(" salud pública ").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/api/catalog/v1");
        assert_eq!(url.host_str(), Some("www.datos.gov.co"));
        assert_eq!(pairs[0], ("q".to_string(), "salud pública".to_string()));
        assert_eq!(pairs[1], ("domains".to_string(), "www.datos.gov.co".to_string()));
        assert!(client().search_url("  ").is_err());
    }

    #[test]
    fn test_metadata_url() {
        let url = client().metadata_url(" abcd-1234 ").unwrap();
        assert_eq!(url.as_str(), "https://www.datos.gov.co/api/views/abcd-1234.json");
        assert!(client().metadata_url("").is_err());
    }

    #[test]
    fn test_discovery_result_maps_to_entry() {
        let response: DiscoveryResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "resource": {
                    "id": "abcd-1234",
                    "name": "Casos",
                    "description": " ",
                    "updatedAt": "2024-05-01T00:00:00.000Z",
                    "columns_field_name": ["municipio", "total"],
                    "columns_name": ["Municipio", "Total"]
                },
                "permalink": "https://www.datos.gov.co/d/abcd-1234"
            }],
            "resultSetSize": 1
        }))
        .unwrap();

        let entry = CatalogEntry::from(response.results.into_iter().next().unwrap());
        assert_eq!(entry.id, "abcd-1234");
        assert_eq!(entry.description, None);
        assert_eq!(entry.columns, vec!["municipio", "total"]);
        assert_eq!(entry.link.as_deref(), Some("https://www.datos.gov.co/d/abcd-1234"));
    }

    #[test]
    fn test_metadata_parses_views_payload() {
        let meta: DatasetMetadata = serde_json::from_value(serde_json::json!({
            "id": "abcd-1234",
            "name": "Casos",
            "category": "Salud",
            "rowsUpdatedAt": 1714521600,
            "viewType": "tabular",
            "columns": [
                {"id": 1, "name": "Municipio", "fieldName": "municipio", "dataTypeName": "text"}
            ]
        }))
        .unwrap();

        assert_eq!(meta.rows_updated_at, Some(1714521600));
        assert_eq!(meta.columns[0].field_name, "municipio");
        assert_eq!(meta.columns[0].data_type_name.as_deref(), Some("text"));
        assert_eq!(meta.description, None);
    }

    #[tokio::test]
    async fn test_fetch_without_id_never_sends() {
        let err = client().fetch(&CatalogQuery::default()).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert!(client().search(" ").await.is_err());
        assert!(client().metadata("").await.is_err());
    }
}
