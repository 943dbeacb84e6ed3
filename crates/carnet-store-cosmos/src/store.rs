//! [`CosmosStore`], the Cosmos DB implementation of [`DocumentStore`].

use std::{future::Future, time::Duration};

use carnet_core::{
  document::Document,
  query::Query,
  store::{Container, DocumentStore},
};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
  Error, Result,
  auth::{MasterKey, http_date},
  sql::QuerySpec,
};

const API_VERSION: &str = "2018-12-31";

/// Connection settings, deserialised from the `[store]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CosmosConfig {
  /// Account endpoint, e.g. `https://myaccount.documents.azure.com:443/`.
  pub endpoint:              String,
  /// Base64 master key.
  pub key:                   String,
  pub database:              String,
  pub carnets_container:     String,
  pub citas_container:       String,
  #[serde(default = "default_promociones_container")]
  pub promociones_container: String,
  /// Per-request timeout. The store client is the only place one is applied.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:          u64,
}

fn default_promociones_container() -> String { "promociones_salud".to_owned() }

fn default_timeout_secs() -> u64 { 10 }

/// A document store backed by a Cosmos DB SQL API account.
///
/// Clones share one [`reqwest::Client`] connection pool.
#[derive(Clone)]
pub struct CosmosStore {
  client: Client,
  key:    MasterKey,
  config: CosmosConfig,
}

/// Page of results returned by a query.
#[derive(Deserialize)]
struct QueryPage {
  #[serde(rename = "Documents")]
  documents: Vec<Document>,
}

/// Error body returned by the gateway.
#[derive(Deserialize)]
struct GatewayError {
  message: String,
}

impl CosmosStore {
  /// Build a client. Fails if the master key is not valid base64 or the
  /// HTTP client cannot be constructed; no request is sent.
  pub fn new(config: CosmosConfig) -> Result<Self> {
    let key = MasterKey::from_base64(&config.key)?;
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, key, config })
  }

  fn collection(&self, container: Container) -> &str {
    match container {
      Container::Carnets => &self.config.carnets_container,
      Container::Citas => &self.config.citas_container,
      Container::Promociones => &self.config.promociones_container,
    }
  }

  /// `dbs/{db}/colls/{coll}`, the resource link for the docs feed.
  fn collection_link(&self, container: Container) -> String {
    format!("dbs/{}/colls/{}", self.config.database, self.collection(container))
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
  }

  /// Attach the headers every call needs.
  fn signed(
    &self,
    builder: RequestBuilder,
    verb: &str,
    resource_link: &str,
  ) -> RequestBuilder {
    let date = http_date(Utc::now());
    let auth = self.key.authorization(verb, "docs", resource_link, &date);
    builder
      .header("authorization", auth)
      .header("x-ms-date", date)
      .header("x-ms-version", API_VERSION)
  }

  async fn get_document(&self, container: Container, id: &str) -> Result<Option<Document>> {
    validate_id(id)?;
    let link = format!("{}/docs/{id}", self.collection_link(container));
    let url = self.url(&format!(
      "{}/docs/{}",
      self.collection_link(container),
      urlencoding::encode(id)
    ));

    let resp = self
      .signed(self.client.get(url), "GET", &link)
      .header("x-ms-documentdb-partitionkey", partition_key(id))
      .send()
      .await?;

    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let resp = check(resp).await?;
    Ok(Some(resp.json().await?))
  }

  async fn run_query(&self, container: Container, query: &Query) -> Result<Vec<Document>> {
    let link = self.collection_link(container);
    let url = self.url(&format!("{link}/docs"));
    let body = serde_json::to_vec(&QuerySpec::from_query(query))?;

    let mut documents = Vec::new();
    let mut continuation: Option<String> = None;
    loop {
      let mut req = self
        .signed(self.client.post(&url), "POST", &link)
        .header("content-type", "application/query+json")
        .header("x-ms-documentdb-isquery", "True")
        .header("x-ms-documentdb-query-enablecrosspartition", "True")
        .body(body.clone());
      if let Some(token) = &continuation {
        req = req.header("x-ms-continuation", token);
      }

      let resp = check(req.send().await?).await?;
      continuation = resp
        .headers()
        .get("x-ms-continuation")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
      let page: QueryPage = resp.json().await?;
      documents.extend(page.documents);

      if continuation.is_none() {
        break;
      }
    }

    debug!(%container, results = documents.len(), "cosmos query complete");
    query.sort(&mut documents);
    Ok(documents)
  }

  async fn create_document(&self, container: Container, doc: Document) -> Result<Document> {
    let id = doc
      .get("id")
      .and_then(serde_json::Value::as_str)
      .ok_or_else(|| Error::InvalidId(String::new()))?
      .to_owned();
    validate_id(&id)?;

    let link = self.collection_link(container);
    let url = self.url(&format!("{link}/docs"));
    let resp = self
      .signed(self.client.post(url), "POST", &link)
      .header("x-ms-documentdb-partitionkey", partition_key(&id))
      .json(&doc)
      .send()
      .await?;

    Ok(check(resp).await?.json().await?)
  }
}

/// Turn a non-success response into [`Error::Status`].
async fn check(resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let text = resp.text().await.unwrap_or_default();
  let message = serde_json::from_str::<GatewayError>(&text)
    .map(|e| e.message)
    .unwrap_or(text);
  Err(Error::Status { status, message })
}

/// Containers are partitioned on `/id`.
fn partition_key(id: &str) -> String {
  serde_json::Value::from(vec![id]).to_string()
}

/// Cosmos DB ids may not contain `/`, `\`, `?` or `#`, nor be empty.
fn validate_id(id: &str) -> Result<()> {
  if id.is_empty() || id.contains(['/', '\\', '?', '#']) {
    return Err(Error::InvalidId(id.to_owned()));
  }
  Ok(())
}

impl DocumentStore for CosmosStore {
  type Error = Error;

  fn read<'a>(
    &'a self,
    container: Container,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Document>>> + Send + 'a {
    self.get_document(container, id)
  }

  fn query<'a>(
    &'a self,
    container: Container,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Document>>> + Send + 'a {
    self.run_query(container, query)
  }

  fn create(
    &self,
    container: Container,
    doc: Document,
  ) -> impl Future<Output = Result<Document>> + Send + '_ {
    self.create_document(container, doc)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use carnet_core::{
    LookupError,
    lookup::LookupService,
    query::{Direction, Filter},
  };
  use serde_json::{Value, json};
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, header_exists, method, path, path_regex},
  };

  use super::*;

  fn config() -> CosmosConfig {
    CosmosConfig {
      endpoint:              "https://sasu.documents.azure.com:443/".into(),
      key:                   "Y2FybmV0LXRlc3QtbWFzdGVyLWtleS0wMTIzNDU2Nzg5".into(),
      database:              "SASU".into(),
      carnets_container:     "carnets_id".into(),
      citas_container:       "cita_id".into(),
      promociones_container: default_promociones_container(),
      timeout_secs:          default_timeout_secs(),
    }
  }

  #[test]
  fn resource_links() {
    let store = CosmosStore::new(config()).unwrap();
    assert_eq!(store.collection_link(Container::Carnets), "dbs/SASU/colls/carnets_id");
    assert_eq!(store.collection_link(Container::Promociones), "dbs/SASU/colls/promociones_salud");
    assert_eq!(
      store.url("dbs/SASU/colls/cita_id/docs"),
      "https://sasu.documents.azure.com:443/dbs/SASU/colls/cita_id/docs"
    );
  }

  #[test]
  fn bad_master_key_fails_construction() {
    let mut cfg = config();
    cfg.key = "%%%".into();
    assert!(matches!(CosmosStore::new(cfg), Err(Error::MasterKey(_))));
  }

  #[test]
  fn ids_are_validated() {
    assert!(validate_id("carnet:2025").is_ok());
    assert!(validate_id("carnet:20/25").is_err());
    assert!(validate_id("a?b").is_err());
    assert!(validate_id("").is_err());
  }

  #[test]
  fn partition_key_is_json_array() {
    assert_eq!(partition_key("carnet:2025"), r#"["carnet:2025"]"#);
  }

  #[test]
  fn config_defaults() {
    let cfg: CosmosConfig = serde_json::from_value(serde_json::json!({
      "endpoint": "https://x.documents.azure.com",
      "key": "a2V5",
      "database": "db",
      "carnets_container": "c",
      "citas_container": "d"
    }))
    .unwrap();
    assert_eq!(cfg.promociones_container, "promociones_salud");
    assert_eq!(cfg.timeout_secs, 10);
  }

  #[tokio::test]
  async fn malformed_key_fails_before_any_request() {
    let store = CosmosStore::new(config()).unwrap();
    let err = store.read(Container::Carnets, "carnet:a/b").await.unwrap_err();
    assert!(matches!(err, Error::InvalidId(_)));
  }

  // ─── Against a mock gateway ──────────────────────────────────────────────

  const CARNET_PATH: &str = r"^/dbs/SASU/colls/carnets_id/docs/carnet(%3A|:)2025$";

  fn store_for(server: &MockServer) -> CosmosStore {
    let mut cfg = config();
    cfg.endpoint = server.uri();
    CosmosStore::new(cfg).unwrap()
  }

  fn gateway_error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "code": "Error", "message": message }))
  }

  #[tokio::test]
  async fn point_read_sends_signed_partitioned_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path_regex(CARNET_PATH))
      .and(header("x-ms-documentdb-partitionkey", r#"["carnet:2025"]"#))
      .and(header("x-ms-version", API_VERSION))
      .and(header_exists("x-ms-date"))
      .and(header_exists("authorization"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": "carnet:2025", "matricula": "2025", "_rid": "abc", "_etag": "\"1\""
      })))
      .expect(1)
      .mount(&server)
      .await;

    let doc = store_for(&server)
      .read(Container::Carnets, "carnet:2025")
      .await
      .unwrap()
      .unwrap();
    assert_eq!(doc["matricula"], json!("2025"));
    assert_eq!(doc["_rid"], json!("abc"));
  }

  #[tokio::test]
  async fn point_read_404_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path_regex(CARNET_PATH))
      .respond_with(gateway_error(404, "Resource Not Found"))
      .expect(1)
      .mount(&server)
      .await;

    let found = store_for(&server).read(Container::Carnets, "carnet:2025").await.unwrap();
    assert!(found.is_none());
  }

  #[tokio::test]
  async fn point_read_failure_is_an_error_with_gateway_message() {
    for status in [403, 503] {
      let server = MockServer::start().await;
      Mock::given(method("GET"))
        .and(path_regex(CARNET_PATH))
        .respond_with(gateway_error(status, "request rejected"))
        .mount(&server)
        .await;

      let err = store_for(&server).read(Container::Carnets, "carnet:2025").await.unwrap_err();
      match err {
        Error::Status { status: got, message } => {
          assert_eq!(got.as_u16(), status);
          assert_eq!(message, "request rejected");
        }
        other => panic!("expected status error, got {other:?}"),
      }
    }
  }

  #[tokio::test]
  async fn failed_point_read_does_not_trigger_fallback_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path_regex(CARNET_PATH))
      .respond_with(gateway_error(503, "overloaded"))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/dbs/SASU/colls/carnets_id/docs"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Documents": [] })))
      .expect(0)
      .mount(&server)
      .await;

    let lookup = LookupService::new(Arc::new(store_for(&server)));
    let err = lookup.resolve_profile("2025").await.unwrap_err();
    assert!(matches!(err, LookupError::Store(_)));
  }

  #[tokio::test]
  async fn missing_point_read_falls_back_to_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path_regex(CARNET_PATH))
      .respond_with(gateway_error(404, "Resource Not Found"))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/dbs/SASU/colls/carnets_id/docs"))
      .and(body_string_contains("@p0"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "Documents": [{ "id": "legacy-1", "matricula": "2025", "_ts": 1 }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let lookup = LookupService::new(Arc::new(store_for(&server)));
    let profile = lookup.resolve_profile("2025").await.unwrap().unwrap();
    assert_eq!(profile.as_document()["id"], json!("legacy-1"));
    assert!(profile.as_document().get("_ts").is_none());
  }

  #[tokio::test]
  async fn query_follows_continuation_then_sorts_stably() {
    let server = MockServer::start().await;
    let feed = "/dbs/SASU/colls/cita_id/docs";

    Mock::given(method("POST"))
      .and(path(feed))
      .and(header("x-ms-continuation", "page-2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "Documents": [
          { "id": "b", "matricula": "2025", "inicio": "2025-03-01T09:00:00" },
          { "id": "c", "matricula": "2025", "inicio": "2025-01-01T09:00:00" }
        ]
      })))
      .with_priority(1)
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path(feed))
      .and(header("content-type", "application/query+json"))
      .and(header("x-ms-documentdb-isquery", "True"))
      .respond_with(
        ResponseTemplate::new(200)
          .insert_header("x-ms-continuation", "page-2")
          .set_body_json(json!({
            "Documents": [{ "id": "a", "matricula": "2025", "inicio": "2025-01-01T09:00:00" }]
          })),
      )
      .expect(1)
      .mount(&server)
      .await;

    let query = Query::filter(Filter::eq("matricula", "2025")).order_by("inicio", Direction::Desc);
    let docs = store_for(&server).query(Container::Citas, &query).await.unwrap();
    let ids: Vec<&str> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
  }

  #[tokio::test]
  async fn create_posts_to_partition_of_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/dbs/SASU/colls/promociones_salud/docs"))
      .and(header("x-ms-documentdb-partitionkey", r#"["promo_1"]"#))
      .and(body_string_contains("\"departamento\":\"Salud\""))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "id": "promo_1", "departamento": "Salud", "_rid": "xyz"
      })))
      .expect(1)
      .mount(&server)
      .await;

    let doc = json!({ "id": "promo_1", "departamento": "Salud" });
    let Value::Object(doc) = doc else { unreachable!() };
    let stored = store_for(&server).create(Container::Promociones, doc).await.unwrap();
    assert_eq!(stored["_rid"], json!("xyz"));
  }

  #[tokio::test]
  async fn create_conflict_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/dbs/SASU/colls/promociones_salud/docs"))
      .respond_with(gateway_error(409, "Entity with the specified id already exists"))
      .mount(&server)
      .await;

    let Value::Object(doc) = json!({ "id": "promo_1" }) else { unreachable!() };
    let err = store_for(&server).create(Container::Promociones, doc).await.unwrap_err();
    assert!(matches!(err, Error::Status { status, .. } if status == StatusCode::CONFLICT));
  }
}
