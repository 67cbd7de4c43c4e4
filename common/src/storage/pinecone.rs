use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::{
    error::AppError,
    storage::{
        types::{
            index_spec::{IndexDescription, IndexSpec, Metric},
            indexed_vector::IndexedVector,
            query_result::{QueryRequest, QueryResult},
        },
        vector_store::VectorStore,
    },
    utils::config::AppConfig,
};

const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const API_VERSION: &str = "2024-07";

/// Pinecone REST client covering the control plane (index management) and the
/// per-index data plane (upsert and query).
pub struct PineconeClient {
    http: Client,
    api_key: String,
    controller: Url,
    cloud: String,
    region: String,
    hosts: RwLock<HashMap<String, Url>>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: usize,
    #[serde(default)]
    metric: Metric,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    ready: bool,
    #[serde(default)]
    state: Option<String>,
}

impl From<IndexModel> for IndexDescription {
    fn from(model: IndexModel) -> Self {
        Self {
            name: model.name,
            dimension: model.dimension,
            metric: model.metric,
            ready: model.status.as_ref().is_some_and(|status| status.ready),
            host: model.host,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: Metric,
    spec: ServerlessSpecWrapper<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpecWrapper<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexedVector],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

impl PineconeClient {
    pub fn new(
        api_key: impl Into<String>,
        controller_url: &str,
        cloud: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            http: Client::new(),
            api_key: api_key.into(),
            controller: base_url(controller_url)?,
            cloud: cloud.into(),
            region: region.into(),
            hosts: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.pinecone_api_key.clone(),
            &config.pinecone_controller_url,
            config.pinecone_cloud.clone(),
            config.pinecone_environment.clone(),
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    fn controller_endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.controller
            .join(path)
            .map_err(|err| AppError::Validation(format!("invalid Pinecone path {path}: {err}")))
    }

    /// Resolves (and caches) the data-plane host for an index.
    async fn index_host(&self, index: &str) -> Result<Url, AppError> {
        if let Some(host) = self.hosts.read().await.get(index) {
            return Ok(host.clone());
        }

        let description = self.describe_index(index).await?;
        let host = description.host.ok_or_else(|| {
            AppError::Processing(format!("Pinecone reported no data-plane host for index {index}"))
        })?;
        let host = host_url(&host)?;

        self.hosts
            .write()
            .await
            .insert(index.to_string(), host.clone());
        Ok(host)
    }

    async fn data_endpoint(&self, index: &str, path: &str) -> Result<Url, AppError> {
        self.index_host(index)
            .await?
            .join(path)
            .map_err(|err| AppError::Validation(format!("invalid Pinecone path {path}: {err}")))
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    async fn list_indexes(&self) -> Result<Vec<String>, AppError> {
        let url = self.controller_endpoint("indexes")?;
        let response = self.authorized(self.http.get(url)).send().await?;
        let list: IndexList = parse_json(response).await?;

        Ok(list.indexes.into_iter().map(|index| index.name).collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), AppError> {
        let url = self.controller_endpoint("indexes")?;
        let body = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: ServerlessSpecWrapper {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self.authorized(self.http.post(url)).json(&body).send().await?;
        ensure_success(response).await?;

        info!(
            index = %spec.name,
            dimension = spec.dimension,
            cloud = %self.cloud,
            region = %self.region,
            "Pinecone index creation requested"
        );
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, AppError> {
        let url = self.controller_endpoint(&format!("indexes/{name}"))?;
        let response = self.authorized(self.http.get(url)).send().await?;
        let model: IndexModel = parse_json(response).await?;

        if let Some(status) = &model.status {
            debug!(index = %name, ready = status.ready, state = ?status.state, "Index status");
        }

        Ok(model.into())
    }

    async fn upsert(&self, index: &str, vectors: Vec<IndexedVector>) -> Result<usize, AppError> {
        let url = self.data_endpoint(index, "vectors/upsert").await?;
        let body = UpsertRequest { vectors: &vectors };

        let response = self.authorized(self.http.post(url)).json(&body).send().await?;
        let acknowledged: UpsertResponse = parse_json(response).await?;

        Ok(acknowledged.upserted_count)
    }

    async fn query(&self, index: &str, request: &QueryRequest) -> Result<QueryResult, AppError> {
        let url = self.data_endpoint(index, "query").await?;
        let response = self
            .authorized(self.http.post(url))
            .json(request)
            .send()
            .await?;

        parse_json(response).await
    }
}

fn base_url(raw: &str) -> Result<Url, AppError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|err| AppError::Validation(format!("invalid Pinecone URL {raw}: {err}")))
}

/// Index hosts are reported without a scheme.
fn host_url(host: &str) -> Result<Url, AppError> {
    if host.starts_with("http://") || host.starts_with("https://") {
        base_url(host)
    } else {
        base_url(&format!("https://{host}"))
    }
}

async fn ensure_success(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(message));
    }
    Err(AppError::VectorStore {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let response = ensure_success(response).await?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::document::{ChunkLocation, LineRange};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    #[derive(Debug, Clone)]
    struct RecordedRequest {
        line: String,
        head: String,
        body: String,
    }

    type Responder = dyn Fn(&str, &str) -> (u16, String) + Send + Sync;

    /// Local HTTP listener standing in for both Pinecone planes. `{host}` in a response
    /// body is replaced with the listener's own base URL.
    struct FakePinecone {
        base: String,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl FakePinecone {
        async fn start(
            respond: impl Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
        ) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let base = format!("http://{}", listener.local_addr().expect("addr"));
            let requests = Arc::new(Mutex::new(Vec::new()));
            let respond: Arc<Responder> = Arc::new(respond);

            let recorded = Arc::clone(&requests);
            let host = base.clone();
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let Ok(request) = read_request(&mut stream).await else {
                        continue;
                    };
                    let mut parts = request.line.split_whitespace();
                    let method = parts.next().unwrap_or_default().to_string();
                    let path = parts.next().unwrap_or_default().to_string();
                    recorded.lock().expect("lock").push(request);

                    let (status, body) = respond(&method, &path);
                    let body = body.replace("{host}", &host);
                    let response = format!(
                        "HTTP/1.1 {status} Fake\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self { base, requests }
        }

        fn client(&self) -> PineconeClient {
            PineconeClient::new("test-key", &self.base, "aws", "us-east-1").expect("client")
        }

        fn request_lines(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("lock")
                .iter()
                .map(|request| request.line.clone())
                .collect()
        }
    }

    async fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let read = stream.read(&mut chunk).await?;
            if read == 0 {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            buf.extend_from_slice(&chunk[..read]);
            if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let read = stream.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);
        }

        let body_end = buf.len().min(header_end + content_length);
        Ok(RecordedRequest {
            line: head.lines().next().unwrap_or_default().to_string(),
            body: String::from_utf8_lossy(&buf[header_end..body_end]).to_string(),
            head,
        })
    }

    fn describe_body(with_host: bool) -> String {
        let mut model = json!({
            "name": "docs",
            "dimension": 2,
            "metric": "cosine",
            "status": { "ready": true, "state": "Ready" }
        });
        if with_host {
            model["host"] = json!("{host}");
        }
        model.to_string()
    }

    fn stored_vector(chunk_index: usize) -> IndexedVector {
        IndexedVector::new(
            "doc.txt",
            chunk_index,
            format!("chunk {chunk_index}"),
            &ChunkLocation {
                lines: LineRange { from: 1, to: 2 },
            },
            vec![1.0, 0.0],
        )
        .expect("vector")
    }

    #[test]
    fn host_url_adds_scheme_and_trailing_slash() {
        let url = host_url("docs-abc123.svc.aped-4627-b74a.pinecone.io").expect("url");
        assert_eq!(
            url.join("query").expect("join").as_str(),
            "https://docs-abc123.svc.aped-4627-b74a.pinecone.io/query"
        );

        let url = host_url("http://localhost:5080").expect("url");
        assert_eq!(
            url.join("vectors/upsert").expect("join").as_str(),
            "http://localhost:5080/vectors/upsert"
        );
    }

    #[test]
    fn controller_paths_are_joined_under_base() {
        let client = PineconeClient::new("key", "https://api.pinecone.io", "aws", "us-east-1")
            .expect("client");
        assert_eq!(
            client.controller_endpoint("indexes/docs").expect("url").as_str(),
            "https://api.pinecone.io/indexes/docs"
        );
    }

    #[test]
    fn invalid_controller_url_is_rejected() {
        assert!(matches!(
            PineconeClient::new("key", "not a url", "aws", "us-east-1"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn index_model_maps_to_description() {
        let model: IndexModel = serde_json::from_value(json!({
            "name": "docs",
            "dimension": 1536,
            "metric": "cosine",
            "host": "docs-abc.svc.pinecone.io",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } },
            "status": { "ready": false, "state": "Initializing" }
        }))
        .expect("deserialize");

        let description = IndexDescription::from(model);
        assert_eq!(description.name, "docs");
        assert_eq!(description.dimension, 1536);
        assert_eq!(description.metric, Metric::Cosine);
        assert!(!description.ready);
        assert_eq!(description.host.as_deref(), Some("docs-abc.svc.pinecone.io"));
    }

    #[test]
    fn index_list_tolerates_empty_payload() {
        let list: IndexList = serde_json::from_value(json!({})).expect("deserialize");
        assert!(list.indexes.is_empty());
    }

    #[test]
    fn create_request_uses_serverless_spec() {
        let body = CreateIndexRequest {
            name: "docs",
            dimension: 1536,
            metric: Metric::Cosine,
            spec: ServerlessSpecWrapper {
                serverless: ServerlessSpec {
                    cloud: "aws",
                    region: "us-east-1",
                },
            },
        };

        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({
                "name": "docs",
                "dimension": 1536,
                "metric": "cosine",
                "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
            })
        );
    }

    #[test]
    fn query_request_uses_camel_case_fields() {
        let request = QueryRequest::with_everything(vec![0.1, 0.2], 10);
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({
                "vector": [0.1f32, 0.2f32],
                "topK": 10,
                "includeMetadata": true,
                "includeValues": true
            })
        );
    }

    #[tokio::test]
    async fn query_describes_index_once_and_caches_host() {
        let server = FakePinecone::start(|method, path| match (method, path) {
            ("GET", "/indexes/docs") => (200, describe_body(true)),
            ("POST", "/query") => (
                200,
                json!({
                    "matches": [
                        { "id": "doc.txt_0", "score": 0.9, "metadata": { "pageContent": "hi" } }
                    ]
                })
                .to_string(),
            ),
            _ => (500, "unexpected".to_string()),
        })
        .await;
        let client = server.client();

        for _ in 0..2 {
            let result = client
                .query("docs", &QueryRequest::with_everything(vec![1.0, 0.0], 10))
                .await
                .expect("query");
            assert_eq!(result.len(), 1);
            assert_eq!(result.matches[0].page_content(), Some("hi"));
        }

        assert_eq!(
            server.request_lines(),
            vec![
                "GET /indexes/docs HTTP/1.1".to_string(),
                "POST /query HTTP/1.1".to_string(),
                "POST /query HTTP/1.1".to_string(),
            ]
        );

        let requests = server.requests.lock().expect("lock").clone();
        let query = &requests[1];
        assert!(query.head.to_ascii_lowercase().contains("api-key: test-key"));
        assert!(query
            .head
            .to_ascii_lowercase()
            .contains("x-pinecone-api-version: 2024-07"));
        let body: serde_json::Value = serde_json::from_str(&query.body).expect("query body");
        assert_eq!(body["topK"], 10);
        assert_eq!(body["includeMetadata"], true);
    }

    #[tokio::test]
    async fn upsert_returns_acknowledged_count() {
        let server = FakePinecone::start(|method, path| match (method, path) {
            ("GET", "/indexes/docs") => (200, describe_body(true)),
            ("POST", "/vectors/upsert") => (200, json!({ "upsertedCount": 2 }).to_string()),
            _ => (500, "unexpected".to_string()),
        })
        .await;

        let acknowledged = server
            .client()
            .upsert("docs", vec![stored_vector(0), stored_vector(1)])
            .await
            .expect("upsert");

        assert_eq!(acknowledged, 2);
        let requests = server.requests.lock().expect("lock").clone();
        let body: serde_json::Value =
            serde_json::from_str(&requests[1].body).expect("upsert body");
        assert_eq!(body["vectors"][0]["id"], "doc.txt_0");
        assert_eq!(body["vectors"][1]["metadata"]["pageContent"], "chunk 1");
        assert_eq!(body["vectors"][1]["metadata"]["txtPath"], "doc.txt");
    }

    #[tokio::test]
    async fn rejected_request_becomes_vector_store_error() {
        let server = FakePinecone::start(|_, _| (401, "Invalid API Key".to_string())).await;

        let err = server.client().list_indexes().await.expect_err("unauthorized");

        assert!(matches!(
            err,
            AppError::VectorStore { status: 401, ref message } if message == "Invalid API Key"
        ));
    }

    #[tokio::test]
    async fn missing_index_is_not_found() {
        let server = FakePinecone::start(|_, _| {
            (
                404,
                json!({
                    "error": { "code": "NOT_FOUND", "message": "Resource docs not found" },
                    "status": 404
                })
                .to_string(),
            )
        })
        .await;
        let client = server.client();

        let err = client.describe_index("docs").await.expect_err("describe");
        assert!(matches!(err, AppError::NotFound(ref message) if message.contains("docs")));

        let err = client
            .query("docs", &QueryRequest::with_everything(vec![1.0, 0.0], 10))
            .await
            .expect_err("query");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn index_without_host_is_a_processing_error() {
        let server = FakePinecone::start(|method, path| match (method, path) {
            ("GET", "/indexes/docs") => (200, describe_body(false)),
            _ => (500, "unexpected".to_string()),
        })
        .await;

        let err = server
            .client()
            .query("docs", &QueryRequest::with_everything(vec![1.0, 0.0], 10))
            .await
            .expect_err("no host");

        assert!(matches!(err, AppError::Processing(ref message) if message.contains("docs")));
        assert_eq!(server.request_lines(), vec!["GET /indexes/docs HTTP/1.1".to_string()]);
    }
}
