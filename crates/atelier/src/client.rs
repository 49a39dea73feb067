//! Document operations of the Atelier API.
//!
//! Each operation reads the namespace from the live configuration, shapes a
//! path and parameter set, and makes exactly one [`RequestExecutor::execute`]
//! call.

use std::sync::Arc;

use crate::{
    AtelierError, ConfigProvider, ConsoleSink, CookieJar, DocNamesQuery, DocumentContent,
    DocumentName, Method, QueryParams, RequestExecutor, ResponseEnvelope, TransportSet,
};

/// Client for one configured Atelier server connection.
#[derive(Debug)]
pub struct AtelierClient {
    executor: RequestExecutor,
}

impl AtelierClient {
    /// Creates a client with a fresh session.
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        transports: TransportSet,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        Self {
            executor: RequestExecutor::new(config, transports, console),
        }
    }

    /// Returns a snapshot of the session cookies.
    pub fn cookies(&self) -> CookieJar {
        self.executor.cookies()
    }

    /// Performs a raw request against `/api/atelier/<path>`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&serde_json::Value>,
    ) -> Result<ResponseEnvelope, AtelierError> {
        self.executor.execute(method, path, params, body).await
    }

    /// `GET /api/atelier/`: server version, namespaces and features.
    pub async fn server_info(&self) -> Result<ResponseEnvelope, AtelierError> {
        self.request(Method::Get, "", None, None).await
    }

    /// Lists document names in the configured namespace.
    pub async fn get_doc_names(
        &self,
        query: &DocNamesQuery,
    ) -> Result<ResponseEnvelope, AtelierError> {
        let ns = self.namespace().await?;
        let path = format!("v2/{ns}/docnames/{}/{}", query.category, query.doc_type);
        let params = QueryParams::new()
            .with("filter", query.filter.as_str())
            .with("generated", query.generated);
        self.request(Method::Get, &path, Some(&params), None).await
    }

    /// Fetches one document, optionally in a specific `format` (e.g. `udl`, `xml`).
    pub async fn get_doc(
        &self,
        name: &DocumentName,
        format: Option<&str>,
    ) -> Result<ResponseEnvelope, AtelierError> {
        let ns = self.namespace().await?;
        let path = format!("v2/{ns}/doc/{name}");
        let params = QueryParams::new().with("format", format);
        self.request(Method::Get, &path, Some(&params), None).await
    }

    /// Creates or replaces a document.
    ///
    /// With `ignore_conflict` set the server overwrites the document even if
    /// it changed since it was last read.
    pub async fn put_doc(
        &self,
        name: &DocumentName,
        content: &DocumentContent,
        ignore_conflict: Option<bool>,
    ) -> Result<ResponseEnvelope, AtelierError> {
        let ns = self.namespace().await?;
        let path = format!("v2/{ns}/doc/{name}");
        let params = QueryParams::new().with("ignoreConflict", ignore_conflict);
        let body = serde_json::to_value(content).map_err(AtelierError::BodySerialization)?;
        self.request(Method::Put, &path, Some(&params), Some(&body))
            .await
    }

    /// Returns index information (members, super classes) for documents.
    pub async fn action_index(
        &self,
        docs: &[DocumentName],
    ) -> Result<ResponseEnvelope, AtelierError> {
        let ns = self.namespace().await?;
        let path = format!("v2/{ns}/action/index");
        let body = serde_json::to_value(docs).map_err(AtelierError::BodySerialization)?;
        self.request(Method::Post, &path, Some(&QueryParams::new()), Some(&body))
            .await
    }

    /// Compiles documents with optional compiler `flags`.
    ///
    /// With `source` set the server returns the generated source in the response.
    pub async fn action_compile(
        &self,
        docs: &[DocumentName],
        flags: Option<&str>,
        source: bool,
    ) -> Result<ResponseEnvelope, AtelierError> {
        let ns = self.namespace().await?;
        let path = format!("v2/{ns}/action/compile");
        let params = QueryParams::new()
            .with("flags", flags)
            .with("source", source);
        let body = serde_json::to_value(docs).map_err(AtelierError::BodySerialization)?;
        self.request(Method::Post, &path, Some(&params), Some(&body))
            .await
    }

    async fn namespace(&self) -> Result<String, AtelierError> {
        Ok(self.executor.config_provider().current().await?.ns)
    }
}
