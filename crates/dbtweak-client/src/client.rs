//! REST client for the databases API.
//!
//! This module provides the `Client` struct, a [`DocumentStore`] backed by
//! HTTP calls against one database of one project.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use dbtweak_core::store::DocumentStore;
use dbtweak_proto::{
    AttributeDescriptor, CollectionDescriptor, DocumentPage, IndexDescriptor, ResourceKind,
};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::wire::{
    self, ApiErrorBody, AttributeList, DocumentList, IndexList, RawAttribute, RawCollection,
    RawIndex,
};

/// Entries requested per page when listing attributes or indexes.
const LIST_PAGE_SIZE: usize = 100;

/// A client for one database.
///
/// # Example
///
/// ```ignore
/// use dbtweak_client::{Client, ClientConfig};
/// use dbtweak_core::{MigrationConfig, MigrationPlanner};
///
/// let config = ClientConfig::new("my-project", api_key, "main")
///     .with_endpoint("https://db.example.com/v1");
/// let client = Client::new(config)?;
///
/// let planner = MigrationPlanner::new(&client, "users", MigrationConfig::default())?;
/// planner.rename_attribute("name", "fullname").await?;
/// ```
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Build a client. No request is made until the first call.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert("x-appwrite-project", header_value("project", &config.project)?);
        headers.insert("x-appwrite-key", header_value("API key", &config.api_key)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.self_signed)
            .build()?;

        Ok(Self { http, config })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/databases/{}/collections",
            self.config.endpoint, self.config.database
        )
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.collections_url(), collection)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        debug!(%method, %url, "request");
        self.http.request(method, url)
    }

    /// Send a request and decode the JSON body.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch every page of a schema listing.
    async fn fetch_all<L, T>(&self, url: String, split: fn(L) -> (u64, Vec<T>)) -> Result<Vec<T>, Error>
    where
        L: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut offset = 0u64;
        loop {
            let request = self
                .request(Method::GET, url.clone())
                .query(&wire::page_queries(LIST_PAGE_SIZE, offset));
            let (total, page) = split(self.fetch(request).await?);
            let page_len = page.len();
            items.extend(page);

            match wire::next_page_offset(items.len(), page_len, total) {
                Some(next) => offset = next,
                None => return Ok(items),
            }
        }
    }

    /// Send a request and return the raw body of a success response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, Error> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let (kind, message) = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => (parsed.kind, parsed.message),
            Err(_) => (None, body),
        };
        debug!(status = status.as_u16(), kind = ?kind, %message, "api error");
        Err(Error::Api {
            code: status.as_u16(),
            kind,
            message,
        })
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::Config(format!("{} contains characters not allowed in a header", name)))
}

#[async_trait]
impl DocumentStore for Client {
    async fn list_attributes(
        &self,
        collection: &str,
    ) -> dbtweak_core::Result<Vec<AttributeDescriptor>> {
        let url = format!("{}/attributes", self.collection_url(collection));
        let attributes = self
            .fetch_all(url, AttributeList::into_parts)
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        Ok(attributes
            .into_iter()
            .map(RawAttribute::into_descriptor)
            .collect())
    }

    async fn get_attribute(
        &self,
        collection: &str,
        key: &str,
    ) -> dbtweak_core::Result<AttributeDescriptor> {
        let url = format!("{}/attributes/{}", self.collection_url(collection), key);
        let raw: RawAttribute = self
            .fetch(self.request(Method::GET, url))
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Attribute, key))?;
        Ok(raw.into_descriptor())
    }

    async fn create_attribute(
        &self,
        collection: &str,
        attribute: &AttributeDescriptor,
    ) -> dbtweak_core::Result<()> {
        let endpoint = wire::attribute_endpoint(attribute)
            .map_err(|e| e.into_store_error(ResourceKind::Attribute, &attribute.key))?;
        let url = format!(
            "{}/attributes/{}",
            self.collection_url(collection),
            endpoint
        );
        self.execute(
            self.request(Method::POST, url)
                .json(&wire::attribute_body(attribute)),
        )
        .await
        .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        Ok(())
    }

    async fn delete_attribute(&self, collection: &str, key: &str) -> dbtweak_core::Result<()> {
        let url = format!("{}/attributes/{}", self.collection_url(collection), key);
        self.execute(self.request(Method::DELETE, url))
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Attribute, key))?;
        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> dbtweak_core::Result<Vec<IndexDescriptor>> {
        let url = format!("{}/indexes", self.collection_url(collection));
        let indexes = self
            .fetch_all(url, IndexList::into_parts)
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        Ok(indexes.into_iter().map(RawIndex::into_descriptor).collect())
    }

    async fn get_index(&self, collection: &str, key: &str) -> dbtweak_core::Result<IndexDescriptor> {
        let url = format!("{}/indexes/{}", self.collection_url(collection), key);
        let raw: RawIndex = self
            .fetch(self.request(Method::GET, url))
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Index, key))?;
        Ok(raw.into_descriptor())
    }

    async fn create_index(
        &self,
        collection: &str,
        index: &IndexDescriptor,
    ) -> dbtweak_core::Result<()> {
        let url = format!("{}/indexes", self.collection_url(collection));
        self.execute(self.request(Method::POST, url).json(&wire::index_body(index)))
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        Ok(())
    }

    async fn delete_index(&self, collection: &str, key: &str) -> dbtweak_core::Result<()> {
        let url = format!("{}/indexes/{}", self.collection_url(collection), key);
        self.execute(self.request(Method::DELETE, url))
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Index, key))?;
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: &str,
        limit: usize,
        offset: u64,
    ) -> dbtweak_core::Result<DocumentPage> {
        let url = format!("{}/documents", self.collection_url(collection));
        let request = self
            .request(Method::GET, url)
            .query(&wire::page_queries(limit, offset));
        let list: DocumentList = self
            .fetch(request)
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        debug!(collection, offset, total = list.total, "listed documents");
        Ok(list.into_page())
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        patch: Map<String, Value>,
    ) -> dbtweak_core::Result<()> {
        let url = format!(
            "{}/documents/{}",
            self.collection_url(collection),
            document_id
        );
        self.execute(
            self.request(Method::PATCH, url)
                .json(&wire::document_update_body(patch)),
        )
        .await
        .map_err(|e| e.into_store_error(ResourceKind::Document, document_id))?;
        Ok(())
    }

    async fn create_document(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: Map<String, Value>,
    ) -> dbtweak_core::Result<()> {
        let url = format!("{}/documents", self.collection_url(collection));
        self.execute(
            self.request(Method::POST, url)
                .json(&wire::document_create_body(document_id, data)),
        )
        .await
        .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        Ok(())
    }

    async fn get_collection(&self, collection: &str) -> dbtweak_core::Result<CollectionDescriptor> {
        let raw: RawCollection = self
            .fetch(self.request(Method::GET, self.collection_url(collection)))
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        Ok(raw.into_descriptor())
    }

    async fn create_collection(&self, collection: &CollectionDescriptor) -> dbtweak_core::Result<()> {
        self.execute(
            self.request(Method::POST, self.collections_url())
                .json(&wire::collection_body(collection)),
        )
        .await
        .map_err(|e| e.into_store_error(ResourceKind::Collection, &collection.id))?;
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> dbtweak_core::Result<()> {
        self.execute(self.request(Method::DELETE, self.collection_url(collection)))
            .await
            .map_err(|e| e.into_store_error(ResourceKind::Collection, collection))?;
        Ok(())
    }
}
