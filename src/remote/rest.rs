//! REST collection client using reqwest.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::contact::{Contact, NewContact};
use crate::remote::{ContactService, ServiceError};

/// Client for a json-server style collection (`GET`/`POST` on the
/// collection, `DELETE` on `<collection>/<id>`).
pub struct HttpContactService {
    client: Client,
    collection: Url,
}

impl HttpContactService {
    pub fn new(collection_url: &str, timeout: Duration) -> Result<Self> {
        let collection = parse_collection_url(collection_url)?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, collection })
    }

    /// URL addressing a single contact
    pub fn item_url(&self, id: i64) -> Url {
        let mut url = self.collection.clone();
        // parse_collection_url already rejected cannot-be-a-base URLs
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        url
    }
}

pub fn parse_collection_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid server URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("server URL must use http or https: {}", raw);
    }
    if url.cannot_be_a_base() {
        bail!("server URL cannot address a collection: {}", raw);
    }
    Ok(url)
}

fn check_status(response: Response, id: Option<i64>) -> Result<Response, ServiceError> {
    match ServiceError::from_status(response.status(), id) {
        Some(err) => Err(err),
        None => Ok(response),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let body = response.bytes().await.map_err(ServiceError::Network)?;
    serde_json::from_slice(&body).map_err(|e| ServiceError::Decode(e.to_string()))
}

impl ContactService for HttpContactService {
    async fn get_all(&self) -> Result<Vec<Contact>, ServiceError> {
        tracing::debug!(url = %self.collection, "fetching contacts");
        let response = self
            .client
            .get(self.collection.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(ServiceError::Network)?;

        let response = check_status(response, None)?;
        let contacts: Vec<Contact> = decode(response).await?;
        tracing::debug!(count = contacts.len(), "fetched contacts");
        Ok(contacts)
    }

    async fn create(&self, contact: &NewContact) -> Result<Contact, ServiceError> {
        tracing::debug!(name = %contact.name, candidate_id = contact.id, "creating contact");
        let response = self
            .client
            .post(self.collection.clone())
            .header("Accept", "application/json")
            .json(contact)
            .send()
            .await
            .map_err(ServiceError::Network)?;

        let response = check_status(response, None)?;
        decode(response).await
    }

    async fn delete_number(&self, contact: &Contact) -> Result<(), ServiceError> {
        let url = self.item_url(contact.id);
        tracing::debug!(%url, "deleting contact");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(ServiceError::Network)?;

        check_status(response, Some(contact.id))?;
        Ok(())
    }
}
