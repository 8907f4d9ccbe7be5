//! HTTP adapters for the account and catalog services.

use std::time::Duration;

use async_trait::async_trait;
use common::{AccountId, ProductId};
use domain::{Account, Product};
use reqwest::{Client, StatusCode, Url};

use super::{AccountGateway, CatalogGateway};
use crate::error::GatewayError;

fn build_client(timeout: Duration) -> Result<Client, GatewayError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn parse_base_url(base_url: &str) -> Result<Url, GatewayError> {
    let url = Url::parse(base_url)
        .map_err(|e| GatewayError::InvalidUrl(format!("{base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(GatewayError::InvalidUrl(base_url.to_string()));
    }
    Ok(url)
}

/// Appends `segments` to the base path, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| GatewayError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Account gateway backed by `GET {base_url}/accounts/{id}`.
#[derive(Debug, Clone)]
pub struct HttpAccountGateway {
    client: Client,
    base_url: Url,
}

impl HttpAccountGateway {
    /// Creates a gateway whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base_url(&base_url.into())?,
        })
    }
}

#[async_trait]
impl AccountGateway for HttpAccountGateway {
    #[tracing::instrument(skip(self))]
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, GatewayError> {
        let url = endpoint(&self.base_url, &["accounts", id.as_str()])?;
        let response = self.client.get(url.clone()).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let account = response.json::<Account>().await?;
                if account.id != *id {
                    return Err(GatewayError::UnexpectedResponse(format!(
                        "asked for account {id}, got {}",
                        account.id
                    )));
                }
                Ok(Some(account))
            }
            status => Err(GatewayError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

/// Catalog gateway backed by `GET {base_url}/products?ids=a&ids=b`.
#[derive(Debug, Clone)]
pub struct HttpCatalogGateway {
    client: Client,
    base_url: Url,
}

impl HttpCatalogGateway {
    /// Creates a gateway whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base_url(&base_url.into())?,
        })
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    #[tracing::instrument(skip(self), fields(count = ids.len()))]
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, GatewayError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = endpoint(&self.base_url, &["products"])?;
        // One pair per id; ids may themselves contain commas.
        url.query_pairs_mut()
            .extend_pairs(ids.iter().map(|id| ("ids", id.as_str())));
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<Vec<Product>>().await?)
    }
}
