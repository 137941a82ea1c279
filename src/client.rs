use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use crate::{
    config::{Credentials, Environment},
    error::{ApiError, BuildClientError, CredentialsError, RequestError, SearchError, WebhookError},
    models::{ApiErrorResponse, Disbursement, Subscription, SubscriptionCollection, Transaction, TransactionCollection},
    pagination::{PageCursor, SearchBackend, SearchIds, SearchPage},
    search::Search,
    webhook::{Key, Notification},
};
use crate::{
    document::strip_nil_elements,
    pagination::{fetch_ids, fetch_page},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT_VALUE: &str = "Braintree-API-Client";
const XML_CONTENT_TYPE: &str = "application/xml";
const API_VERSION_HEADER: &str = "X-ApiVersion";
const API_VERSION: &str = "3";
const ADVANCED_SEARCH_IDS_PATH: &str = "advanced_search_ids";
const ADVANCED_SEARCH_PATH: &str = "advanced_search";

/// A resource that supports advanced search.
pub trait Searchable: DeserializeOwned + Send + Sync + 'static {
    /// The path of the resource below the merchant, e.g. `transactions`.
    const PATH: &'static str;

    /// The document a hydration request answers with.
    type Collection: DeserializeOwned + Into<Vec<Self>> + Send;
}

impl Searchable for Transaction {
    const PATH: &'static str = "transactions";
    type Collection = TransactionCollection;
}

impl Searchable for Subscription {
    const PATH: &'static str = "subscriptions";
    type Collection = SubscriptionCollection;
}

/// An interface to interact with the gateway.
#[async_trait]
pub trait GatewayClient {
    /// Runs a search and returns a cursor over the ids of every match.
    async fn search_ids<R: Searchable>(&self, query: &Search) -> Result<PageCursor, RequestError>;

    /// Hydrates one page of a search started with [`GatewayClient::search_ids`].
    async fn search_page<R: Searchable>(
        &self,
        query: &Search,
        cursor: &PageCursor,
        page: usize,
    ) -> Result<SearchPage<R>, SearchError>;

    /// Fetches the first page of transactions paid out by a disbursement.
    async fn disbursement_transactions(
        &self,
        disbursement: &Disbursement,
    ) -> Result<SearchPage<Transaction>, SearchError>;

    /// Verifies and decodes a webhook notification.
    fn parse_notification(&self, signature: &str, payload: &str) -> Result<Notification, WebhookError>;

    /// Answers the gateway's webhook verification challenge.
    fn verify_challenge(&self, challenge: &str) -> Result<String, WebhookError>;
}

/// The default gateway client that hits the actual service.
pub struct DefaultGatewayClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    webhook_key: Option<Key>,
}

impl DefaultGatewayClient {
    /// Creates a client for the given environment.
    pub fn new(environment: Environment, credentials: Credentials) -> Result<Self, reqwest::Error> {
        Self::with_base_url(environment.base_url(), credentials)
    }

    /// Creates a client for an access token, in the environment the token was issued for.
    pub fn from_access_token(access_token: impl Into<String>) -> Result<Self, BuildClientError> {
        let credentials = Credentials::access_token(access_token)?;
        let Some(environment) = credentials.environment() else {
            return Err(CredentialsError::MalformedAccessToken.into());
        };
        Ok(Self::new(environment, credentials)?)
    }

    /// Creates a client that sends requests to `base_url`.
    pub fn with_base_url(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).gzip(true).build()?;
        let webhook_key = match &credentials {
            Credentials::ApiKey { key, .. } => Some(key.clone()),
            Credentials::AccessToken { .. } => None,
        };
        Ok(Self { client, base_url: base_url.into(), credentials, webhook_key })
    }

    /// Sets the key webhook notifications are verified with.
    pub fn with_webhook_key(mut self, key: Key) -> Self {
        self.webhook_key = Some(key);
        self
    }

    fn make_url(&self, path: &str) -> String {
        let base_url = &self.base_url;
        let merchant_id = self.credentials.merchant_id();
        format!("{base_url}/merchants/{merchant_id}/{path}")
    }

    /// Sends a document to the gateway and returns the normalized response document.
    pub async fn call(&self, method: Method, path: &str, body: Option<String>) -> Result<Vec<u8>, RequestError> {
        let url = self.make_url(path);
        debug!("Sending {method} request to {url}");

        let mut request = self
            .client
            .request(method, &url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .header(ACCEPT, XML_CONTENT_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(AUTHORIZATION, self.credentials.authorization_header());
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.bytes().await?;
        let body = match strip_nil_elements(&raw) {
            Ok(body) => body,
            // Proxies answer errors with pages that are not gateway documents.
            Err(e) if status.as_u16() > 299 => {
                warn!("Gateway answered with status {status} and a malformed body: {e}");
                return Err(RequestError::Status(status));
            }
            Err(e) => return Err(e.into()),
        };
        check_response(status, &body)?;
        Ok(body)
    }

    async fn post<O>(&self, path: &str, query: &Search) -> Result<O, RequestError>
    where
        O: DeserializeOwned,
    {
        let body = self.call(Method::POST, path, Some(query.to_xml())).await?;
        Ok(quick_xml::de::from_reader(body.as_slice())?)
    }

    fn webhook_key(&self) -> Result<&Key, WebhookError> {
        self.webhook_key.as_ref().ok_or(WebhookError::MissingKey)
    }
}

/// Turns an error envelope into an [`ApiError`], and any other error status into [`RequestError::Status`].
fn check_response(status: StatusCode, body: &[u8]) -> Result<(), RequestError> {
    // Success documents are not envelopes, so a failed decode just means there is no error.
    if let Ok(response) = quick_xml::de::from_reader::<_, ApiErrorResponse>(body) {
        if !response.message.is_empty() {
            warn!("Gateway rejected request with status {status}: {}", response.message);
            return Err(ApiError { status, response }.into());
        }
    }
    if status.as_u16() > 299 {
        warn!("Gateway answered with unexpected status {status}");
        return Err(RequestError::Status(status));
    }
    Ok(())
}

#[async_trait]
impl<R: Searchable> SearchBackend<R> for DefaultGatewayClient {
    async fn advanced_search_ids(&self, query: &Search) -> Result<SearchIds, RequestError> {
        let path = format!("{}/{ADVANCED_SEARCH_IDS_PATH}", R::PATH);
        self.post(&path, query).await
    }

    async fn advanced_search(&self, query: &Search) -> Result<Vec<R>, RequestError> {
        let path = format!("{}/{ADVANCED_SEARCH_PATH}", R::PATH);
        let collection: R::Collection = self.post(&path, query).await?;
        Ok(collection.into())
    }
}

#[async_trait]
impl GatewayClient for DefaultGatewayClient {
    async fn search_ids<R: Searchable>(&self, query: &Search) -> Result<PageCursor, RequestError> {
        fetch_ids::<R, _>(self, query).await
    }

    async fn search_page<R: Searchable>(
        &self,
        query: &Search,
        cursor: &PageCursor,
        page: usize,
    ) -> Result<SearchPage<R>, SearchError> {
        fetch_page::<R, _>(self, cursor, query, page).await
    }

    async fn disbursement_transactions(
        &self,
        disbursement: &Disbursement,
    ) -> Result<SearchPage<Transaction>, SearchError> {
        let mut query = Search::new();
        query.add_multi("ids").items(disbursement.transaction_ids.iter().cloned());

        let cursor = self.search_ids::<Transaction>(&query).await?;
        info!("Disbursement {} paid out {} transactions", disbursement.id, cursor.total_items());
        if cursor.page_count() == 0 {
            return Ok(SearchPage { total_items: 0, page_number: 1, page_size: cursor.page_size(), items: Vec::new() });
        }
        self.search_page(&query, &cursor, 1).await
    }

    fn parse_notification(&self, signature: &str, payload: &str) -> Result<Notification, WebhookError> {
        self.webhook_key()?.parse(signature, payload)
    }

    fn verify_challenge(&self, challenge: &str) -> Result<String, WebhookError> {
        Ok(self.webhook_key()?.verify_challenge(challenge))
    }
}
