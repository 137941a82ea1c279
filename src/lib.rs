//! A Rust client for the core of the [Braintree](https://www.braintreepayments.com) payment gateway's
//! XML API.
//!
//! The crate covers the mechanisms every gateway resource depends on: exact decimal amounts, the
//! advanced search query builder, normalization of `nil="true"` elements, the nested validation error
//! tree, two phase search pagination and signed webhook notifications.
//!
//! # Getting Started
//!
//! The primary entry point is the [`GatewayClient`] trait and its default implementation,
//! [`DefaultGatewayClient`].
//!
//! ## Example: Paging Through a Transaction Search
//!
//! ```no_run
//! use braintree_client::{
//!     client::{DefaultGatewayClient, GatewayClient},
//!     config::{Credentials, Environment},
//!     decimal::Decimal,
//!     models::Transaction,
//!     search::Search,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::api_key("merchant_id", "public_key", "private_key");
//!     let client = DefaultGatewayClient::new(Environment::Sandbox, credentials)?;
//!
//!     // 1. Build the query
//!     let mut query = Search::new();
//!     query.add_range("amount").min("10.00".parse::<Decimal>()?);
//!     query.add_multi("status").items(["settled", "settling"]);
//!
//!     // 2. Fetch the ids of every match
//!     let mut cursor = client.search_ids::<Transaction>(&query).await?;
//!
//!     // 3. Hydrate the pages one at a time
//!     if cursor.page_count() > 0 {
//!         loop {
//!             let page = client.search_page::<Transaction>(&query, &cursor, cursor.current_page()).await?;
//!             for transaction in page.items {
//!                 println!("{} {:?}", transaction.id, transaction.amount.map(|a| a.to_string()));
//!             }
//!             if cursor.next_page().is_none() {
//!                 break;
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example: Handling a Webhook
//!
//! ```no_run
//! use braintree_client::webhook::{Key, Subject};
//!
//! fn handle(bt_signature: &str, bt_payload: &str) -> Result<(), Box<dyn std::error::Error>> {
//!     let key = Key::new("public_key", "private_key");
//!     let notification = key.parse(bt_signature, bt_payload)?;
//!     if let Subject::Disbursement(disbursement) = &notification.subject {
//!         println!("disbursement {} paid out {:?}", disbursement.id, disbursement.transaction_ids);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod decimal;
pub mod document;
pub mod error;
pub mod models;
pub mod pagination;
pub mod search;
pub mod validation;
pub mod webhook;

pub use client::{DefaultGatewayClient, GatewayClient, Searchable};
pub use decimal::Decimal;
pub use pagination::{PageCursor, SearchBackend, SearchPage};
pub use search::Search;
pub use validation::{ValidationError, ValidationErrors};
pub use webhook::{Key, Notification, Subject, WebhookKind};
