use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer};

use crate::{decimal::Decimal, validation::ValidationErrors};

/// The pattern of date-only fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A payment transaction.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Transaction {
    /// The transaction id.
    pub id: String,

    /// The status, e.g. `settled`.
    pub status: String,

    /// The transaction type, `sale` or `credit`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The ISO 4217 currency code.
    pub currency_iso_code: String,

    /// The amount charged.
    pub amount: Option<Decimal>,

    /// The merchant account the transaction was processed through.
    pub merchant_account_id: String,

    /// The merchant's order id.
    pub order_id: String,

    /// The subscription that created the transaction, if any.
    pub subscription_id: String,

    /// When the transaction was created.
    pub created_at: Option<DateTime<Utc>>,

    /// When the transaction was last updated.
    pub updated_at: Option<DateTime<Utc>>,

    /// Disbursement information, once the funds have been disbursed.
    pub disbursement_details: Option<DisbursementDetails>,
}

/// When the funds of a transaction were disbursed.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DisbursementDetails {
    /// The date of the disbursement.
    #[serde(deserialize_with = "date")]
    pub disbursement_date: Option<NaiveDate>,
}

/// A recurring billing subscription.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Subscription {
    /// The subscription id.
    pub id: String,

    /// The status, e.g. `Active` or `Past Due`.
    pub status: String,

    /// The plan the subscription bills for.
    pub plan_id: String,

    /// The merchant account the subscription bills through.
    pub merchant_account_id: String,

    /// The price per billing cycle.
    pub price: Option<Decimal>,

    /// The outstanding balance.
    pub balance: Option<Decimal>,

    /// The next billing date.
    #[serde(deserialize_with = "date")]
    pub next_billing_date: Option<NaiveDate>,

    /// The transactions created by this subscription.
    #[serde(deserialize_with = "transactions")]
    pub transactions: Vec<Transaction>,
}

/// A merchant account.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MerchantAccount {
    /// The merchant account id.
    pub id: String,

    /// The status, e.g. `active` or `suspended`.
    pub status: String,

    /// The ISO 4217 currency code.
    pub currency_iso_code: String,

    /// Whether this is a sub-merchant account.
    pub sub_merchant_account: bool,

    /// The master merchant account of a sub-merchant account.
    #[serde(alias = "master_merchant_account")]
    pub master_merchant_account: Option<Box<MerchantAccount>>,
}

/// A payout of settled funds to a merchant.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Disbursement {
    /// The disbursement id.
    pub id: String,

    /// Why the disbursement failed, e.g. `bank_rejected`.
    pub exception_message: Option<String>,

    /// The ISO 4217 currency code.
    pub currency_iso_code: String,

    /// The status of the disbursement.
    pub status: String,

    /// What the merchant has to do after a failure, e.g. `update_funding_information`.
    pub follow_up_action: Option<String>,

    /// Whether the disbursement succeeded.
    pub success: bool,

    /// Whether the disbursement will be retried.
    pub retry: bool,

    /// The ids of the transactions paid out.
    #[serde(deserialize_with = "items")]
    pub transaction_ids: Vec<String>,

    /// The date of the disbursement.
    #[serde(deserialize_with = "date")]
    pub disbursement_date: Option<NaiveDate>,

    /// The total amount disbursed.
    pub amount: Option<Decimal>,

    /// The merchant account receiving the funds.
    pub merchant_account: Option<MerchantAccount>,
}

/// A chargeback, retrieval or pre-arbitration case.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Dispute {
    /// The dispute id.
    pub id: String,

    /// The disputed amount.
    pub amount: Option<Decimal>,

    /// The ISO 4217 currency code.
    pub currency_iso_code: String,

    /// The dispute kind, e.g. `chargeback`.
    pub kind: String,

    /// The status, e.g. `open`, `won` or `lost`.
    pub status: String,

    /// The reason given by the card holder, e.g. `fraud`.
    pub reason: String,

    /// When the dispute was received.
    #[serde(deserialize_with = "date")]
    pub received_date: Option<NaiveDate>,

    /// When the merchant has to respond by.
    #[serde(deserialize_with = "date")]
    pub reply_by_date: Option<NaiveDate>,

    /// When the dispute was opened.
    #[serde(deserialize_with = "date")]
    pub date_opened: Option<NaiveDate>,

    /// When the dispute was won.
    #[serde(deserialize_with = "date")]
    pub date_won: Option<NaiveDate>,

    /// The disputed transaction.
    pub transaction: Option<DisputeTransaction>,
}

/// The transaction a dispute refers to.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DisputeTransaction {
    /// The transaction id.
    pub id: String,

    /// The transaction amount.
    pub amount: Option<Decimal>,
}

/// The account updater's daily report.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DailyReport {
    /// The date the report covers.
    #[serde(deserialize_with = "date")]
    pub report_date: Option<NaiveDate>,

    /// Where the CSV report can be downloaded.
    pub report_url: String,
}

/// The gateway's error envelope, `<api-error-response>`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiErrorResponse {
    /// The summary message.
    pub message: String,

    /// The validation errors, nested like the request that failed.
    #[serde(deserialize_with = "root_errors")]
    pub errors: ValidationErrors,

    /// The merchant account the request concerned, if the gateway echoed it.
    pub merchant_account: Option<MerchantAccount>,

    /// The transaction the request created, if any, e.g. a declined sale.
    pub transaction: Option<Transaction>,
}

/// The hydration response of a transaction search.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionCollection {
    #[serde(rename = "transaction", default)]
    transactions: Vec<Transaction>,
}

impl From<TransactionCollection> for Vec<Transaction> {
    fn from(collection: TransactionCollection) -> Self {
        collection.transactions
    }
}

/// The hydration response of a subscription search.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionCollection {
    #[serde(rename = "subscription", default)]
    subscriptions: Vec<Subscription>,
}

impl From<SubscriptionCollection> for Vec<Subscription> {
    fn from(collection: SubscriptionCollection) -> Self {
        collection.subscriptions
    }
}

#[derive(Default, Deserialize)]
struct Items {
    #[serde(rename = "item", default)]
    items: Vec<String>,
}

/// Decodes a `type="array"` element of `<item>` children.
pub(crate) fn items<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Items::deserialize(deserializer)?.items)
}

fn transactions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Transaction>, D::Error> {
    Ok(TransactionCollection::deserialize(deserializer)?.into())
}

/// Decodes a `type="date"` element. Empty text is no date.
fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let text = String::deserialize(deserializer)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).map(Some).map_err(de::Error::custom)
}

fn root_errors<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ValidationErrors, D::Error> {
    Ok(ValidationErrors::deserialize(deserializer)?.named("Errors"))
}
