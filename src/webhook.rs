//! Verification and parsing of webhook notifications.
//!
//! The gateway posts two form fields: `bt_signature`, a list of `public_key|hex_digest` pairs joined by
//! `&`, and `bt_payload`, a base64 encoded notification document. Several pairs may be present while a
//! merchant rotates keys; only the pair for our public key is checked.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{
    digest::{Key as MacKey, KeyInit},
    Hmac, Mac,
};
use quick_xml::escape::escape;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::{
    convert::Infallible,
    fmt::{self, Display},
    str::FromStr,
};
use tracing::{debug, warn};

use crate::{
    document::strip_nil_elements,
    error::{SignatureError, WebhookError},
    models::{ApiErrorResponse, DailyReport, Disbursement, Dispute, MerchantAccount, Subscription, Transaction},
};

type HmacSha1 = Hmac<Sha1>;

const PAIR_SEPARATOR: char = '&';
const KEY_SEPARATOR: char = '|';

/// A public/private key pair used to sign and verify webhook payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    /// The public key, sent in the clear alongside each digest.
    pub public_key: String,

    /// The private key the digests are derived from.
    pub private_key: String,
}

impl Key {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self { public_key: public_key.into(), private_key: private_key.into() }
    }

    /// Finds the digest signed for our public key in a `public|digest&public|digest` list.
    pub fn parse_signature<'a>(&self, signature_pairs: &'a str) -> Result<&'a str, SignatureError> {
        if !signature_pairs.contains(KEY_SEPARATOR) {
            return Err(SignatureError::MissingPipe);
        }
        signature_pairs
            .split(PAIR_SEPARATOR)
            .filter_map(|pair| pair.split_once(KEY_SEPARATOR))
            .find(|(public_key, digest)| *public_key == self.public_key && !digest.contains(KEY_SEPARATOR))
            .map(|(_, digest)| digest)
            .ok_or(SignatureError::WrongPublicKey)
    }

    /// The lowercase hex HMAC-SHA1 of `payload`, keyed with the SHA-1 of the private key.
    pub fn hmac(&self, payload: &str) -> String {
        hex::encode(self.mac(payload).finalize().into_bytes())
    }

    /// Checks the digest signed for our public key against `payload`.
    ///
    /// A digest that does not match is `Ok(false)`; only a malformed list or a missing public key are errors.
    pub fn verify_signature(&self, signature_pairs: &str, payload: &str) -> Result<bool, SignatureError> {
        let digest = self.parse_signature(signature_pairs)?;
        let Ok(digest) = hex::decode(digest) else {
            return Ok(false);
        };
        Ok(self.mac(payload).verify_slice(&digest).is_ok())
    }

    /// Signs `payload`, producing a `public|digest` pair.
    pub fn sign(&self, payload: &str) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.public_key, self.hmac(payload))
    }

    /// Answers the gateway's webhook verification challenge.
    pub fn verify_challenge(&self, challenge: &str) -> String {
        self.sign(challenge)
    }

    /// Verifies and decodes a webhook notification.
    pub fn parse(&self, signature_pairs: &str, payload: &str) -> Result<Notification, WebhookError> {
        if !self.verify_signature(signature_pairs, payload)? {
            warn!("Rejecting webhook payload with an invalid signature for public key {}", self.public_key);
            return Err(SignatureError::Invalid.into());
        }

        // Payloads are MIME encoded, with a line break every 60 characters.
        let encoded: Vec<u8> = payload.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        let document = strip_nil_elements(&STANDARD.decode(encoded)?)?;
        let notification = Notification::from_xml(&document)?;
        debug!("Parsed webhook notification kind={}", notification.kind);
        Ok(notification)
    }

    fn mac(&self, payload: &str) -> HmacSha1 {
        // The 20 byte digest is shorter than the 64 byte block, so zero padding it is the HMAC key.
        let digest = Sha1::digest(self.private_key.as_bytes());
        let mut key = MacKey::<HmacSha1>::default();
        key[..digest.len()].copy_from_slice(&digest);
        let mut mac = <HmacSha1 as KeyInit>::new(&key);
        mac.update(payload.as_bytes());
        mac
    }
}

/// The kind of event a notification reports.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WebhookKind {
    Check,
    Disbursement,
    DisbursementException,
    SubscriptionCanceled,
    SubscriptionChargedSuccessfully,
    SubscriptionChargedUnsuccessfully,
    SubscriptionExpired,
    SubscriptionTrialEnded,
    SubscriptionWentActive,
    SubscriptionWentPastDue,
    SubMerchantAccountApproved,
    SubMerchantAccountDeclined,
    PartnerMerchantConnected,
    PartnerMerchantDisconnected,
    PartnerMerchantDeclined,
    TransactionSettled,
    TransactionSettlementDeclined,
    TransactionDisbursed,
    DisputeOpened,
    DisputeLost,
    DisputeWon,
    AccountUpdaterDailyReport,

    /// A kind this library does not know about yet.
    Other(String),
}

impl WebhookKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Check => "check",
            Self::Disbursement => "disbursement",
            Self::DisbursementException => "disbursement_exception",
            Self::SubscriptionCanceled => "subscription_canceled",
            Self::SubscriptionChargedSuccessfully => "subscription_charged_successfully",
            Self::SubscriptionChargedUnsuccessfully => "subscription_charged_unsuccessfully",
            Self::SubscriptionExpired => "subscription_expired",
            Self::SubscriptionTrialEnded => "subscription_trial_ended",
            Self::SubscriptionWentActive => "subscription_went_active",
            Self::SubscriptionWentPastDue => "subscription_went_past_due",
            Self::SubMerchantAccountApproved => "sub_merchant_account_approved",
            Self::SubMerchantAccountDeclined => "sub_merchant_account_declined",
            Self::PartnerMerchantConnected => "partner_merchant_connected",
            Self::PartnerMerchantDisconnected => "partner_merchant_disconnected",
            Self::PartnerMerchantDeclined => "partner_merchant_declined",
            Self::TransactionSettled => "transaction_settled",
            Self::TransactionSettlementDeclined => "transaction_settlement_declined",
            Self::TransactionDisbursed => "transaction_disbursed",
            Self::DisputeOpened => "dispute_opened",
            Self::DisputeLost => "dispute_lost",
            Self::DisputeWon => "dispute_won",
            Self::AccountUpdaterDailyReport => "account_updater_daily_report",
            Self::Other(kind) => kind,
        }
    }
}

impl FromStr for WebhookKind {
    type Err = Infallible;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        Ok(match kind {
            "check" => Self::Check,
            "disbursement" => Self::Disbursement,
            "disbursement_exception" => Self::DisbursementException,
            "subscription_canceled" => Self::SubscriptionCanceled,
            "subscription_charged_successfully" => Self::SubscriptionChargedSuccessfully,
            "subscription_charged_unsuccessfully" => Self::SubscriptionChargedUnsuccessfully,
            "subscription_expired" => Self::SubscriptionExpired,
            "subscription_trial_ended" => Self::SubscriptionTrialEnded,
            "subscription_went_active" => Self::SubscriptionWentActive,
            "subscription_went_past_due" => Self::SubscriptionWentPastDue,
            "sub_merchant_account_approved" => Self::SubMerchantAccountApproved,
            "sub_merchant_account_declined" => Self::SubMerchantAccountDeclined,
            "partner_merchant_connected" => Self::PartnerMerchantConnected,
            "partner_merchant_disconnected" => Self::PartnerMerchantDisconnected,
            "partner_merchant_declined" => Self::PartnerMerchantDeclined,
            "transaction_settled" => Self::TransactionSettled,
            "transaction_settlement_declined" => Self::TransactionSettlementDeclined,
            "transaction_disbursed" => Self::TransactionDisbursed,
            "dispute_opened" => Self::DisputeOpened,
            "dispute_lost" => Self::DisputeLost,
            "dispute_won" => Self::DisputeWon,
            "account_updater_daily_report" => Self::AccountUpdaterDailyReport,
            other => Self::Other(other.to_string()),
        })
    }
}

impl Display for WebhookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource a notification is about, selected by its kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Subject {
    /// The answer to a webhook test.
    Check,

    /// A sub-merchant account was approved.
    MerchantAccount(MerchantAccount),

    /// A sub-merchant account was declined; the envelope explains why.
    ErrorResponse(ApiErrorResponse),

    /// A disbursement succeeded or failed.
    Disbursement(Disbursement),

    /// A dispute was opened, won or lost.
    Dispute(Dispute),

    /// A subscription changed state or was charged.
    Subscription(Subscription),

    /// A transaction settled, failed to settle, or was disbursed.
    Transaction(Transaction),

    /// The account updater's daily report is ready.
    DailyReport(DailyReport),

    /// The kind is unknown, or its subject was missing.
    Unset,
}

/// A verified webhook notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    /// What happened.
    pub kind: WebhookKind,

    /// When it happened, if the gateway said.
    pub timestamp: Option<DateTime<Utc>>,

    /// The resource it happened to.
    pub subject: Subject,
}

#[derive(Deserialize)]
struct RawNotification {
    kind: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    subject: RawSubject,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct RawSubject {
    check: Option<bool>,
    api_error_response: Option<ApiErrorResponse>,
    #[serde(alias = "merchant_account")]
    merchant_account: Option<MerchantAccount>,
    disbursement: Option<Disbursement>,
    dispute: Option<Dispute>,
    subscription: Option<Subscription>,
    transaction: Option<Transaction>,
    account_updater_daily_report: Option<DailyReport>,
}

impl Notification {
    /// Decodes an already normalized notification document.
    pub fn from_xml(document: &[u8]) -> Result<Self, quick_xml::DeError> {
        let raw: RawNotification = quick_xml::de::from_reader(document)?;
        let kind = match raw.kind.parse::<WebhookKind>() {
            Ok(kind) => kind,
            Err(never) => match never {},
        };
        let subject = raw.subject;

        use WebhookKind as K;
        let selected = match &kind {
            K::Check => subject.check.map(|_| Subject::Check),
            K::SubMerchantAccountApproved => subject.merchant_account.map(Subject::MerchantAccount),
            K::SubMerchantAccountDeclined => subject.api_error_response.map(Subject::ErrorResponse),
            K::Disbursement | K::DisbursementException => subject.disbursement.map(Subject::Disbursement),
            K::DisputeOpened | K::DisputeLost | K::DisputeWon => subject.dispute.map(Subject::Dispute),
            K::SubscriptionCanceled
            | K::SubscriptionChargedSuccessfully
            | K::SubscriptionChargedUnsuccessfully
            | K::SubscriptionExpired
            | K::SubscriptionTrialEnded
            | K::SubscriptionWentActive
            | K::SubscriptionWentPastDue => subject.subscription.map(Subject::Subscription),
            K::TransactionSettled | K::TransactionSettlementDeclined | K::TransactionDisbursed => {
                subject.transaction.map(Subject::Transaction)
            }
            K::AccountUpdaterDailyReport => subject.account_updater_daily_report.map(Subject::DailyReport),
            K::PartnerMerchantConnected | K::PartnerMerchantDisconnected | K::PartnerMerchantDeclined | K::Other(_) => {
                None
            }
        };

        Ok(Self { kind, timestamp: raw.timestamp, subject: selected.unwrap_or(Subject::Unset) })
    }

    /// The merchant account, whether approved or carried by a decline.
    pub fn merchant_account(&self) -> Option<&MerchantAccount> {
        match &self.subject {
            Subject::MerchantAccount(account) => Some(account),
            Subject::ErrorResponse(response) => response.merchant_account.as_ref(),
            _ => None,
        }
    }

    pub fn disbursement(&self) -> Option<&Disbursement> {
        match &self.subject {
            Subject::Disbursement(disbursement) => Some(disbursement),
            _ => None,
        }
    }

    pub fn dispute(&self) -> Option<&Dispute> {
        match &self.subject {
            Subject::Dispute(dispute) => Some(dispute),
            _ => None,
        }
    }
}

/// Builds a base64 payload shaped like the gateway's notifications, for exercising webhook handlers.
///
/// Sign it with [`Key::sign`] to get a matching signature.
pub fn sample_notification(kind: &WebhookKind, id: &str, timestamp: DateTime<Utc>) -> String {
    let payload = format!(
        "<notification><timestamp type=\"datetime\">{}</timestamp><kind>{kind}</kind><subject>{}</subject></notification>",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        sample_subject(kind, &escape(id)),
    );
    STANDARD.encode(payload)
}

fn sample_subject(kind: &WebhookKind, id: &str) -> String {
    use WebhookKind as K;
    match kind {
        K::Check => r#"<check type="boolean">true</check>"#.to_string(),
        K::SubMerchantAccountApproved => format!(
            "<merchant-account><id>{id}</id><status>active</status>\
             <master-merchant-account><id>master_ma_for_{id}</id><status>active</status></master-merchant-account>\
             </merchant-account>"
        ),
        K::SubMerchantAccountDeclined => format!(
            "<api-error-response><message>Credit score is too low</message>\
             <errors><errors type=\"array\"/><merchant-account><errors type=\"array\">\
             <error><code>82621</code><message>Credit score is too low</message><attribute type=\"symbol\">base</attribute></error>\
             </errors></merchant-account></errors>\
             <merchant-account><id>{id}</id><status>suspended</status>\
             <master-merchant-account><id>master_ma_for_{id}</id><status>suspended</status></master-merchant-account>\
             </merchant-account></api-error-response>"
        ),
        K::TransactionDisbursed => format!(
            "<transaction><id>{id}</id><amount>100</amount>\
             <disbursement-details><disbursement-date type=\"date\">2013-07-09</disbursement-date></disbursement-details>\
             </transaction>"
        ),
        K::TransactionSettled | K::TransactionSettlementDeclined => {
            let status = if *kind == K::TransactionSettled { "settled" } else { "settlement_declined" };
            format!(
                "<transaction><id>{id}</id><status>{status}</status><type>sale</type>\
                 <currency-iso-code>USD</currency-iso-code><amount>100.00</amount>\
                 <merchant-account-id>ogaotkivejpfayqfeaimuktty</merchant-account-id></transaction>"
            )
        }
        K::Disbursement | K::DisbursementException => {
            let (success, exception, follow_up) = if *kind == K::Disbursement {
                ("true", r#"<exception-message nil="true"/>"#, r#"<follow-up-action nil="true"/>"#)
            } else {
                (
                    "false",
                    "<exception-message>bank_rejected</exception-message>",
                    "<follow-up-action>update_funding_information</follow-up-action>",
                )
            };
            format!(
                "<disbursement><id>{id}</id>\
                 <transaction-ids type=\"array\"><item>afv56j</item><item>kj8hjk</item></transaction-ids>\
                 <success type=\"boolean\">{success}</success><retry type=\"boolean\">false</retry>\
                 <merchant-account><id>merchant_account_token</id><currency-iso-code>USD</currency-iso-code>\
                 <sub-merchant-account type=\"boolean\">false</sub-merchant-account><status>active</status></merchant-account>\
                 <amount>100.00</amount><disbursement-date type=\"date\">2014-02-10</disbursement-date>\
                 {exception}{follow_up}</disbursement>"
            )
        }
        K::DisputeOpened | K::DisputeLost | K::DisputeWon => {
            let (status, won) = match kind {
                K::DisputeLost => ("lost", ""),
                K::DisputeWon => ("won", r#"<date-won type="date">2014-03-22</date-won>"#),
                _ => ("open", ""),
            };
            format!(
                "<dispute><amount>250.00</amount><currency-iso-code>USD</currency-iso-code>\
                 <received-date type=\"date\">2020-05-01</received-date><reply-by-date type=\"date\">2020-06-01</reply-by-date>\
                 <kind>chargeback</kind><status>{status}</status><reason>fraud</reason><id>{id}</id>\
                 <transaction><id>{id}</id><amount>250.00</amount></transaction>\
                 <date-opened type=\"date\">2020-06-01</date-opened>{won}</dispute>"
            )
        }
        K::AccountUpdaterDailyReport => "<account-updater-daily-report>\
             <report-date type=\"date\">2020-01-01</report-date><report-url>link-to-csv-report</report-url>\
             </account-updater-daily-report>"
            .to_string(),
        K::SubscriptionChargedSuccessfully => format!(
            "<subscription><id>{id}</id><transactions type=\"array\">\
             <transaction><id>{id}</id><status>submitted_for_settlement</status><amount>49.99</amount></transaction>\
             </transactions></subscription>"
        ),
        _ => format!("<subscription><id>{id}</id><transactions type=\"array\"></transactions></subscription>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use chrono::{NaiveDate, TimeZone};
    use rstest::rstest;

    fn key() -> Key {
        Key::new("jkq28pcxj4r85dwr", "66062a3876e2dc298f2195f0bf173f5a")
    }

    fn signed(kind: WebhookKind, id: &str) -> (Key, String, String) {
        let key = key();
        let timestamp = Utc.with_ymd_and_hms(2014, 1, 26, 10, 32, 28).unwrap();
        let payload = sample_notification(&kind, id, timestamp);
        let signature = key.sign(&payload);
        (key, signature, payload)
    }

    #[rstest]
    #[case("pubkey|the_signature", Ok("the_signature"))]
    #[case("pubkey2|the_signature", Err(SignatureError::WrongPublicKey))]
    #[case("pubkey|the_signature&pubkey2|the_signature", Ok("the_signature"))]
    #[case("pubkey2|other&pubkey|the_signature", Ok("the_signature"))]
    #[case("pubkeythe_signature", Err(SignatureError::MissingPipe))]
    #[case("pubkey|a|b", Err(SignatureError::WrongPublicKey))]
    fn parses_signature_pairs(#[case] pairs: &str, #[case] expected: Result<&str, SignatureError>) {
        let key = Key::new("pubkey", "privkey");
        assert_eq!(key.parse_signature(pairs), expected);
    }

    #[test]
    fn matches_digest_for_local_public_key() {
        let key = Key::new("pub2", "secret");
        assert_eq!(key.parse_signature("pub1|abc&pub2|def"), Ok("def"));
        assert_eq!(Key::new("pub3", "secret").parse_signature("pub1|abc&pub2|def"), Err(SignatureError::WrongPublicKey));
    }

    const CHECK_PAYLOAD: &str = "PD94bWwgdmVyc2lvbj0iMS4wIiBlbmNvZGluZz0iVVRGLTgiPz4KPG5vdGlm\naWNhdGlvbj4KICA8a2luZD5jaGVjazwva2luZD4KICA8dGltZXN0YW1wIHR5\ncGU9ImRhdGV0aW1lIj4yMDE3LTA0LTI0VDA0OjI1OjEwWjwvdGltZXN0YW1w\nPgogIDxzdWJqZWN0PgogICAgPGNoZWNrIHR5cGU9ImJvb2xlYW4iPnRydWU8\nL2NoZWNrPgogIDwvc3ViamVjdD4KPC9ub3RpZmljYXRpb24+Cg==\n";

    #[rstest]
    #[case("jkq28pcxj4r85dwr|4af78bab15cc58195871c636c786716f34cd9711", CHECK_PAYLOAD, Ok(true))]
    #[case(
        "4zn8jg4gdmzyvcyd|dd6390bc9d75985f0cc986d5d5f55fcdb52531cb&jkq28pcxj4r85dwr|4af78bab15cc58195871c636c786716f34cd9711",
        CHECK_PAYLOAD,
        Ok(true)
    )]
    #[case("jkq28pcxj4r85dwr|4af78bab15cc58195871c636c786716f34cd9711", "payloadthatdoesntmatchsignature", Ok(false))]
    #[case("jkq28pcxj4r85dwr|not-hex", CHECK_PAYLOAD, Ok(false))]
    #[case(
        "cd7jwvrw8jytyfm3|d7fdd777e30a1fd93b58770d7682b577b461cf6f&jkq28pcxj4r85dwr",
        CHECK_PAYLOAD,
        Err(SignatureError::WrongPublicKey)
    )]
    fn verifies_signatures(#[case] pairs: &str, #[case] payload: &str, #[case] expected: Result<bool, SignatureError>) {
        assert_eq!(key().verify_signature(pairs, payload), expected);
    }

    #[test]
    fn computes_hex_digest() {
        assert_eq!(Key::new("pubkey", "privkey").hmac("hello"), "0c7fd33b63c73643cd615899aa928343310893e9");
        assert_eq!(Key::new("pubkey", "privkey").verify_challenge("hello"), "pubkey|0c7fd33b63c73643cd615899aa928343310893e9");
    }

    #[rstest]
    #[case("privkey")]
    #[case("")]
    #[case("a private key that is a good deal longer than the sixty four byte block of sha1")]
    fn padded_key_matches_slice_keyed_hmac(#[case] private_key: &str) {
        let key = Key::new("pubkey", private_key);
        let digest = Sha1::digest(private_key.as_bytes());
        let mut reference = <HmacSha1 as Mac>::new_from_slice(&digest).expect("any key length");
        reference.update(b"payload");
        assert_eq!(key.hmac("payload"), hex::encode(reference.finalize().into_bytes()));
    }

    #[test]
    fn parses_gateway_check_notification() {
        let key = Key::new("sz9g7zhxz8838v7h", "0c809a2d2e8f4e4c817900ff441c9554");
        let payload = "PD94bWwgdmVyc2lvbj0iMS4wIiBlbmNvZGluZz0iVVRGLTgiPz4KPG5vdGlm\naWNhdGlvbj4KICA8a2luZD5jaGVjazwva2luZD4KICA8dGltZXN0YW1wIHR5\ncGU9ImRhdGV0aW1lIj4yMDE3LTA0LTI2VDA3OjEyOjI0WjwvdGltZXN0YW1w\nPgogIDxzdWJqZWN0PgogICAgPGNoZWNrIHR5cGU9ImJvb2xlYW4iPnRydWU8\nL2NoZWNrPgogIDwvc3ViamVjdD4KPC9ub3RpZmljYXRpb24+Cg==\n";
        let notification = key
            .parse("sz9g7zhxz8838v7h|4b532339b3107eae876d7637d59217858f320098", payload)
            .expect("valid notification");

        assert_eq!(notification.kind, WebhookKind::Check);
        assert_eq!(notification.subject, Subject::Check);
        assert_eq!(notification.timestamp, Some(Utc.with_ymd_and_hms(2017, 4, 26, 7, 12, 24).unwrap()));
    }

    #[test]
    fn rejects_tampered_payload() {
        let (key, signature, payload) = signed(WebhookKind::Check, "1");
        let tampered = format!("{payload}AAAA");
        assert!(matches!(key.parse(&signature, &tampered), Err(WebhookError::Signature(SignatureError::Invalid))));
    }

    #[test]
    fn parses_approved_merchant_account() {
        let (key, signature, payload) = signed(WebhookKind::SubMerchantAccountApproved, "123");
        let notification = key.parse(&signature, &payload).expect("valid notification");

        let account = notification.merchant_account().expect("merchant account");
        assert_eq!(account.id, "123");
        assert_eq!(account.status, "active");
        let master = account.master_merchant_account.as_deref().expect("master account");
        assert_eq!(master.id, "master_ma_for_123");
    }

    #[test]
    fn parses_declined_merchant_account() {
        let (key, signature, payload) = signed(WebhookKind::SubMerchantAccountDeclined, "123");
        let notification = key.parse(&signature, &payload).expect("valid notification");

        let Subject::ErrorResponse(response) = &notification.subject else {
            panic!("expected an error response, got {:?}", notification.subject);
        };
        assert_eq!(response.message, "Credit score is too low");
        let errors = response.errors.for_object("MerchantAccount").on("Base");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "82621");

        let account = notification.merchant_account().expect("merchant account");
        assert_eq!(account.id, "123");
        assert_eq!(account.status, "suspended");
    }

    #[test]
    fn strips_nil_fields_from_disbursement() {
        let (key, signature, payload) = signed(WebhookKind::Disbursement, "456");
        let notification = key.parse(&signature, &payload).expect("valid notification");

        let disbursement = notification.disbursement().expect("disbursement");
        assert_eq!(disbursement.id, "456");
        assert_eq!(disbursement.transaction_ids, ["afv56j", "kj8hjk"]);
        assert_eq!(disbursement.exception_message, None);
        assert_eq!(disbursement.follow_up_action, None);
        assert_eq!(disbursement.amount, Some(Decimal::new(10000, 2)));
        assert!(disbursement.success);

        let (key, signature, payload) = signed(WebhookKind::DisbursementException, "456");
        let notification = key.parse(&signature, &payload).expect("valid notification");
        let disbursement = notification.disbursement().expect("disbursement");
        assert_eq!(disbursement.exception_message.as_deref(), Some("bank_rejected"));
        assert!(!disbursement.success);
    }

    #[test]
    fn parses_won_dispute() {
        let (key, signature, payload) = signed(WebhookKind::DisputeWon, "d1");
        let notification = key.parse(&signature, &payload).expect("valid notification");

        let dispute = notification.dispute().expect("dispute");
        assert_eq!(dispute.status, "won");
        assert_eq!(dispute.date_won, NaiveDate::from_ymd_opt(2014, 3, 22));
        assert_eq!(dispute.transaction.as_ref().map(|t| t.id.as_str()), Some("d1"));
    }

    #[rstest]
    #[case(WebhookKind::TransactionSettled)]
    #[case(WebhookKind::SubscriptionChargedSuccessfully)]
    #[case(WebhookKind::AccountUpdaterDailyReport)]
    #[case(WebhookKind::SubscriptionWentPastDue)]
    fn selects_subject_by_kind(#[case] kind: WebhookKind) {
        let (key, signature, payload) = signed(kind.clone(), "x1");
        let notification = key.parse(&signature, &payload).expect("valid notification");

        assert_eq!(notification.kind, kind);
        match (&kind, &notification.subject) {
            (WebhookKind::TransactionSettled, Subject::Transaction(t)) => assert_eq!(t.status, "settled"),
            (WebhookKind::SubscriptionChargedSuccessfully, Subject::Subscription(s)) => assert_eq!(s.transactions.len(), 1),
            (WebhookKind::AccountUpdaterDailyReport, Subject::DailyReport(r)) => assert_eq!(r.report_url, "link-to-csv-report"),
            (WebhookKind::SubscriptionWentPastDue, Subject::Subscription(s)) => assert_eq!(s.id, "x1"),
            (kind, subject) => panic!("unexpected subject {subject:?} for {kind}"),
        }
    }

    #[test]
    fn tolerates_unknown_kinds() {
        let key = key();
        let document = "<notification><timestamp type=\"datetime\">2020-01-01T00:00:00Z</timestamp>\
                        <kind>brand_new_event</kind><subject><brand-new><id>1</id></brand-new></subject></notification>";
        let payload = STANDARD.encode(document);
        let notification = key.parse(&key.sign(&payload), &payload).expect("valid notification");

        assert_eq!(notification.kind, WebhookKind::Other("brand_new_event".to_string()));
        assert_eq!(notification.subject, Subject::Unset);
    }

    #[test]
    fn tolerates_missing_timestamps() {
        let key = key();
        let payload = STANDARD.encode("<notification><kind>check</kind><subject><check>true</check></subject></notification>");
        let notification = key.parse(&key.sign(&payload), &payload).expect("valid notification");

        assert_eq!(notification.timestamp, None);
        assert_eq!(notification.subject, Subject::Check);
    }

    #[test]
    fn kind_round_trips_through_text() {
        for kind in ["check", "dispute_won", "account_updater_daily_report", "something_else"] {
            assert_eq!(kind.parse::<WebhookKind>().map(|k| k.to_string()), Ok(kind.to_string()));
        }
    }
}
