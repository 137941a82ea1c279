use quick_xml::{events::attributes::AttrError, DeError};
use reqwest::StatusCode;

use crate::{
    models::ApiErrorResponse,
    validation::{ValidationError, ValidationErrors},
};

/// An error when parsing the text form of a decimal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseDecimalError {
    /// The text had more than one decimal point.
    #[error("more than one decimal point in {0:?}")]
    MultiplePoints(String),

    /// The text contained something other than an optional sign and digits.
    #[error("invalid digits in {0:?}")]
    InvalidDigits(String),

    /// The unscaled magnitude does not fit in 64 bits.
    #[error("decimal out of range: {0:?}")]
    Overflow(String),
}

/// An error when normalizing a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document is not well-formed.
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A start tag carried a malformed attribute.
    #[error("attribute: {0}")]
    Attribute(#[from] AttrError),

    /// Writing the normalized document failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The document ended while elements were still open.
    #[error("document ended with {0} unclosed element(s)")]
    Unterminated(usize),
}

/// An error when reading a webhook signature list.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// No pair in the list contained the `|` separator.
    #[error("signature-key pair does not contain |")]
    MissingPipe,

    /// No pair in the list was signed for our public key.
    #[error("signature-key pair contains the wrong public key")]
    WrongPublicKey,

    /// The digest for our public key did not match the payload.
    #[error("invalid signature")]
    Invalid,
}

/// An error when parsing a webhook notification.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The signature could not be verified.
    #[error("signature: {0}")]
    Signature(#[from] SignatureError),

    /// The payload was not valid base64.
    #[error("payload encoding: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload was not a well-formed document.
    #[error("payload document: {0}")]
    Document(#[from] DocumentError),

    /// The document did not have the shape of a notification.
    #[error("decoding notification: {0}")]
    Decode(#[from] DeError),

    /// No key to verify signatures with was configured.
    #[error("no webhook key configured")]
    MissingKey,
}

/// An error when building credentials.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsError {
    /// The access token is not of the form `access_token$<environment>$<merchant id>`.
    #[error("access token is not of expected format")]
    MalformedAccessToken,

    /// The environment name is not one of `dev`, `sandbox` or `prod`.
    #[error("unsupported environment {0:?}")]
    UnknownEnvironment(String),
}

/// An error when building a gateway client.
#[derive(Debug, thiserror::Error)]
pub enum BuildClientError {
    /// The credentials could not be parsed.
    #[error("credentials: {0}")]
    Credentials(#[from] CredentialsError),

    /// The Http client could not be built.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

/// A page outside `1..=page_count` was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("page {page} out of bounds, page numbers start at 1 and page count is {page_count}")]
pub struct PageOutOfBounds {
    /// The requested page.
    pub page: usize,

    /// The number of pages available.
    pub page_count: usize,
}

/// An error when performing a request against the gateway.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// An Http request failed.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not a well-formed document.
    #[error("response document: {0}")]
    Document(#[from] DocumentError),

    /// The response body did not have the expected shape.
    #[error("decoding response: {0}")]
    Decode(#[from] DeError),

    /// The gateway rejected the request with an error envelope.
    #[error("api: {0}")]
    Api(ApiError),

    /// The gateway answered with an error status and no error envelope.
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

impl From<ApiError> for RequestError {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}

/// An error when searching for resources.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A round trip to the gateway failed.
    #[error("request: {0}")]
    Request(#[from] RequestError),

    /// The requested page does not exist.
    #[error("pagination: {0}")]
    PageOutOfBounds(#[from] PageOutOfBounds),
}

// implement `From<$cause>` for `SearchError` by way of `RequestError`.
macro_rules! impl_from_request_cause {
    ($t:ty) => {
        impl From<$t> for SearchError {
            fn from(e: $t) -> Self {
                Self::Request(e.into())
            }
        }
    };
    ($t:ty, $($rest:ty),+) => {
        impl_from_request_cause!($t);
        impl_from_request_cause!($($rest),+);
    };
}

impl_from_request_cause!(reqwest::Error, DocumentError, DeError, ApiError);

/// A validation failure reported by the gateway.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{} ({status})", response.message)]
pub struct ApiError {
    /// The Http status the envelope arrived with.
    pub status: StatusCode,

    /// The decoded error envelope.
    pub response: ApiErrorResponse,
}

impl ApiError {
    /// The top level error message.
    pub fn message(&self) -> &str {
        &self.response.message
    }

    /// Every validation error in the envelope, at any depth.
    pub fn all(&self) -> Vec<ValidationError> {
        self.response.errors.all_deep()
    }

    /// The errors reported for the named top level object, e.g. `Transaction`.
    pub fn for_object(&self, name: &str) -> &ValidationErrors {
        self.response.errors.for_object(name)
    }
}
