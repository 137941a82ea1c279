use base64::{engine::general_purpose::STANDARD, Engine};
use std::{fmt, str::FromStr};

use crate::{error::CredentialsError, webhook::Key};

const ACCESS_TOKEN_PREFIX: &str = "access_token";

/// A gateway environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Environment {
    /// A gateway running locally.
    Development,
    Sandbox,
    Production,
}

impl Environment {
    /// The base url requests are sent to.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Development => "http://localhost:3000",
            Self::Sandbox => "https://api.sandbox.braintreegateway.com:443",
            Self::Production => "https://api.braintreegateway.com:443",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Sandbox => "sandbox",
            Self::Production => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = CredentialsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Development),
            "sandbox" => Ok(Self::Sandbox),
            "prod" => Ok(Self::Production),
            other => Err(CredentialsError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How requests authenticate against the gateway.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A merchant's API key pair, sent with Http basic authentication.
    ApiKey { merchant_id: String, key: Key },

    /// An OAuth access token of the form `access_token$<environment>$<merchant id>$<secret>`.
    AccessToken { raw: String, environment: Environment, merchant_id: String },
}

impl Credentials {
    pub fn api_key(
        merchant_id: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self::ApiKey { merchant_id: merchant_id.into(), key: Key::new(public_key, private_key) }
    }

    /// Parses an access token, which also determines the environment it is valid for.
    pub fn access_token(raw: impl Into<String>) -> Result<Self, CredentialsError> {
        let raw = raw.into();
        let mut parts = raw.split('$');
        let (Some(ACCESS_TOKEN_PREFIX), Some(environment), Some(merchant_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialsError::MalformedAccessToken);
        };
        let environment = environment.parse()?;
        let merchant_id = merchant_id.to_string();
        Ok(Self::AccessToken { raw, environment, merchant_id })
    }

    pub fn merchant_id(&self) -> &str {
        match self {
            Self::ApiKey { merchant_id, .. } | Self::AccessToken { merchant_id, .. } => merchant_id,
        }
    }

    /// The environment an access token is bound to. API keys work against whichever environment issued them.
    pub fn environment(&self) -> Option<Environment> {
        match self {
            Self::ApiKey { .. } => None,
            Self::AccessToken { environment, .. } => Some(*environment),
        }
    }

    /// The value of the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        match self {
            Self::ApiKey { key, .. } => {
                let pair = format!("{}:{}", key.public_key, key.private_key);
                format!("Basic {}", STANDARD.encode(pair))
            }
            Self::AccessToken { raw, .. } => format!("Bearer {raw}"),
        }
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey { merchant_id, key } => f
                .debug_struct("ApiKey")
                .field("merchant_id", merchant_id)
                .field("public_key", &key.public_key)
                .finish_non_exhaustive(),
            Self::AccessToken { environment, merchant_id, .. } => f
                .debug_struct("AccessToken")
                .field("environment", environment)
                .field("merchant_id", merchant_id)
                .finish_non_exhaustive(),
        }
    }
}
