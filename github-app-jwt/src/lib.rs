//! [Doc](https://docs.github.com/en/apps/creating-github-apps/authenticating-with-a-github-app/generating-a-json-web-token-jwt-for-a-github-app)

use core::fmt;
use std::{io, path::PathBuf};

use chrono::{serde::ts_seconds, DateTime, Duration as ChronoDuration, Utc};
use jwt::{
    header::HeaderType, AlgorithmType, Error as JwtError, Header, PKeyWithDigest, SignWithKey,
    Token,
};
use openssl::hash::MessageDigest;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod key;

pub use key::{KeyFormatError, PrivateKey};

// GitHub rejects an `iat` in the future, so the token is stamped in the past.
pub const BACKDATE_OFFSET_SECONDS: i64 = 60;
// 10 minutes, the maximum GitHub accepts
pub const VALIDITY_WINDOW_SECONDS: i64 = 60 * 10;

//
#[derive(Debug, Clone)]
pub struct IssueConfig {
    pub private_key_file: PathBuf,
    pub github_app_id: u64,
    pub debug: bool,
}

impl IssueConfig {
    pub fn new(private_key_file: impl Into<PathBuf>, github_app_id: u64) -> Self {
        Self {
            private_key_file: private_key_file.into(),
            github_app_id,
            debug: false,
        }
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

//
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    #[serde(with = "ts_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    exp: DateTime<Utc>,
    iss: u64,
}

impl Claims {
    pub fn new(github_app_id: u64, issued_at: DateTime<Utc>) -> Self {
        Self {
            iat: issued_at,
            exp: issued_at + ChronoDuration::seconds(VALIDITY_WINDOW_SECONDS),
            iss: github_app_id,
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.iat
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.exp
    }

    pub fn issuer(&self) -> u64 {
        self.iss
    }
}

pub fn current_issued_at() -> DateTime<Utc> {
    Utc::now() - ChronoDuration::seconds(BACKDATE_OFFSET_SECONDS)
}

/// Signs `claims` with RS256 and returns the compact `header.payload.signature` form.
///
/// The key is consumed, it is not meant to outlive a single token.
pub fn sign(claims: &Claims, key: PrivateKey) -> Result<String, IssueError> {
    let pkey = PKeyWithDigest {
        digest: MessageDigest::sha256(),
        key: key.0,
    };

    let header = Header {
        algorithm: AlgorithmType::Rs256,
        type_: Some(HeaderType::JsonWebToken),
        ..Default::default()
    };

    let token = Token::new(header, claims)
        .sign_with_key(&pkey)
        .map_err(IssueError::SignFailed)?;

    Ok(token.as_str().to_owned())
}

/// Issues a token for `config.github_app_id`, reading the key from `config.private_key_file`.
///
/// Nothing is cached: every call reads and parses the key again.
pub fn issue(config: &IssueConfig) -> Result<String, IssueError> {
    let issued_at = current_issued_at();
    let claims = Claims::new(config.github_app_id, issued_at);
    debug!(
        iss = claims.issuer(),
        iat = claims.issued_at().timestamp(),
        exp = claims.expires_at().timestamp(),
        "claims built"
    );

    let ret = key::load_private_key(&config.private_key_file).and_then(|key| sign(&claims, key));

    match &ret {
        Ok(_) => debug!("token signed"),
        Err(err) => debug!(step = %err.step(), "{}", err.report(config.debug)),
    }

    ret
}

pub fn create(
    pem_private_key_bytes: impl AsRef<[u8]>,
    github_app_id: u64,
    issued_at: impl Into<Option<DateTime<Utc>>>,
) -> Result<String, IssueError> {
    let issued_at = issued_at.into().unwrap_or_else(current_issued_at);
    let claims = Claims::new(github_app_id, issued_at);

    let key =
        key::parse_private_key(pem_private_key_bytes).map_err(IssueError::ParseKeyFailed)?;

    sign(&claims, key)
}

//
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Read,
    Parse,
    Sign,
}

impl Step {
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Read => "Error reading PEM",
            Self::Parse => "Error parsing PEM",
            Self::Sign => "Error signing token",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Parse => write!(f, "parse"),
            Self::Sign => write!(f, "sign"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("Error reading PEM: {0}")]
    ReadKeyFailed(#[source] io::Error),
    #[error("Error parsing PEM: {0}")]
    ParseKeyFailed(#[source] KeyFormatError),
    #[error("Error signing token: {0}")]
    SignFailed(#[source] JwtError),
}

impl IssueError {
    pub fn step(&self) -> Step {
        match self {
            Self::ReadKeyFailed(_) => Step::Read,
            Self::ParseKeyFailed(_) => Step::Parse,
            Self::SignFailed(_) => Step::Sign,
        }
    }

    /// The underlying cause is only included when `debug` is set.
    pub fn report(&self, debug: bool) -> String {
        if debug {
            self.to_string()
        } else {
            self.step().summary().to_owned()
        }
    }
}
