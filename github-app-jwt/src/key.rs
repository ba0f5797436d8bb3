//! Loading of the GitHub App private key.
//!
//! GitHub hands out the key as a PKCS#1 PEM file (`BEGIN RSA PRIVATE KEY`),
//! PKCS#8 (`BEGIN PRIVATE KEY`) is accepted as well.

use core::fmt;
use std::{fs, io, path::Path};

use openssl::{
    error::ErrorStack as OpensslErrorStack,
    pkey::{Id, PKey, Private},
};
use tracing::debug;

use crate::IssueError;

//
pub struct PrivateKey(pub(crate) PKey<Private>);

impl PrivateKey {
    pub fn bits(&self) -> u32 {
        self.0.bits()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

//
pub fn read_key_bytes(path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
    fs::read(path)
}

pub fn parse_private_key(pem_bytes: impl AsRef<[u8]>) -> Result<PrivateKey, KeyFormatError> {
    let pkey =
        PKey::private_key_from_pem(pem_bytes.as_ref()).map_err(KeyFormatError::PemInvalid)?;

    if pkey.id() != Id::RSA {
        return Err(KeyFormatError::NotRsa(key_family_name(pkey.id())));
    }

    Ok(PrivateKey(pkey))
}

/// Reads and parses the key at `path`, tagging the failure with the step it came from.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<PrivateKey, IssueError> {
    let path = path.as_ref();

    debug!(path = %path.display(), "reading private key");
    let pem_bytes = read_key_bytes(path).map_err(IssueError::ReadKeyFailed)?;

    debug!(len = pem_bytes.len(), "parsing private key");
    let key = parse_private_key(pem_bytes).map_err(IssueError::ParseKeyFailed)?;

    debug!(bits = key.bits(), "private key loaded");
    Ok(key)
}

fn key_family_name(id: Id) -> &'static str {
    match id {
        Id::EC => "EC",
        Id::DSA => "DSA",
        Id::DH => "DH",
        _ => "non-RSA",
    }
}

//
#[derive(Debug, thiserror::Error)]
pub enum KeyFormatError {
    #[error("not a PEM encoded private key: {0}")]
    PemInvalid(#[source] OpensslErrorStack),
    #[error("expected an RSA private key, found {0}")]
    NotRsa(&'static str),
}
