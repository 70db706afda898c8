//! API tokens and the roles they were issued for.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use sha2::{Digest, Sha512};

use crate::Error;

/// The set of valid API tokens.
///
/// Only SHA-512 digests of the tokens are kept in memory, and a token is
/// looked up by the digest of the presented value.
#[derive(Clone, Default)]
pub struct ApiTokens {
    roles_by_digest: HashMap<Vec<u8>, String>,
}

impl ApiTokens {
    /// Create a token table from `(role, token)` pairs.
    ///
    /// If a token appears more than once, its last role wins.
    pub fn new<I, R, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (R, T)>,
        R: Into<String>,
        T: AsRef<[u8]>,
    {
        Self {
            roles_by_digest: tokens
                .into_iter()
                .map(|(role, token)| (digest(token.as_ref()), role.into()))
                .collect(),
        }
    }

    /// Parse a token list of the form `role:token[,role:token...]`.
    ///
    /// Whitespace around entries is ignored and empty entries are skipped.
    ///
    /// # Errors
    /// Returns [Error::InvalidConfig] if an entry has no ':' separator, an empty
    /// role or an empty token, if a token is listed more than once, or if the
    /// list contains no tokens at all.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut tokens = Vec::new();
        let mut seen = HashSet::new();

        for (position, entry) in text.split(',').map(str::trim).enumerate() {
            if entry.is_empty() {
                continue;
            }

            let (role, token) = entry.split_once(':').ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "token entry {} is not in the form role:token",
                    position + 1
                ))
            })?;
            let (role, token) = (role.trim(), token.trim());

            if role.is_empty() || token.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "token entry {} has an empty role or token",
                    position + 1
                )));
            }

            if !seen.insert(token) {
                return Err(Error::InvalidConfig(format!(
                    "token entry {} repeats an earlier token",
                    position + 1
                )));
            }

            tokens.push((role.to_owned(), token.to_owned()));
        }

        if tokens.is_empty() {
            return Err(Error::InvalidConfig("no API tokens configured".to_owned()));
        }

        Ok(Self::new(tokens))
    }

    /// The role `token` was issued for, if it is a known token.
    pub fn role_for(&self, token: &str) -> Option<&str> {
        self.roles_by_digest
            .get(&digest(token.as_bytes()))
            .map(String::as_str)
    }

    /// The number of configured tokens.
    pub fn len(&self) -> usize {
        self.roles_by_digest.len()
    }

    /// Returns true if no tokens are configured.
    pub fn is_empty(&self) -> bool {
        self.roles_by_digest.is_empty()
    }
}

// Never print the digests.
impl fmt::Debug for ApiTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTokens")
            .field("count", &self.roles_by_digest.len())
            .finish()
    }
}

fn digest(token: &[u8]) -> Vec<u8> {
    Sha512::digest(token).to_vec()
}
