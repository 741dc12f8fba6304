//! Network identity (ESSID, BSSID) and its filename token.

use std::fmt;

/// Placeholder for the half of an identity we could not determine.
pub const UNKNOWN_HALF: &str = "<unknown>";

/// The access point the host is attached to.
///
/// Either half may be empty when unknown. Both empty means there is no
/// identity at all and nothing may be rotated.
///
/// The BSSID is kept in its natural colon-separated form; [`token`] swaps
/// colons for underscores so the identity can name a file.
///
/// [`token`]: NetworkIdentity::token
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NetworkIdentity {
    essid: String,
    bssid: String,
}

impl NetworkIdentity {
    /// Build an identity from its two halves.
    pub fn new(essid: impl Into<String>, bssid: impl Into<String>) -> Self {
        Self { essid: essid.into(), bssid: bssid.into() }
    }

    /// Network name (hex encoded by the adapters).
    pub fn essid(&self) -> &str {
        &self.essid
    }

    /// Access point hardware address.
    pub fn bssid(&self) -> &str {
        &self.bssid
    }

    /// Both halves empty.
    pub fn is_unknown(&self) -> bool {
        self.essid.is_empty() && self.bssid.is_empty()
    }

    /// `essid.bssid` with `:` replaced by `_`.
    ///
    /// Used both as the per-identity file name in the StateStore and as the
    /// content of the last-identity file.
    pub fn token(&self) -> String {
        format!("{}.{}", self.essid, self.bssid.replace(':', "_"))
    }

    /// Parse a token back into an identity.
    ///
    /// The token must split on `.` into exactly two parts; either may be
    /// empty but not both. Returns `None` for anything else.
    pub fn from_token(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let (Some(essid), Some(bssid), None) = (parts.next(), parts.next(), parts.next()) else {
            return None;
        };

        let identity = Self::new(essid, bssid.replace('_', ":"));
        (!identity.is_unknown()).then_some(identity)
    }

    /// Replace empty halves with [`UNKNOWN_HALF`].
    #[must_use]
    pub fn with_unknown_halves(self) -> Self {
        let fill = |half: String| if half.is_empty() { UNKNOWN_HALF.to_string() } else { half };
        Self { essid: fill(self.essid), bssid: fill(self.bssid) }
    }
}

impl fmt::Display for NetworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Hex encode an ESSID as reported by a network manager.
///
/// Surrounding double quotes (as printed by `iwconfig`) are stripped first.
/// Hex keeps arbitrary ESSID bytes, dots included, out of file names.
pub fn hexify_essid(raw: &str) -> String {
    let trimmed = raw.strip_prefix('"').unwrap_or(raw);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    hex::encode_upper(trimmed)
}
