use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A PostgreSQL server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Oldest server the checker knows how to reason about.
pub const MINIMUM_SUPPORTED: ServerVersion = ServerVersion::new(9, 6, 0);

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Decode `server_version_num`: `110005` is 11.0.5, `90605` is 9.6.5.
    pub fn from_packed(num: u32) -> Self {
        Self::new(num / 10000, (num % 10000) / 100, num % 100)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        *self >= capability.min_version()
    }
}

/// Server features the checker relies on for safe alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Hash indexes are WAL-logged and crash safe.
    HashIndexWal,
    /// `ADD COLUMN .. DEFAULT <literal>` no longer rewrites the table.
    FastColumnDefault,
    /// `SET NOT NULL` skips the scan when a validated `IS NOT NULL` check exists.
    NotNullConstraintPromotion,
    /// `timestamp` to `timestamptz` skips the rewrite when the session is UTC.
    TimestampTzRewriteFree,
}

impl Capability {
    pub const ALL: [(Capability, ServerVersion); 4] = [
        (Capability::HashIndexWal, ServerVersion::new(10, 0, 0)),
        (Capability::FastColumnDefault, ServerVersion::new(11, 0, 0)),
        (
            Capability::NotNullConstraintPromotion,
            ServerVersion::new(12, 0, 0),
        ),
        (
            Capability::TimestampTzRewriteFree,
            ServerVersion::new(12, 0, 0),
        ),
    ];

    pub fn min_version(self) -> ServerVersion {
        Self::ALL
            .iter()
            .find(|(cap, _)| *cap == self)
            .map(|(_, version)| *version)
            .unwrap_or(ServerVersion::new(u32::MAX, 0, 0))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid server version: {0:?}")]
pub struct ParseVersionError(String);

impl FromStr for ServerVersion {
    type Err = ParseVersionError;

    /// Accepts `11`, `10.5` and `12.1.3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32, ParseVersionError> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| err()),
                None if required => Err(err()),
                None => Ok(0),
            }
        };

        let version = ServerVersion::new(next(true)?, next(false)?, next(false)?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

impl Serialize for ServerVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServerVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_packed_versions() {
        assert_eq!(ServerVersion::from_packed(110005), ServerVersion::new(11, 0, 5));
        assert_eq!(ServerVersion::from_packed(90605), ServerVersion::new(9, 6, 5));
        assert_eq!(ServerVersion::from_packed(150002), ServerVersion::new(15, 0, 2));
    }

    #[test]
    fn parses_partial_versions() {
        assert_eq!("11".parse::<ServerVersion>(), Ok(ServerVersion::new(11, 0, 0)));
        assert_eq!("10.5".parse::<ServerVersion>(), Ok(ServerVersion::new(10, 5, 0)));
        assert_eq!("12.1.3".parse::<ServerVersion>(), Ok(ServerVersion::new(12, 1, 3)));
        assert!("".parse::<ServerVersion>().is_err());
        assert!("eleven".parse::<ServerVersion>().is_err());
        assert!("1.2.3.4".parse::<ServerVersion>().is_err());
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(ServerVersion::new(10, 5, 0) < ServerVersion::new(11, 0, 0));
        assert!(ServerVersion::new(9, 6, 0) < ServerVersion::new(10, 0, 0));
    }

    #[test]
    fn capability_gates() {
        let v10 = ServerVersion::new(10, 5, 0);
        let v11 = ServerVersion::new(11, 0, 0);
        let v12 = ServerVersion::new(12, 0, 0);

        assert!(v10.supports(Capability::HashIndexWal));
        assert!(!v10.supports(Capability::FastColumnDefault));
        assert!(v11.supports(Capability::FastColumnDefault));
        assert!(!v11.supports(Capability::NotNullConstraintPromotion));
        assert!(v12.supports(Capability::NotNullConstraintPromotion));
        assert!(v12.supports(Capability::TimestampTzRewriteFree));
    }

    #[test]
    fn every_capability_has_a_threshold() {
        for (cap, version) in Capability::ALL {
            assert_eq!(cap.min_version(), version);
        }
    }

    #[test]
    fn serde_uses_dotted_strings() {
        let version: ServerVersion = serde_json::from_str("\"10.5\"").unwrap();
        assert_eq!(version, ServerVersion::new(10, 5, 0));
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"10.5.0\"");
    }
}
