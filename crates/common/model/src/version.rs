use std::fmt;

use serde::{Deserialize, Serialize};

/// A `major.minor.patch` version extracted from a node's `server_version` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    /// Finds the first `x.y.z` triple in `raw`, allowing an optional leading `v` and any
    /// suffix such as `-rc1`. Returns `None` when no triple is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        for start in 0..bytes.len() {
            if !bytes[start].is_ascii_digit() || (start > 0 && bytes[start - 1].is_ascii_digit())
            {
                continue;
            }
            if let Some(version) = Self::parse_triple(&raw[start..]) {
                return Some(version);
            }
        }
        None
    }

    fn parse_triple(input: &str) -> Option<Self> {
        let mut parts = [0u32; 3];
        let mut rest = input;
        for (index, part) in parts.iter_mut().enumerate() {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                return None;
            }
            *part = rest[..digits].parse().ok()?;
            rest = &rest[digits..];
            if index < 2 {
                rest = rest.strip_prefix('.')?;
            }
        }
        Some(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
        })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_version() {
        let version = ServerVersion::parse("v3.5.0-rc1").expect("version");
        assert_eq!(version.to_string(), "3.5.0");
        assert_eq!(
            ServerVersion::parse("nodeos 2.0.12"),
            Some(ServerVersion {
                major: 2,
                minor: 0,
                patch: 12
            })
        );
        assert_eq!(ServerVersion::parse("v3.5"), None);
        assert_eq!(ServerVersion::parse(""), None);
    }

    #[test]
    fn test_versions_order_numerically() {
        let older = ServerVersion::parse("v3.4.10").expect("version");
        let newer = ServerVersion::parse("v3.10.0").expect("version");
        assert!(newer > older);
    }
}
