use bpmon_network_spec::networks::Chain;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A governance multisig proposal as recorded by the chain reader.
///
/// `requested` and `received` keep the signer payloads exactly as they were stored; they are
/// parsed once per scoring run with [`SignerSet::from_payload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub chain: Chain,
    pub proposal_name: String,
    pub block_num: u64,
    pub time_stamp: DateTime<Utc>,
    #[serde(default)]
    pub requested: Value,
    #[serde(default)]
    pub received: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    pub actor: String,
    /// When the approval was given. Requested signers carry no time.
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerPayloadError {
    #[error("Signer payload must be an array or an object, got {0}")]
    UnexpectedShape(&'static str),

    #[error("Signer entry is not an object with an actor: {0}")]
    InvalidEntry(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerSet {
    signers: Vec<Signer>,
}

impl SignerSet {
    /// Parses one stored signer payload.
    ///
    /// Accepted shapes:
    /// - `null`: no signers
    /// - an array of `{"actor": .., "time": ..}` objects or of plain actor strings
    /// - an object whose keys are JSON-encoded `{"actor": .., "time": ..}` entries, which is how
    ///   approvals were persisted by the original chain reader
    pub fn from_payload(payload: &Value) -> Result<Self, SignerPayloadError> {
        let signers = match payload {
            Value::Null => vec![],
            Value::Array(entries) => entries
                .iter()
                .map(parse_entry)
                .collect::<Result<Vec<_>, _>>()?,
            Value::Object(map) => map
                .keys()
                .map(|key| {
                    serde_json::from_str::<Value>(key)
                        .map_err(|_| SignerPayloadError::InvalidEntry(key.clone()))
                        .and_then(|entry| parse_entry(&entry))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Value::Bool(_) => return Err(SignerPayloadError::UnexpectedShape("bool")),
            Value::Number(_) => return Err(SignerPayloadError::UnexpectedShape("number")),
            Value::String(_) => return Err(SignerPayloadError::UnexpectedShape("string")),
        };
        Ok(Self { signers })
    }

    pub fn find(&self, actor: &str) -> Option<&Signer> {
        self.signers.iter().find(|signer| signer.actor == actor)
    }

    pub fn contains(&self, actor: &str) -> bool {
        self.find(actor).is_some()
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

impl FromIterator<Signer> for SignerSet {
    fn from_iter<T: IntoIterator<Item = Signer>>(iter: T) -> Self {
        Self {
            signers: iter.into_iter().collect(),
        }
    }
}

fn parse_entry(entry: &Value) -> Result<Signer, SignerPayloadError> {
    match entry {
        Value::String(actor) if !actor.is_empty() => Ok(Signer {
            actor: actor.clone(),
            time: None,
        }),
        Value::Object(fields) => {
            let actor = fields
                .get("actor")
                .and_then(Value::as_str)
                .filter(|actor| !actor.is_empty())
                .ok_or_else(|| SignerPayloadError::InvalidEntry(entry.to_string()))?;
            let time = fields
                .get("time")
                .and_then(Value::as_str)
                .and_then(parse_signing_time);
            Ok(Signer {
                actor: actor.to_string(),
                time,
            })
        }
        _ => Err(SignerPayloadError::InvalidEntry(entry.to_string())),
    }
}

/// Approval times come either as RFC 3339 or as a naive UTC timestamp such as
/// `2024-06-01T12:00:00.500`.
pub fn parse_signing_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_array_payload() {
        let set = SignerSet::from_payload(&json!([
            { "actor": "bp1", "time": "2024-06-02T10:00:00.000" },
            { "actor": "bp2", "permission": "active" },
            "bp3",
        ]))
        .expect("payload");

        assert_eq!(set.len(), 3);
        assert!(set.find("bp1").and_then(|signer| signer.time).is_some());
        assert!(set.find("bp2").and_then(|signer| signer.time).is_none());
        assert!(set.contains("bp3"));
    }

    #[test]
    fn test_parse_object_keyed_payload() {
        let set = SignerSet::from_payload(&json!({
            "{\"actor\":\"bp1\",\"time\":\"2024-06-02T10:00:00Z\"}": true,
        }))
        .expect("payload");

        assert!(set.contains("bp1"));
    }

    #[test]
    fn test_null_payload_is_empty() {
        assert!(SignerSet::from_payload(&Value::Null).expect("payload").is_empty());
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        assert_eq!(
            SignerSet::from_payload(&json!("bp1")),
            Err(SignerPayloadError::UnexpectedShape("string"))
        );
        assert!(SignerSet::from_payload(&json!([{ "permission": "active" }])).is_err());
        assert!(SignerSet::from_payload(&json!({ "not json": true })).is_err());
        assert!(SignerSet::from_payload(&json!([42])).is_err());
    }

    #[test]
    fn test_unparsable_time_is_dropped() {
        let set = SignerSet::from_payload(&json!([{ "actor": "bp1", "time": "yesterday" }]))
            .expect("payload");
        assert_eq!(set.find("bp1").and_then(|signer| signer.time), None);
    }
}
