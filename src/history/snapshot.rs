use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A sanitized, captured card. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardSnapshot {
    id: String,
    markup: String,
    captured_at: DateTime<Utc>,
}

impl CardSnapshot {
    pub fn new(id: impl Into<String>, markup: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        CardSnapshot {
            id: id.into(),
            markup: markup.into(),
            captured_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn to_record(&self) -> SnapshotRecord {
        SnapshotRecord {
            id: self.id.clone(),
            html: self.markup.clone(),
            timestamp: self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Wire shape of one entry in the persisted history blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: String,
    pub html: String,
    /// ISO-8601, e.g. `2024-05-01T12:00:00.000Z`.
    pub timestamp: String,
}

impl TryFrom<SnapshotRecord> for CardSnapshot {
    type Error = chrono::ParseError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let captured_at = DateTime::parse_from_rfc3339(&record.timestamp)?.with_timezone(&Utc);
        Ok(CardSnapshot {
            id: record.id,
            markup: record.html,
            captured_at,
        })
    }
}
