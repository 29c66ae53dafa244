use hickory_proto::rr::{Name, Record, RecordType};
use serde::{Deserialize, Serialize};

/// Which slot of a cached name an entry occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// Records of a standard DNS type, keyed by its type code
    Record(u16),
    /// Additional-section records that accompany an A or NS answer
    Additionals,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    name: String,
    kind: KeyKind,
}

impl CacheKey {
    pub fn new(name: &Name, kind: KeyKind) -> Self {
        CacheKey {
            name: name.to_lowercase().to_ascii(),
            kind,
        }
    }

    pub fn for_type(name: &Name, query_type: RecordType) -> Self {
        CacheKey::new(name, KeyKind::Record(query_type.into()))
    }

    pub fn additionals(name: &Name) -> Self {
        CacheKey::new(name, KeyKind::Additionals)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }
}

/// A set of records with an absolute deadline.
///
/// `authoritative` is only set for records that came from the answer section of an upstream
/// reply. Anything taken from the authority or additional sections is kept to decorate
/// other replies and is never served as an answer on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheValue {
    /// Unix seconds
    pub expiry_time: u64,
    #[serde(with = "wire_records")]
    pub records: Vec<Record>,
    pub authoritative: bool,
}

impl CacheValue {
    pub fn new(expiry_time: u64, records: Vec<Record>, authoritative: bool) -> Self {
        CacheValue {
            expiry_time,
            records,
            authoritative,
        }
    }

    pub fn from_ttl(now: u64, ttl: u32, records: Vec<Record>, authoritative: bool) -> Self {
        CacheValue::new(now + u64::from(ttl), records, authoritative)
    }

    pub fn is_fresh(&self, now: u64) -> bool {
        self.expiry_time > now
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry_time < now
    }

    pub fn remaining_ttl(&self, now: u64) -> u32 {
        u32::try_from(self.expiry_time.saturating_sub(now)).unwrap_or(u32::MAX)
    }

    /// Copies of the cached records with their TTL rewritten to the time left until expiry.
    pub fn records_at(&self, now: u64) -> Vec<Record> {
        self.records_with_ttl(self.remaining_ttl(now))
    }

    pub fn records_with_ttl(&self, ttl: u32) -> Vec<Record> {
        self.records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                record.set_ttl(ttl);
                record
            })
            .collect()
    }
}

/// Records are persisted in their binary wire encoding.
mod wire_records {
    use hickory_proto::rr::Record;
    use hickory_proto::serialize::binary::{BinDecodable as _, BinEncodable as _};
    use serde::de::Error as _;
    use serde::ser::{Error as _, SerializeSeq as _};
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(records: &[Record], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(records.len()))?;
        for record in records {
            let encoded = record.to_bytes().map_err(S::Error::custom)?;
            seq.serialize_element(&encoded)?;
        }
        seq.end()
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Record>, D::Error> {
        Vec::<Vec<u8>>::deserialize(deserializer)?
            .iter()
            .map(|encoded| Record::from_bytes(encoded).map_err(D::Error::custom))
            .collect()
    }
}
