use anyhow::Context as _;
use hickory_proto::op::Message;
use hickory_proto::rr::{Name, Record, RecordType};

use crate::cache::{CacheKey, CacheValue, Store};
use crate::upstream::{Forwarded, Upstream};
use crate::util::{get_empty_reply, unix_now};

/// Query types whose replies are cached and can be rebuilt from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedType {
    A,
    Ptr,
    Ns,
}

impl SupportedType {
    fn record_type(self) -> RecordType {
        match self {
            SupportedType::A => RecordType::A,
            SupportedType::Ptr => RecordType::PTR,
            SupportedType::Ns => RecordType::NS,
        }
    }
}

/// Caching policy for an incoming question.
///
/// `Unsupported` types are always forwarded and their replies are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Supported(SupportedType),
    Unsupported(RecordType),
}

impl From<RecordType> for QueryKind {
    fn from(query_type: RecordType) -> Self {
        match query_type {
            RecordType::A => QueryKind::Supported(SupportedType::A),
            RecordType::PTR => QueryKind::Supported(SupportedType::Ptr),
            RecordType::NS => QueryKind::Supported(SupportedType::Ns),
            other => QueryKind::Unsupported(other),
        }
    }
}

/// Answers raw queries either from the cache or by asking the upstream resolver.
pub struct Dispatcher<U> {
    upstream: U,
    store: Store,
}

impl<U: Upstream> Dispatcher<U> {
    pub fn new(upstream: U, store: Store) -> Self {
        Dispatcher { upstream, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    pub async fn handle(&mut self, raw_query: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.handle_at(raw_query, unix_now()).await
    }

    /// Same as [`Dispatcher::handle`], with `now` as unix seconds.
    pub async fn handle_at(&mut self, raw_query: &[u8], now: u64) -> anyhow::Result<Vec<u8>> {
        let query = Message::from_vec(raw_query).context("malformed DNS query")?;
        let question = query
            .queries()
            .first()
            .context("malformed DNS query: question is missing")?;
        let qname = question.name().clone();
        let qtype = question.query_type();

        if let QueryKind::Supported(supported) = QueryKind::from(qtype) {
            let key = CacheKey::for_type(&qname, supported.record_type());
            match self.store.get(&key) {
                Some(entry) if entry.is_fresh(now) && entry.authoritative => {
                    tracing::debug!(qname = %qname, qtype = ?qtype, "Cache hit");
                    return self.reply_from_cache(&query, &qname, supported, entry, now);
                }
                Some(entry) if entry.is_fresh(now) => {
                    tracing::debug!(
                        qname = %qname,
                        qtype = ?qtype,
                        "Found entry in cache, but it's not authoritative. Doing a lookup"
                    );
                }
                Some(_) => {
                    tracing::debug!(qname = %qname, qtype = ?qtype, "Found entry in cache, but it's stale. Doing a lookup");
                }
                None => {
                    tracing::debug!(qname = %qname, qtype = ?qtype, "Cache miss");
                }
            }
        } else {
            tracing::debug!(qname = %qname, qtype = ?qtype, "Query type is not cached, forwarding");
        }

        self.forward_and_cache(raw_query, &query, now).await
    }

    async fn forward_and_cache(&mut self, raw_query: &[u8], query: &Message, now: u64) -> anyhow::Result<Vec<u8>> {
        match self
            .upstream
            .ask(raw_query)
            .await
            .context("error while forwarding a query to the upstream resolver")?
        {
            Forwarded::Reply(raw_reply) => {
                match Message::from_vec(&raw_reply) {
                    Ok(reply) => self.cache_reply(&reply, now),
                    Err(e) => tracing::debug!("Passing through an upstream reply that failed to parse: {}", e),
                }
                Ok(raw_reply)
            }
            Forwarded::TimedOut => {
                tracing::warn!(id = query.id(), "Upstream resolver didn't reply in time, sending an empty reply");
                get_empty_reply(query)
                    .to_vec()
                    .context("error while encoding an empty reply")
            }
        }
    }

    /// Stores the parts of an upstream reply needed to answer the same question later.
    ///
    /// Expiry is always derived from the first answer record, except for PTR replies that carry
    /// their data in the authority section.
    fn cache_reply(&mut self, reply: &Message, now: u64) {
        let Some(question) = reply.queries().first() else {
            return;
        };
        let qname = question.name();
        let QueryKind::Supported(supported) = QueryKind::from(question.query_type()) else {
            return;
        };

        match supported {
            SupportedType::A => {
                let Some(ttl) = first_ttl(reply.answers()) else {
                    return;
                };
                self.store.put(
                    CacheKey::for_type(qname, RecordType::A),
                    CacheValue::from_ttl(now, ttl, reply.answers().to_vec(), true),
                );
                self.store.put(
                    CacheKey::for_type(qname, RecordType::NS),
                    CacheValue::from_ttl(now, ttl, reply.name_servers().to_vec(), false),
                );
                self.store.put(
                    CacheKey::additionals(qname),
                    CacheValue::from_ttl(now, ttl, reply.additionals().to_vec(), false),
                );
            }
            SupportedType::Ptr => {
                let (ttl, records) = if reply.name_servers().is_empty() {
                    (first_ttl(reply.answers()), reply.answers())
                } else {
                    (first_ttl(reply.name_servers()), reply.name_servers())
                };
                let Some(ttl) = ttl else {
                    return;
                };
                self.store.put(
                    CacheKey::for_type(qname, RecordType::PTR),
                    CacheValue::from_ttl(now, ttl, records.to_vec(), true),
                );
            }
            SupportedType::Ns => {
                let Some(ttl) = first_ttl(reply.answers()) else {
                    return;
                };
                self.store.put(
                    CacheKey::for_type(qname, RecordType::NS),
                    CacheValue::from_ttl(now, ttl, reply.answers().to_vec(), true),
                );
                self.store.put(
                    CacheKey::additionals(qname),
                    CacheValue::from_ttl(now, ttl, reply.additionals().to_vec(), false),
                );
            }
        }

        tracing::debug!(qname = %qname, qtype = ?question.query_type(), "Cached upstream reply");
    }

    fn reply_from_cache(
        &self,
        query: &Message,
        qname: &Name,
        supported: SupportedType,
        entry: &CacheValue,
        now: u64,
    ) -> anyhow::Result<Vec<u8>> {
        let mut reply = get_empty_reply(query);

        match supported {
            SupportedType::A => {
                reply.add_answers(entry.records_at(now));
                if let Some(ns) = self.fresh_entry(&CacheKey::for_type(qname, RecordType::NS), now) {
                    reply.add_name_servers(ns.records_at(now));
                }
                if let Some(additionals) = self.fresh_entry(&CacheKey::additionals(qname), now) {
                    reply.add_additionals(additionals.records_at(now));
                }
            }
            // Reverse lookups are carried in the authority section
            SupportedType::Ptr => {
                reply.add_name_servers(entry.records_at(now));
            }
            SupportedType::Ns => {
                reply.add_answers(entry.records_at(now));
                if let Some(additionals) = self.fresh_entry(&CacheKey::additionals(qname), now) {
                    reply.add_additionals(additionals.records_with_ttl(entry.remaining_ttl(now)));
                }
            }
        }

        tracing::debug!(reply = ?reply, "Reply built from cache");

        reply.to_vec().context("error while encoding a reply from cache")
    }

    fn fresh_entry(&self, key: &CacheKey, now: u64) -> Option<&CacheValue> {
        self.store.get(key).filter(|entry| entry.is_fresh(now))
    }
}

fn first_ttl(records: &[Record]) -> Option<u32> {
    records.first().map(Record::ttl)
}
