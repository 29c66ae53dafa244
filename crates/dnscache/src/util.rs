use std::time::{SystemTime, UNIX_EPOCH};

use hickory_proto::op::{Message, MessageType};

/// Current wall-clock time as unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Builds a response without any records that mirrors the identifying fields of the query.
pub fn get_empty_reply(query: &Message) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_recursion_desired(query.recursion_desired())
        .set_checking_disabled(query.checking_disabled())
        .set_recursion_available(true);
    reply.add_queries(query.queries().iter().cloned());
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{OpCode, Query, ResponseCode};
    use hickory_proto::rr::{Name, RecordType};

    #[test]
    fn empty_reply_copies_the_question() {
        let mut query = Message::new();
        query
            .set_id(4242)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true);
        let name = Name::from_ascii("example.com.").unwrap();
        query.add_query(Query::query(name, RecordType::MX));

        let reply = get_empty_reply(&query);
        assert_eq!(reply.id(), 4242);
        assert_eq!(reply.message_type(), MessageType::Response);
        assert!(reply.recursion_desired());
        assert!(reply.recursion_available());
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(reply.queries(), query.queries());
        assert!(reply.answers().is_empty());
        assert!(reply.name_servers().is_empty());
        assert!(reply.additionals().is_empty());
    }
}
