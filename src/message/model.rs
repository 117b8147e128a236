use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::integration::store;
use crate::{room, user};

use super::Id;

/// Author of a message as the chat UI renders it.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Sender {
    #[serde(rename = "_id")]
    pub id: user::Id,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Sender {
    pub fn new(id: user::Id, name: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Id,
    pub chat_room_id: room::Id,
    pub user: Sender,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Newest first, ties broken by id so the order is total.
pub fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[derive(Clone, Debug)]
pub struct NewMessage {
    pub sender: Sender,
    pub text: String,
}

impl NewMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MessageRecord<'a> {
    chat_room_id: &'a room::Id,
    user: &'a Sender,
    text: &'a str,
    created_at: Value,
}

impl<'a> MessageRecord<'a> {
    pub fn new(chat_room_id: &'a room::Id, user: &'a Sender, text: &'a str) -> Self {
        Self {
            chat_room_id,
            user,
            text,
            created_at: store::server_timestamp(),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn message(id: &str, at: i64) -> Message {
        Message {
            id: Id::new(id),
            chat_room_id: room::Id::new("r1"),
            user: Sender::new(user::Id::from("jora"), "Jora", None),
            text: "hi".into(),
            created_at: Utc.timestamp_millis_opt(at).unwrap(),
        }
    }

    #[test]
    fn should_sort_newest_first_with_id_tiebreak() {
        let mut messages = vec![message("a", 1), message("c", 2), message("b", 2)];

        sort_newest_first(&mut messages);

        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn should_write_sender_under_underscore_id() {
        let sender = Sender::new(user::Id::from("jora"), "Jora", None);
        let room = room::Id::new("r1");

        let fields = store::to_fields(&MessageRecord::new(&room, &sender, "hi")).unwrap();

        assert_eq!(fields["chatRoomId"], "r1");
        assert_eq!(fields["user"], serde_json::json!({ "_id": "jora", "name": "Jora" }));
        assert!(store::is_server_timestamp(&fields["createdAt"]));
    }
}
