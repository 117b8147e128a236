use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::integration::store;
use crate::user::{
    self,
    model::{Profile, UNKNOWN_USER, display_name},
};

use super::Id;

/// Display fields of a participant copied into the room at creation. Never
/// refreshed afterwards.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetails {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
}

impl ParticipantDetails {
    pub fn snapshot(p: &Profile) -> Self {
        Self {
            display_name: display_name(p.display_name.as_deref(), p.email.as_deref()),
            email: p.email.clone().unwrap_or_default(),
            photo_url: p.photo_url.clone().unwrap_or_default(),
        }
    }

    pub fn name(&self) -> String {
        display_name(Some(&self.display_name), Some(&self.email))
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: Id,
    pub participants: Vec<user::Id>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_message_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participant_details: HashMap<user::Id, ParticipantDetails>,
}

impl ChatRoom {
    pub fn has_participant(&self, id: &user::Id) -> bool {
        self.participants.contains(id)
    }

    pub fn other_participant(&self, me: &user::Id) -> Option<&user::Id> {
        self.participants.iter().find(|p| *p != me)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatRoom<'a> {
    participants: [&'a user::Id; 2],
    created_at: Value,
    last_message: Option<String>,
    last_message_time: Option<i64>,
    participant_details: HashMap<&'a user::Id, ParticipantDetails>,
}

impl<'a> NewChatRoom<'a> {
    pub fn new(
        first: &'a user::Id,
        second: &'a user::Id,
        first_profile: &Profile,
        second_profile: &Profile,
    ) -> Self {
        let participant_details = HashMap::from([
            (first, ParticipantDetails::snapshot(first_profile)),
            (second, ParticipantDetails::snapshot(second_profile)),
        ]);

        Self {
            participants: [first, second],
            created_at: store::server_timestamp(),
            last_message: None,
            last_message_time: None,
            participant_details,
        }
    }
}

/// One line of a user's chat list.
#[derive(Clone, Debug, PartialEq)]
pub struct UserChat {
    pub chat_room_id: Id,
    pub other_user_id: user::Id,
    pub other_user_name: String,
    pub other_user_photo: Option<String>,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
}

impl UserChat {
    pub fn from_room(room: ChatRoom, me: &user::Id) -> Self {
        let other_user_id = room
            .other_participant(me)
            .cloned()
            .unwrap_or_else(|| user::Id::new(""));

        let details = room
            .participant_details
            .get(&other_user_id)
            .cloned()
            .unwrap_or_default();

        Self {
            other_user_name: details.name(),
            other_user_photo: Some(details.photo_url).filter(|p| !p.is_empty()),
            chat_room_id: room.id,
            other_user_id,
            last_message: room.last_message,
            last_message_time: room.last_message_time,
        }
    }

    pub fn needs_enrichment(&self) -> bool {
        self.other_user_name == UNKNOWN_USER && !self.other_user_id.is_empty()
    }
}

/// Most recent first; chats without any message go last.
pub fn sort_by_recency(chats: &mut [UserChat]) {
    chats.sort_by(|a, b| match (a.last_message_time, b.last_message_time) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
