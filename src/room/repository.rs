use async_trait::async_trait;
use serde_json::Value;

use crate::integration::store::{self, FieldUpdate, Listener, Query, Store};
use crate::user;

use super::Id;
use super::model::{ChatRoom, NewChatRoom};

pub const CHAT_ROOMS_COLLECTION: &str = "chatRooms";

#[async_trait]
pub trait RoomRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<ChatRoom>>;

    async fn find_by_participant(&self, participant: &user::Id) -> super::Result<Vec<ChatRoom>>;

    async fn create(&self, room: &NewChatRoom<'_>) -> super::Result<Id>;

    async fn update_last_message(&self, id: &Id, text: &str) -> super::Result<()>;

    fn listen_by_participant(&self, participant: &user::Id) -> super::Result<Listener>;
}

pub struct StoreRoomRepository {
    store: Store,
}

impl StoreRoomRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

fn by_participant(participant: &user::Id) -> Query {
    Query::new(CHAT_ROOMS_COLLECTION).array_contains("participants", participant.as_str())
}

#[async_trait]
impl RoomRepository for StoreRoomRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<ChatRoom>> {
        let doc = self.store.get(CHAT_ROOMS_COLLECTION, id.as_str()).await?;
        let room = doc.map(|d| d.decode::<ChatRoom>()).transpose()?;
        Ok(room)
    }

    async fn find_by_participant(&self, participant: &user::Id) -> super::Result<Vec<ChatRoom>> {
        let docs = self.store.query(&by_participant(participant)).await?;

        let rooms = docs
            .iter()
            .map(|d| d.decode::<ChatRoom>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    async fn create(&self, room: &NewChatRoom<'_>) -> super::Result<Id> {
        let fields = store::to_fields(room)?;
        let id = self.store.create(CHAT_ROOMS_COLLECTION, fields).await?;
        Ok(Id::new(id))
    }

    async fn update_last_message(&self, id: &Id, text: &str) -> super::Result<()> {
        self.store
            .update(
                CHAT_ROOMS_COLLECTION,
                id.as_str(),
                vec![
                    ("lastMessage".into(), FieldUpdate::Set(Value::from(text))),
                    ("lastMessageTime".into(), FieldUpdate::ServerTimestamp),
                ],
            )
            .await?;
        Ok(())
    }

    fn listen_by_participant(&self, participant: &user::Id) -> super::Result<Listener> {
        let listener = self.store.listen(by_participant(participant))?;
        Ok(listener)
    }
}
