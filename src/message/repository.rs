use async_trait::async_trait;

use crate::integration::store::{self, Listener, Query, Store};
use crate::room;

use super::Id;
use super::model::{Message, MessageRecord, NewMessage, sort_newest_first};

pub const MESSAGES_COLLECTION: &str = "messages";

#[async_trait]
pub trait MessageRepository {
    async fn create(&self, room_id: &room::Id, message: &NewMessage) -> super::Result<Id>;

    async fn find_by_room(&self, room_id: &room::Id) -> super::Result<Vec<Message>>;

    fn listen_by_room(&self, room_id: &room::Id) -> super::Result<Listener>;
}

pub struct StoreMessageRepository {
    store: Store,
}

impl StoreMessageRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

// No order clause: ordering by createdAt next to the room filter would need a
// composite index, so callers sort locally.
fn by_room(room_id: &room::Id) -> Query {
    Query::new(MESSAGES_COLLECTION).filter_eq("chatRoomId", room_id.as_str())
}

#[async_trait]
impl MessageRepository for StoreMessageRepository {
    async fn create(&self, room_id: &room::Id, message: &NewMessage) -> super::Result<Id> {
        let record = MessageRecord::new(room_id, &message.sender, &message.text);
        let fields = store::to_fields(&record)?;

        let id = self.store.create(MESSAGES_COLLECTION, fields).await?;
        Ok(Id::new(id))
    }

    async fn find_by_room(&self, room_id: &room::Id) -> super::Result<Vec<Message>> {
        let docs = self.store.query(&by_room(room_id)).await?;

        let mut messages = docs
            .iter()
            .map(|d| d.decode::<Message>())
            .collect::<Result<Vec<_>, _>>()?;
        sort_newest_first(&mut messages);

        Ok(messages)
    }

    fn listen_by_room(&self, room_id: &room::Id) -> super::Result<Listener> {
        let listener = self.store.listen(by_room(room_id))?;
        Ok(listener)
    }
}
