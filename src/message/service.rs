use async_trait::async_trait;
use log::{debug, error};

use crate::event::{self, Callback, Subscription};
use crate::integration::store::Snapshot;
use crate::{room, validation};

use super::model::{Message, NewMessage, sort_newest_first};
use super::{Error, Id, Repository};

#[async_trait]
pub trait MessageService {
    async fn send(&self, room_id: &room::Id, message: NewMessage) -> super::Result<Id>;

    async fn find_by_room(&self, room_id: &room::Id) -> super::Result<Vec<Message>>;

    fn subscribe(
        &self,
        room_id: &room::Id,
        on_update: Callback<Message>,
    ) -> super::Result<Subscription>;
}

#[derive(Clone)]
pub struct MessageServiceImpl {
    repo: Repository,
    rooms: room::Repository,
}

impl MessageServiceImpl {
    pub fn new(repo: Repository, rooms: room::Repository) -> Self {
        Self { repo, rooms }
    }
}

async fn newest_first(snapshot: Snapshot) -> Vec<Message> {
    let mut messages = event::decode_snapshot::<Message>(&snapshot);
    sort_newest_first(&mut messages);
    messages
}

#[async_trait]
impl MessageService for MessageServiceImpl {
    // The message and the room preview are written separately: when the second
    // write fails the message stays and the error is still returned.
    async fn send(&self, room_id: &room::Id, message: NewMessage) -> super::Result<Id> {
        let text = validation::text(&message.text)
            .map_err(|_| Error::EmptyText)?
            .to_string();
        let message = NewMessage { text, ..message };

        let id = self
            .repo
            .create(room_id, &message)
            .await
            .inspect_err(|e| error!("failed to send message to {room_id}: {e}"))?;

        self.rooms
            .update_last_message(room_id, &message.text)
            .await
            .inspect_err(|e| error!("message {id} sent but {room_id} preview not updated: {e}"))?;

        debug!("{} sent {id} to {room_id}", message.sender.id);
        Ok(id)
    }

    async fn find_by_room(&self, room_id: &room::Id) -> super::Result<Vec<Message>> {
        self.repo.find_by_room(room_id).await
    }

    fn subscribe(
        &self,
        room_id: &room::Id,
        on_update: Callback<Message>,
    ) -> super::Result<Subscription> {
        let listener = self.repo.listen_by_room(room_id)?;
        Ok(event::deliver(listener, newest_first, on_update))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::integration::memory::MemoryStore;
    use crate::integration::store::Store;
    use crate::message::model::Sender;
    use crate::message::repository::StoreMessageRepository;
    use crate::room::model::NewChatRoom;
    use crate::room::repository::{RoomRepository, StoreRoomRepository};
    use crate::user::{self, model::Profile};

    struct Setup {
        svc: MessageServiceImpl,
        rooms: room::Repository,
        room_id: room::Id,
    }

    async fn setup() -> Setup {
        let store: Store = Arc::new(MemoryStore::new());
        let rooms: room::Repository = Arc::new(StoreRoomRepository::new(store.clone()));
        let (jora, valera) = (user::Id::from("jora"), user::Id::from("valera"));
        let room_id = rooms
            .create(&NewChatRoom::new(
                &jora,
                &valera,
                &Profile::default(),
                &Profile::default(),
            ))
            .await
            .unwrap();

        let svc = MessageServiceImpl::new(
            Arc::new(StoreMessageRepository::new(store)),
            rooms.clone(),
        );
        Setup {
            svc,
            rooms,
            room_id,
        }
    }

    fn from_jora(text: &str) -> NewMessage {
        NewMessage::new(Sender::new(user::Id::from("jora"), "Jora", None), text)
    }

    #[tokio::test]
    async fn should_send_and_update_room_preview() {
        let Setup {
            svc,
            rooms,
            room_id,
        } = setup().await;

        let id = svc.send(&room_id, from_jora("  hello ")).await.unwrap();

        let messages = svc.find_by_room(&room_id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, id);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].user.name, "Jora");

        let room = rooms.find_by_id(&room_id).await.unwrap().unwrap();
        assert_eq!(room.last_message.as_deref(), Some("hello"));
        assert!(room.last_message_time.is_some());
    }

    #[tokio::test]
    async fn should_reject_blank_message_before_writing() {
        let Setup { svc, room_id, .. } = setup().await;

        let err = svc.send(&room_id, from_jora(" \n ")).await.err().unwrap();

        assert!(matches!(err, Error::EmptyText));
        assert!(svc.find_by_room(&room_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_keep_message_when_room_is_missing() {
        let Setup { svc, .. } = setup().await;
        let ghost = room::Id::new("ghost");

        let err = svc.send(&ghost, from_jora("hi")).await.err().unwrap();

        assert!(matches!(err, Error::_Room(_)));
        assert_eq!(svc.find_by_room(&ghost).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_stream_newest_first() {
        let Setup { svc, room_id, .. } = setup().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = svc
            .subscribe(
                &room_id,
                Box::new(move |messages: Vec<Message>| {
                    let _ = tx.send(messages);
                }),
            )
            .unwrap();
        assert_eq!(rx.recv().await, Some(vec![]));

        svc.send(&room_id, from_jora("first")).await.unwrap();
        svc.send(&room_id, from_jora("second")).await.unwrap();

        let mut latest = vec![];
        while latest.len() < 2 {
            latest = rx.recv().await.unwrap();
        }
        let texts: Vec<_> = latest.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }
}
