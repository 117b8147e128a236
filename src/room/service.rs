use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info, warn};

use crate::event::{self, Callback, Subscription};
use crate::integration::store::Document;
use crate::post;
use crate::user::{self, model::Profile};

use super::model::{ChatRoom, NewChatRoom, UserChat, sort_by_recency};
use super::{Error, Id, Repository};

#[async_trait]
pub trait RoomService {
    /// Returns the room shared by both users, creating it on first contact.
    async fn resolve_room(
        &self,
        me: &user::Id,
        other: &user::Id,
        my_profile: &Profile,
        other_profile: &Profile,
    ) -> super::Result<Id>;

    async fn find_by_id(&self, id: &Id) -> super::Result<ChatRoom>;

    fn subscribe_user_chats(
        &self,
        user_id: &user::Id,
        on_update: Callback<UserChat>,
    ) -> super::Result<Subscription>;
}

#[derive(Clone)]
pub struct RoomServiceImpl {
    repo: Repository,
    enricher: Enricher,
}

impl RoomServiceImpl {
    pub fn new(repo: Repository, users: user::Repository, posts: post::Repository) -> Self {
        Self {
            repo,
            enricher: Enricher { users, posts },
        }
    }
}

#[async_trait]
impl RoomService for RoomServiceImpl {
    // Find-then-create is not atomic: two concurrent first contacts may both
    // create a room.
    async fn resolve_room(
        &self,
        me: &user::Id,
        other: &user::Id,
        my_profile: &Profile,
        other_profile: &Profile,
    ) -> super::Result<Id> {
        if me == other {
            return Err(Error::SameParticipants(me.clone()));
        }

        let rooms = self
            .repo
            .find_by_participant(me)
            .await
            .inspect_err(|e| error!("failed to list rooms of {me}: {e}"))?;

        if let Some(room) = rooms.into_iter().find(|r| r.has_participant(other)) {
            debug!("{me} and {other} already share room {}", room.id);
            return Ok(room.id);
        }

        let id = self
            .repo
            .create(&NewChatRoom::new(me, other, my_profile, other_profile))
            .await
            .inspect_err(|e| error!("failed to create room for {me} and {other}: {e}"))?;

        info!("created room {id} for {me} and {other}");
        Ok(id)
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<ChatRoom> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn subscribe_user_chats(
        &self,
        user_id: &user::Id,
        on_update: Callback<UserChat>,
    ) -> super::Result<Subscription> {
        let listener = self.repo.listen_by_participant(user_id)?;
        let enricher = self.enricher.clone();
        let me = user_id.clone();

        let transform = move |snapshot: Vec<Document>| {
            let enricher = enricher.clone();
            let me = me.clone();
            async move { enricher.user_chats(&snapshot, &me).await }
        };

        Ok(event::deliver(listener, transform, on_update))
    }
}

#[derive(Default)]
struct Identity {
    name: Option<String>,
    photo: Option<String>,
}

/// Fills in participants whose room snapshot carries no usable name.
#[derive(Clone)]
struct Enricher {
    users: user::Repository,
    posts: post::Repository,
}

impl Enricher {
    async fn user_chats(&self, snapshot: &[Document], me: &user::Id) -> Vec<UserChat> {
        let mut chats: Vec<UserChat> = event::decode_snapshot::<ChatRoom>(snapshot)
            .into_iter()
            .map(|room| UserChat::from_room(room, me))
            .collect();

        self.enrich(&mut chats).await;
        sort_by_recency(&mut chats);
        chats
    }

    async fn enrich(&self, chats: &mut [UserChat]) {
        let pending: Vec<(usize, user::Id)> = chats
            .iter()
            .enumerate()
            .filter(|(_, c)| c.needs_enrichment())
            .map(|(idx, c)| (idx, c.other_user_id.clone()))
            .collect();

        if pending.is_empty() {
            return;
        }

        let identities = join_all(pending.iter().map(|(_, id)| self.resolve_identity(id))).await;

        for ((idx, _), identity) in pending.into_iter().zip(identities) {
            let chat = &mut chats[idx];
            if let Some(name) = identity.name {
                chat.other_user_name = name;
            }
            if chat.other_user_photo.is_none() {
                chat.other_user_photo = identity.photo;
            }
        }
    }

    async fn resolve_identity(&self, id: &user::Id) -> Identity {
        let fields = match self.users.find_name_fields(id).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!("could not look up participant {id}: {e}");
                return Identity::default();
            }
        };

        let mut identity = Identity::default();
        match fields {
            Some(fields) => {
                identity.name = fields.resolve_name();
                identity.photo = fields.photo_url.filter(|p| !p.is_empty());
            }
            None => debug!("no user document for participant {id}"),
        }

        if identity.name.is_none() {
            identity.name = self.author_name(id).await;
        }
        identity
    }

    async fn author_name(&self, id: &user::Id) -> Option<String> {
        match self.posts.find_latest_by_user(id).await {
            Ok(post) => post.map(|p| p.user_name).filter(|n| !n.is_empty()),
            Err(e) => {
                debug!("post lookup for {id} failed: {e}");
                None
            }
        }
    }
}
