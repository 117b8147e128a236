use std::sync::Arc;

use url::Url;

use crate::auth::service::AuthServiceImpl;
use crate::auth::session::Session;
use crate::integration::idp::{self, MemoryAuthProvider};
use crate::integration::memory::MemoryStore;
use crate::integration::store::Store;
use crate::integration::upload::{self, CloudinaryHost, MemoryImageHost};
use crate::integration::{self, Config};
use crate::message::repository::StoreMessageRepository;
use crate::message::service::MessageServiceImpl;
use crate::notification::LogNotificationService;
use crate::post::repository::StorePostRepository;
use crate::post::service::PostServiceImpl;
use crate::room::repository::StoreRoomRepository;
use crate::room::service::RoomServiceImpl;
use crate::user::repository::StoreUserRepository;
use crate::user::service::UserServiceImpl;
use crate::{auth, message, notification, post, room, user};

const LOCAL_IMAGE_BASE: &str = "https://images.local/";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: Session,

    pub auth_service: auth::Service,
    pub user_service: user::Service,
    pub room_service: room::Service,
    pub message_service: message::Service,
    pub post_service: post::Service,
    pub notification_service: notification::Service,
}

impl AppState {
    /// Wires the services against a hosted store and identity provider,
    /// uploading images over HTTP.
    pub fn init(config: Config, store: Store, idp: idp::Provider) -> integration::Result<Self> {
        let http = integration::init_http_client()?;
        let images = Arc::new(CloudinaryHost::new(config.upload.clone(), http));

        Ok(Self::new(
            config,
            store,
            idp,
            images,
            Arc::new(LogNotificationService::new()),
        ))
    }

    /// Everything in process; nothing leaves the machine.
    pub fn in_memory(config: Config) -> integration::Result<Self> {
        let images = Arc::new(MemoryImageHost::new(Url::parse(LOCAL_IMAGE_BASE)?));

        Ok(Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryAuthProvider::new()),
            images,
            Arc::new(LogNotificationService::new()),
        ))
    }

    pub fn new(
        config: Config,
        store: Store,
        idp: idp::Provider,
        images: upload::Host,
        notifications: notification::Service,
    ) -> Self {
        let users: user::Repository = Arc::new(StoreUserRepository::new(store.clone()));
        let rooms: room::Repository = Arc::new(StoreRoomRepository::new(store.clone()));
        let posts: post::Repository = Arc::new(StorePostRepository::new(store.clone()));
        let messages: message::Repository = Arc::new(StoreMessageRepository::new(store));

        let session = Session::new();
        let user_service: user::Service = Arc::new(UserServiceImpl::new(users.clone()));

        Self {
            auth_service: Arc::new(AuthServiceImpl::new(
                idp,
                user_service.clone(),
                images,
                session.clone(),
            )),
            room_service: Arc::new(RoomServiceImpl::new(rooms.clone(), users, posts.clone())),
            message_service: Arc::new(MessageServiceImpl::new(messages, rooms)),
            post_service: Arc::new(PostServiceImpl::new(
                posts,
                notifications.clone(),
                config.feed_limit,
            )),
            notification_service: notifications,
            user_service,
            session,
            config,
        }
    }
}
