use anyhow::Context;
use log::info;
use tokio::sync::mpsc;

use social_client::auth::model::AuthUser;
use social_client::auth::service::AuthService;
use social_client::event::Registry;
use social_client::integration::Config;
use social_client::integration::upload::Image;
use social_client::message::model::{NewMessage, Sender};
use social_client::message::service::MessageService;
use social_client::post::model::{NewComment, NewPost};
use social_client::post::service::PostService;
use social_client::room::model::UserChat;
use social_client::room::service::RoomService;
use social_client::state::AppState;
use social_client::user::model::Profile;
use social_client::user::service::UserService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::default();
    config
        .init_logger()
        .with_context(|| "Failed to initialize logger")?;

    let app = AppState::in_memory(config).with_context(|| "Failed to wire services")?;
    let mut screens = Registry::new();

    let jora = register(&app, "Jora", "jora@example.com").await?;
    let valera = register(&app, "Valera", "valera@example.com").await?;

    screens.register(
        "session",
        app.session.subscribe(Box::new(|user: Option<AuthUser>| match user {
            Some(u) => info!("session: {}", u.uid),
            None => info!("session: signed out"),
        })),
    );

    let me = app
        .auth_service
        .sign_in("jora@example.com", "secret1")
        .await
        .map_err(|e| anyhow::anyhow!(e.message()))?;
    app.auth_service
        .update_photo(Image::new(vec![0xff, 0xd8, 0xff, 0xe0]))
        .await
        .with_context(|| "Failed to update photo")?;

    let (tx, mut roster) = mpsc::unbounded_channel();
    screens.register(
        "roster",
        app.room_service
            .subscribe_user_chats(
                &me.uid,
                Box::new(move |chats: Vec<UserChat>| {
                    let _ = tx.send(chats);
                }),
            )
            .with_context(|| "Failed to subscribe to chats")?,
    );

    let room_id = app
        .room_service
        .resolve_room(
            &jora.uid,
            &valera.uid,
            &Profile::from(&jora),
            &Profile::from(&valera),
        )
        .await?;
    let sender = Sender::new(me.uid.clone(), "Jora", me.photo_url.clone());
    app.message_service
        .send(&room_id, NewMessage::new(sender, "Hi Valera!"))
        .await?;

    while let Some(chats) = roster.recv().await {
        if let Some(chat) = chats.first().filter(|c| c.last_message.is_some()) {
            info!(
                "chat with {}: {}",
                chat.other_user_name,
                chat.last_message.as_deref().unwrap_or_default()
            );
            break;
        }
    }

    let post_id = app
        .post_service
        .create_post(NewPost {
            user_id: valera.uid.clone(),
            user_name: "Valera".into(),
            user_avatar: None,
            image_url: "https://images.local/posts/sunset.jpg".into(),
            caption: "Sunset".into(),
        })
        .await?;
    app.post_service.like_post(&post_id, &me.uid).await?;
    app.post_service
        .add_comment(
            &post_id,
            NewComment {
                user_id: me.uid.clone(),
                user_name: "Jora".into(),
                user_avatar: None,
                text: "Beautiful".into(),
            },
        )
        .await?;

    app.user_service.follow(&me.uid, &valera.uid).await?;
    let stats = app.user_service.stats(&valera.uid).await?;
    info!("{} has {} followers", valera.uid, stats.followers_count);

    for post in app.post_service.get_posts().await? {
        info!(
            "{}: '{}' ({} likes, {} comments)",
            post.user_name,
            post.caption,
            post.likes.len(),
            post.comments.len()
        );
    }

    app.auth_service
        .sign_out()
        .await
        .with_context(|| "Failed to sign out")?;
    screens.dispose_all();

    Ok(())
}

async fn register(app: &AppState, name: &str, email: &str) -> anyhow::Result<AuthUser> {
    app.auth_service
        .sign_up(name, email, "secret1")
        .await
        .map_err(|e| anyhow::anyhow!(e.message()))
        .with_context(|| format!("Failed to register {email}"))
}
