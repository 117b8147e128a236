use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, warn};

use crate::event::{self, Callback, Subscription};
use crate::integration::store::Snapshot;
use crate::{notification, user, validation};

use super::model::{Comment, CommentId, NewComment, NewPost, Post, PostUpdate, sort_newest_first};
use super::{Error, Id, Repository};

const COMMENT_TITLE: &str = "New Comment";

#[async_trait]
pub trait PostService {
    async fn create_post(&self, post: NewPost) -> super::Result<Id>;

    async fn find_by_id(&self, id: &Id) -> super::Result<Post>;

    async fn get_posts(&self) -> super::Result<Vec<Post>>;

    async fn find_latest_by_user(&self, user_id: &user::Id) -> super::Result<Option<Post>>;

    fn subscribe_to_posts(&self, on_update: Callback<Post>) -> super::Result<Subscription>;

    fn subscribe_user_posts(
        &self,
        user_id: &user::Id,
        on_update: Callback<Post>,
    ) -> super::Result<Subscription>;

    async fn like_post(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;

    async fn unlike_post(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;

    async fn add_comment(&self, id: &Id, comment: NewComment) -> super::Result<Comment>;

    async fn delete_comment(&self, id: &Id, comment_id: &CommentId) -> super::Result<()>;

    async fn update_post(&self, id: &Id, actor: &user::Id, update: PostUpdate)
    -> super::Result<()>;

    async fn delete_post(&self, id: &Id, actor: &user::Id) -> super::Result<()>;
}

#[derive(Clone)]
pub struct PostServiceImpl {
    repo: Repository,
    notifications: notification::Service,
    feed_limit: usize,
}

impl PostServiceImpl {
    pub fn new(repo: Repository, notifications: notification::Service, feed_limit: usize) -> Self {
        Self {
            repo,
            notifications,
            feed_limit,
        }
    }

    async fn find_authored(&self, id: &Id, actor: &user::Id) -> super::Result<Post> {
        let post = self.find_by_id(id).await?;
        if &post.user_id != actor {
            return Err(Error::NotAuthor(actor.clone()));
        }
        Ok(post)
    }

    async fn notify_author(&self, post: &Post, comment: &Comment) {
        if post.user_id == comment.user_id {
            return;
        }

        let body = format!("{} commented on your post", comment.user_name);
        if let Err(e) = self.notifications.schedule(COMMENT_TITLE, &body).await {
            warn!("could not notify author of {}: {e}", post.id);
        }
    }
}

async fn newest_first(snapshot: Snapshot) -> Vec<Post> {
    let mut posts = event::decode_snapshot::<Post>(&snapshot);
    sort_newest_first(&mut posts);
    posts
}

#[async_trait]
impl PostService for PostServiceImpl {
    async fn create_post(&self, post: NewPost) -> super::Result<Id> {
        let id = self
            .repo
            .create(&post)
            .await
            .inspect_err(|e| error!("failed to create post of {}: {e}", post.user_id))?;

        debug!("{} published post {id}", post.user_id);
        Ok(id)
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<Post> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    async fn get_posts(&self) -> super::Result<Vec<Post>> {
        self.repo.find_recent(self.feed_limit).await
    }

    async fn find_latest_by_user(&self, user_id: &user::Id) -> super::Result<Option<Post>> {
        self.repo.find_latest_by_user(user_id).await
    }

    fn subscribe_to_posts(&self, on_update: Callback<Post>) -> super::Result<Subscription> {
        let listener = self.repo.listen_recent(self.feed_limit)?;
        Ok(event::deliver(listener, newest_first, on_update))
    }

    fn subscribe_user_posts(
        &self,
        user_id: &user::Id,
        on_update: Callback<Post>,
    ) -> super::Result<Subscription> {
        let listener = self.repo.listen_by_user(user_id)?;
        Ok(event::deliver(listener, newest_first, on_update))
    }

    async fn like_post(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        self.repo
            .add_like(id, user_id)
            .await
            .inspect_err(|e| error!("{user_id} could not like {id}: {e}"))
    }

    async fn unlike_post(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        self.repo
            .remove_like(id, user_id)
            .await
            .inspect_err(|e| error!("{user_id} could not unlike {id}: {e}"))
    }

    async fn add_comment(&self, id: &Id, comment: NewComment) -> super::Result<Comment> {
        let text = validation::text(&comment.text)?.to_string();
        let post = self.find_by_id(id).await?;

        let comment = Comment::new(NewComment { text, ..comment }, Utc::now());
        self.repo
            .add_comment(id, &comment)
            .await
            .inspect_err(|e| error!("failed to comment on {id}: {e}"))?;

        self.notify_author(&post, &comment).await;
        Ok(comment)
    }

    // Read-modify-write: a comment added between the read and the write is lost.
    async fn delete_comment(&self, id: &Id, comment_id: &CommentId) -> super::Result<()> {
        let post = self.find_by_id(id).await?;

        let remaining: Vec<Comment> = post
            .comments
            .into_iter()
            .filter(|c| &c.id != comment_id)
            .collect();

        self.repo.replace_comments(id, &remaining).await
    }

    async fn update_post(
        &self,
        id: &Id,
        actor: &user::Id,
        update: PostUpdate,
    ) -> super::Result<()> {
        self.find_authored(id, actor).await?;
        if update.is_empty() {
            return Ok(());
        }
        self.repo.update(id, &update).await
    }

    async fn delete_post(&self, id: &Id, actor: &user::Id) -> super::Result<()> {
        self.find_authored(id, actor).await?;
        self.repo
            .delete(id)
            .await
            .inspect_err(|e| error!("failed to delete post {id}: {e}"))?;

        debug!("{actor} deleted post {id}");
        Ok(())
    }
}
