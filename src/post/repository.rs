use async_trait::async_trait;
use serde_json::Value;

use crate::integration::store::{
    self, Direction, Document, FieldUpdate, Listener, Query, Store,
};
use crate::user;

use super::Id;
use super::model::{Comment, NewPost, Post, PostUpdate, sort_newest_first};

pub const POSTS_COLLECTION: &str = "posts";

#[async_trait]
pub trait PostRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<Post>>;

    async fn find_recent(&self, limit: usize) -> super::Result<Vec<Post>>;

    async fn find_by_user(&self, user_id: &user::Id) -> super::Result<Vec<Post>>;

    async fn find_latest_by_user(&self, user_id: &user::Id) -> super::Result<Option<Post>>;

    async fn create(&self, post: &NewPost) -> super::Result<Id>;

    async fn update(&self, id: &Id, update: &PostUpdate) -> super::Result<()>;

    async fn add_like(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;

    async fn remove_like(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;

    async fn add_comment(&self, id: &Id, comment: &Comment) -> super::Result<()>;

    async fn replace_comments(&self, id: &Id, comments: &[Comment]) -> super::Result<()>;

    async fn delete(&self, id: &Id) -> super::Result<()>;

    fn listen_recent(&self, limit: usize) -> super::Result<Listener>;

    fn listen_by_user(&self, user_id: &user::Id) -> super::Result<Listener>;
}

pub struct StorePostRepository {
    store: Store,
}

impl StorePostRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn apply(&self, id: &Id, updates: Vec<(String, FieldUpdate)>) -> super::Result<()> {
        self.store
            .update(POSTS_COLLECTION, id.as_str(), updates)
            .await?;
        Ok(())
    }
}

fn recent(limit: usize) -> Query {
    Query::new(POSTS_COLLECTION)
        .order_by("createdAt", Direction::Desc)
        .limit(limit)
}

// Equality only: filtering by author and ordering by date would need a
// composite index.
fn by_user(user_id: &user::Id) -> Query {
    Query::new(POSTS_COLLECTION).filter_eq("userId", user_id.as_str())
}

fn decode_all(docs: &[Document]) -> super::Result<Vec<Post>> {
    let posts = docs
        .iter()
        .map(|d| d.decode::<Post>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

fn encode<T: serde::Serialize>(value: &T) -> super::Result<Value> {
    let fields = store::to_fields(value)?;
    Ok(Value::Object(fields))
}

#[async_trait]
impl PostRepository for StorePostRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<Post>> {
        let doc = self.store.get(POSTS_COLLECTION, id.as_str()).await?;
        let post = doc.map(|d| d.decode::<Post>()).transpose()?;
        Ok(post)
    }

    async fn find_recent(&self, limit: usize) -> super::Result<Vec<Post>> {
        let docs = self.store.query(&recent(limit)).await?;
        decode_all(&docs)
    }

    async fn find_by_user(&self, user_id: &user::Id) -> super::Result<Vec<Post>> {
        let docs = self.store.query(&by_user(user_id)).await?;
        let mut posts = decode_all(&docs)?;
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn find_latest_by_user(&self, user_id: &user::Id) -> super::Result<Option<Post>> {
        let posts = self.find_by_user(user_id).await?;
        Ok(posts.into_iter().next())
    }

    async fn create(&self, post: &NewPost) -> super::Result<Id> {
        let mut fields = store::to_fields(post)?;
        fields.insert("createdAt".into(), store::server_timestamp());
        fields.insert("likes".into(), Value::Array(vec![]));
        fields.insert("comments".into(), Value::Array(vec![]));

        let id = self.store.create(POSTS_COLLECTION, fields).await?;
        Ok(Id::new(id))
    }

    async fn update(&self, id: &Id, update: &PostUpdate) -> super::Result<()> {
        let mut updates = vec![];
        if let Some(caption) = &update.caption {
            updates.push(("caption".into(), FieldUpdate::Set(Value::from(caption.as_str()))));
        }
        if let Some(image_url) = &update.image_url {
            updates.push((
                "imageUrl".into(),
                FieldUpdate::Set(Value::from(image_url.as_str())),
            ));
        }
        self.apply(id, updates).await
    }

    async fn add_like(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        let like = Value::from(user_id.as_str());
        self.apply(id, vec![("likes".into(), FieldUpdate::ArrayUnion(vec![like]))])
            .await
    }

    async fn remove_like(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        let like = Value::from(user_id.as_str());
        self.apply(id, vec![("likes".into(), FieldUpdate::ArrayRemove(vec![like]))])
            .await
    }

    async fn add_comment(&self, id: &Id, comment: &Comment) -> super::Result<()> {
        let comment = encode(comment)?;
        self.apply(
            id,
            vec![("comments".into(), FieldUpdate::ArrayUnion(vec![comment]))],
        )
        .await
    }

    async fn replace_comments(&self, id: &Id, comments: &[Comment]) -> super::Result<()> {
        let comments = comments
            .iter()
            .map(encode)
            .collect::<super::Result<Vec<_>>>()?;
        self.apply(
            id,
            vec![("comments".into(), FieldUpdate::Set(Value::Array(comments)))],
        )
        .await
    }

    async fn delete(&self, id: &Id) -> super::Result<()> {
        self.store.delete(POSTS_COLLECTION, id.as_str()).await?;
        Ok(())
    }

    fn listen_recent(&self, limit: usize) -> super::Result<Listener> {
        let listener = self.store.listen(recent(limit))?;
        Ok(listener)
    }

    fn listen_by_user(&self, user_id: &user::Id) -> super::Result<Listener> {
        let listener = self.store.listen(by_user(user_id))?;
        Ok(listener)
    }
}
