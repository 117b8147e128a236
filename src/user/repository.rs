use async_trait::async_trait;
use serde_json::Value;

use crate::integration::store::{FieldUpdate, Fields, Query, SetMode, Store};

use super::Id;
use super::model::{NameFields, User};

pub const USERS_COLLECTION: &str = "users";

#[async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<User>>;

    async fn find_name_fields(&self, id: &Id) -> super::Result<Option<NameFields>>;

    async fn find_all(&self) -> super::Result<Vec<User>>;

    async fn merge(&self, id: &Id, fields: Fields) -> super::Result<()>;

    async fn add_following(&self, id: &Id, target: &Id) -> super::Result<()>;

    async fn remove_following(&self, id: &Id, target: &Id) -> super::Result<()>;

    async fn add_follower(&self, id: &Id, follower: &Id) -> super::Result<()>;

    async fn remove_follower(&self, id: &Id, follower: &Id) -> super::Result<()>;
}

pub struct StoreUserRepository {
    store: Store,
}

impl StoreUserRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn mutate_edge(
        &self,
        id: &Id,
        set_field: &str,
        counter_field: &str,
        other: &Id,
        add: bool,
    ) -> super::Result<()> {
        let other = Value::from(other.as_str());
        let (set_update, by) = if add {
            (FieldUpdate::ArrayUnion(vec![other]), 1)
        } else {
            (FieldUpdate::ArrayRemove(vec![other]), -1)
        };

        self.store
            .update(
                USERS_COLLECTION,
                id.as_str(),
                vec![
                    (set_field.into(), set_update),
                    (counter_field.into(), FieldUpdate::Increment(by)),
                ],
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn find_by_id(&self, id: &Id) -> super::Result<Option<User>> {
        let doc = self.store.get(USERS_COLLECTION, id.as_str()).await?;
        let user = doc.map(|d| d.decode::<User>()).transpose()?;
        Ok(user)
    }

    async fn find_name_fields(&self, id: &Id) -> super::Result<Option<NameFields>> {
        let doc = self.store.get(USERS_COLLECTION, id.as_str()).await?;
        let fields = doc.map(|d| d.decode::<NameFields>()).transpose()?;
        Ok(fields)
    }

    async fn find_all(&self) -> super::Result<Vec<User>> {
        let docs = self.store.query(&Query::new(USERS_COLLECTION)).await?;

        let users = docs
            .iter()
            .map(|d| d.decode::<User>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    async fn merge(&self, id: &Id, fields: Fields) -> super::Result<()> {
        self.store
            .set(USERS_COLLECTION, id.as_str(), fields, SetMode::Merge)
            .await?;
        Ok(())
    }

    async fn add_following(&self, id: &Id, target: &Id) -> super::Result<()> {
        self.mutate_edge(id, "following", "followingCount", target, true)
            .await
    }

    async fn remove_following(&self, id: &Id, target: &Id) -> super::Result<()> {
        self.mutate_edge(id, "following", "followingCount", target, false)
            .await
    }

    async fn add_follower(&self, id: &Id, follower: &Id) -> super::Result<()> {
        self.mutate_edge(id, "followers", "followersCount", follower, true)
            .await
    }

    async fn remove_follower(&self, id: &Id, follower: &Id) -> super::Result<()> {
        self.mutate_edge(id, "followers", "followersCount", follower, false)
            .await
    }
}
