use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::integration::store::{self, Fields};

use super::model::{NewUser, ProfileFields, User, UserStats, UserSummary};
use super::{Error, Id, Repository};

#[async_trait]
pub trait UserService {
    async fn create(&self, id: &Id, display_name: &str, email: &str) -> super::Result<()>;

    async fn find_by_id(&self, id: &Id) -> super::Result<User>;

    async fn find_all_except(&self, current: &Id) -> super::Result<Vec<UserSummary>>;

    async fn stats(&self, id: &Id) -> super::Result<UserStats>;

    async fn is_following(&self, id: &Id, target: &Id) -> super::Result<bool>;

    async fn follow(&self, id: &Id, target: &Id) -> super::Result<()>;

    async fn unfollow(&self, id: &Id, target: &Id) -> super::Result<()>;

    async fn save_profile(&self, id: &Id, bio: &str, public_profile: bool) -> super::Result<()>;

    async fn set_photo(&self, id: &Id, photo_url: &str) -> super::Result<()>;
}

#[derive(Clone)]
pub struct UserServiceImpl {
    repo: Repository,
}

impl UserServiceImpl {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn create(&self, id: &Id, display_name: &str, email: &str) -> super::Result<()> {
        let fields = store::to_fields(&NewUser::new(display_name, email))?;
        self.repo.merge(id, fields).await
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    async fn find_all_except(&self, current: &Id) -> super::Result<Vec<UserSummary>> {
        let users = self.repo.find_all().await?;

        Ok(users
            .into_iter()
            .filter(|u| &u.id != current)
            .map(UserSummary::from)
            .collect())
    }

    async fn stats(&self, id: &Id) -> super::Result<UserStats> {
        let stats = self
            .repo
            .find_by_id(id)
            .await
            .inspect_err(|e| error!("failed to get stats of {id}: {e}"))?
            .map(UserStats::from)
            .unwrap_or_default();

        Ok(stats)
    }

    async fn is_following(&self, id: &Id, target: &Id) -> super::Result<bool> {
        let user = self.repo.find_by_id(id).await?;
        Ok(user.is_some_and(|u| u.is_following(target)))
    }

    // Two independent writes: a failure of the second leaves the edge one-sided.
    async fn follow(&self, id: &Id, target: &Id) -> super::Result<()> {
        if id == target {
            return Err(Error::SelfFollow(id.clone()));
        }

        self.repo
            .add_following(id, target)
            .await
            .inspect_err(|e| error!("{id} could not follow {target}: {e}"))?;
        self.repo
            .add_follower(target, id)
            .await
            .inspect_err(|e| error!("{target} did not record follower {id}: {e}"))?;

        info!("{id} follows {target}");
        Ok(())
    }

    async fn unfollow(&self, id: &Id, target: &Id) -> super::Result<()> {
        if id == target {
            return Err(Error::SelfFollow(id.clone()));
        }

        self.repo
            .remove_following(id, target)
            .await
            .inspect_err(|e| error!("{id} could not unfollow {target}: {e}"))?;
        self.repo
            .remove_follower(target, id)
            .await
            .inspect_err(|e| error!("{target} did not drop follower {id}: {e}"))?;

        info!("{id} unfollowed {target}");
        Ok(())
    }

    async fn save_profile(&self, id: &Id, bio: &str, public_profile: bool) -> super::Result<()> {
        let fields = store::to_fields(&ProfileFields::new(bio.trim(), public_profile))?;
        self.repo.merge(id, fields).await
    }

    async fn set_photo(&self, id: &Id, photo_url: &str) -> super::Result<()> {
        let mut fields = Fields::new();
        fields.insert("photoURL".into(), Value::from(photo_url));
        self.repo.merge(id, fields).await
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::integration::memory::MemoryStore;
    use crate::user::repository::StoreUserRepository;

    async fn service() -> UserServiceImpl {
        let store = Arc::new(MemoryStore::new());
        let svc = UserServiceImpl::new(Arc::new(StoreUserRepository::new(store)));
        svc.create(&Id::from("jora"), "Jora", "jora@x.com")
            .await
            .unwrap();
        svc.create(&Id::from("valera"), "Valera", "valera@x.com")
            .await
            .unwrap();
        svc
    }

    #[tokio::test]
    async fn should_follow_and_unfollow() {
        let svc = service().await;
        let jora = Id::from("jora");
        let valera = Id::from("valera");

        svc.follow(&jora, &valera).await.unwrap();

        assert!(svc.is_following(&jora, &valera).await.unwrap());
        assert!(!svc.is_following(&valera, &jora).await.unwrap());
        let stats = svc.stats(&valera).await.unwrap();
        assert_eq!(stats.followers_count, 1);
        assert_eq!(stats.followers, vec![jora.clone()]);
        assert_eq!(svc.stats(&jora).await.unwrap().following_count, 1);

        svc.unfollow(&jora, &valera).await.unwrap();

        assert!(!svc.is_following(&jora, &valera).await.unwrap());
        assert_eq!(svc.stats(&valera).await.unwrap(), UserStats::default());
        assert_eq!(svc.stats(&jora).await.unwrap(), UserStats::default());
    }

    #[tokio::test]
    async fn should_leave_edge_one_sided_when_target_is_missing() {
        let svc = service().await;
        let jora = Id::from("jora");
        let ghost = Id::from("ghost");

        let err = svc.follow(&jora, &ghost).await.err().unwrap();

        assert!(matches!(err, Error::_Integration(_)));
        // the first write went through
        let stats = svc.stats(&jora).await.unwrap();
        assert_eq!(stats.following, vec![ghost]);
        assert_eq!(stats.following_count, 1);
    }

    #[tokio::test]
    async fn should_reject_self_follow() {
        let svc = service().await;
        let jora = Id::from("jora");

        let err = svc.follow(&jora, &jora).await.err().unwrap();

        assert!(matches!(err, Error::SelfFollow(_)));
    }

    #[tokio::test]
    async fn should_answer_zero_stats_for_missing_user() {
        let svc = service().await;

        let stats = svc.stats(&Id::from("ghost")).await.unwrap();

        assert_eq!(stats, UserStats::default());
        assert!(!svc.is_following(&Id::from("ghost"), &Id::from("jora")).await.unwrap());
    }

    #[tokio::test]
    async fn should_list_everyone_but_current_user() {
        let svc = service().await;

        let others = svc.find_all_except(&Id::from("jora")).await.unwrap();

        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, Id::from("valera"));
    }

    #[tokio::test]
    async fn should_merge_profile_fields() {
        let svc = service().await;
        let jora = Id::from("jora");

        svc.save_profile(&jora, "  hello  ", true).await.unwrap();
        svc.set_photo(&jora, "https://img.local/users/0.jpg")
            .await
            .unwrap();

        let user = svc.find_by_id(&jora).await.unwrap();
        assert_eq!(user.bio.as_deref(), Some("hello"));
        assert!(user.public_profile);
        assert!(user.updated_at.is_some());
        assert_eq!(user.photo_url.as_deref(), Some("https://img.local/users/0.jpg"));
        assert_eq!(user.display_name.as_deref(), Some("Jora"));
    }
}
