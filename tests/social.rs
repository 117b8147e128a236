#[cfg(test)]
mod tests {
    use social_client::auth::model::AuthUser;
    use social_client::auth::service::AuthService;
    use social_client::integration::Config;
    use social_client::state::AppState;
    use social_client::user::service::UserService;

    async fn signed_up(app: &AppState, name: &str, email: &str) -> AuthUser {
        app.auth_service
            .sign_up(name, email, "secret1")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_follow_then_unfollow_restores_counters() {
        let app = AppState::in_memory(Config::default()).unwrap();
        let ann = signed_up(&app, "Ann", "ann@x.com").await;
        let bob = signed_up(&app, "Bob", "bob@x.com").await;
        let before = app.user_service.stats(&bob.uid).await.unwrap();

        app.user_service.follow(&ann.uid, &bob.uid).await.unwrap();

        let after = app.user_service.stats(&bob.uid).await.unwrap();
        assert_eq!(after.followers_count, before.followers_count + 1);
        assert!(after.followers.contains(&ann.uid));
        assert!(app.user_service.is_following(&ann.uid, &bob.uid).await.unwrap());

        app.user_service.unfollow(&ann.uid, &bob.uid).await.unwrap();

        assert_eq!(app.user_service.stats(&bob.uid).await.unwrap(), before);
        assert!(!app.user_service.is_following(&ann.uid, &bob.uid).await.unwrap());
        assert_eq!(
            app.user_service.stats(&ann.uid).await.unwrap().following_count,
            0
        );
    }

    #[tokio::test]
    async fn test_user_picker_hides_current_user() {
        let app = AppState::in_memory(Config::default()).unwrap();
        let ann = signed_up(&app, "Ann", "ann@x.com").await;
        let bob = signed_up(&app, "Bob", "bob@x.com").await;

        let others = app.user_service.find_all_except(&ann.uid).await.unwrap();

        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, bob.uid);
        assert_eq!(others[0].display_name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_session_follows_sign_in_and_out() {
        let app = AppState::in_memory(Config::default()).unwrap();
        let ann = signed_up(&app, "Ann", "ann@x.com").await;
        assert_eq!(app.session.current(), None);

        app.auth_service.sign_in("ann@x.com", "secret1").await.unwrap();
        assert_eq!(app.session.current().map(|u| u.uid), Some(ann.uid));

        app.auth_service.sign_out().await.unwrap();
        assert!(!app.session.is_signed_in());
    }
}
