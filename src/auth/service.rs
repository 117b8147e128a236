use async_trait::async_trait;
use log::{debug, error, info};
use url::Url;

use crate::integration::idp;
use crate::integration::upload::{self, Folder, Image};
use crate::{user, validation};

use super::model::{AuthUser, ProfileUpdate};
use super::session::Session;
use super::Error;

#[async_trait]
pub trait AuthService {
    /// Registers the account and its user document. Does not sign in.
    async fn sign_up(&self, display_name: &str, email: &str, password: &str)
    -> super::Result<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> super::Result<AuthUser>;

    async fn sign_out(&self) -> super::Result<()>;

    async fn update_photo(&self, image: Image) -> super::Result<Url>;

    fn session(&self) -> &Session;
}

#[derive(Clone)]
pub struct AuthServiceImpl {
    idp: idp::Provider,
    users: user::Service,
    images: upload::Host,
    session: Session,
}

impl AuthServiceImpl {
    pub fn new(
        idp: idp::Provider,
        users: user::Service,
        images: upload::Host,
        session: Session,
    ) -> Self {
        Self {
            idp,
            users,
            images,
            session,
        }
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn sign_up(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> super::Result<AuthUser> {
        let display_name = validation::display_name(display_name)?;
        let email = validation::email(email)?;
        let password = validation::new_password(password)?;

        let account = self
            .idp
            .sign_up(email, password)
            .await
            .inspect_err(|e| debug!("sign up of {email} refused: {e}"))?;

        let account = self
            .idp
            .update_profile(&account.uid, &ProfileUpdate::display_name(display_name))
            .await?;

        self.users
            .create(&account.uid, display_name, email)
            .await
            .inspect_err(|e| error!("no user document for {}: {e}", account.uid))?;

        info!("registered {}", account.uid);
        Ok(account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> super::Result<AuthUser> {
        let email = validation::email(email)?;
        let password = validation::password(password)?;

        let account = self
            .idp
            .sign_in(email, password)
            .await
            .inspect_err(|e| debug!("sign in of {email} refused: {e}"))?;

        self.session.set(Some(account.clone()));
        info!("{} signed in", account.uid);
        Ok(account)
    }

    async fn sign_out(&self) -> super::Result<()> {
        self.idp.sign_out().await?;

        if let Some(account) = self.session.current() {
            info!("{} signed out", account.uid);
        }
        self.session.set(None);
        Ok(())
    }

    async fn update_photo(&self, image: Image) -> super::Result<Url> {
        let account = self.session.current().ok_or(Error::NotSignedIn)?;

        let url = self
            .images
            .upload(image, Folder::Users)
            .await
            .inspect_err(|e| error!("photo upload of {} failed: {e}", account.uid))?;

        let account = self
            .idp
            .update_profile(&account.uid, &ProfileUpdate::photo_url(url.as_str()))
            .await?;
        self.users.set_photo(&account.uid, url.as_str()).await?;

        self.session.set(Some(account));
        Ok(url)
    }

    fn session(&self) -> &Session {
        &self.session
    }
}
