use crate::application_port::*;
use crate::domain_model::{DomainEvent, UserEvent, UserId};
use crate::domain_port::*;
use std::sync::Arc;
use tracing::{error, info};

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    publisher: Arc<dyn EventPublisher>,
    tx_manager: Arc<dyn TxManager>,
    user_registered_topic: String,
}

impl RealUserService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        publisher: Arc<dyn EventPublisher>,
        tx_manager: Arc<dyn TxManager>,
        user_registered_topic: impl Into<String>,
    ) -> RealUserService {
        RealUserService {
            user_repo,
            credential_hasher,
            publisher,
            tx_manager,
            user_registered_topic: user_registered_topic.into(),
        }
    }

    async fn create_and_announce<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
        password_hash: &str,
    ) -> Result<UserView, UserError> {
        let record = self
            .user_repo
            .create_in_tx(tx, username, password_hash)
            .await?;
        let view = UserView::from(&record);

        let event = DomainEvent::UserRegistered(UserEvent {
            id: view.id,
            username: view.username.clone(),
            created_at: view.created_at.clone(),
            updated_at: view.updated_at.clone(),
        });
        publish_event(self.publisher.as_ref(), &self.user_registered_topic, &event)
            .await
            .map_err(|e| UserError::InternalError(e.to_string()))?;

        Ok(view)
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn register(&self, request: RegisterInput) -> Result<UserView, UserError> {
        let RegisterInput { username, password } = request;

        if self.user_repo.count_by_username(&username).await? > 0 {
            return Err(UserError::UsernameTaken);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| UserError::Store(e.to_string()))?;

        match self
            .create_and_announce(&mut *tx, &username, &password_hash)
            .await
        {
            Ok(view) => {
                tx.commit()
                    .await
                    .map_err(|e| UserError::Store(e.to_string()))?;
                info!(user_id = %view.id, username = %view.username, "user registered");
                Ok(view)
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    error!(error = %e, "failed to roll back user registration");
                }
                Err(err)
            }
        }
    }

    async fn list(&self, request: SearchUserInput) -> Result<(Vec<UserView>, u64), UserError> {
        let filter = UserFilter {
            user_id: request.user_id,
            username: request.username,
            page: request.page,
        };
        let (records, total) = self.user_repo.list(&filter).await?;
        Ok((records.iter().map(UserView::from).collect(), total))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<UserView, UserError> {
        let record = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::UserNotFound)?;
        Ok(UserView::from(&record))
    }

    async fn change_password(&self, request: ChangePasswordInput) -> Result<(), UserError> {
        let record = self
            .user_repo
            .find_by_id(request.user_id)
            .await?
            .ok_or(UserError::UserNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(&request.old_password, &record.password_hash)
            .await?;
        if !ok {
            return Err(UserError::InvalidOldPassword);
        }

        let password_hash = self
            .credential_hasher
            .hash_password(&request.new_password)
            .await?;
        self.user_repo
            .update_password(record.user_id, &password_hash)
            .await?;
        Ok(())
    }
}
