use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shoplist_core::entity::{Filter, Includes, User};
use shoplist_core::integrations::{BlobStore, EmailMessage, MessageQueue};
use shoplist_core::storage::{Repository, RepositoryError};
use uuid::Uuid;

use crate::{hash_password, validate_password, verify_password, AuthError, TokenService};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
}

/// Registration and login over a user repository.
///
/// Registration enqueues a welcome message; queue failures are logged and do
/// not undo the sign-up.
pub struct AuthService<R> {
    users: R,
    tokens: Arc<TokenService>,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn MessageQueue>,
}

impl<R: Repository<User>> AuthService<R> {
    pub fn new(
        users: R,
        tokens: Arc<TokenService>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            users,
            tokens,
            blobs,
            queue,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        if request.password != request.confirm_password {
            return Err(AuthError::PasswordsDoNotMatch);
        }
        validate_password(&request.password)?;
        let email = normalize_email(&request.email)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .post(User::new(email.clone(), email).with_password_hash(password_hash))
            .await?;
        self.users.save_changes().await.map_err(|e| match e {
            RepositoryError::AlreadyExists { .. } => AuthError::EmailTaken,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user.id, "User registered");

        if let Err(err) = self
            .queue
            .send(EmailMessage::registration(user.email.clone()))
            .await
        {
            tracing::warn!(user_id = %user.id, error = %err, "Failed to queue registration email");
        }

        self.respond(&user).await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&request.password, hash)?;
        tracing::debug!(user_id = %user.id, "User logged in");

        self.respond(&user).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .get_first_or_default(Some(Filter::eq("email", email)), Includes::NONE)
            .await?)
    }

    async fn respond(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let token = self.tokens.generate(user, self.image_url(user).await)?;
        Ok(AuthResponse {
            token,
            user_id: user.id,
        })
    }

    async fn image_url(&self, user: &User) -> Option<String> {
        if user.has_default_image() {
            return None;
        }
        match self.blobs.get_blob_url(&user.image_name).await {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "Failed to resolve avatar URL");
                None
            }
        }
    }
}

/// Trims and lowercases `email`, rejecting anything without a local part and
/// a dotted domain.
fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shoplist_core::entity::Mutation;
    use shoplist_core::integrations::{BlobError, QueueError};
    use shoplist_core::storage::{Change, EntitySet, GenericRepository, Query};
    use tokio::sync::Mutex;

    use crate::TokenConfig;

    #[derive(Default)]
    struct UserStore {
        rows: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl EntitySet<User> for UserStore {
        async fn fetch(&self, query: Query) -> shoplist_core::storage::Result<Vec<User>> {
            let rows = self.rows.lock().await;
            Ok(rows
                .iter()
                .filter(|u| query.filter.as_ref().is_none_or(|f| f.matches(*u)))
                .cloned()
                .collect())
        }

        async fn count(&self) -> shoplist_core::storage::Result<u64> {
            Ok(self.rows.lock().await.len() as u64)
        }

        async fn commit(&self, changes: Vec<Change<User>>) -> shoplist_core::storage::Result<()> {
            let mut rows = self.rows.lock().await;
            for change in changes {
                match change {
                    Change::Insert(user) => {
                        if rows.iter().any(|u| u.email == user.email) {
                            return Err(RepositoryError::AlreadyExists {
                                entity_type: "user",
                                id: user.email,
                            });
                        }
                        rows.push(user);
                    }
                    Change::Update(user) => {
                        if let Some(row) = rows.iter_mut().find(|u| u.id == user.id) {
                            *row = user;
                        }
                    }
                    Change::Delete(id) => rows.retain(|u| u.id != id),
                }
            }
            Ok(())
        }

        async fn update_where(
            &self,
            _filter: &Filter,
            _mutation: &Mutation,
        ) -> shoplist_core::storage::Result<u64> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct RecordingQueue {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl MessageQueue for RecordingQueue {
        async fn send(&self, message: EmailMessage) -> Result<(), QueueError> {
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    struct ClosedQueue;

    #[async_trait]
    impl MessageQueue for ClosedQueue {
        async fn send(&self, _message: EmailMessage) -> Result<(), QueueError> {
            Err(QueueError::Closed)
        }
    }

    struct FixedUrlBlobs;

    #[async_trait]
    impl BlobStore for FixedUrlBlobs {
        async fn upload_blob(
            &self,
            _content: &[u8],
            _file_name: &str,
            base_name: &str,
            _previous: Option<&str>,
        ) -> Result<String, BlobError> {
            Ok(base_name.to_string())
        }

        async fn get_blob_url(&self, blob_name: &str) -> Result<Option<String>, BlobError> {
            Ok(Some(format!("http://blobs/{blob_name}?sig=test")))
        }

        async fn remove_blob(&self, _blob_name: &str) -> Result<(), BlobError> {
            Ok(())
        }
    }

    type Service = AuthService<GenericRepository<User, UserStore>>;

    struct Fixture {
        store: Arc<UserStore>,
        queue: Arc<RecordingQueue>,
        tokens: Arc<TokenService>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(UserStore::default()),
                queue: Arc::new(RecordingQueue::default()),
                tokens: Arc::new(TokenService::new(TokenConfig::ephemeral())),
            }
        }

        // A fresh service per call, like one per request.
        fn service(&self) -> Service {
            AuthService::new(
                GenericRepository::new(self.store.clone()),
                self.tokens.clone(),
                Arc::new(FixedUrlBlobs),
                self.queue.clone(),
            )
        }
    }

    fn register_request(email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_user_and_queues_email() {
        let fixture = Fixture::new();

        let response = fixture
            .service()
            .register(register_request("Bob@Example.com ", "password1", "password1"))
            .await
            .unwrap();

        let rows = fixture.store.rows.lock().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, response.user_id);
        assert_eq!(rows[0].email, "bob@example.com");
        assert_eq!(rows[0].user_name, "bob@example.com");
        assert!(rows[0].has_default_image());
        assert!(rows[0].password_hash.as_deref().is_some_and(|h| h != "password1"));

        let sent = fixture.queue.sent.lock().await;
        assert_eq!(*sent, vec![EmailMessage::registration("bob@example.com")]);

        let claims = fixture.tokens.verify(&response.token).unwrap();
        assert_eq!(claims.sub, response.user_id.to_string());
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_passwords() {
        let fixture = Fixture::new();
        let result = fixture
            .service()
            .register(register_request("bob@example.com", "password1", "password2"))
            .await;
        assert!(matches!(result, Err(AuthError::PasswordsDoNotMatch)));
        assert!(fixture.store.rows.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let fixture = Fixture::new();
        let result = fixture
            .service()
            .register(register_request("bob@example.com", "short", "short"))
            .await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_email() {
        let fixture = Fixture::new();
        for email in ["", "bob", "@example.com", "bob@", "bob@example", "b ob@example.com"] {
            let result = fixture
                .service()
                .register(register_request(email, "password1", "password1"))
                .await;
            assert!(
                matches!(result, Err(AuthError::InvalidEmail(_))),
                "accepted {email:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_taken() {
        let fixture = Fixture::new();
        fixture
            .service()
            .register(register_request("bob@example.com", "password1", "password1"))
            .await
            .unwrap();

        let result = fixture
            .service()
            .register(register_request("BOB@example.com", "password2", "password2"))
            .await;
        assert!(matches!(result, Err(AuthError::EmailTaken)));
        assert_eq!(fixture.store.rows.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_register_survives_closed_queue() {
        let store = Arc::new(UserStore::default());
        let service = AuthService::new(
            GenericRepository::new(store.clone()),
            Arc::new(TokenService::new(TokenConfig::ephemeral())),
            Arc::new(FixedUrlBlobs),
            Arc::new(ClosedQueue),
        );

        let result = service
            .register(register_request("bob@example.com", "password1", "password1"))
            .await;
        assert!(result.is_ok());
        assert_eq!(store.rows.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_login_after_register() {
        let fixture = Fixture::new();
        let registered = fixture
            .service()
            .register(register_request("bob@example.com", "password1", "password1"))
            .await
            .unwrap();

        let logged_in = fixture
            .service()
            .login(LoginRequest {
                email: "BOB@example.com".to_string(),
                password: "password1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user_id, registered.user_id);
        assert_ne!(logged_in.token, registered.token);
    }

    #[tokio::test]
    async fn test_login_wrong_password_or_unknown_email() {
        let fixture = Fixture::new();
        fixture
            .service()
            .register(register_request("bob@example.com", "password1", "password1"))
            .await
            .unwrap();

        let wrong_password = fixture
            .service()
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "password2".to_string(),
            })
            .await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));

        let unknown = fixture
            .service()
            .login(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "password1".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_user_without_credential() {
        let fixture = Fixture::new();
        fixture.store.rows.lock().await.push(
            User::new("bob@example.com", "bob@example.com").with_id(Uuid::new_v4()),
        );

        let result = fixture
            .service()
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "password1".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_token_carries_avatar_url() {
        let fixture = Fixture::new();
        let mut user = User::new("bob@example.com", "bob@example.com")
            .with_id(Uuid::new_v4())
            .with_password_hash(hash_password("password1").unwrap());
        user.image_name = format!("{}.png", user.id);
        let image_name = user.image_name.clone();
        fixture.store.rows.lock().await.push(user);

        let response = fixture
            .service()
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "password1".to_string(),
            })
            .await
            .unwrap();
        let claims = fixture.tokens.verify(&response.token).unwrap();
        assert_eq!(claims.image, format!("http://blobs/{image_name}?sig=test"));
    }
}
