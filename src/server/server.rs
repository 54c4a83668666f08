use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use nanoid::nanoid;
use sqlx::MySqlPool;
use std::sync::Arc;

const RUN_ID_ALPHABET: [char; 16] = [
    '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
];

/// Short random id distinguishing Kafka clients of one process run.
pub fn run_id() -> String {
    nanoid!(10, &RUN_ID_ALPHABET)
}

/// Services behind the HTTP API.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub todo_service: Arc<dyn TodoService>,
    pool: Option<MySqlPool>,
}

impl Server {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        todo_service: Arc<dyn TodoService>,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            todo_service,
            pool: None,
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        if settings.auth.jwt_secret.is_empty() {
            return Err(anyhow::anyhow!("auth.jwt_secret must be set"));
        }
        let run_id = run_id();

        let pool = connect_pool(&settings.mysql.url, settings.mysql.max_connections).await?;
        let tx_manager: Arc<dyn TxManager> = Arc::new(MySqlTxManager::new(pool.clone()));
        let user_repo: Arc<dyn UserRepo> = Arc::new(MySqlUserRepo::new(pool.clone()));
        let todo_repo: Arc<dyn TodoRepo> = Arc::new(MySqlTodoRepo::new(pool.clone()));

        let session_store = build_session_store(settings).await?;

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            access_ttl: settings.auth.access_ttl(),
            signing_key: settings.auth.jwt_secret.clone().into_bytes(),
        }));
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let publisher: Arc<dyn EventPublisher> = Arc::new(KafkaPublisher::new(
            &settings.kafka.bootstrap_servers,
            &format!("todo-pub-{run_id}"),
        )?);

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            credential_hasher.clone(),
            token_codec,
            Arc::new(UuidRefreshTokenGenerator::new()),
            session_store,
        ));
        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(
            user_repo,
            credential_hasher,
            publisher,
            tx_manager,
            settings.kafka.user_registered_topic.clone(),
        ));
        let todo_service: Arc<dyn TodoService> = Arc::new(RealTodoService::new(todo_repo));

        info!(run_id = %run_id, session_backend = %settings.session.backend, "server started");

        Ok(Self {
            auth_service,
            user_service,
            todo_service,
            pool: Some(pool),
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

async fn build_session_store(settings: &Settings) -> anyhow::Result<Arc<dyn SessionStore>> {
    match settings.session.backend.as_str() {
        "memory" => {
            warn!("memory session store: sessions are not shared between instances");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        "redis" => Ok(Arc::new(
            RedisSessionStore::connect(&settings.redis.url).await?,
        )),
        other => Err(anyhow::anyhow!("Unknown session backend: {}", other)),
    }
}
