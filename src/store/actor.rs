use crate::error::WorkspaceError;
use crate::store::models::StoredCredentialBlob;
use crate::store::schema::SQLITE_INIT;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub enum StoreMessage {
    /// Insert or replace the blob for an account label.
    Save(String, String, RpcReplyPort<Result<(), WorkspaceError>>),

    /// Fetch the blob for an account label.
    Load(
        String,
        RpcReplyPort<Result<Option<StoredCredentialBlob>, WorkspaceError>>,
    ),

    /// Delete the blob for an account label; replies whether a row existed.
    Delete(String, RpcReplyPort<Result<bool, WorkspaceError>>),
}

/// Cheap, cloneable handle to the store actor.
#[derive(Clone)]
pub struct CredentialStore {
    actor: ActorRef<StoreMessage>,
}

impl CredentialStore {
    pub async fn save(&self, account: &str, blob: String) -> Result<(), WorkspaceError> {
        ractor::call!(self.actor, StoreMessage::Save, account.to_string(), blob)
            .map_err(|e| WorkspaceError::Store(format!("Save RPC failed: {e}")))?
    }

    pub async fn load(&self, account: &str) -> Result<Option<StoredCredentialBlob>, WorkspaceError> {
        ractor::call!(self.actor, StoreMessage::Load, account.to_string())
            .map_err(|e| WorkspaceError::Store(format!("Load RPC failed: {e}")))?
    }

    pub async fn delete(&self, account: &str) -> Result<bool, WorkspaceError> {
        ractor::call!(self.actor, StoreMessage::Delete, account.to_string())
            .map_err(|e| WorkspaceError::Store(format!("Delete RPC failed: {e}")))?
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("actor", &self.actor.get_id())
            .finish()
    }
}

struct StoreState {
    pool: SqlitePool,
}

struct StoreActor;

#[ractor::async_trait]
impl Actor for StoreActor {
    type Msg = StoreMessage;
    type State = StoreState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("Credential store initialized");
        Ok(StoreState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            StoreMessage::Save(account, blob, reply) => {
                let res = save_blob(&state.pool, &account, &blob).await;
                let _ = reply.send(res);
            }
            StoreMessage::Load(account, reply) => {
                let res = load_blob(&state.pool, &account).await;
                let _ = reply.send(res);
            }
            StoreMessage::Delete(account, reply) => {
                let res = delete_blob(&state.pool, &account).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

async fn save_blob(pool: &SqlitePool, account: &str, blob: &str) -> Result<(), WorkspaceError> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO encrypted_credentials (account, blob, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(account) DO UPDATE SET
            blob = excluded.blob,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(account)
    .bind(blob)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    debug!(account, "Encrypted credentials saved");
    Ok(())
}

async fn load_blob(
    pool: &SqlitePool,
    account: &str,
) -> Result<Option<StoredCredentialBlob>, WorkspaceError> {
    let row = sqlx::query_as::<_, StoredCredentialBlob>(
        r#"
        SELECT account, blob, created_at, updated_at
        FROM encrypted_credentials
        WHERE account = ?
        "#,
    )
    .bind(account)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn delete_blob(pool: &SqlitePool, account: &str) -> Result<bool, WorkspaceError> {
    let res = sqlx::query("DELETE FROM encrypted_credentials WHERE account = ?")
        .bind(account)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Spawn the store actor. Unnamed so several stores can coexist in one process.
pub async fn spawn(database_url: &str) -> Result<CredentialStore, WorkspaceError> {
    let (actor, _jh) = ractor::Actor::spawn(None, StoreActor, database_url.to_string())
        .await
        .map_err(|e| WorkspaceError::Store(format!("failed to spawn store actor: {e}")))?;

    Ok(CredentialStore { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), WorkspaceError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
