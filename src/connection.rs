//! Per-session database connection with bounded-retry acquisition.
//!
//! A [`SessionContext`] starts `Unconnected`. [`ConnectionManager::ensure`]
//! reuses the recorded handle while it answers a liveness probe and otherwise
//! walks `Unconnected -> Connecting -> Connected`, making up to
//! `max_retries` attempts with a fixed backoff between failures. Running out
//! of attempts leaves the context `Unconnected`; the next `ensure` starts a
//! fresh round.

#![allow(async_fn_in_trait)]

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::database::PredictionStore;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
}

/// Connection state owned by a single user session.
#[derive(Debug)]
pub struct SessionContext<H> {
    state: ConnectionState,
    handle: Option<H>,
}

impl<H> Default for SessionContext<H> {
    fn default() -> Self {
        Self {
            state: ConnectionState::Unconnected,
            handle: None,
        }
    }
}

impl<H> SessionContext<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The handle, if the session is currently connected.
    pub fn handle_mut(&mut self) -> Option<&mut H> {
        if self.is_connected() {
            self.handle.as_mut()
        } else {
            None
        }
    }

    /// Demotes the session after a failed operation. The stale handle is
    /// kept until the next acquisition replaces it.
    pub fn invalidate(&mut self) {
        if self.state != ConnectionState::Unconnected {
            warn!("session connection invalidated");
        }
        self.state = ConnectionState::Unconnected;
    }
}

/// Opens, probes and prepares database handles.
pub trait Connector {
    type Handle;

    async fn connect(&self) -> Result<Self::Handle, sqlx::Error>;

    /// Round-trip probe of an existing handle.
    async fn is_alive(&self, handle: &mut Self::Handle) -> bool;

    /// Makes a fresh handle ready for use (creates the schema).
    async fn prepare(&self, handle: &mut Self::Handle) -> StoreResult<()>;
}

/// Wait inserted between failed connection attempts.
pub trait Backoff {
    async fn wait(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackoff;

impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// SQLite connector driven by the configured URL.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    url: String,
}

impl SqliteConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for SqliteConnector {
    type Handle = SqliteConnection;

    async fn connect(&self) -> Result<SqliteConnection, sqlx::Error> {
        SqliteConnectOptions::from_str(&self.url)?
            .create_if_missing(true)
            .connect()
            .await
    }

    async fn is_alive(&self, handle: &mut SqliteConnection) -> bool {
        handle.ping().await.is_ok()
    }

    async fn prepare(&self, handle: &mut SqliteConnection) -> StoreResult<()> {
        PredictionStore::new(handle).ensure_schema().await
    }
}

pub struct ConnectionManager<C, B = TokioBackoff> {
    connector: C,
    backoff: B,
    max_retries: u32,
    delay: Duration,
}

impl ConnectionManager<SqliteConnector, TokioBackoff> {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(
            SqliteConnector::new(config.url.clone()),
            TokioBackoff,
            config.max_retries,
            config.backoff(),
        )
    }
}

impl<C: Connector, B: Backoff> ConnectionManager<C, B> {
    pub fn new(connector: C, backoff: B, max_retries: u32, delay: Duration) -> Self {
        Self {
            connector,
            backoff,
            max_retries: max_retries.max(1),
            delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns a live handle for the session, acquiring one if needed.
    pub async fn ensure<'s>(
        &self,
        ctx: &'s mut SessionContext<C::Handle>,
    ) -> StoreResult<&'s mut C::Handle> {
        let alive = match (ctx.state, ctx.handle.as_mut()) {
            (ConnectionState::Connected, Some(handle)) => self.connector.is_alive(handle).await,
            _ => false,
        };

        if alive {
            debug!("reusing live session connection");
        } else {
            ctx.state = ConnectionState::Connecting;
            let mut handle = match self.acquire().await {
                Ok(handle) => handle,
                Err(err) => {
                    ctx.state = ConnectionState::Unconnected;
                    return Err(err);
                }
            };
            if let Err(err) = self.connector.prepare(&mut handle).await {
                warn!(error = %err, "schema preparation failed");
                ctx.state = ConnectionState::Unconnected;
                return Err(err);
            }
            ctx.handle = Some(handle);
            ctx.state = ConnectionState::Connected;
        }

        ctx.handle.as_mut().ok_or(StoreError::NotConnected)
    }

    async fn acquire(&self) -> StoreResult<C::Handle> {
        let mut attempt = 1;
        loop {
            match self.connector.connect().await {
                Ok(handle) => {
                    info!(attempt, "database connection established");
                    return Ok(handle);
                }
                Err(source) if attempt >= self.max_retries => {
                    warn!(attempt, error = %source, "giving up on database connection");
                    return Err(StoreError::Connectivity {
                        attempts: attempt,
                        source,
                    });
                }
                Err(source) => {
                    warn!(attempt, error = %source, "database connection attempt failed");
                    self.backoff.wait(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
