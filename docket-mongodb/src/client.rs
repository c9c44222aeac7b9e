//! MongoDB client wrapper: verified connection, lifecycle and transactions.

use std::sync::Arc;
use std::time::Duration;

use bson::{Document, doc};
use futures::future::BoxFuture;
use mongodb::{Client, Collection, Database, IndexModel};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};
use crate::retry::retry_with_backoff;
use crate::transaction::TransactionSession;

/// The live driver handle and its resolved database.
#[derive(Clone)]
struct Connection {
    client: Client,
    database: Database,
}

struct ClientInner {
    /// `None` once closed.
    state: RwLock<Option<Connection>>,
    config: MongoConfig,
}

/// A MongoDB client bound to one database.
///
/// The driver pools connections internally; this wrapper adds verified
/// establishment, an explicit closed state and transaction scoping.
/// Clones share the same connection, and closing any clone closes all of
/// them. After [`close`](Self::close) every accessor fails with
/// [`MongoError::ClientClosed`] without touching the network.
#[derive(Clone)]
pub struct MongoClient {
    inner: Arc<ClientInner>,
}

impl MongoClient {
    /// Connect and verify the connection with a ping.
    ///
    /// Establishment follows the configured [`RetryPolicy`](crate::RetryPolicy):
    /// each attempt opens a fresh handle and pings the server, discarding the
    /// handle if the ping fails. `cancel` interrupts the backoff sleeps and
    /// any in-flight attempt.
    pub async fn connect(config: MongoConfig, cancel: &CancellationToken) -> MongoResult<Self> {
        let options = config.to_client_options().await?;
        let database_name = config.database.clone();
        let ping_timeout = config.socket_timeout;

        let connection = retry_with_backoff(&config.retry, cancel, "connect", |attempt| {
            let options = options.clone();
            let database_name = database_name.clone();
            async move {
                let client = Client::with_options(options)
                    .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;
                let database = client.database(&database_name);

                match ping(&database, ping_timeout).await {
                    Ok(()) => Ok(Connection { client, database }),
                    Err(e) => {
                        debug!(attempt, "Discarding client after failed ping");
                        drop(database);
                        drop(client);
                        Err(e)
                    }
                }
            }
        })
        .await?;

        info!(
            uri = %config.uri,
            database = %config.database,
            "MongoDB client connected"
        );

        Ok(Self::from_connection(connection, config))
    }

    /// Connect with a token that is never cancelled.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        Self::connect(config, &CancellationToken::new()).await
    }

    /// Build a client without contacting the server.
    ///
    /// The driver connects lazily on first use, so a bad address only
    /// surfaces on the first operation.
    pub async fn unverified(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;
        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;
        let database = client.database(&config.database);
        debug!(database = %config.database, "MongoDB client created without verification");
        Ok(Self::from_connection(Connection { client, database }, config))
    }

    fn from_connection(connection: Connection, config: MongoConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                state: RwLock::new(Some(connection)),
                config,
            }),
        }
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    fn connection(&self) -> MongoResult<Connection> {
        self.inner
            .state
            .read()
            .as_ref()
            .cloned()
            .ok_or(MongoError::ClientClosed)
    }

    /// The configured database.
    pub fn database(&self) -> MongoResult<Database> {
        Ok(self.connection()?.database)
    }

    /// A collection of BSON documents.
    pub fn collection(&self, name: &str) -> MongoResult<Collection<Document>> {
        Ok(self.connection()?.database.collection(name))
    }

    /// The underlying driver client.
    pub fn client(&self) -> MongoResult<Client> {
        Ok(self.connection()?.client)
    }

    /// The configuration the client was built from.
    pub fn config(&self) -> &MongoConfig {
        &self.inner.config
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.state.read().is_none()
    }

    /// Close the client. Closing an already closed client is a no-op.
    pub async fn close(&self) {
        let taken = self.inner.state.write().take();
        match taken {
            Some(Connection { client, database }) => {
                drop(database);
                client.shutdown().await;
                info!(database = %self.inner.config.database, "MongoDB client closed");
            }
            None => debug!("MongoDB client already closed"),
        }
    }

    /// List all collection names in the database.
    pub async fn list_collections(&self) -> MongoResult<Vec<String>> {
        let names = self.database()?.list_collection_names(None).await?;
        Ok(names)
    }

    /// Drop a collection.
    pub async fn drop_collection(&self, name: &str) -> MongoResult<()> {
        debug!(collection = %name, "Dropping collection");
        self.collection(name)?.drop(None).await?;
        Ok(())
    }

    /// Create an index on a collection and return its name.
    pub async fn create_index(&self, collection: &str, model: IndexModel) -> MongoResult<String> {
        let result = self
            .collection(collection)?
            .create_index(model, None)
            .await?;
        Ok(result.index_name)
    }

    /// Run a database command.
    pub async fn run_command(&self, command: Document) -> MongoResult<Document> {
        let result = self.database()?.run_command(command, None).await?;
        Ok(result)
    }

    /// Run `f` inside a transaction.
    ///
    /// `f` receives the session-bound handle; only operations issued through
    /// it participate. The transaction commits when `f` succeeds and is
    /// aborted when `f` or the commit fails. A closed client fails before a
    /// session is started.
    ///
    /// ```rust,ignore
    /// let id = client
    ///     .with_transaction(|tx| {
    ///         Box::pin(async move {
    ///             let id = tx.insert_one("orders", doc! { "total": 10 }).await?;
    ///             tx.update_one("stock", doc! { "sku": "A1" }, doc! { "$inc": { "qty": -1 } }).await?;
    ///             Ok(id)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_transaction<F, T>(&self, f: F) -> MongoResult<T>
    where
        F: for<'s> FnOnce(&'s mut TransactionSession) -> BoxFuture<'s, MongoResult<T>>,
        T: Send,
    {
        let Connection { client, database } = self.connection()?;

        let mut session = client.start_session(None).await?;
        session
            .start_transaction(None)
            .await
            .map_err(|e| MongoError::transaction(format!("failed to start transaction: {}", e)))?;

        let mut tx = TransactionSession::new(session, database);
        let outcome = match f(&mut tx).await {
            Ok(value) => tx.commit().await.map(|()| value),
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            warn!(error = %err, "Rolling back transaction");
            if let Err(abort_err) = tx.abort().await {
                warn!(error = %abort_err, "Transaction rollback failed");
            }
        }

        outcome
    }
}

/// Ping `database`, bounded by `limit` when set.
async fn ping(database: &Database, limit: Option<Duration>) -> MongoResult<()> {
    let ping = database.run_command(doc! { "ping": 1 }, None);
    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, ping)
            .await
            .map_err(|_| MongoError::Timeout(limit.as_millis() as u64))?,
        None => ping.await,
    };
    result
        .map(|_| ())
        .map_err(|e| MongoError::connection(format!("ping failed: {}", e)))
}

/// Builder for MongoClient.
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    min_pool_size: Option<u32>,
    connect_timeout: Option<Duration>,
    max_retries: Option<u32>,
    direct_connection: Option<bool>,
}

impl MongoClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the number of connection retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    fn into_config(self) -> MongoResult<MongoConfig> {
        let mut config_builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            config_builder = config_builder.uri(uri);
        }

        if let Some(database) = self.database {
            config_builder = config_builder.database(database);
        }

        if let Some(app_name) = self.app_name {
            config_builder = config_builder.app_name(app_name);
        }

        if let Some(max_pool) = self.max_pool_size {
            config_builder = config_builder.max_pool_size(max_pool);
        }

        if let Some(min_pool) = self.min_pool_size {
            config_builder = config_builder.min_pool_size(min_pool);
        }

        if let Some(timeout) = self.connect_timeout {
            config_builder = config_builder.connect_timeout(timeout);
        }

        if let Some(retries) = self.max_retries {
            config_builder = config_builder.max_retries(retries);
        }

        if let Some(direct) = self.direct_connection {
            config_builder = config_builder.direct_connection(direct);
        }

        config_builder.build()
    }

    /// Connect, honoring `cancel` during establishment.
    pub async fn connect(self, cancel: &CancellationToken) -> MongoResult<MongoClient> {
        MongoClient::connect(self.into_config()?, cancel).await
    }

    /// Connect without cancellation.
    pub async fn build(self) -> MongoResult<MongoClient> {
        self.connect(&CancellationToken::new()).await
    }
}
