use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{Connection, ConnectionConfig, ConnectionId};
use crate::services::database::DatabaseAdapter;

/// Owns the single active connection slot.
///
/// Writers hold the slot lock for the whole teardown-then-setup sequence, so
/// readers only ever observe no connection or a fully established one.
pub struct ConnectionService {
    db: Arc<dyn DatabaseAdapter>,
    active: RwLock<Option<Connection>>,
}

impl ConnectionService {
    pub fn new(db: Arc<dyn DatabaseAdapter>) -> Self {
        Self {
            db,
            active: RwLock::new(None),
        }
    }

    /// Connect to `config`, replacing any active connection
    pub async fn connect(&self, config: ConnectionConfig) -> Result<Connection, AppError> {
        let target = config.to_display_safe_string();
        tracing::info!(server = %target, "Connecting to database");

        let mut slot = self.active.write().await;
        if let Some(mut previous) = slot.take() {
            tracing::info!(connection_id = %previous.id(), "Disconnecting existing connection");
            self.close(&mut previous).await;
        }

        let mut connection = Connection::new(config);
        match self.db.connect(connection.config()).await {
            Ok(()) => {
                connection.mark_established();
                tracing::info!(
                    connection_id = %connection.id(),
                    server = %target,
                    database_type = self.db.database_type(),
                    "Connection established"
                );
                *slot = Some(connection.clone());
                Ok(connection)
            }
            Err(e) => {
                connection.mark_failed(e.to_string());
                tracing::error!(server = %target, error = %e, "Connection failed");
                Err(match e {
                    AppError::ConnectionFailed { .. } => e,
                    other => AppError::connection_failed(
                        connection.config().host(),
                        connection.config().port(),
                        other,
                    ),
                })
            }
        }
    }

    /// Close the active connection if `id` names it.
    ///
    /// Returns false when `id` is not the active connection. Adapter errors are
    /// logged and the slot is cleared regardless.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let mut slot = self.active.write().await;
        match slot.as_ref() {
            Some(connection) if connection.id() == id => {}
            _ => {
                tracing::warn!(connection_id = %id, "Attempted to disconnect non-active connection");
                return false;
            }
        }

        if let Some(mut connection) = slot.take() {
            self.close(&mut connection).await;
        }
        true
    }

    pub async fn active_connection(&self) -> Option<Connection> {
        self.active
            .read()
            .await
            .as_ref()
            .filter(|connection| connection.is_connected())
            .cloned()
    }

    /// Id of the active connection, or `NotConnected`
    pub async fn require_active(&self) -> Result<ConnectionId, AppError> {
        self.active_connection()
            .await
            .map(|connection| connection.id())
            .ok_or(AppError::NotConnected)
    }

    pub async fn test_connection(&self, config: &ConnectionConfig) -> bool {
        tracing::debug!(server = %config.to_display_safe_string(), "Testing connection");
        self.db.test_connection(config).await
    }

    async fn close(&self, connection: &mut Connection) {
        if let Err(e) = self.db.disconnect().await {
            tracing::error!(
                connection_id = %connection.id(),
                error = %e,
                "Error during disconnect"
            );
        }
        connection.mark_closed();
        tracing::info!(connection_id = %connection.id(), "Disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionEvent, ConnectionStatus};
    use crate::services::database::mock::MockDatabase;
    use tokio_test::{assert_err, assert_ok};

    fn config(host: &str) -> ConnectionConfig {
        ConnectionConfig::new(host, 5432, "shop", "analyst", "s3cret").unwrap()
    }

    #[tokio::test]
    async fn test_connect_records_active_connection() {
        let db = Arc::new(MockDatabase::new());
        let service = ConnectionService::new(db.clone());

        let connection = assert_ok!(service.connect(config("db.local")).await);
        assert!(connection.is_connected());
        assert!(matches!(
            connection.events(),
            [ConnectionEvent::ConnectionEstablished { .. }]
        ));

        let active = service.active_connection().await.unwrap();
        assert_eq!(active.id(), connection.id());
        assert_eq!(service.require_active().await.unwrap(), connection.id());
        assert_eq!(db.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_carries_host_and_port() {
        let db = Arc::new(MockDatabase::new().failing_connect());
        let service = ConnectionService::new(db);

        let err = assert_err!(service.connect(config("db.local")).await);
        match err {
            AppError::ConnectionFailed { host, port, cause } => {
                assert_eq!(host, "db.local");
                assert_eq!(port, 5432);
                assert!(cause.contains("connection refused"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(service.active_connection().await.is_none());
        assert!(matches!(
            service.require_active().await,
            Err(AppError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_replaces_previous_connection() {
        let db = Arc::new(MockDatabase::new());
        let service = ConnectionService::new(db.clone());

        let first = service.connect(config("first.local")).await.unwrap();
        let second = service.connect(config("second.local")).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(db.disconnect_calls(), 1);
        assert_eq!(db.connect_calls(), 2);
        assert_eq!(
            service.active_connection().await.unwrap().config().host(),
            "second.local"
        );
    }

    #[tokio::test]
    async fn test_disconnect_unknown_id_is_noop() {
        let db = Arc::new(MockDatabase::new());
        let service = ConnectionService::new(db.clone());
        let connection = service.connect(config("db.local")).await.unwrap();

        assert!(!service.disconnect(ConnectionId::generate()).await);
        assert_eq!(db.disconnect_calls(), 0);
        assert_eq!(
            service.active_connection().await.unwrap().id(),
            connection.id()
        );
    }

    #[tokio::test]
    async fn test_disconnect_active_connection() {
        let db = Arc::new(MockDatabase::new());
        let service = ConnectionService::new(db.clone());
        let connection = service.connect(config("db.local")).await.unwrap();

        assert!(service.disconnect(connection.id()).await);
        assert_eq!(db.disconnect_calls(), 1);
        assert!(service.active_connection().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_errors_are_swallowed() {
        let db = Arc::new(MockDatabase::new().failing_disconnect());
        let service = ConnectionService::new(db.clone());
        let connection = service.connect(config("db.local")).await.unwrap();

        assert!(service.disconnect(connection.id()).await);
        assert!(service.active_connection().await.is_none());

        // A failed teardown never blocks the next connect
        let next = service.connect(config("db.local")).await.unwrap();
        assert_eq!(next.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_test_connection_delegates() {
        let service = ConnectionService::new(Arc::new(MockDatabase::new()));
        assert!(service.test_connection(&config("db.local")).await);

        let failing = ConnectionService::new(Arc::new(MockDatabase::new().failing_connect()));
        assert!(!failing.test_connection(&config("db.local")).await);
    }
}
