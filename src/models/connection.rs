use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::EventLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|e| AppError::Validation(format!("Invalid connection id '{}': {}", value, e)))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable connection settings. The password never leaves this type
/// through Debug, Serialize or the display helpers.
#[derive(Clone, Serialize)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    database: String,
    username: String,
    #[serde(skip_serializing)]
    password: String,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u32,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, AppError> {
        let host = host.into();
        let database = database.into();

        if host.trim().is_empty() {
            return Err(AppError::Validation("Host cannot be blank".to_string()));
        }
        if !(1..=65535).contains(&port) {
            return Err(AppError::Validation(
                "Port must be between 1 and 65535".to_string(),
            ));
        }
        if database.trim().is_empty() {
            return Err(AppError::Validation("Database cannot be blank".to_string()));
        }

        Ok(Self {
            host,
            port: port as u16,
            database,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Parse the compact `host[:port]/database` form
    pub fn parse_target(
        target: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        default_port: u16,
    ) -> Result<Self, AppError> {
        let (address, database) = target.split_once('/').ok_or_else(|| {
            AppError::Validation(
                "Missing database name. Use format: host:port/database".to_string(),
            )
        })?;

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u32>().map_err(|_| {
                    AppError::Validation(format!("Invalid port number: {}", port))
                })?;
                (host, port)
            }
            None => (address, u32::from(default_port)),
        };

        Self::new(host, port, database, username, password)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// `user@host:port/database`, without credentials
    pub fn to_display_safe_string(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }

    /// PostgreSQL URL without the password, for diagnostics
    ///
    /// Falls back to plain formatting when the parts do not form a valid URL.
    pub fn to_connection_url(&self) -> String {
        let fallback = || format!("postgresql://{}", self.to_display_safe_string());

        let Ok(mut parsed) = url::Url::parse(&format!(
            "postgresql://{}:{}/{}",
            self.host, self.port, self.database
        )) else {
            return fallback();
        };

        if !self.username.is_empty() && parsed.set_username(&self.username).is_err() {
            return fallback();
        }
        parsed.to_string()
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ConnectionEvent {
    ConnectionEstablished {
        connection_id: ConnectionId,
        config: ConnectionConfig,
        occurred_at: DateTime<Utc>,
    },
    ConnectionFailed {
        connection_id: ConnectionId,
        config: ConnectionConfig,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    ConnectionClosed {
        connection_id: ConnectionId,
        previous_status: ConnectionStatus,
        occurred_at: DateTime<Utc>,
    },
}

impl ConnectionEvent {
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            ConnectionEvent::ConnectionEstablished { connection_id, .. }
            | ConnectionEvent::ConnectionFailed { connection_id, .. }
            | ConnectionEvent::ConnectionClosed { connection_id, .. } => *connection_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ConnectionEvent::ConnectionEstablished { occurred_at, .. }
            | ConnectionEvent::ConnectionFailed { occurred_at, .. }
            | ConnectionEvent::ConnectionClosed { occurred_at, .. } => *occurred_at,
        }
    }
}

/// A database connection and its lifecycle.
///
/// Transitions never fail on their own; reuse of a failed or closed
/// instance is prevented by the connection service, which always builds
/// a fresh `Connection` per attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    id: ConnectionId,
    config: ConnectionConfig,
    status: ConnectionStatus,
    failure_reason: Option<String>,
    connected_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: EventLog<ConnectionEvent>,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            id: ConnectionId::generate(),
            config,
            status: ConnectionStatus::Disconnected,
            failure_reason: None,
            connected_at: None,
            events: EventLog::new(),
        }
    }

    pub fn mark_established(&mut self) {
        let now = Utc::now();
        self.status = ConnectionStatus::Connected;
        self.connected_at = Some(now);
        self.failure_reason = None;
        self.events.record(ConnectionEvent::ConnectionEstablished {
            connection_id: self.id,
            config: self.config.clone(),
            occurred_at: now,
        });
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.status = ConnectionStatus::Failed;
        self.failure_reason = Some(reason.clone());
        self.connected_at = None;
        self.events.record(ConnectionEvent::ConnectionFailed {
            connection_id: self.id,
            config: self.config.clone(),
            reason,
            occurred_at: Utc::now(),
        });
    }

    pub fn mark_closed(&mut self) {
        let previous_status = self.status;
        self.status = ConnectionStatus::Disconnected;
        self.connected_at = None;
        self.events.record(ConnectionEvent::ConnectionClosed {
            connection_id: self.id,
            previous_status,
            occurred_at: Utc::now(),
        });
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    pub fn events(&self) -> &[ConnectionEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<ConnectionEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("localhost", 5432, "shop", "app", "s3cr3t-pw").unwrap()
    }

    #[test]
    fn test_config_rejects_blank_host_and_database() {
        assert!(ConnectionConfig::new("", 5432, "db", "u", "p").is_err());
        assert!(ConnectionConfig::new("   ", 5432, "db", "u", "p").is_err());
        assert!(ConnectionConfig::new("localhost", 5432, "", "u", "p").is_err());
        assert!(ConnectionConfig::new("localhost", 5432, " \t", "u", "p").is_err());
    }

    #[test]
    fn test_config_rejects_out_of_range_port() {
        assert!(ConnectionConfig::new("localhost", 0, "db", "u", "p").is_err());
        assert!(ConnectionConfig::new("localhost", 65536, "db", "u", "p").is_err());
        assert!(ConnectionConfig::new("localhost", 1, "db", "u", "p").is_ok());
        assert!(ConnectionConfig::new("localhost", 65535, "db", "u", "p").is_ok());
    }

    #[test]
    fn test_display_safe_string_hides_password() {
        let config = config();
        let display = config.to_display_safe_string();
        assert_eq!(display, "app@localhost:5432/shop");
        assert!(!display.contains("s3cr3t-pw"));
        assert!(!format!("{:?}", config).contains("s3cr3t-pw"));
        assert!(!config.to_connection_url().contains("s3cr3t-pw"));
        assert!(!serde_json::to_string(&config).unwrap().contains("s3cr3t-pw"));
    }

    #[test]
    fn test_connection_url() {
        assert_eq!(
            config().to_connection_url(),
            "postgresql://app@localhost:5432/shop"
        );

        let spaced = ConnectionConfig::new("localhost", 5432, "shop", "app user", "pw").unwrap();
        assert_eq!(
            spaced.to_connection_url(),
            "postgresql://app%20user@localhost:5432/shop"
        );

        let anonymous = ConnectionConfig::new("localhost", 5432, "shop", "", "pw").unwrap();
        assert_eq!(anonymous.to_connection_url(), "postgresql://localhost:5432/shop");
    }

    #[test]
    fn test_connection_url_falls_back_for_unparseable_host() {
        let config = ConnectionConfig::new("db host", 5432, "shop", "app", "s3cr3t-pw").unwrap();
        let url = config.to_connection_url();
        assert_eq!(url, "postgresql://app@db host:5432/shop");
        assert!(!url.contains("s3cr3t-pw"));
    }

    #[test]
    fn test_parse_target() {
        let parsed = ConnectionConfig::parse_target("db.local:6543/sales", "u", "p", 5432).unwrap();
        assert_eq!(parsed.host(), "db.local");
        assert_eq!(parsed.port(), 6543);
        assert_eq!(parsed.database(), "sales");

        let defaulted = ConnectionConfig::parse_target("db.local/sales", "u", "p", 5432).unwrap();
        assert_eq!(defaulted.port(), 5432);

        assert!(ConnectionConfig::parse_target("db.local", "u", "p", 5432).is_err());
        assert!(ConnectionConfig::parse_target("db.local/", "u", "p", 5432).is_err());
        assert!(ConnectionConfig::parse_target("db.local:abc/sales", "u", "p", 5432).is_err());
    }

    #[test]
    fn test_new_connection_is_disconnected() {
        let connection = Connection::new(config());
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
        assert!(!connection.is_connected());
        assert!(connection.events().is_empty());
    }

    #[test]
    fn test_established_then_closed() {
        let mut connection = Connection::new(config());
        connection.mark_established();

        assert!(connection.is_connected());
        assert!(connection.connected_at().is_some());
        let established: Vec<_> = connection
            .events()
            .iter()
            .filter(|e| matches!(e, ConnectionEvent::ConnectionEstablished { .. }))
            .collect();
        assert_eq!(established.len(), 1);

        connection.mark_closed();
        assert!(!connection.is_connected());
        assert!(connection.connected_at().is_none());
        assert_eq!(connection.events().len(), 2);
        match &connection.events()[1] {
            ConnectionEvent::ConnectionClosed {
                previous_status, ..
            } => assert_eq!(*previous_status, ConnectionStatus::Connected),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_mark_failed_records_reason() {
        let mut connection = Connection::new(config());
        connection.mark_failed("connection refused");

        assert_eq!(connection.status(), ConnectionStatus::Failed);
        assert_eq!(connection.failure_reason(), Some("connection refused"));
        assert!(matches!(
            connection.events()[0],
            ConnectionEvent::ConnectionFailed { .. }
        ));
    }

    #[test]
    fn test_established_clears_failure_reason() {
        let mut connection = Connection::new(config());
        connection.mark_failed("timeout");
        connection.mark_established();
        assert!(connection.failure_reason().is_none());
    }

    #[test]
    fn test_drain_events() {
        let mut connection = Connection::new(config());
        connection.mark_established();
        let drained = connection.drain_events();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].connection_id(), connection.id());
        assert!(connection.events().is_empty());
    }
}
