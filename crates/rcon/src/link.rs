use {
    async_trait::async_trait,
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use gamebridge_metrics::{counter, histogram, rcon as rcon_metrics};

use crate::{Error, Result, tcp::TcpDialer};

/// Anything that can run a remote command and return its textual response.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> Result<String>;
}

/// A single established session with the command endpoint.
#[async_trait]
pub trait CommandConnection: Send {
    async fn execute(&mut self, command: &str) -> Result<String>;
    async fn close(&mut self) -> Result<()>;
}

/// Opens new sessions with the command endpoint.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Connection: CommandConnection + 'static;

    async fn dial(&self) -> Result<Self::Connection>;

    /// Human-readable endpoint, used in logs.
    fn endpoint(&self) -> &str;
}

/// Shared, serialized, auto-reconnecting command link.
///
/// Exactly one command is in flight at a time; concurrent callers queue on the
/// internal lock. A command that fails on an established connection triggers a
/// single redial and a single retry. A second failure is returned to the
/// caller and the connection slot is left empty so the next call redials.
pub struct RemoteCommandLink<D: Dialer = TcpDialer> {
    dialer: D,
    conn: Mutex<Option<D::Connection>>,
}

impl<D: Dialer> RemoteCommandLink<D> {
    pub fn new(dialer: D) -> Self {
        Self {
            dialer,
            conn: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.dialer.endpoint()
    }

    /// Run `command`, dialing or redialing as needed.
    pub async fn execute(&self, command: &str) -> Result<String> {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let result = self.execute_serialized(command).await;

        #[cfg(feature = "metrics")]
        {
            counter!(rcon_metrics::COMMANDS_TOTAL).increment(1);
            histogram!(rcon_metrics::COMMAND_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
            if result.is_err() {
                counter!(rcon_metrics::ERRORS_TOTAL).increment(1);
            }
        }

        result
    }

    /// Close the current connection, if any.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.conn.lock().await;
        match slot.take() {
            Some(mut conn) => {
                debug!(endpoint = self.endpoint(), "closing rcon connection");
                conn.close().await
            },
            None => Ok(()),
        }
    }

    /// Whether a connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    async fn execute_serialized(&self, command: &str) -> Result<String> {
        let mut slot = self.conn.lock().await;

        // The connection is taken out of the slot for the duration of the
        // command and only put back on success, so an abandoned or failed
        // call never leaves a half-read session behind.
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.dial().await?,
        };

        let first_error = match conn.execute(command).await {
            Ok(response) => {
                *slot = Some(conn);
                return Ok(response);
            },
            Err(e) if !e.is_connection_fault() => {
                *slot = Some(conn);
                return Err(e);
            },
            Err(e) => e,
        };

        warn!(
            endpoint = self.endpoint(),
            error = %first_error,
            "rcon command failed, reconnecting"
        );
        if let Err(e) = conn.close().await {
            debug!(endpoint = self.endpoint(), error = %e, "closing stale rcon connection");
        }
        drop(conn);

        let mut conn = self.dial().await.map_err(Error::reconnect)?;
        match conn.execute(command).await {
            Ok(response) => {
                *slot = Some(conn);
                Ok(response)
            },
            Err(e) => {
                if let Err(close_err) = conn.close().await {
                    debug!(endpoint = self.endpoint(), error = %close_err, "closing failed rcon connection");
                }
                Err(Error::retry_failed(e))
            },
        }
    }

    async fn dial(&self) -> Result<D::Connection> {
        #[cfg(feature = "metrics")]
        counter!(rcon_metrics::DIALS_TOTAL).increment(1);

        let conn = self.dialer.dial().await?;
        debug!(endpoint = self.endpoint(), "rcon connected");
        Ok(conn)
    }
}

#[async_trait]
impl<D: Dialer> CommandExecutor for RemoteCommandLink<D> {
    async fn execute(&self, command: &str) -> Result<String> {
        RemoteCommandLink::execute(self, command).await
    }
}
