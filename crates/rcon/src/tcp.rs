//! RCON over TCP.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tokio::{io::AsyncWriteExt, net::TcpStream, time::timeout},
    tracing::debug,
};

use crate::{
    Error, Result,
    link::{CommandConnection, Dialer},
    packet::{
        AUTH_FAILED_ID, MAX_COMMAND_LEN, Packet, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE,
        SERVERDATA_EXECCOMMAND, SERVERDATA_RESPONSE_VALUE, read_packet, write_packet,
    },
};

pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Dials authenticated RCON sessions.
pub struct TcpDialer {
    addr: String,
    password: Secret<String>,
    dial_timeout: Duration,
    command_timeout: Duration,
}

impl TcpDialer {
    pub fn new(addr: impl Into<String>, password: Secret<String>) -> Self {
        Self {
            addr: addr.into(),
            password,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, dial: Duration, command: Duration) -> Self {
        self.dial_timeout = dial;
        self.command_timeout = command;
        self
    }
}

impl std::fmt::Debug for TcpDialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpDialer")
            .field("addr", &self.addr)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Connection = RconConnection;

    async fn dial(&self) -> Result<RconConnection> {
        RconConnection::connect(
            &self.addr,
            self.password.expose_secret(),
            self.dial_timeout,
            self.command_timeout,
        )
        .await
    }

    fn endpoint(&self) -> &str {
        &self.addr
    }
}

/// One authenticated RCON session.
pub struct RconConnection {
    stream: TcpStream,
    next_id: i32,
    command_timeout: Duration,
}

impl RconConnection {
    pub async fn connect(
        addr: &str,
        password: &str,
        dial_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self> {
        let stream = timeout(dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::Timeout {
                operation: "dial",
                timeout: dial_timeout,
            })?
            .map_err(|source| Error::Connect {
                addr: addr.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            stream,
            next_id: 1,
            command_timeout,
        };

        timeout(command_timeout, conn.authenticate(addr, password))
            .await
            .map_err(|_| Error::Timeout {
                operation: "authentication",
                timeout: command_timeout,
            })??;

        Ok(conn)
    }

    fn next_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    async fn authenticate(&mut self, addr: &str, password: &str) -> Result<()> {
        let id = self.next_id();
        write_packet(&mut self.stream, &Packet::new(id, SERVERDATA_AUTH, password)).await?;

        loop {
            let packet = read_packet(&mut self.stream).await?;
            match packet.kind {
                SERVERDATA_AUTH_RESPONSE if packet.id == AUTH_FAILED_ID => {
                    return Err(Error::AuthRejected {
                        addr: addr.to_string(),
                    });
                },
                SERVERDATA_AUTH_RESPONSE if packet.id == id => return Ok(()),
                SERVERDATA_AUTH_RESPONSE => {
                    return Err(Error::protocol(format!(
                        "auth response for id {} while waiting for {id}",
                        packet.id
                    )));
                },
                // Source servers send an empty response value ahead of the
                // auth response.
                _ => continue,
            }
        }
    }

    async fn run(&mut self, command: &str) -> Result<String> {
        let id = self.next_id();
        write_packet(
            &mut self.stream,
            &Packet::new(id, SERVERDATA_EXECCOMMAND, command),
        )
        .await?;

        loop {
            let packet = read_packet(&mut self.stream).await?;
            if packet.id == AUTH_FAILED_ID {
                return Err(Error::protocol("server revoked authentication"));
            }
            if packet.id == id && packet.kind == SERVERDATA_RESPONSE_VALUE {
                return Ok(packet.body);
            }
            debug!(
                expected = id,
                got = packet.id,
                "skipping unrelated rcon packet"
            );
        }
    }
}

#[async_trait]
impl CommandConnection for RconConnection {
    async fn execute(&mut self, command: &str) -> Result<String> {
        if command.len() > MAX_COMMAND_LEN {
            return Err(Error::CommandTooLong {
                len: command.len(),
                max: MAX_COMMAND_LEN,
            });
        }
        let command_timeout = self.command_timeout;
        timeout(command_timeout, self.run(command))
            .await
            .map_err(|_| Error::Timeout {
                operation: "command",
                timeout: command_timeout,
            })?
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
