//! Minimal async SMTP submission client.
//!
//! Speaks just enough of the protocol for takedown notices routed
//! through an internal relay: EHLO, optional AUTH PLAIN, MAIL FROM,
//! RCPT TO, DATA with dot-stuffing, QUIT. Every exchange is bounded by
//! a per-step timeout. STARTTLS is intentionally not implemented.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::errors::{Result, TakedownError};

/// SMTP relay settings, one per connector.
#[derive(Debug, Clone, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.from.is_empty()
    }
}

/// Outbound mail client shared by the email-based connectors.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: SmtpConfig,
    step_timeout: Duration,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config,
            step_timeout: Duration::from_secs(15),
        }
    }

    pub fn from_address(&self) -> &str {
        &self.config.from
    }

    /// Send a `text/plain; charset=UTF-8` message.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if !self.config.is_configured() {
            return Err(TakedownError::smtp(
                "<unconfigured>",
                "SMTP host/from not configured",
            ));
        }

        let server = format!("{}:{}", self.config.host, self.config.port);
        debug!(%server, %to, "SMTP submission");

        let stream = timeout(self.step_timeout, TcpStream::connect(&server))
            .await
            .map_err(|_| TakedownError::smtp(&server, "connect timeout"))?
            .map_err(|e| TakedownError::smtp(&server, format!("connect error: {e}")))?;

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        self.expect(&mut reader, &server, 220).await?;

        self.command(&mut write_half, &server, "EHLO takedown.local")
            .await?;
        self.expect(&mut reader, &server, 250).await?;

        if !self.config.username.is_empty() {
            let token = BASE64.encode(format!(
                "\0{}\0{}",
                self.config.username, self.config.password
            ));
            self.command(&mut write_half, &server, &format!("AUTH PLAIN {token}"))
                .await?;
            self.expect(&mut reader, &server, 235).await?;
        }

        self.command(
            &mut write_half,
            &server,
            &format!("MAIL FROM:<{}>", self.config.from),
        )
        .await?;
        self.expect(&mut reader, &server, 250).await?;

        self.command(&mut write_half, &server, &format!("RCPT TO:<{to}>"))
            .await?;
        self.expect(&mut reader, &server, 250).await?;

        self.command(&mut write_half, &server, "DATA").await?;
        self.expect(&mut reader, &server, 354).await?;

        let message = format_message(&self.config.from, to, subject, body);
        timeout(self.step_timeout, write_half.write_all(message.as_bytes()))
            .await
            .map_err(|_| TakedownError::smtp(&server, "write timeout"))?
            .map_err(|e| TakedownError::smtp(&server, format!("write error: {e}")))?;
        self.expect(&mut reader, &server, 250).await?;

        self.command(&mut write_half, &server, "QUIT").await?;
        Ok(())
    }

    async fn command<W: AsyncWriteExt + Unpin>(
        &self,
        writer: &mut W,
        server: &str,
        line: &str,
    ) -> Result<()> {
        let full = format!("{line}\r\n");
        timeout(self.step_timeout, writer.write_all(full.as_bytes()))
            .await
            .map_err(|_| TakedownError::smtp(server, "write timeout"))?
            .map_err(|e| TakedownError::smtp(server, format!("write error: {e}")))
    }

    /// Read one (possibly multi-line) reply and check its status code.
    async fn expect<R: AsyncBufReadExt + Unpin>(
        &self,
        reader: &mut R,
        server: &str,
        expected: u16,
    ) -> Result<()> {
        loop {
            let mut line = String::new();
            let read = timeout(self.step_timeout, reader.read_line(&mut line))
                .await
                .map_err(|_| TakedownError::smtp(server, "read timeout"))?
                .map_err(|e| TakedownError::smtp(server, format!("read error: {e}")))?;
            if read == 0 {
                return Err(TakedownError::smtp(server, "connection closed"));
            }
            if line.len() < 4 {
                return Err(TakedownError::smtp(server, format!("short reply: {line:?}")));
            }
            let code: u16 = line[..3]
                .parse()
                .map_err(|_| TakedownError::smtp(server, format!("bad reply: {line:?}")))?;
            // "250-..." continues a multi-line reply; "250 ..." ends it.
            let last = line.as_bytes()[3] != b'-';
            if last {
                if code != expected {
                    return Err(TakedownError::smtp(
                        server,
                        format!("expected {expected}, got: {}", line.trim_end()),
                    ));
                }
                return Ok(());
            }
        }
    }
}

/// RFC 5322 message with dot-stuffed body and terminating `.` line.
fn format_message(from: &str, to: &str, subject: &str, body: &str) -> String {
    let mut stuffed = String::with_capacity(body.len() + 8);
    for line in body.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.starts_with('.') {
            stuffed.push('.');
        }
        stuffed.push_str(line);
        stuffed.push_str("\r\n");
    }
    format!(
        "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{stuffed}.\r\n"
    )
}
