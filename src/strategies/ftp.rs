//! FTP transport: passive-mode `RETR` over a line-framed control connection
//!
//! Logs in with the URL's credentials, or as `anonymous` when the URL has
//! none, switches to binary mode, changes into each directory of the URL
//! path, and hands back the data connection as the reader. The control
//! connection stays open inside the reader until it is dropped.

use async_trait::async_trait;
use futures::StreamExt;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::debug;
use url::Url;

use super::transport::{ByteReader, StreamTransport, TransportError};

const ANONYMOUS_USER: &str = "anonymous";
const MAX_REPLY_LINE: usize = 8 * 1024;

/// FTP client configuration
#[derive(Debug, Clone)]
pub struct FtpConfig {
    /// Applies to the control and the data connection
    pub connect_timeout: Duration,
    /// Password sent for anonymous logins
    pub anonymous_password: String,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            anonymous_password: "anonymous@".to_string(),
        }
    }
}

/// Transport for `ftp://` URLs
#[derive(Debug, Clone, Default)]
pub struct FtpTransport {
    config: FtpConfig,
}

impl FtpTransport {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    async fn connect(&self, addr: impl tokio::net::ToSocketAddrs, what: &str) -> Result<TcpStream, TransportError> {
        match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(TransportError::Connection(format!("{what} connection failed: {e}"))),
            Err(_) => Err(TransportError::Connection(format!("{what} connection timed out"))),
        }
    }

    async fn login(&self, control: &mut Control, url: &Url) -> Result<(), TransportError> {
        let (user, password) = if url.username().is_empty() {
            (
                Cow::Borrowed(ANONYMOUS_USER),
                Cow::Borrowed(self.config.anonymous_password.as_str()),
            )
        } else {
            (
                decode(url.username())?,
                decode(url.password().unwrap_or_default())?,
            )
        };

        let reply = control.command(&format!("USER {user}"), "USER").await?;
        match reply.code {
            230 => Ok(()),
            331 | 332 => control
                .expect_hidden(&format!("PASS {password}"), "PASS", &[202, 230])
                .await
                .map(|_| ()),
            _ => Err(reply.rejected("USER")),
        }
    }
}

#[async_trait]
impl StreamTransport for FtpTransport {
    async fn open(&self, url: &Url) -> Result<ByteReader, TransportError> {
        if url.scheme() != "ftp" {
            return Err(TransportError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportError::Connection(format!("{url} has no host")))?;
        let port = url.port_or_known_default().unwrap_or(21);
        let (directories, file) = remote_path(url)?;

        debug!(%url, "Opening FTP session");

        let stream = self.connect((host, port), "control").await?;
        let server_ip = stream
            .peer_addr()
            .map_err(|e| TransportError::Connection(format!("control connection lost: {e}")))?
            .ip();
        let mut control = Control::new(stream);

        control.expect_greeting().await?;
        self.login(&mut control, url).await?;
        control.expect("TYPE I", &[200]).await?;
        for dir in &directories {
            control.expect(&format!("CWD {dir}"), &[250]).await?;
        }

        let port = control.passive_port().await?;
        // The advertised host is ignored: servers behind NAT report private addresses.
        let data = self.connect(SocketAddr::new(server_ip, port), "data").await?;
        control.expect(&format!("RETR {file}"), &[125, 150]).await?;

        Ok(Box::new(FtpDownload {
            data,
            _control: control,
        }))
    }
}

/// Decoded directory segments and file name of the URL path
fn remote_path(url: &Url) -> Result<(Vec<String>, String), TransportError> {
    let mut segments = url
        .path_segments()
        .map(|segments| segments.collect::<Vec<_>>())
        .unwrap_or_default();

    let file = match segments.pop() {
        Some(name) if !name.is_empty() => decode(name)?.into_owned(),
        _ => return Err(TransportError::Connection(format!("{url} names no file"))),
    };

    let directories = segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| decode(s).map(Cow::into_owned))
        .collect::<Result<_, _>>()?;

    Ok((directories, file))
}

fn decode(raw: &str) -> Result<Cow<'_, str>, TransportError> {
    urlencoding::decode(raw).map_err(|e| TransportError::Connection(format!("undecodable url component: {e}")))
}

/// One server reply; multi-line texts are joined with `\n`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    fn rejected(self, command: &str) -> TransportError {
        TransportError::FtpReply {
            command: command.to_string(),
            code: self.code,
            message: self.text,
        }
    }
}

struct Control {
    replies: FramedRead<OwnedReadHalf, LinesCodec>,
    writer: OwnedWriteHalf,
}

impl Control {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            replies: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_REPLY_LINE)),
            writer,
        }
    }

    async fn expect_greeting(&mut self) -> Result<(), TransportError> {
        let reply = self.read_reply().await?;
        if reply.code != 220 {
            return Err(reply.rejected("connect"));
        }
        Ok(())
    }

    async fn expect(&mut self, command: &str, accepted: &[u16]) -> Result<Reply, TransportError> {
        let verb = command.split(' ').next().unwrap_or(command);
        self.expect_hidden(command, verb, accepted).await
    }

    /// Like [`expect`](Self::expect), naming the command only by `verb` in
    /// logs and errors
    async fn expect_hidden(&mut self, command: &str, verb: &str, accepted: &[u16]) -> Result<Reply, TransportError> {
        let reply = self.command(command, verb).await?;
        if accepted.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(reply.rejected(verb))
        }
    }

    async fn command(&mut self, command: &str, verb: &str) -> Result<Reply, TransportError> {
        self.writer
            .write_all(format!("{command}\r\n").as_bytes())
            .await
            .map_err(|e| TransportError::Connection(format!("cannot send {verb}: {e}")))?;

        let reply = self.read_reply().await?;
        debug!(command = verb, code = reply.code, "FTP reply");
        Ok(reply)
    }

    async fn read_reply(&mut self) -> Result<Reply, TransportError> {
        let first = self.next_line().await?;
        let code = reply_code(&first)?;
        let mut text = first.get(4..).unwrap_or_default().to_string();

        if first.as_bytes().get(3) == Some(&b'-') {
            let last_prefix = format!("{code} ");
            loop {
                let line = self.next_line().await?;
                let done = line.starts_with(&last_prefix) || line == code.to_string();
                text.push('\n');
                text.push_str(line.strip_prefix(&last_prefix).unwrap_or(&line));
                if done {
                    break;
                }
            }
        }

        Ok(Reply { code, text })
    }

    async fn next_line(&mut self) -> Result<String, TransportError> {
        match self.replies.next().await {
            Some(Ok(line)) => Ok(line),
            Some(Err(e)) => Err(TransportError::Connection(format!("unreadable control reply: {e}"))),
            None => Err(TransportError::Connection("control connection closed".to_string())),
        }
    }

    /// Ask for a passive data port, `EPSV` first and `PASV` as fallback
    async fn passive_port(&mut self) -> Result<u16, TransportError> {
        let reply = self.command("EPSV", "EPSV").await?;
        if reply.code == 229 {
            return epsv_port(&reply.text).ok_or_else(|| reply.rejected("EPSV"));
        }

        let reply = self.expect("PASV", &[227]).await?;
        pasv_port(&reply.text).ok_or_else(|| reply.rejected("PASV"))
    }
}

fn reply_code(line: &str) -> Result<u16, TransportError> {
    line.get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| TransportError::Connection(format!("malformed FTP reply: {line:?}")))
}

/// Port from `Entering Extended Passive Mode (|||6446|)`
fn epsv_port(text: &str) -> Option<u16> {
    let inner = text.split_once('(')?.1.split_once(')')?.0;
    let delimiter = inner.chars().next()?;
    inner.split(delimiter).nth(3)?.parse().ok()
}

/// Port from `Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
fn pasv_port(text: &str) -> Option<u16> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let numbers = text[start..]
        .split(',')
        .take(6)
        .map(|part| part.trim_matches(|c: char| !c.is_ascii_digit()).parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;

    match numbers[..] {
        [_, _, _, _, high, low] => Some((u16::from(high) << 8) | u16::from(low)),
        _ => None,
    }
}

/// Data connection of a running `RETR`
struct FtpDownload {
    data: TcpStream,
    _control: Control,
}

impl AsyncRead for FtpDownload {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}
