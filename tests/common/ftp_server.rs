//! Minimal FTP server for integration tests.
//!
//! Serves a fixed set of files from memory over passive-mode data
//! connections. Supports USER, PASS, TYPE, CWD, EPSV, PASV, RETR and QUIT.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::net::tcp::OwnedWriteHalf;

#[derive(Debug, Clone, Copy)]
pub struct FtpServerOptions {
    /// If false, EPSV is answered with 502 and the client must use PASV.
    pub epsv: bool,
}

impl Default for FtpServerOptions {
    fn default() -> Self {
        Self { epsv: true }
    }
}

pub struct MockFtp {
    /// Base URL, e.g. "ftp://127.0.0.1:2121"
    pub url: String,
    /// Every USER/PASS pair the server has accepted
    pub logins: Arc<Mutex<Vec<(String, String)>>>,
}

/// Serve `files`, keyed by absolute path such as "/pub/c.bin".
pub async fn start(files: HashMap<String, Vec<u8>>) -> MockFtp {
    start_with_options(files, FtpServerOptions::default()).await
}

pub async fn start_with_options(files: HashMap<String, Vec<u8>>, opts: FtpServerOptions) -> MockFtp {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files = Arc::new(files);
    let logins = Arc::new(Mutex::new(Vec::new()));

    let accepted = Arc::clone(&logins);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let files = Arc::clone(&files);
            let logins = Arc::clone(&accepted);
            tokio::spawn(async move {
                let _ = session(stream, &files, &logins, opts).await;
            });
        }
    });

    MockFtp {
        url: format!("ftp://127.0.0.1:{port}"),
        logins,
    }
}

async fn reply(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(format!("{line}\r\n").as_bytes()).await
}

async fn session(
    stream: TcpStream,
    files: &HashMap<String, Vec<u8>>,
    logins: &Mutex<Vec<(String, String)>>,
    opts: FtpServerOptions,
) -> std::io::Result<()> {
    let (read, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    writer.write_all(b"220-mock FTP server\r\n220 ready\r\n").await?;

    let mut user = String::new();
    let mut cwd = String::from("/");
    let mut passive: Option<TcpListener> = None;

    while let Some(line) = lines.next_line().await? {
        let (verb, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        match verb.to_ascii_uppercase().as_str() {
            "USER" => {
                user = arg.to_string();
                reply(&mut writer, "331 password please").await?;
            }
            "PASS" => {
                logins.lock().unwrap().push((user.clone(), arg.to_string()));
                reply(&mut writer, "230 logged in").await?;
            }
            "TYPE" => reply(&mut writer, "200 type set").await?,
            "CWD" => {
                let dir = join(&cwd, arg);
                let prefix = format!("{dir}/");
                if files.keys().any(|path| path.starts_with(&prefix)) {
                    cwd = dir;
                    reply(&mut writer, "250 directory changed").await?;
                } else {
                    reply(&mut writer, "550 no such directory").await?;
                }
            }
            "EPSV" if opts.epsv => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                reply(&mut writer, &format!("229 Entering Extended Passive Mode (|||{port}|)")).await?;
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                reply(
                    &mut writer,
                    &format!("227 Entering Passive Mode (127,0,0,1,{},{}).", port >> 8, port & 0xff),
                )
                .await?;
            }
            "RETR" => {
                let path = join(&cwd, arg);
                match (files.get(&path), passive.take()) {
                    (Some(body), Some(listener)) => {
                        reply(&mut writer, "150 opening data connection").await?;
                        let (mut data, _) = listener.accept().await?;
                        data.write_all(body).await?;
                        data.shutdown().await?;
                        drop(data);
                        reply(&mut writer, "226 transfer complete").await?;
                    }
                    (None, _) => reply(&mut writer, "550 no such file").await?,
                    (Some(_), None) => reply(&mut writer, "425 use PASV first").await?,
                }
            }
            "QUIT" => {
                reply(&mut writer, "221 bye").await?;
                break;
            }
            _ => reply(&mut writer, "502 command not implemented").await?,
        }
    }

    Ok(())
}

fn join(cwd: &str, name: &str) -> String {
    if name.starts_with('/') {
        return name.trim_end_matches('/').to_string();
    }
    format!("{}/{}", cwd.trim_end_matches('/'), name)
}
