use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub mod handler;

/// Shared handler state: one repository per service component.
#[derive(Debug)]
pub struct AppState<AR, BR> {
    pub author_repo: Arc<AR>,
    pub book_repo: Arc<BR>,
}

impl<AR: AuthorRepository, BR: BookRepository> AppState<AR, BR> {
    pub fn new(author_repo: AR, book_repo: BR) -> Self {
        Self {
            author_repo: Arc::new(author_repo),
            book_repo: Arc::new(book_repo),
        }
    }
}

impl<AR, BR> Clone for AppState<AR, BR> {
    fn clone(&self) -> Self {
        Self {
            author_repo: Arc::clone(&self.author_repo),
            book_repo: Arc::clone(&self.book_repo),
        }
    }
}

#[derive(Debug)]
pub struct RpcServerConfig {
    host: String,
    port: u16,
}

impl RpcServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Message-pattern RPC server: newline-delimited JSON frames over TCP,
/// each carrying a named command and a payload.
pub struct RpcServer<AR, BR> {
    listener: TcpListener,
    state: AppState<AR, BR>,
}

impl<AR: AuthorRepository, BR: BookRepository> RpcServer<AR, BR> {
    pub async fn new(state: AppState<AR, BR>, config: RpcServerConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(format!("{}:{}", config.host, config.port))
            .await
            .with_context(|| format!("Failed to bind to {}:{}", config.host, config.port))?;

        Ok(Self { listener, state })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self
            .listener
            .local_addr()
            .context("Failed to read local address")?;
        tracing::info!(%addr, "listening for commands");

        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;
            tracing::debug!(%peer, "client connected");

            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_connection(state, stream).await {
                    tracing::warn!(%peer, "connection closed with error: {err:#}");
                }
            });
        }
    }
}

async fn serve_connection<AR: AuthorRepository, BR: BookRepository>(
    state: AppState<AR, BR>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read request frame")?
    {
        if line.trim().is_empty() {
            continue;
        }

        let response = handler::handle_frame(&state, &line).await;
        let mut frame =
            serde_json::to_string(&response).context("Failed to serialize response frame")?;
        frame.push('\n');
        writer
            .write_all(frame.as_bytes())
            .await
            .context("Failed to write response frame")?;
    }

    Ok(())
}
