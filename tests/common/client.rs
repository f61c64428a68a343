//! Test WebSocket client.
//!
//! Sends requests with generated correlation ids and separates replies from
//! pushed events. Events that arrive while waiting for a reply are buffered
//! so ordering assertions can still see them.

use bidstage_proto::{ClientCommand, Event, Reply, Request, ServerFrame};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A test WebSocket client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    events: VecDeque<Event>,
}

impl TestClient {
    /// Connect presenting `origin` in the handshake.
    pub async fn connect(url: &str, origin: &str) -> anyhow::Result<Self> {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert("Origin", HeaderValue::from_str(origin)?);
        let (ws, _) = connect_async(request).await?;
        Ok(Self {
            ws,
            next_id: 0,
            events: VecDeque::new(),
        })
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    async fn recv_frame(&mut self, dur: Duration) -> anyhow::Result<ServerFrame> {
        loop {
            let msg = timeout(dur, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match msg {
                Message::Text(text) => return Ok(text.parse()?),
                Message::Close(_) => anyhow::bail!("connection closed"),
                _ => continue,
            }
        }
    }

    /// Receive the next reply, buffering any events that arrive first.
    pub async fn recv_reply(&mut self) -> anyhow::Result<Reply> {
        loop {
            match self.recv_frame(RECV_TIMEOUT).await? {
                ServerFrame::Reply(reply) => return Ok(reply),
                ServerFrame::Event(event) => self.events.push_back(event),
            }
        }
    }

    /// Send a command and wait for its reply.
    pub async fn request(&mut self, command: ClientCommand) -> anyhow::Result<Reply> {
        self.next_id += 1;
        let id = self.next_id.to_string();
        self.send_raw(&Request::new(id.clone(), command).to_text())
            .await?;
        loop {
            let reply = self.recv_reply().await?;
            if reply.id.as_deref() == Some(id.as_str()) {
                return Ok(reply);
            }
        }
    }

    /// Send a command and decode its successful reply data.
    pub async fn call<T: DeserializeOwned>(&mut self, command: ClientCommand) -> anyhow::Result<T> {
        let reply = self.request(command).await?;
        if let Some(error) = reply.error {
            anyhow::bail!("{}: {}", error.code, error.message);
        }
        Ok(serde_json::from_value(reply.data.unwrap_or_default())?)
    }

    /// Send a command and return its error code.
    pub async fn call_err(&mut self, command: ClientCommand) -> anyhow::Result<String> {
        let reply = self.request(command).await?;
        reply
            .error
            .map(|e| e.code)
            .ok_or_else(|| anyhow::anyhow!("expected an error reply"))
    }

    /// Wait for the next event named `name`, skipping others.
    pub async fn next_event(&mut self, name: &str) -> anyhow::Result<Event> {
        while let Some(event) = self.events.pop_front() {
            if event.event == name {
                return Ok(event);
            }
        }
        loop {
            match self.recv_frame(RECV_TIMEOUT).await? {
                ServerFrame::Event(event) if event.event == name => return Ok(event),
                _ => continue,
            }
        }
    }

    /// Every event received so far plus anything arriving within `dur`.
    pub async fn drain_events(&mut self, dur: Duration) -> Vec<Event> {
        while let Ok(frame) = self.recv_frame(dur).await {
            if let ServerFrame::Event(event) = frame {
                self.events.push_back(event);
            }
        }
        self.events.drain(..).collect()
    }

    /// Authenticate with a bearer token.
    pub async fn auth(&mut self, token: &str) -> anyhow::Result<()> {
        let reply = self
            .request(ClientCommand::Auth {
                credential: token.to_string(),
            })
            .await?;
        match reply.error {
            Some(error) => anyhow::bail!("auth failed: {}", error.code),
            None => Ok(()),
        }
    }
}

/// Decode an event payload.
#[allow(dead_code)]
pub fn payload<T: DeserializeOwned>(event: &Event) -> anyhow::Result<T> {
    Ok(serde_json::from_value(event.payload.clone())?)
}
