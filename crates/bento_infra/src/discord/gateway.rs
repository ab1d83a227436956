//! Discord gateway websocket client.
//!
//! Connects, identifies (or resumes), heartbeats at the interval announced
//! in HELLO and forwards decoded dispatches on a channel. A dropped
//! connection is retried after a fixed pause, forever; only close codes
//! that no retry can fix end the loop.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use bento_core::ports::{GatewayError, GatewayEvent, LifecycleNotice};

use super::model::{
    Dispatch, GatewayPayload, Hello, Identify, OP_DISPATCH, OP_HEARTBEAT, OP_HEARTBEAT_ACK,
    OP_HELLO, OP_IDENTIFY, OP_INVALID_SESSION, OP_RECONNECT, OP_RESUME, Resume, decode_dispatch,
};

pub const GATEWAY_URL: &str = "wss://gateway.discord.gg";
pub const GATEWAY_QUERY: &str = "?v=10&encoding=json";
pub const RECONNECT_PAUSE: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Close codes after which reconnecting cannot succeed: authentication
/// failed, invalid shard, sharding required, invalid API version, invalid or
/// disallowed intents.
pub fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}

pub fn heartbeat_frame(seq: Option<u64>) -> String {
    json!({ "op": OP_HEARTBEAT, "d": seq }).to_string()
}

pub fn identify_frame(token: &str) -> String {
    json!({ "op": OP_IDENTIFY, "d": Identify::new(token) }).to_string()
}

pub fn resume_frame(token: &str, session_id: &str, seq: u64) -> String {
    json!({
        "op": OP_RESUME,
        "d": Resume { token, session_id, seq },
    })
    .to_string()
}

pub fn connect_url(base: &str) -> String {
    format!("{}/{GATEWAY_QUERY}", base.trim_end_matches('/'))
}

/// What a resume needs from the previous connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResumeState {
    pub session_id: Option<String>,
    pub resume_url: Option<String>,
    pub seq: Option<u64>,
}

impl ResumeState {
    fn can_resume(&self) -> bool {
        self.session_id.is_some() && self.seq.is_some()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug)]
enum SessionEnd {
    /// Reconnect after the pause.
    Retry(String),
    /// Close code no retry can fix.
    Fatal(u16, String),
    /// Nobody is listening for events any more.
    Shutdown,
}

pub struct GatewayClient {
    url: String,
    token: String,
    reconnect_pause: Duration,
}

impl GatewayClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            url: GATEWAY_URL.to_string(),
            token: token.into(),
            reconnect_pause: RECONNECT_PAUSE,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_reconnect_pause(mut self, pause: Duration) -> Self {
        self.reconnect_pause = pause;
        self
    }

    /// Drive the connection until a fatal close or until `events` is closed.
    pub async fn run(self, events: mpsc::Sender<GatewayEvent>) -> Result<(), GatewayError> {
        let mut resume = ResumeState::default();
        loop {
            let end = self.session(&mut resume, &events).await;
            match end {
                SessionEnd::Shutdown => return Ok(()),
                SessionEnd::Fatal(code, reason) => {
                    error!(code, %reason, "gateway closed permanently");
                    return Err(GatewayError::Status {
                        status: code,
                        body: reason,
                    });
                }
                SessionEnd::Retry(reason) => {
                    warn!(%reason, pause = ?self.reconnect_pause, "gateway connection lost");
                    let notice = LifecycleNotice::Disconnected { reason };
                    if events.send(GatewayEvent::Lifecycle(notice)).await.is_err() {
                        return Ok(());
                    }
                }
            }
            tokio::time::sleep(self.reconnect_pause).await;
            if events
                .send(GatewayEvent::Lifecycle(LifecycleNotice::Reconnecting))
                .await
                .is_err()
            {
                return Ok(());
            }
        }
    }

    async fn session(
        &self,
        resume: &mut ResumeState,
        events: &mpsc::Sender<GatewayEvent>,
    ) -> SessionEnd {
        let base = resume.resume_url.as_deref().unwrap_or(&self.url);
        let url = connect_url(base);
        info!(%url, resume = resume.can_resume(), "connecting to gateway");

        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await {
            Ok(Ok((stream, _))) => stream,
            Ok(Err(err)) => return SessionEnd::Retry(format!("connect failed: {err}")),
            Err(_) => return SessionEnd::Retry("connect timed out".to_string()),
        };
        let (mut write, mut read) = stream.split();

        let hello = match read.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str::<GatewayPayload>(&text)
                .ok()
                .filter(|payload| payload.op == OP_HELLO)
                .and_then(|payload| serde_json::from_value::<Hello>(payload.d).ok()),
            _ => None,
        };
        let Some(hello) = hello else {
            return SessionEnd::Retry("no HELLO from gateway".to_string());
        };

        let handshake = match (&resume.session_id, resume.seq) {
            (Some(session_id), Some(seq)) => resume_frame(&self.token, session_id, seq),
            _ => identify_frame(&self.token),
        };
        if let Err(err) = write.send(Message::Text(handshake)).await {
            return SessionEnd::Retry(format!("handshake send failed: {err}"));
        }
        if events
            .send(GatewayEvent::Lifecycle(LifecycleNotice::Connected))
            .await
            .is_err()
        {
            return SessionEnd::Shutdown;
        }

        let period = Duration::from_millis(hello.heartbeat_interval);
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut acked = true;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !acked {
                        return SessionEnd::Retry("heartbeat not acknowledged".to_string());
                    }
                    acked = false;
                    if let Err(err) = write.send(Message::Text(heartbeat_frame(resume.seq))).await {
                        return SessionEnd::Retry(format!("heartbeat send failed: {err}"));
                    }
                }
                frame = read.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(close))) => {
                            let (code, reason) = close
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1000, String::new()));
                            if is_fatal_close(code) {
                                return SessionEnd::Fatal(code, reason);
                            }
                            return SessionEnd::Retry(format!("closed with {code} {reason}"));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => return SessionEnd::Retry(format!("read failed: {err}")),
                        None => return SessionEnd::Retry("stream ended".to_string()),
                    };
                    let payload = match serde_json::from_str::<GatewayPayload>(&text) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(error = %err, "undecodable gateway frame");
                            continue;
                        }
                    };
                    if payload.s.is_some() {
                        resume.seq = payload.s;
                    }
                    match payload.op {
                        OP_DISPATCH => {
                            let kind = payload.t.unwrap_or_default();
                            if !forward_dispatch(&kind, payload.d, resume, events).await {
                                return SessionEnd::Shutdown;
                            }
                        }
                        OP_HEARTBEAT => {
                            if let Err(err) = write.send(Message::Text(heartbeat_frame(resume.seq))).await {
                                return SessionEnd::Retry(format!("heartbeat send failed: {err}"));
                            }
                        }
                        OP_HEARTBEAT_ACK => acked = true,
                        OP_RECONNECT => return SessionEnd::Retry("server requested reconnect".to_string()),
                        OP_INVALID_SESSION => {
                            if !payload.d.as_bool().unwrap_or(false) {
                                resume.clear();
                            }
                            return SessionEnd::Retry("invalid session".to_string());
                        }
                        other => debug!(op = other, "gateway opcode ignored"),
                    }
                }
            }
        }
    }
}

/// Decode one dispatch and hand it on. Returns false once the receiver is
/// gone.
async fn forward_dispatch(
    kind: &str,
    d: Value,
    resume: &mut ResumeState,
    events: &mpsc::Sender<GatewayEvent>,
) -> bool {
    let event = match decode_dispatch(kind, d) {
        Ok(Dispatch::Ready {
            event,
            session_id,
            resume_url,
        }) => {
            resume.session_id = Some(session_id);
            resume.resume_url = resume_url;
            event
        }
        Ok(Dispatch::Resumed) => GatewayEvent::Lifecycle(LifecycleNotice::Resumed),
        Ok(Dispatch::Event(event)) => event,
        Ok(Dispatch::Other) => return true,
        Err(err) => {
            warn!(%kind, error = %err, "dispatch dropped");
            return true;
        }
    };
    events.send(event).await.is_ok()
}
