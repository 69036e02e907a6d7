//! Heartbeat monitor: a ping interval and a pong timeout, decoupled from
//! any particular timer so the connection's event loop can race it
//! against `WsReader::recv_event` with `tokio::select!`.

use std::time::Duration;

use tokio::time::Instant;

use crate::ws::close::CloseCode;

#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub auto_close: bool,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            auto_close: true,
        }
    }
}

/// Tracks when the next Ping is due and whether the last one has been
/// answered in time. Carries no I/O itself — the caller's event loop owns
/// the actual `send_ping`/`send_close` calls and just asks this monitor
/// what to do next.
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    next_ping_at: Instant,
    awaiting_pong_since: Option<Instant>,
}

pub enum HeartbeatAction {
    Wait(Duration),
    SendPing,
    CloseTimedOut(CloseCode),
}

impl HeartbeatMonitor {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            next_ping_at: Instant::now() + config.ping_interval,
            awaiting_pong_since: None,
            config,
        }
    }

    /// Call right before a ping is actually sent, to start the pong-timeout
    /// clock.
    pub fn ping_sent(&mut self, now: Instant) {
        self.awaiting_pong_since = Some(now);
    }

    /// Call when a Pong event arrives; clears the pending deadline and
    /// schedules the next ping.
    pub fn on_pong(&mut self, now: Instant) {
        self.awaiting_pong_since = None;
        self.next_ping_at = now + self.config.ping_interval;
    }

    /// What the event loop should do at time `now`: keep waiting for
    /// `Duration`, send a ping now, or (if a pong is overdue and
    /// `auto_close` is set) close the connection.
    pub fn poll(&mut self, now: Instant) -> HeartbeatAction {
        if let Some(since) = self.awaiting_pong_since {
            let deadline = since + self.config.pong_timeout;
            if now >= deadline {
                if self.config.auto_close {
                    return HeartbeatAction::CloseTimedOut(CloseCode::GoingAway);
                }
                self.awaiting_pong_since = None;
            } else {
                return HeartbeatAction::Wait(deadline - now);
            }
        }
        if now >= self.next_ping_at {
            HeartbeatAction::SendPing
        } else {
            HeartbeatAction::Wait(self.next_ping_at - now)
        }
    }
}
