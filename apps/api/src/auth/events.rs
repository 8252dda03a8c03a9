//! Auth state broadcast backed by a `tokio::sync::broadcast` channel.
//!
//! Every sign-in and sign-out is published here. The identity service is the
//! only publisher; any number of subscribers (the audit log, a UI bridge)
//! receive every change independently.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::user::User;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { user: User },
    SignedOut { user_id: Uuid },
}

#[derive(Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AuthEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: AuthEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

/// Logs every auth state change until the channel closes.
pub fn spawn_audit_log(events: &AuthEvents) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(AuthEvent::SignedIn { user }) => {
                    info!(user_id = %user.id, anonymous = user.is_anonymous, "user signed in");
                }
                Ok(AuthEvent::SignedOut { user_id }) => {
                    info!(user_id = %user_id, "user signed out");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Auth audit log lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_each_event() {
        let events = AuthEvents::default();
        let mut a = events.subscribe();
        let mut b = events.subscribe();

        let user_id = Uuid::new_v4();
        events.publish(AuthEvent::SignedOut { user_id });

        assert_eq!(a.recv().await.unwrap(), AuthEvent::SignedOut { user_id });
        assert_eq!(b.recv().await.unwrap(), AuthEvent::SignedOut { user_id });
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        AuthEvents::default().publish(AuthEvent::SignedOut {
            user_id: Uuid::new_v4(),
        });
    }

    #[test]
    fn test_event_wire_format() {
        let user_id = Uuid::nil();
        let json = serde_json::to_value(AuthEvent::SignedOut { user_id }).unwrap();
        assert_eq!(json["event"], "signed_out");
        assert_eq!(json["user_id"], user_id.to_string());
    }

    #[tokio::test]
    async fn test_audit_log_stops_when_channel_closes() {
        let events = AuthEvents::default();
        let handle = spawn_audit_log(&events);
        events.publish(AuthEvent::SignedOut {
            user_id: Uuid::new_v4(),
        });
        drop(events);
        handle.await.unwrap();
    }
}
