//! In-process outbound email queue.
//!
//! A bounded tokio channel decouples request handlers from email delivery.
//! One background task drains it and hands each message to an
//! [`EmailSender`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use shoplist_core::integrations::{EmailMessage, EmailSender, MessageQueue, QueueError};

/// Sending half of the email queue. Sending never waits: a full queue is an
/// error.
#[derive(Clone)]
pub struct ChannelQueue {
    tx: mpsc::Sender<EmailMessage>,
}

impl ChannelQueue {
    /// Creates the queue and spawns its worker.
    ///
    /// The worker exits once every `ChannelQueue` clone is dropped.
    pub fn spawn(capacity: usize, sender: Arc<dyn EmailSender>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(deliver(rx, sender));
        (Self { tx }, worker)
    }
}

async fn deliver(mut rx: mpsc::Receiver<EmailMessage>, sender: Arc<dyn EmailSender>) {
    while let Some(message) = rx.recv().await {
        if let Err(err) = sender.send_email(&message).await {
            tracing::warn!(to = %message.to, subject = %message.subject, error = %err, "Email delivery failed");
        }
    }
    tracing::debug!("Email queue closed");
}

#[async_trait]
impl MessageQueue for ChannelQueue {
    async fn send(&self, message: EmailMessage) -> Result<(), QueueError> {
        self.tx.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Closed(_) => QueueError::Closed,
        })?;
        tracing::debug!("Email queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_core::integrations::EmailError;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send_email(&self, message: &EmailMessage) -> Result<(), EmailError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl EmailSender for FailingSender {
        async fn send_email(&self, _message: &EmailMessage) -> Result<(), EmailError> {
            Err(EmailError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let sender = Arc::new(RecordingSender::default());
        let (queue, worker) = ChannelQueue::spawn(8, sender.clone());

        queue.send(EmailMessage::registration("a@example.com")).await.unwrap();
        queue.send(EmailMessage::registration("b@example.com")).await.unwrap();
        drop(queue);
        worker.await.unwrap();

        let sent = sender.sent.lock().await;
        assert_eq!(
            sent.iter().map(|m| m.to.as_str()).collect::<Vec<_>>(),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_worker_alive() {
        let (queue, worker) = ChannelQueue::spawn(8, Arc::new(FailingSender));

        queue.send(EmailMessage::registration("a@example.com")).await.unwrap();
        queue.send(EmailMessage::registration("b@example.com")).await.unwrap();
        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_queue_is_reported() {
        // Nothing drains this channel
        let (tx, _rx) = mpsc::channel(1);
        let queue = ChannelQueue { tx };

        queue.send(EmailMessage::registration("a@example.com")).await.unwrap();
        assert_eq!(
            queue.send(EmailMessage::registration("b@example.com")).await,
            Err(QueueError::Full)
        );
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let queue = ChannelQueue { tx };

        assert_eq!(
            queue.send(EmailMessage::registration("a@example.com")).await,
            Err(QueueError::Closed)
        );
    }
}
