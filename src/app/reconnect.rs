//! Connection attempts driven from the session loop

use std::pin::Pin;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use reqwest::Url;
use tokio::time::{sleep, timeout, Instant, Sleep};
use tracing::debug;

use crate::util::backoff::Backoff;
use crate::ws::{Connection, ConnectionError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type Attempt = LocalBoxFuture<'static, Result<Connection, ConnectionError>>;

/// Owns the backoff timer and the in-flight attempt so `next` can sit in a
/// `select!` branch and be dropped without losing either.
pub struct Reconnector {
    url: Url,
    backoff: Backoff,
    timer: Pin<Box<Sleep>>,
    attempt: Option<Attempt>,
}

impl Reconnector {
    /// The first attempt starts immediately
    pub fn new(url: Url, backoff: Backoff) -> Self {
        Self {
            url,
            backoff,
            timer: Box::pin(sleep(Duration::ZERO)),
            attempt: None,
        }
    }

    /// Failed attempts since the last success
    pub fn attempts(&self) -> u32 {
        self.backoff.attempt()
    }

    #[cfg(test)]
    pub fn is_connecting(&self) -> bool {
        self.attempt.is_some()
    }

    /// Start over after an established connection dropped
    pub fn connection_lost(&mut self) {
        self.attempt = None;
        self.backoff.reset();
        self.schedule_retry();
    }

    /// Wait for the backoff timer, then for one attempt to finish.
    /// Cancel safe: an attempt in flight survives the future being dropped.
    pub async fn next(&mut self) -> Result<Connection, ConnectionError> {
        if self.attempt.is_none() {
            self.timer.as_mut().await;
        }

        let url = &self.url;
        let result = self
            .attempt
            .get_or_insert_with(|| connect(url.clone()).boxed_local())
            .await;
        self.attempt = None;

        match &result {
            Ok(_) => {
                debug!(failed_attempts = self.backoff.attempt(), "Connect attempt succeeded");
                self.backoff.reset();
            }
            Err(_) => self.schedule_retry(),
        }
        result
    }

    fn schedule_retry(&mut self) {
        let delay = self.backoff.next_delay();
        self.timer.as_mut().reset(Instant::now() + delay);
    }
}

async fn connect(url: Url) -> Result<Connection, ConnectionError> {
    match timeout(CONNECT_TIMEOUT, Connection::connect(&url)).await {
        Ok(result) => result,
        Err(_) => Err(ConnectionError::Timeout(CONNECT_TIMEOUT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn quick_backoff() -> Backoff {
        Backoff::new(Duration::from_millis(10), Duration::from_millis(40))
    }

    #[tokio::test]
    async fn stalled_handshake_does_not_block_other_branches() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the TCP connection but never answer the upgrade
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let url = Url::parse(&format!("ws://{addr}/ws/abc")).unwrap();
        let mut reconnector = Reconnector::new(url, quick_backoff());
        let started = std::time::Instant::now();

        let shutdown_won = tokio::select! {
            _ = reconnector.next() => false,
            _ = sleep(Duration::from_millis(200)) => true,
        };

        assert!(shutdown_won);
        assert!(started.elapsed() < CONNECT_TIMEOUT);
        assert!(reconnector.is_connecting());
        server.abort();
    }

    #[tokio::test]
    async fn in_flight_attempt_completes_after_being_interrupted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            sleep(Duration::from_millis(150)).await;
            let ws = accept_async(stream).await.unwrap();
            sleep(Duration::from_secs(1)).await;
            drop(ws);
        });

        let url = Url::parse(&format!("ws://{addr}/ws/abc")).unwrap();
        let mut reconnector = Reconnector::new(url, quick_backoff());

        tokio::select! {
            _ = reconnector.next() => panic!("handshake answered too early"),
            _ = sleep(Duration::from_millis(50)) => {}
        }
        assert!(reconnector.is_connecting());

        let connection = reconnector.next().await;
        assert!(connection.is_ok());
        assert!(!reconnector.is_connecting());
        assert_eq!(reconnector.attempts(), 0);
        server.abort();
    }

    #[tokio::test]
    async fn failures_back_off_and_count() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}/ws/abc")).unwrap();
        let mut reconnector = Reconnector::new(url, quick_backoff());

        assert!(matches!(reconnector.next().await, Err(ConnectionError::Connect(_))));
        assert_eq!(reconnector.attempts(), 1);
        assert!(!reconnector.is_connecting());

        assert!(reconnector.next().await.is_err());
        assert_eq!(reconnector.attempts(), 2);

        reconnector.connection_lost();
        assert_eq!(reconnector.attempts(), 1);
    }
}
