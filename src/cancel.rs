use crate::error::{Result, SharpError};
use std::future::Future;
use tokio::sync::watch;

#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn none() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
            None => false,
        }
    }

    /// Resolves once cancelled or once the source is dropped. Never resolves for
    /// [`CancelToken::none`].
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        // wait_for also returns Err when the source is dropped
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(SharpError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(SharpError::Cancelled),
            out = fut => out,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let source = CancelSource::new();
        let out = source.token().run(async { Ok::<_, SharpError>(5) }).await.unwrap();
        assert_eq!(out, 5);
        assert_eq!(CancelToken::none().run(async { Ok::<_, SharpError>(1) }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_work() {
        let source = CancelSource::new();
        let token = source.token();
        let task = tokio::spawn(async move {
            token
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, SharpError>(())
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel();
        assert!(source.is_cancelled());
        let out = task.await.unwrap();
        assert!(matches!(out, Err(SharpError::Cancelled)));
    }

    #[tokio::test]
    async fn dropping_source_cancels_tokens() {
        let source = CancelSource::new();
        let token = source.token();
        drop(source);
        assert!(token.is_cancelled());
        let out = token.run(async { Ok::<_, SharpError>(()) }).await;
        assert!(matches!(out, Err(SharpError::Cancelled)));
    }
}
