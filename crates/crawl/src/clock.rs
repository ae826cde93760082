use async_trait::async_trait;
use std::time::Duration;

/// Blocking-style waits between page interactions.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(any(test, feature = "testing"))]
pub use recording::RecordingSleeper;

#[cfg(any(test, feature = "testing"))]
mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Returns immediately and remembers every requested wait.
    #[derive(Default)]
    pub struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn waits(&self) -> Vec<Duration> {
            self.waits.lock().map(|w| w.clone()).unwrap_or_default()
        }

        pub fn total(&self) -> Duration {
            self.waits().iter().sum()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            if let Ok(mut waits) = self.waits.lock() {
                waits.push(duration);
            }
        }
    }
}
