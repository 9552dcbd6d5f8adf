//! A resettable countdown barrier that carries a value.
//!
//! `n` parties arrive; the first `n - 1` get a [`Gate`] to wait on, the last
//! one gets the [`Release`] and decides the value every waiter receives.
//! Resetting starts a new epoch: waiters of the old epoch observe
//! [`LatchError::Abandoned`] instead of hanging forever.

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LatchError {
    #[error("more parties arrived than the latch expects")]
    Overflow,
    #[error("the latch was reset or released without a value")]
    Abandoned,
}

struct Epoch<T> {
    arrived: usize,
    sender: Option<watch::Sender<Option<T>>>,
    receiver: watch::Receiver<Option<T>>,
}

impl<T> Epoch<T> {
    fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self {
            arrived: 0,
            sender: Some(sender),
            receiver,
        }
    }
}

pub struct CountdownLatch<T> {
    expected: usize,
    epoch: Mutex<Epoch<T>>,
}

impl<T: Clone> CountdownLatch<T> {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            epoch: Mutex::new(Epoch::new()),
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Parties that arrived in the current epoch.
    pub fn arrived(&self) -> usize {
        self.epoch.lock().arrived
    }

    pub fn arrive(&self) -> Result<Arrival<T>, LatchError> {
        let mut epoch = self.epoch.lock();
        if epoch.arrived >= self.expected {
            return Err(LatchError::Overflow);
        }
        epoch.arrived += 1;

        if epoch.arrived == self.expected {
            let sender = epoch.sender.take().ok_or(LatchError::Overflow)?;
            Ok(Arrival::Last(Release { sender }))
        } else {
            Ok(Arrival::Waiting(Gate {
                receiver: epoch.receiver.clone(),
            }))
        }
    }

    /// Start a new epoch. Pending gates of the old one are abandoned.
    pub fn reset(&self) {
        *self.epoch.lock() = Epoch::new();
    }
}

pub enum Arrival<T> {
    /// Wait for the last party.
    Waiting(Gate<T>),
    /// This party completes the epoch.
    Last(Release<T>),
}

pub struct Gate<T> {
    receiver: watch::Receiver<Option<T>>,
}

impl<T: Clone> Gate<T> {
    pub async fn wait(mut self) -> Result<T, LatchError> {
        let value = self
            .receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| LatchError::Abandoned)?;
        (*value).clone().ok_or(LatchError::Abandoned)
    }
}

/// Dropping a release without opening it abandons every waiter.
pub struct Release<T> {
    sender: watch::Sender<Option<T>>,
}

impl<T> Release<T> {
    pub fn open(self, value: T) {
        self.sender.send_replace(Some(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn waiters_receive_the_value_of_the_last_party() {
        let latch = CountdownLatch::<u32>::new(3);
        let Arrival::Waiting(first) = latch.arrive().unwrap() else {
            panic!("first party should wait");
        };
        let Arrival::Waiting(second) = latch.arrive().unwrap() else {
            panic!("second party should wait");
        };
        let Arrival::Last(release) = latch.arrive().unwrap() else {
            panic!("third party should release");
        };

        let waiting = tokio::spawn(async move { (first.wait().await, second.wait().await) });
        tokio::time::sleep(Duration::from_millis(10)).await;
        release.open(7);

        assert_eq!(waiting.await.unwrap(), (Ok(7), Ok(7)));
    }

    #[tokio::test]
    async fn single_party_is_released_immediately() {
        let latch = CountdownLatch::<()>::new(1);
        assert!(matches!(latch.arrive().unwrap(), Arrival::Last(_)));
        assert!(matches!(latch.arrive(), Err(LatchError::Overflow)));
    }

    #[tokio::test]
    async fn reset_abandons_pending_waiters() {
        let latch = CountdownLatch::<u32>::new(2);
        let Arrival::Waiting(gate) = latch.arrive().unwrap() else {
            panic!("should wait");
        };
        latch.reset();
        assert_eq!(gate.wait().await, Err(LatchError::Abandoned));

        assert_eq!(latch.arrived(), 0);
        assert!(matches!(latch.arrive().unwrap(), Arrival::Waiting(_)));
        assert!(matches!(latch.arrive().unwrap(), Arrival::Last(_)));
    }

    #[tokio::test]
    async fn dropped_release_abandons_waiters() {
        let latch = CountdownLatch::<u32>::new(2);
        let Arrival::Waiting(gate) = latch.arrive().unwrap() else {
            panic!("should wait");
        };
        drop(latch.arrive().unwrap());
        assert_eq!(gate.wait().await, Err(LatchError::Abandoned));
    }
}
