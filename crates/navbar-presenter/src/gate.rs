//! Navbar mount gate.
//!
//! The navbar fragment is injected asynchronously, so renders must wait
//! for it. The surface signals readiness once, through a watch channel;
//! renders that arrive first park on the channel instead of polling.

use std::time::Duration;
use tokio::sync::watch;

/// Sender half: the surface calls [`mark_mounted`](Self::mark_mounted)
/// once its elements exist.
pub struct MountHandle {
    tx: watch::Sender<bool>,
}

impl MountHandle {
    pub fn mark_mounted(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiver half, owned by the presenter.
#[derive(Clone)]
pub struct MountGate {
    rx: watch::Receiver<bool>,
}

impl MountGate {
    /// Create a gate and the handle that opens it.
    pub fn channel() -> (MountHandle, MountGate) {
        let (tx, rx) = watch::channel(false);
        (MountHandle { tx }, MountGate { rx })
    }

    /// A gate that is already open, for surfaces that mount eagerly.
    pub fn open() -> MountGate {
        let (_, rx) = watch::channel(true);
        MountGate { rx }
    }

    /// Wait for the surface to mount, up to `deadline`. Returns false if
    /// it never did.
    pub async fn wait_ready(&self, deadline: Duration) -> bool {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return true;
        }

        tokio::time::timeout(deadline, async {
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_gate_is_immediately_ready() {
        let gate = MountGate::open();
        assert!(gate.wait_ready(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn gate_opens_when_marked() {
        let (handle, gate) = MountGate::channel();

        let waiter = tokio::spawn(async move { gate.wait_ready(Duration::from_secs(1)).await });
        handle.mark_mounted();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn unmounted_gate_times_out() {
        let (_handle, gate) = MountGate::channel();
        assert!(!gate.wait_ready(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn ready_state_is_sticky() {
        let (handle, gate) = MountGate::channel();
        handle.mark_mounted();

        assert!(gate.wait_ready(Duration::from_millis(10)).await);
        assert!(gate.wait_ready(Duration::from_millis(10)).await);
    }
}
