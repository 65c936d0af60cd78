use tokio::sync::watch;

/// Resolve once `true` has been sent on the shutdown channel.
///
/// Never resolves if the sender is dropped without signalling.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_resolves_after_signal() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(true).unwrap();
        });

        let result = timeout(Duration::from_secs(1), wait_for_shutdown(&mut rx)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_already_signalled() {
        let (_tx, mut rx) = watch::channel(true);
        assert!(is_shutdown(&rx));
        let result = timeout(Duration::from_millis(100), wait_for_shutdown(&mut rx)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_sender_never_resolves() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let result = timeout(Duration::from_millis(50), wait_for_shutdown(&mut rx)).await;
        assert!(result.is_err());
    }
}
