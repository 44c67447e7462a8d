use tokio::sync::watch;

pub fn cancel_requested(cancel_rx: Option<&watch::Receiver<bool>>) -> bool {
    cancel_rx.map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Resolves once the flag reads `true`. A dropped sender can no longer cancel,
/// so the future then stays pending.
pub async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    if cancel_rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}
