//! Background jobs.

use academy_core::PaymentService;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Run [`PaymentService::reconcile`] every `interval` until `shutdown`
/// flips to true.
pub fn spawn_reconciler(
    payments: PaymentService,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match payments.reconcile().await {
                        Ok(report) if report.updated > 0 || report.failed > 0 => {
                            info!(checked = report.checked, updated = report.updated, failed = report.failed, "reconciliation pass");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "reconciliation pass failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("reconciler stopped");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::testing::{FakeGateway, MemoryStore};
    use academy_core::{AuthorizeCommand, NewUser, PaymentStatus, PlatformFee, Store};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn reconciler_repairs_and_stops() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::new());
        let user = store
            .create_user(NewUser {
                email: "ada@example.com".into(),
                password_hash: "x".into(),
                customer_id: Some("cus_1".into()),
            })
            .await
            .unwrap();
        let payments = PaymentService::new(store.clone(), gateway.clone(), PlatformFee::default());
        let auth = payments
            .authorize(AuthorizeCommand {
                user_id: user.id,
                payment_method_id: "pm_1".into(),
                amount: 1000,
                currency: "usd".into(),
                description: None,
            })
            .await
            .unwrap();
        let intent_id = auth.payment.payment_intent_id;
        gateway.set_intent_status(&intent_id, PaymentStatus::Canceled);

        let (tx, rx) = watch::channel(false);
        let handle = spawn_reconciler(payments.clone(), Duration::from_secs(30), rx);

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            payments.get_payment(&intent_id).await.unwrap().status,
            PaymentStatus::Canceled
        );

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
