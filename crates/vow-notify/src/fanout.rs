use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    error::{Result, TransportError},
    transport::NotificationTransport,
    types::Notification,
};

/// Sends every notification through each registered transport in order.
///
/// Succeeds if at least one transport delivered; a failing transport is
/// logged and the next one is still tried.
pub struct FanoutTransport {
    transports: Vec<Box<dyn NotificationTransport>>,
}

impl FanoutTransport {
    /// At least one transport is required.
    pub fn new(transports: Vec<Box<dyn NotificationTransport>>) -> Result<Self> {
        if transports.is_empty() {
            return Err(TransportError::Config(
                "fan-out requires at least one transport".to_string(),
            ));
        }
        for t in &transports {
            info!(transport = %t.name(), "registering notification transport");
        }
        Ok(Self { transports })
    }
}

#[async_trait]
impl NotificationTransport for FanoutTransport {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn send_to_users(&self, user_ids: &[String], notification: &Notification) -> Result<()> {
        let mut delivered = false;
        let mut last_err: Option<TransportError> = None;

        for transport in &self.transports {
            match transport.send_to_users(user_ids, notification).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    warn!(
                        transport = %transport.name(),
                        category = %notification.category,
                        err = %e,
                        "transport send failed"
                    );
                    last_err = Some(e);
                }
            }
        }

        if delivered {
            return Ok(());
        }
        Err(TransportError::AllFailed(
            last_err.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct AlwaysFail;

    #[async_trait]
    impl NotificationTransport for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }
        async fn send_to_users(&self, _: &[String], _: &Notification) -> Result<()> {
            Err(TransportError::Config("intentional failure".to_string()))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl NotificationTransport for Counting {
        fn name(&self) -> &str {
            "counting"
        }
        async fn send_to_users(&self, _: &[String], _: &Notification) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_success_is_enough() {
        let hits = Arc::new(AtomicUsize::new(0));
        let fanout = FanoutTransport::new(vec![
            Box::new(AlwaysFail),
            Box::new(Counting(Arc::clone(&hits))),
        ])
        .unwrap();

        fanout
            .send_to_users(&["u1".to_string()], &Notification::midpoint("w1"))
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_when_all_fail() {
        let fanout = FanoutTransport::new(vec![Box::new(AlwaysFail), Box::new(AlwaysFail)]).unwrap();
        let result = fanout
            .send_to_users(&["u1".to_string()], &Notification::midpoint("w1"))
            .await;
        assert!(matches!(result, Err(TransportError::AllFailed(_))));
    }

    #[test]
    fn empty_fanout_is_rejected() {
        assert!(FanoutTransport::new(Vec::new()).is_err());
    }
}
