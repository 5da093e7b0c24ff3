//! Hand-written collaborator mocks that record what the scheduler asked.

use dca_core::{OpenOrder, OrderSide};
use dca_engine::{
    BoxFuture, CreationRequest, EngineError, EngineResult, Notification, Notifier, OrderGateway,
    SubmitError, SubmittedOrder,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Notifier recording every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            self.sent.lock().push(notification);
            Ok(())
        })
    }
}

/// Notifier that always fails.
#[derive(Default)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notification: Notification) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async { Err(EngineError::Collaborator("notification service down".into())) })
    }
}

/// How [`MockGateway`] answers submissions.
#[derive(Clone)]
pub enum SubmitBehaviour {
    Accept,
    Reject(SubmitError),
}

/// Gateway with preset open orders, scripted submissions and an optional
/// per-submission delay. Tracks the peak number of concurrent submissions.
pub struct MockGateway {
    open: Mutex<Vec<OpenOrder>>,
    behaviour: SubmitBehaviour,
    delay: Option<Duration>,
    fail_open_orders: bool,
    submitted: Mutex<Vec<CreationRequest>>,
    cancelled: Mutex<Vec<OpenOrder>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockGateway {
    pub fn new(behaviour: SubmitBehaviour) -> Self {
        Self {
            open: Mutex::new(Vec::new()),
            behaviour,
            delay: None,
            fail_open_orders: false,
            submitted: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_open_orders(self, orders: Vec<OpenOrder>) -> Self {
        *self.open.lock() = orders;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_open_orders(mut self) -> Self {
        self.fail_open_orders = true;
        self
    }

    pub fn submitted(&self) -> Vec<CreationRequest> {
        self.submitted.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<OpenOrder> {
        self.cancelled.lock().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl OrderGateway for MockGateway {
    fn submit(
        &self,
        request: CreationRequest,
    ) -> BoxFuture<'_, Result<SubmittedOrder, SubmitError>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.submitted.lock().push(request.clone());
            match &self.behaviour {
                SubmitBehaviour::Accept => Ok(SubmittedOrder {
                    entry: OpenOrder::from_spec(&request.entry),
                    exits: request.exits.iter().map(OpenOrder::from_spec).collect(),
                }),
                SubmitBehaviour::Reject(error) => Err(error.clone()),
            }
        })
    }

    fn open_orders<'a>(
        &'a self,
        symbol: &'a str,
        side: OrderSide,
    ) -> BoxFuture<'a, EngineResult<Vec<OpenOrder>>> {
        Box::pin(async move {
            if self.fail_open_orders {
                return Err(EngineError::Collaborator("open orders unavailable".into()));
            }
            Ok(self
                .open
                .lock()
                .iter()
                .filter(|o| o.symbol == symbol && o.side == side)
                .cloned()
                .collect())
        })
    }

    fn cancel(&self, order: OpenOrder) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            self.cancelled.lock().push(order);
            Ok(())
        })
    }
}
