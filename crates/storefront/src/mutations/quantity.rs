//! Debounced quantity stepper for one cart line.
//!
//! Clicks move a local display quantity at once. The "set quantity" call
//! goes out only after the line has been quiet for the configured delay,
//! carrying whatever the display shows at that moment. Each click cancels
//! the pending timer and starts a new one; a call already sent is never
//! cancelled.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use freshcart_core::ProductId;
use tokio::task::JoinHandle;

use super::CartActions;
use crate::error::{MutationError, Rejection};
use crate::state::CartLine;

/// Increment/decrement control for one cart line.
///
/// Dropping the stepper does not cancel a pending update.
#[derive(Debug)]
pub struct QuantityStepper {
    actions: CartActions,
    product_id: ProductId,
    ceiling: u32,
    delay: Duration,
    /// Display quantity, and the value the timer sends when it fires.
    requested: Arc<AtomicU32>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl QuantityStepper {
    /// Stepper starting at the line's current quantity.
    ///
    /// The ceiling is the line's stock, or the configured default when the
    /// stock is unknown.
    #[must_use]
    pub fn new(actions: CartActions, line: &CartLine) -> Self {
        let cart_config = actions.storefront().config().cart;
        Self {
            product_id: line.product_id.clone(),
            ceiling: line.stock.unwrap_or(cart_config.stock_ceiling),
            delay: cart_config.quantity_debounce,
            requested: Arc::new(AtomicU32::new(line.quantity.max(1))),
            timer: Mutex::new(None),
            actions,
        }
    }

    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.requested.load(Ordering::Acquire)
    }

    #[must_use]
    pub const fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Whether an update is waiting for the quiet period to end.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock_timer()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// One more unit. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `Rejection::AboveStock` at the ceiling; nothing changes and the
    /// timer is left alone.
    pub fn increment(&self) -> Result<u32, Rejection> {
        let current = self.quantity();
        if current >= self.ceiling {
            return Err(Rejection::AboveStock {
                available: self.ceiling,
            });
        }
        Ok(self.step_to(current + 1))
    }

    /// One less unit. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `Rejection::BelowMinimum` at 1; nothing changes and the timer is left
    /// alone. Removing the line is [`CartActions::remove_item`].
    pub fn decrement(&self) -> Result<u32, Rejection> {
        let current = self.quantity();
        if current <= 1 {
            return Err(Rejection::BelowMinimum);
        }
        Ok(self.step_to(current - 1))
    }

    /// Send a pending update now instead of waiting out the quiet period.
    ///
    /// Returns `None` when nothing is pending.
    pub async fn flush(&self) -> Option<Result<u32, MutationError>> {
        let pending = self.lock_timer().take()?;
        if pending.is_finished() {
            return None;
        }
        pending.abort();
        let quantity = self.quantity();
        Some(self.actions.set_quantity(&self.product_id, quantity).await)
    }

    fn step_to(&self, quantity: u32) -> u32 {
        self.requested.store(quantity, Ordering::Release);
        self.restart_timer();
        quantity
    }

    fn restart_timer(&self) {
        let actions = self.actions.clone();
        let product_id = self.product_id.clone();
        let requested = Arc::clone(&self.requested);
        let delay = self.delay;

        let mut timer = self.lock_timer();
        if let Some(pending) = timer.take() {
            pending.abort();
        }
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let quantity = requested.load(Ordering::Acquire);
            tracing::debug!(product_id = %product_id, quantity, "quantity settled");
            // Once sent, the call outlives later clicks.
            tokio::spawn(async move {
                // Failures already surfaced as a notice.
                let _ = actions.set_quantity(&product_id, quantity).await;
            });
        }));
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{FakeCommerce, Op, product, signed_in};

    async fn stepper_for(
        fake: FakeCommerce,
        stock: Option<u32>,
    ) -> (QuantityStepper, Arc<FakeCommerce>) {
        let (storefront, fake) = signed_in(fake);
        let token = storefront.session().token().unwrap();
        let cart = storefront.api().get_cart(&token).await.unwrap();
        let mut line = cart.line(&product("x")).cloned().unwrap();
        line.stock = stock;
        storefront.cart().replace(cart);
        (QuantityStepper::new(CartActions::new(storefront), &line), fake)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_call() {
        let (stepper, fake) = stepper_for(FakeCommerce::new().with_cart(&[("x", 1)]), None).await;

        for _ in 0..4 {
            stepper.increment().unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(stepper.quantity(), 5);
        assert_eq!(fake.count(Op::UpdateQuantity), 0);
        assert!(stepper.is_pending());

        tokio::time::sleep(Duration::from_millis(500)).await;

        let updates: Vec<_> = fake
            .calls()
            .into_iter()
            .filter(|call| call.op == Op::UpdateQuantity)
            .collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].count, Some(5));
        assert_eq!(stepper.actions.storefront().cart().read(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_click_restarts_quiet_period() {
        let (stepper, fake) = stepper_for(FakeCommerce::new().with_cart(&[("x", 3)]), None).await;

        stepper.decrement().unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        stepper.increment().unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        // 800ms since the first click, 400ms since the last.
        assert_eq!(fake.count(Op::UpdateQuantity), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fake.count(Op::UpdateQuantity), 1);
        assert_eq!(fake.calls().last().unwrap().count, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decrement_at_one_is_refused() {
        let (stepper, fake) = stepper_for(FakeCommerce::new().with_cart(&[("x", 1)]), None).await;

        assert_eq!(stepper.decrement(), Err(Rejection::BelowMinimum));
        assert_eq!(stepper.quantity(), 1);
        assert!(!stepper.is_pending());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fake.count(Op::UpdateQuantity), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_at_stock_is_refused() {
        let (stepper, fake) = stepper_for(FakeCommerce::new().with_cart(&[("x", 2)]), Some(3)).await;

        stepper.increment().unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(stepper.increment(), Err(Rejection::AboveStock { available: 3 }));
        assert_eq!(stepper.quantity(), 3);

        // The refused click did not restart the timer.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fake.count(Op::UpdateQuantity), 1);
        assert_eq!(fake.calls().last().unwrap().count, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_stock_uses_default_ceiling() {
        let (stepper, _fake) = stepper_for(FakeCommerce::new().with_cart(&[("x", 1)]), None).await;
        assert_eq!(stepper.ceiling(), 999);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_sends_immediately_once() {
        let (stepper, fake) = stepper_for(FakeCommerce::new().with_cart(&[("x", 1)]), None).await;
        assert!(stepper.flush().await.is_none());

        stepper.increment().unwrap();
        stepper.increment().unwrap();
        let count = stepper.flush().await.unwrap().unwrap();
        assert_eq!(count, 3);
        assert!(!stepper.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.count(Op::UpdateQuantity), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_update_leaves_store() {
        let fake = FakeCommerce::new().with_cart(&[("x", 2)]);
        fake.fail(Op::UpdateQuantity);
        let (stepper, fake) = stepper_for(fake, None).await;

        stepper.increment().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(fake.count(Op::UpdateQuantity), 1);
        assert_eq!(stepper.actions.storefront().cart().read(), 2);
    }
}
