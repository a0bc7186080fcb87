use async_trait::async_trait;
use tracing::info;

use crate::checkout::dto::{CheckoutOrder, Settlement, SettlementStatus};
use crate::storage::new_record_id;

/// Where checkout hands an order off for payment.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn settle(&self, order: &CheckoutOrder) -> anyhow::Result<Settlement>;
}

/// Accepts every order for manual settlement; nothing is charged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingSettlementGateway;

#[async_trait]
impl PaymentGateway for PendingSettlementGateway {
    async fn settle(&self, order: &CheckoutOrder) -> anyhow::Result<Settlement> {
        let settlement = Settlement {
            reference: new_record_id(),
            status: SettlementStatus::Pending,
            amount: order.amount,
        };
        info!(
            email = %order.email,
            reference = %settlement.reference,
            amount = order.amount,
            "order queued for manual settlement"
        );
        Ok(settlement)
    }
}
