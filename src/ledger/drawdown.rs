//! Draw-down planning for recharges.
//!
//! Bonus funds are consumed before real funds. The reserve minimum is never
//! touched: a plan only exists when `real + bonus - reserve >= cost`.

use crate::error::{ServiceError, ServiceResult};
use bidstage_proto::LedgerKind;

/// How a cost splits across the two balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drawdown {
    pub bonus_used: i64,
    pub real_used: i64,
    pub real_after: i64,
    pub bonus_after: i64,
    pub kind: LedgerKind,
}

impl Drawdown {
    pub fn real_delta(&self) -> i64 {
        -self.real_used
    }

    pub fn bonus_delta(&self) -> i64 {
        -self.bonus_used
    }
}

/// Plan a withdrawal of `cost` from a wallet holding `real`/`bonus`.
pub fn plan_drawdown(real: i64, bonus: i64, reserve: i64, cost: i64) -> ServiceResult<Drawdown> {
    if cost <= 0 {
        return Err(ServiceError::InvalidParameter(format!(
            "cost must be positive, got {cost}"
        )));
    }

    let available = real + bonus - reserve;
    if available < cost {
        return Err(ServiceError::InsufficientFunds {
            available: available.max(0),
            required: cost,
        });
    }

    let bonus_used = bonus.min(cost);
    let real_used = cost - bonus_used;

    let kind = match (bonus_used > 0, real_used > 0) {
        (true, false) => LedgerKind::RechargeBonus,
        (false, true) => LedgerKind::RechargeReal,
        _ => LedgerKind::RechargeMixed,
    };

    Ok(Drawdown {
        bonus_used,
        real_used,
        real_after: real - real_used,
        bonus_after: bonus - bonus_used,
        kind,
    })
}
