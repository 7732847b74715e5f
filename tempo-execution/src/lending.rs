use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tempo_integration::Instant;

use crate::{balance::AccountBalances, error::ExecutionError};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub struct LoanId(pub u64);

/// A borrowed balance accruing interest. `principal` only ever decreases via [`LendingPool::repay`];
/// `accrued_interest` grows via [`LendingPool::accrue`] and is repaid alongside it.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Loan {
    pub id: LoanId,
    pub symbol: SmolStr,
    pub principal: Decimal,
    pub accrued_interest: Decimal,
    pub opened_at: Instant,
    pub closed_at: Option<Instant>,
}

impl Loan {
    pub fn outstanding(&self) -> Decimal {
        self.principal + self.accrued_interest
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// Enables margin trading by crediting borrowed funds against `AccountBalances` and accruing
/// interest at a fixed per-hour rate. Accrual is driven externally by a scheduled callback
/// rather than by wall-clock polling, keeping the pool deterministic under replay.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LendingPool {
    loans: IndexMap<LoanId, Loan>,
    next_id: u64,
    /// Interest rate charged per hour of elapsed simulated time, against outstanding principal.
    pub hourly_rate: Decimal,
}

impl LendingPool {
    pub fn new(hourly_rate: Decimal) -> Self {
        Self {
            loans: IndexMap::new(),
            next_id: 0,
            hourly_rate,
        }
    }

    /// Open a new [`Loan`] for `amount` of `symbol`, crediting it to `balances` immediately.
    pub fn borrow(
        &mut self,
        balances: &mut AccountBalances,
        symbol: &str,
        amount: Decimal,
        now: Instant,
    ) -> LoanId {
        let id = LoanId(self.next_id);
        self.next_id += 1;

        balances.credit(symbol, amount);
        balances.adjust_borrowed(symbol, amount);

        self.loans.insert(
            id,
            Loan {
                id,
                symbol: symbol.into(),
                principal: amount,
                accrued_interest: Decimal::ZERO,
                opened_at: now,
                closed_at: None,
            },
        );

        id
    }

    /// Repay up to `amount` against a loan's outstanding balance (accrued interest first), debiting
    /// `balances`' available funds. Closes the loan once outstanding reaches zero.
    pub fn repay(
        &mut self,
        balances: &mut AccountBalances,
        loan_id: LoanId,
        amount: Decimal,
        now: Instant,
    ) -> Result<(), ExecutionError> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .expect("repay called with unknown loan id");

        let amount = amount.min(loan.outstanding());
        balances.debit(&loan.symbol, amount)?;

        let against_interest = amount.min(loan.accrued_interest);
        loan.accrued_interest -= against_interest;
        let against_principal = amount - against_interest;
        loan.principal -= against_principal;

        balances.adjust_borrowed(&loan.symbol, -against_principal);

        if loan.outstanding().is_zero() {
            loan.closed_at = Some(now);
        }

        Ok(())
    }

    /// Apply interest on every open loan for the elapsed time since it last accrued, crediting
    /// the delta to both the loan and the borrowed side of its balance.
    pub fn accrue(&mut self, balances: &mut AccountBalances, until: Instant) {
        for loan in self.loans.values_mut().filter(|l| l.is_open()) {
            let elapsed_hours = Decimal::from(
                (until - loan.opened_at).num_seconds().max(0),
            ) / Decimal::from(3600);

            let total_interest = loan.principal * self.hourly_rate * elapsed_hours;
            let delta = total_interest - loan.accrued_interest;
            if delta.is_sign_positive() {
                loan.accrued_interest = total_interest;
                balances.adjust_borrowed(&loan.symbol, delta);
            }
        }
    }

    /// Every loan still open, for shutdown reporting.
    pub fn open_loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values().filter(|l| l.is_open())
    }
}
