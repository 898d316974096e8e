//! Vectorizer - Transactions to FeatureVector
//!
//! Single pass over the batch into a `TransactionLedger`, then the ledger
//! writes all 22 features. No state survives between calls.

use std::collections::HashSet;

use crate::logic::parser::{Transaction, TransactionType};

use super::stats::{coefficient_of_variation, safe_div, std_dev};
use super::vector::{FeatureExtractor, FeatureVector};

/// Cap for the active-days proxy
pub const DAYS_ACTIVE_CAP: f64 = 30.0;

// ============================================================================
// LEDGER
// ============================================================================

/// Running totals for one batch
#[derive(Debug, Default)]
pub struct TransactionLedger {
    count: usize,
    total_amount: f64,
    max_amount: f64,
    amounts: Vec<f64>,
    income_amounts: Vec<f64>,

    income: f64,
    expenses: f64,
    gambling_spend: f64,
    utility_spend: f64,
    p2p_sends: f64,
    overdraft_drawn: f64,
    overdraft_repaid: f64,
    microloan_outstanding: f64,
    credit_events: usize,
    credit_exposure: f64,
    alt_network_volume: f64,
    savings_deposits: f64,
    bank_events: usize,
    lenders: HashSet<String>,
}

impl TransactionLedger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            amounts: Vec::with_capacity(capacity),
            income_amounts: Vec::with_capacity(capacity / 2),
            ..Self::default()
        }
    }

    pub fn record(&mut self, txn: &Transaction) {
        let amount = txn.amount;
        let balance = txn.balance.unwrap_or(0.0);

        self.count += 1;
        self.total_amount += amount;
        self.amounts.push(amount);
        if amount > self.max_amount {
            self.max_amount = amount;
        }

        match txn.kind {
            TransactionType::TransferReceived => {
                self.income += amount;
                self.income_amounts.push(amount);
                if txn.channel.is_alternate_network() {
                    self.alt_network_volume += amount;
                }
            }
            TransactionType::TransferSent => {
                self.expenses += amount;
                self.p2p_sends += amount;
                if txn.channel.is_alternate_network() {
                    self.alt_network_volume += amount;
                }
            }
            TransactionType::BillPayment | TransactionType::MerchantPayment => {
                self.expenses += amount;
            }
            TransactionType::Utility => {
                self.expenses += amount;
                self.utility_spend += amount;
            }
            TransactionType::OverdraftDraw => {
                self.income += amount;
                self.overdraft_drawn += amount;
            }
            TransactionType::OverdraftRepay => {
                self.expenses += amount;
                self.overdraft_repaid += amount;
            }
            TransactionType::MicroloanDisburse => {
                self.income += amount;
                self.microloan_outstanding = self.microloan_outstanding.max(balance);
                if amount > 0.0 && self.microloan_outstanding == 0.0 {
                    self.microloan_outstanding = amount;
                }
            }
            TransactionType::MicroloanRepay => {
                self.expenses += amount;
            }
            TransactionType::CreditAdvance => {
                self.income += amount;
                self.record_credit_exposure(amount, balance);
            }
            TransactionType::CreditDebt => {
                self.record_credit_exposure(amount, balance);
            }
            TransactionType::LenderDisburse => {
                self.income += amount;
                self.record_lender(txn);
            }
            TransactionType::LenderRepay => {
                self.expenses += amount;
                self.record_lender(txn);
            }
            TransactionType::SavingsDeposit => {
                self.expenses += amount;
                self.savings_deposits += amount;
            }
            TransactionType::SavingsWithdraw => {
                self.income += amount;
            }
            TransactionType::BankDeposit => {
                self.expenses += amount;
                self.bank_events += 1;
            }
            TransactionType::BankWithdraw => {
                self.income += amount;
                self.bank_events += 1;
            }
            TransactionType::Gambling => {
                self.expenses += amount;
                self.gambling_spend += amount;
            }
            TransactionType::Unknown => {}
        }
    }

    /// A stated balance replaces the running exposure; otherwise the amount accumulates
    fn record_credit_exposure(&mut self, amount: f64, balance: f64) {
        self.credit_events += 1;
        if balance > 0.0 {
            self.credit_exposure = balance;
        } else {
            self.credit_exposure += amount;
        }
    }

    fn record_lender(&mut self, txn: &Transaction) {
        if let Some(lender) = txn.lender().filter(|name| !name.is_empty()) {
            self.lenders.insert(lender.to_string());
        }
    }

    fn days_active(&self) -> f64 {
        (self.count as f64).min(DAYS_ACTIVE_CAP)
    }
}

impl FeatureExtractor for TransactionLedger {
    fn extract(&self, vector: &mut FeatureVector) {
        if self.count == 0 {
            return;
        }

        let days_active = self.days_active();

        // Cash flow
        vector.set(0, self.income);
        vector.set(1, self.expenses);
        vector.set(2, self.income - self.expenses);
        vector.set(3, safe_div(self.total_amount, self.count as f64));
        vector.set(4, self.count as f64);

        // Behaviour
        vector.set(5, coefficient_of_variation(&self.income_amounts));
        vector.set(6, safe_div(self.gambling_spend, self.expenses));
        vector.set(7, safe_div(self.utility_spend, self.expenses));
        vector.set(8, safe_div(self.overdraft_drawn, self.income));
        vector.set(9, safe_div(self.overdraft_repaid, self.overdraft_drawn));
        vector.set(10, safe_div(self.p2p_sends, self.expenses));
        vector.set(11, self.max_amount);
        vector.set(12, std_dev(&self.amounts));
        vector.set(13, days_active);

        // Credit exposure
        vector.set(14, self.microloan_outstanding);
        vector.set(15, self.credit_events as f64);
        vector.set(16, self.alt_network_volume);
        vector.set(17, self.lenders.len() as f64);
        vector.set(
            18,
            safe_div(self.credit_exposure + self.overdraft_drawn, self.income),
        );

        // Savings & banking
        vector.set(19, safe_div(self.savings_deposits, self.income));
        vector.set(20, safe_div(self.total_amount, days_active));
        vector.set(21, self.bank_events as f64);
    }
}

// ============================================================================
// PUBLIC ENTRY
// ============================================================================

/// Map a batch of transactions to the fixed-width feature vector.
/// Empty input yields all zeros.
pub fn vectorize(transactions: &[Transaction]) -> FeatureVector {
    let mut ledger = TransactionLedger::with_capacity(transactions.len());
    for txn in transactions {
        ledger.record(txn);
    }

    let mut vector = FeatureVector::new();
    ledger.extract(&mut vector);
    vector
}
