//! Parser Types
//!
//! Transaction model produced by the SMS parser.

use serde::{Deserialize, Serialize};

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

/// Category of a parsed mobile money / lending / bank message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    // Peer transfers
    TransferReceived,
    TransferSent,
    // Bill / merchant payments
    BillPayment,
    MerchantPayment,
    // Overdraft loan (Fuliza)
    OverdraftDraw,
    OverdraftRepay,
    // Government microloan (Hustler Fund)
    MicroloanDisburse,
    MicroloanRepay,
    // Prepaid credit (Okoa Jahazi)
    CreditAdvance,
    CreditDebt,
    // Third-party digital lenders
    LenderDisburse,
    LenderRepay,
    // Savings funds
    SavingsDeposit,
    SavingsWithdraw,
    // Bank transfers
    BankDeposit,
    BankWithdraw,
    // Spend categories
    Gambling,
    Utility,
    Unknown,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TransferReceived => "TRANSFER_RECEIVED",
            TransactionType::TransferSent => "TRANSFER_SENT",
            TransactionType::BillPayment => "BILL_PAYMENT",
            TransactionType::MerchantPayment => "MERCHANT_PAYMENT",
            TransactionType::OverdraftDraw => "OVERDRAFT_DRAW",
            TransactionType::OverdraftRepay => "OVERDRAFT_REPAY",
            TransactionType::MicroloanDisburse => "MICROLOAN_DISBURSE",
            TransactionType::MicroloanRepay => "MICROLOAN_REPAY",
            TransactionType::CreditAdvance => "CREDIT_ADVANCE",
            TransactionType::CreditDebt => "CREDIT_DEBT",
            TransactionType::LenderDisburse => "LENDER_DISBURSE",
            TransactionType::LenderRepay => "LENDER_REPAY",
            TransactionType::SavingsDeposit => "SAVINGS_DEPOSIT",
            TransactionType::SavingsWithdraw => "SAVINGS_WITHDRAW",
            TransactionType::BankDeposit => "BANK_DEPOSIT",
            TransactionType::BankWithdraw => "BANK_WITHDRAW",
            TransactionType::Gambling => "GAMBLING",
            TransactionType::Utility => "UTILITY",
            TransactionType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CHANNEL
// ============================================================================

/// Rail that carried the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Primary peer network (M-Pesa)
    MPesa,
    AirtelMoney,
    TKash,
    Bank,
    Other,
}

impl Channel {
    /// True for peer networks other than the primary one
    pub fn is_alternate_network(&self) -> bool {
        matches!(self, Channel::AirtelMoney | Channel::TKash)
    }
}

// ============================================================================
// COUNTERPARTY
// ============================================================================

/// Other side of the transaction. Only one role is ever populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "name", rename_all = "snake_case")]
pub enum Counterparty {
    Sender(String),
    Recipient(String),
    Lender(String),
}

impl Counterparty {
    pub fn name(&self) -> &str {
        match self {
            Counterparty::Sender(name)
            | Counterparty::Recipient(name)
            | Counterparty::Lender(name) => name,
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// One parsed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TransactionType,
    pub channel: Channel,
    /// Always >= 0
    pub amount: f64,
    /// Secondary snapshot such as outstanding debt
    pub balance: Option<f64>,
    pub reference: Option<String>,
    pub counterparty: Option<Counterparty>,
    /// Kept for audit only
    pub raw_text: String,
}

impl Transaction {
    pub fn new(kind: TransactionType, channel: Channel, raw_text: &str) -> Self {
        Self {
            kind,
            channel,
            amount: 0.0,
            balance: None,
            reference: None,
            counterparty: None,
            raw_text: raw_text.to_string(),
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = if amount.is_finite() && amount > 0.0 { amount } else { 0.0 };
        self
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = Some(if balance.is_finite() && balance > 0.0 { balance } else { 0.0 });
        self
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference.filter(|r| !r.is_empty());
        self
    }

    pub fn with_counterparty(mut self, counterparty: Counterparty) -> Self {
        if !counterparty.name().is_empty() {
            self.counterparty = Some(counterparty);
        }
        self
    }

    pub fn sender(&self) -> Option<&str> {
        match &self.counterparty {
            Some(Counterparty::Sender(name)) => Some(name),
            _ => None,
        }
    }

    pub fn recipient(&self) -> Option<&str> {
        match &self.counterparty {
            Some(Counterparty::Recipient(name)) => Some(name),
            _ => None,
        }
    }

    pub fn lender(&self) -> Option<&str> {
        match &self.counterparty {
            Some(Counterparty::Lender(name)) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_as_str() {
        assert_eq!(TransactionType::TransferReceived.as_str(), "TRANSFER_RECEIVED");
        assert_eq!(TransactionType::OverdraftDraw.to_string(), "OVERDRAFT_DRAW");
        assert_eq!(TransactionType::Unknown.as_str(), "UNKNOWN");
    }

    #[test]
    fn test_transaction_type_serde_matches_as_str() {
        let json = serde_json::to_string(&TransactionType::SavingsDeposit).unwrap();
        assert_eq!(json, "\"SAVINGS_DEPOSIT\"");
    }

    #[test]
    fn test_amount_never_negative() {
        let txn = Transaction::new(TransactionType::TransferSent, Channel::MPesa, "x")
            .with_amount(-50.0);
        assert_eq!(txn.amount, 0.0);

        let txn = txn.with_amount(f64::NAN);
        assert_eq!(txn.amount, 0.0);
    }

    #[test]
    fn test_counterparty_roles_exclusive() {
        let txn = Transaction::new(TransactionType::LenderRepay, Channel::Other, "x")
            .with_counterparty(Counterparty::Lender("Tala".to_string()));

        assert_eq!(txn.lender(), Some("Tala"));
        assert_eq!(txn.sender(), None);
        assert_eq!(txn.recipient(), None);
    }

    #[test]
    fn test_empty_counterparty_dropped() {
        let txn = Transaction::new(TransactionType::TransferReceived, Channel::MPesa, "x")
            .with_counterparty(Counterparty::Sender(String::new()));
        assert!(txn.counterparty.is_none());
    }
}
