//! Parser Module - SMS to Transaction extraction
//!
//! Two-stage dispatch: a single uppercase keyword scan picks the provider
//! matcher, then that matcher's patterns run in fixed priority order (first
//! match wins). Lines that match nothing are dropped, not reported.

pub mod cancel;
pub mod patterns;
pub mod types;

use regex::Captures;

pub use cancel::{CancelSignal, CancellationFlag, NeverCancel};
pub use patterns::PatternTable;
pub use types::{Channel, Counterparty, Transaction, TransactionType};

use patterns::canonical_lender;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Lines processed between two cancellation checks
pub const CANCEL_CHECK_STRIDE: usize = 100;

// ============================================================================
// ERRORS & RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("parsing cancelled at line {at_line}")]
    Cancelled { at_line: usize },
}

/// Output of a batch parse
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub transactions: Vec<Transaction>,
    /// Lines that matched no pattern
    pub skipped: usize,
}

impl ParsedBatch {
    /// Non-empty input that produced nothing
    pub fn is_silent(&self) -> bool {
        self.transactions.is_empty() && self.skipped > 0
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

// ============================================================================
// ROUTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Airtel,
    Microloan,
    Credit,
    Savings,
    Lender,
    Tkash,
    Overdraft,
    Default,
}

/// Keyword routing over the uppercased line
fn route(upper: &str) -> Route {
    let has = |needle: &str| upper.contains(needle);

    if has("AIRTEL") || has_airtel_txn_id(upper) {
        Route::Airtel
    } else if has("HUSTLER") {
        Route::Microloan
    } else if has("OKOA") {
        Route::Credit
    } else if has("M-SHWARI")
        || has_word(upper, "MALI")
        || has_word(upper, "STAWI")
        || has("KCB M-PESA")
    {
        Route::Savings
    } else if has("TALA") || has("BRANCH") || has("ZENKA") || has("ZASH") || has("OKOLEA") {
        Route::Lender
    } else if has("T-KASH") {
        Route::Tkash
    } else if has("FULIZA") {
        Route::Overdraft
    } else {
        Route::Default
    }
}

/// Whole-word match, so `MALI` does not fire inside `KAMALI`
fn has_word(upper: &str, word: &str) -> bool {
    upper
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .any(|token| token == word)
}

/// True if some token looks like an Airtel transaction id (`AM` + digit),
/// ignoring leading punctuation such as `:` or `(`
fn has_airtel_txn_id(upper: &str) -> bool {
    upper.split_whitespace().any(|token| {
        let token = token.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
        token.starts_with("AM")
            && token[2..].chars().next().map_or(false, |c| c.is_ascii_digit())
    })
}

// ============================================================================
// AMOUNT NORMALIZATION
// ============================================================================

/// Normalize an SMS amount (`Ksh1,500.00`, `KES 3,500`, `ksh100`) to a number.
/// Anything unparseable, negative or non-finite becomes 0.
pub fn parse_amount(text: &str) -> f64 {
    let mut s = text.trim();

    for prefix in ["ksh", "kes"] {
        let matches_prefix = s
            .get(..prefix.len())
            .map(|head| head.eq_ignore_ascii_case(prefix))
            .unwrap_or(false);
        if matches_prefix {
            s = s[prefix.len()..].trim_start_matches('.').trim();
            break;
        }
    }

    if s.is_empty() {
        return 0.0;
    }

    s.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

fn capture(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Words that end a captured name (`from JANE DOE on 5/1/24`)
const NAME_STOP_WORDS: &[&str] = &["on", "at", "for", "new", "via", "ref", "transaction", "balance"];

/// Captured person name with trailing connective words dropped
fn capture_person(caps: &Captures<'_>, name: &str) -> String {
    let raw = capture(caps, name);
    let kept: Vec<&str> = raw
        .split(' ')
        .enumerate()
        .take_while(|(i, word)| {
            *i == 0 || !NAME_STOP_WORDS.iter().any(|stop| word.eq_ignore_ascii_case(stop))
        })
        .map(|(_, word)| word)
        .collect();
    kept.join(" ")
}

fn captured_amount(caps: &Captures<'_>) -> f64 {
    caps.name("amt").map(|m| parse_amount(m.as_str())).unwrap_or(0.0)
}

fn captured_reference(caps: &Captures<'_>) -> Option<String> {
    caps.name("refcode").map(|m| m.as_str().to_string())
}

// ============================================================================
// PARSER
// ============================================================================

/// Stateless SMS parser over the shared pattern table
#[derive(Clone, Copy)]
pub struct SmsParser {
    patterns: &'static PatternTable,
}

impl Default for SmsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SmsParser {
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::global(),
        }
    }

    /// Parse a batch of lines, polling `cancel` every [`CANCEL_CHECK_STRIDE`] lines.
    ///
    /// Unmatched lines are counted in `skipped`; only cancellation fails the
    /// batch, and then no partial result is returned.
    pub fn parse_batch<S: AsRef<str>>(
        &self,
        lines: &[S],
        cancel: &dyn CancelSignal,
    ) -> Result<ParsedBatch, ParseError> {
        if lines.is_empty() {
            return Ok(ParsedBatch::default());
        }

        let mut batch = ParsedBatch {
            transactions: Vec::with_capacity(lines.len()),
            skipped: 0,
        };

        for (i, line) in lines.iter().enumerate() {
            if i % CANCEL_CHECK_STRIDE == 0 && cancel.is_cancelled() {
                log::debug!("Batch parse cancelled at line {} of {}", i, lines.len());
                return Err(ParseError::Cancelled { at_line: i });
            }

            match self.parse_line(line.as_ref()) {
                Some(txn) => batch.transactions.push(txn),
                None => batch.skipped += 1,
            }
        }

        log::debug!(
            "Parsed {} transactions from {} lines ({} skipped)",
            batch.transactions.len(),
            lines.len(),
            batch.skipped
        );

        Ok(batch)
    }

    /// Classify and extract a single line. `None` means the line is irrelevant.
    pub fn parse_line(&self, text: &str) -> Option<Transaction> {
        let upper = text.to_uppercase();

        match route(&upper) {
            Route::Airtel => self.parse_airtel(text),
            Route::Microloan => self.parse_microloan(text),
            Route::Credit => self.parse_credit(text),
            Route::Savings => self.parse_savings(text),
            Route::Lender => self.parse_lender(text, &upper),
            Route::Tkash => self.parse_tkash(text),
            Route::Overdraft => self.parse_overdraft(text),
            Route::Default => self.parse_default(text),
        }
    }

    fn parse_airtel(&self, text: &str) -> Option<Transaction> {
        let p = &self.patterns.airtel;

        if let Some(caps) = p.received.captures(text) {
            return Some(
                Transaction::new(TransactionType::TransferReceived, Channel::AirtelMoney, text)
                    .with_amount(captured_amount(&caps))
                    .with_reference(captured_reference(&caps))
                    .with_counterparty(Counterparty::Sender(capture_person(&caps, "sender"))),
            );
        }

        if let Some(caps) = p.sent.captures(text) {
            return Some(
                Transaction::new(TransactionType::TransferSent, Channel::AirtelMoney, text)
                    .with_amount(captured_amount(&caps))
                    .with_reference(captured_reference(&caps))
                    .with_counterparty(Counterparty::Recipient(capture_person(&caps, "recipient"))),
            );
        }

        // Keyword-only Airtel line: treat as incoming
        if p.keyword.is_match(text) {
            if let Some(caps) = self.patterns.amount.captures(text) {
                return Some(
                    Transaction::new(TransactionType::TransferReceived, Channel::AirtelMoney, text)
                        .with_amount(captured_amount(&caps)),
                );
            }
        }

        None
    }

    fn parse_microloan(&self, text: &str) -> Option<Transaction> {
        let p = &self.patterns.microloan;
        let hustler = || Counterparty::Lender("Hustler Fund".to_string());

        if let Some(caps) = p.disbursed.captures(text) {
            return Some(
                Transaction::new(TransactionType::MicroloanDisburse, Channel::Other, text)
                    .with_amount(captured_amount(&caps))
                    .with_counterparty(hustler()),
            );
        }

        if let Some(caps) = p.repaid.captures(text).or_else(|| p.sent_repayment.captures(text)) {
            return Some(
                Transaction::new(TransactionType::MicroloanRepay, Channel::Other, text)
                    .with_amount(captured_amount(&caps))
                    .with_counterparty(hustler()),
            );
        }

        if let Some(caps) = p.balance.captures(text) {
            return Some(
                Transaction::new(TransactionType::MicroloanDisburse, Channel::Other, text)
                    .with_balance(captured_amount(&caps))
                    .with_counterparty(hustler()),
            );
        }

        None
    }

    fn parse_credit(&self, text: &str) -> Option<Transaction> {
        let p = &self.patterns.credit;

        if let Some(caps) = p.advance.captures(text) {
            let mut txn = Transaction::new(TransactionType::CreditAdvance, Channel::Other, text)
                .with_amount(captured_amount(&caps));
            // Advance notices often state the resulting debt in the same line
            if let Some(debt) = p.debt.captures(text) {
                txn = txn.with_balance(captured_amount(&debt));
            }
            return Some(txn);
        }

        if let Some(caps) = p.debt.captures(text) {
            return Some(
                Transaction::new(TransactionType::CreditDebt, Channel::Other, text)
                    .with_balance(captured_amount(&caps)),
            );
        }

        if let Some(caps) = p.repaid.captures(text) {
            return Some(
                Transaction::new(TransactionType::CreditDebt, Channel::Other, text)
                    .with_amount(captured_amount(&caps)),
            );
        }

        None
    }

    fn parse_savings(&self, text: &str) -> Option<Transaction> {
        let p = &self.patterns.savings;
        let deposit = |caps: &Captures<'_>, fund: &str| {
            Transaction::new(TransactionType::SavingsDeposit, Channel::Other, text)
                .with_amount(captured_amount(caps))
                .with_counterparty(Counterparty::Recipient(fund.to_string()))
        };

        if let Some(caps) = p.mshwari_deposit.captures(text) {
            return Some(deposit(&caps, "M-Shwari"));
        }
        if let Some(caps) = p.mshwari_withdraw.captures(text) {
            return Some(
                Transaction::new(TransactionType::SavingsWithdraw, Channel::Other, text)
                    .with_amount(captured_amount(&caps))
                    .with_counterparty(Counterparty::Sender("M-Shwari".to_string())),
            );
        }
        if let Some(caps) = p.kcb_deposit.captures(text) {
            return Some(deposit(&caps, "KCB M-Pesa"));
        }
        if let Some(caps) = p.mali_deposit.captures(text) {
            return Some(deposit(&caps, "Mali"));
        }
        if let Some(caps) = p.stawi_deposit.captures(text) {
            return Some(deposit(&caps, "Stawi"));
        }

        if p.keyword.is_match(text) {
            if let Some(caps) = self.patterns.amount.captures(text) {
                return Some(
                    Transaction::new(TransactionType::SavingsDeposit, Channel::Other, text)
                        .with_amount(captured_amount(&caps)),
                );
            }
        }

        None
    }

    fn parse_lender(&self, text: &str, upper: &str) -> Option<Transaction> {
        let p = &self.patterns.lenders;

        if let Some(caps) = p.disbursement.captures(text) {
            return Some(
                Transaction::new(TransactionType::LenderDisburse, Channel::Other, text)
                    .with_amount(captured_amount(&caps))
                    .with_counterparty(Counterparty::Lender(canonical_lender(&capture(&caps, "lender")))),
            );
        }

        if let Some(caps) = p.repayment.captures(text) {
            return Some(
                Transaction::new(TransactionType::LenderRepay, Channel::Other, text)
                    .with_amount(captured_amount(&caps))
                    .with_counterparty(Counterparty::Lender(canonical_lender(&capture(&caps, "lender")))),
            );
        }

        // Lender mentioned without a known wording: infer direction from keywords
        let lender = p.keyword.find(text)?;
        let caps = self.patterns.amount.captures(text)?;
        let kind = if upper.contains("REPAY") || upper.contains("PAID") {
            TransactionType::LenderRepay
        } else {
            TransactionType::LenderDisburse
        };

        Some(
            Transaction::new(kind, Channel::Other, text)
                .with_amount(captured_amount(&caps))
                .with_counterparty(Counterparty::Lender(canonical_lender(lender.as_str()))),
        )
    }

    fn parse_tkash(&self, text: &str) -> Option<Transaction> {
        let p = &self.patterns.tkash;

        if let Some(caps) = p.received.captures(text) {
            return Some(
                Transaction::new(TransactionType::TransferReceived, Channel::TKash, text)
                    .with_amount(captured_amount(&caps))
                    .with_counterparty(Counterparty::Sender(capture_person(&caps, "sender"))),
            );
        }

        if let Some(caps) = p.sent.captures(text) {
            return Some(
                Transaction::new(TransactionType::TransferSent, Channel::TKash, text)
                    .with_amount(captured_amount(&caps))
                    .with_counterparty(Counterparty::Recipient(capture_person(&caps, "recipient"))),
            );
        }

        None
    }

    fn parse_overdraft(&self, text: &str) -> Option<Transaction> {
        let p = &self.patterns.overdraft;

        if let Some(caps) = p.borrowed.captures(text) {
            return Some(
                Transaction::new(TransactionType::OverdraftDraw, Channel::MPesa, text)
                    .with_amount(captured_amount(&caps)),
            );
        }

        if let Some(caps) = p.repaid.captures(text) {
            return Some(
                Transaction::new(TransactionType::OverdraftRepay, Channel::MPesa, text)
                    .with_amount(captured_amount(&caps)),
            );
        }

        None
    }

    /// M-Pesa, then gambling keywords, then bank transfers
    fn parse_default(&self, text: &str) -> Option<Transaction> {
        let p = &self.patterns.mpesa;

        if let Some(caps) = p.received.captures(text) {
            return Some(
                Transaction::new(TransactionType::TransferReceived, Channel::MPesa, text)
                    .with_amount(captured_amount(&caps))
                    .with_reference(captured_reference(&caps))
                    .with_counterparty(Counterparty::Sender(capture_person(&caps, "sender"))),
            );
        }

        if let Some(caps) = p.sent.captures(text) {
            return Some(
                Transaction::new(TransactionType::TransferSent, Channel::MPesa, text)
                    .with_amount(captured_amount(&caps))
                    .with_reference(captured_reference(&caps))
                    .with_counterparty(Counterparty::Recipient(capture_person(&caps, "recipient"))),
            );
        }

        // Till payments first: the paybill wording is a superset
        let payment = p
            .buy_goods
            .captures(text)
            .map(|caps| (TransactionType::MerchantPayment, capture(&caps, "merchant"), caps))
            .or_else(|| {
                p.paybill
                    .captures(text)
                    .map(|caps| (TransactionType::BillPayment, capture(&caps, "account"), caps))
            });

        if let Some((kind, payee, caps)) = payment {
            let kind = if self.patterns.utility.is_match(&payee) {
                TransactionType::Utility
            } else {
                kind
            };
            return Some(
                Transaction::new(kind, Channel::MPesa, text)
                    .with_amount(captured_amount(&caps))
                    .with_reference(captured_reference(&caps))
                    .with_counterparty(Counterparty::Recipient(payee)),
            );
        }

        if self.patterns.gambling.is_match(text) {
            let amount = self
                .patterns
                .amount
                .captures(text)
                .map(|caps| captured_amount(&caps))
                .unwrap_or(0.0);
            return Some(
                Transaction::new(TransactionType::Gambling, Channel::Other, text).with_amount(amount),
            );
        }

        let bank = &self.patterns.bank;
        if bank.keyword.is_match(text) {
            if let Some(caps) = bank.deposit.captures(text) {
                return Some(
                    Transaction::new(TransactionType::BankDeposit, Channel::Bank, text)
                        .with_amount(captured_amount(&caps))
                        .with_counterparty(Counterparty::Recipient(capture(&caps, "bank"))),
                );
            }
            if let Some(caps) = bank.withdraw.captures(text) {
                return Some(
                    Transaction::new(TransactionType::BankWithdraw, Channel::Bank, text)
                        .with_amount(captured_amount(&caps))
                        .with_counterparty(Counterparty::Sender(capture(&caps, "bank"))),
                );
            }
        }

        None
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn parse(line: &str) -> Transaction {
        SmsParser::new()
            .parse_line(line)
            .unwrap_or_else(|| panic!("expected a match for {line:?}"))
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("Ksh1,500.00"), 1500.0);
        assert_eq!(parse_amount("Ksh500"), 500.0);
        assert_eq!(parse_amount("Ksh 1,234.56"), 1234.56);
        assert_eq!(parse_amount("KES2,000.00"), 2000.0);
        assert_eq!(parse_amount("KES 3,500"), 3500.0);
        assert_eq!(parse_amount("ksh100"), 100.0);
        assert_eq!(parse_amount("5000.50"), 5000.5);
        assert_eq!(parse_amount("10,000"), 10000.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("-20"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_amount("Ksh"), 0.0);
    }

    #[test]
    fn test_mpesa_received() {
        let txn = parse("UA1234ABCD Confirmed. You have received Ksh1,500.00 from JOHN DOE");
        assert_eq!(txn.kind, TransactionType::TransferReceived);
        assert_eq!(txn.amount, 1500.0);
        assert_eq!(txn.reference.as_deref(), Some("UA1234ABCD"));
        assert_eq!(txn.sender(), Some("JOHN DOE"));
        assert_eq!(txn.channel, Channel::MPesa);
    }

    #[test]
    fn test_mpesa_received_other_prefix() {
        let txn = parse("QKJ3XPYC5T Confirmed. You have received Ksh15,000.00 from SARAH JANE");
        assert_eq!(txn.kind, TransactionType::TransferReceived);
        assert_eq!(txn.amount, 15000.0);
        assert_eq!(txn.reference.as_deref(), Some("QKJ3XPYC5T"));
    }

    #[test]
    fn test_mpesa_sent() {
        let txn = parse("UA5678EFGHIJ Confirmed. Ksh500.00 sent to JANE DOE 0798765432");
        assert_eq!(txn.kind, TransactionType::TransferSent);
        assert_eq!(txn.amount, 500.0);
        assert_eq!(txn.recipient(), Some("JANE DOE"));
    }

    #[test]
    fn test_mixed_case_names() {
        let mixed = parse("UA1234ABCD Confirmed. You have received Ksh1,500.00 from John Doe");
        assert_eq!(mixed.kind, TransactionType::TransferReceived);
        assert_eq!(mixed.sender(), Some("John Doe"));

        let lower = parse("UA1234ABCD Confirmed. You have received Ksh1,500.00 from john doe");
        assert_eq!(lower.amount, 1500.0);
        assert_eq!(lower.sender(), Some("john doe"));

        let hyphenated = parse("UA5678EFGHIJ Confirmed. Ksh500.00 sent to Mary-Anne O'Neil 0798765432");
        assert_eq!(hyphenated.recipient(), Some("Mary-Anne O'Neil"));
    }

    #[test]
    fn test_name_stops_before_connectives() {
        let txn = parse("UA1234ABCD Confirmed. You have received Ksh1,500.00 from Jane Doe on 5/1/24 at 10:15 AM");
        assert_eq!(txn.sender(), Some("Jane Doe"));

        let sent = parse("UA5678EFGHIJ Confirmed. Ksh500.00 sent to PETER OTIENO on 5/1/24");
        assert_eq!(sent.recipient(), Some("PETER OTIENO"));
    }

    #[test]
    fn test_mali_inside_name_is_transfer() {
        let txn = parse("UA1234ABCD Confirmed. Ksh500.00 sent to PETER KAMALI 0712345678");
        assert_eq!(txn.kind, TransactionType::TransferSent);
        assert_eq!(txn.recipient(), Some("PETER KAMALI"));
    }

    #[test]
    fn test_mpesa_payments() {
        let bill = parse("UA9999XYZABC Confirmed. Ksh1,000.00 paid to WATERWAYS SACCO Account 12345");
        assert_eq!(bill.kind, TransactionType::BillPayment);
        assert_eq!(bill.recipient(), Some("WATERWAYS SACCO"));

        let till = parse("UA9999XYZABC Confirmed. Ksh200.00 paid to SUPERMARKET Till Number 123456");
        assert_eq!(till.kind, TransactionType::MerchantPayment);
        assert_eq!(till.amount, 200.0);
    }

    #[test]
    fn test_utility_payee() {
        let txn = parse("UA9999XYZABC Confirmed. Ksh1,000.00 paid to KPLC Account 12345");
        assert_eq!(txn.kind, TransactionType::Utility);
        assert_eq!(txn.amount, 1000.0);
        assert_eq!(txn.recipient(), Some("KPLC"));
    }

    #[test]
    fn test_fuliza() {
        let loan = parse("Fuliza M-PESA. You have borrowed Ksh2,000.00");
        assert_eq!(loan.kind, TransactionType::OverdraftDraw);
        assert_eq!(loan.amount, 2000.0);

        let repay = parse("Fuliza M-PESA. You have repaid Ksh500.00");
        assert_eq!(repay.kind, TransactionType::OverdraftRepay);
        assert_eq!(repay.amount, 500.0);
    }

    #[test]
    fn test_airtel() {
        let received = parse("Transaction ID: AM12345678. You have received Ksh1,000.00 from JOHN DOE");
        assert_eq!(received.kind, TransactionType::TransferReceived);
        assert_eq!(received.channel, Channel::AirtelMoney);
        assert_eq!(received.reference.as_deref(), Some("AM12345678"));

        let sent = parse("Transaction ID: AM87654321. Ksh500.00 sent to JANE DOE");
        assert_eq!(sent.kind, TransactionType::TransferSent);
        assert_eq!(sent.amount, 500.0);

        let generic = parse("Airtel Money: Your transaction of Ksh200.00 was successful");
        assert_eq!(generic.kind, TransactionType::TransferReceived);
        assert_eq!(generic.amount, 200.0);
    }

    #[test]
    fn test_tkash() {
        let txn = parse("T-Kash: You have received Ksh1,000.00 from JOHN DOE");
        assert_eq!(txn.kind, TransactionType::TransferReceived);
        assert_eq!(txn.channel, Channel::TKash);
        assert_eq!(txn.sender(), Some("JOHN DOE"));
    }

    #[test]
    fn test_hustler() {
        let loan = parse("Hustler Fund. You have been disbursed Ksh500.00 to your account");
        assert_eq!(loan.kind, TransactionType::MicroloanDisburse);
        assert_eq!(loan.amount, 500.0);
        assert_eq!(loan.lender(), Some("Hustler Fund"));

        let repay = parse("Hustler Fund. You have repaid Ksh200.00");
        assert_eq!(repay.kind, TransactionType::MicroloanRepay);

        let sent = parse("Confirmed. You have sent Ksh2,000.00 to Hustler Fund on 20/1/26.");
        assert_eq!(sent.kind, TransactionType::MicroloanRepay);
        assert_eq!(sent.amount, 2000.0);

        let balance = parse("Hustler Fund. Your loan balance is Ksh300.00");
        assert_eq!(balance.kind, TransactionType::MicroloanDisburse);
        assert_eq!(balance.amount, 0.0);
        assert_eq!(balance.balance, Some(300.0));
    }

    #[test]
    fn test_okoa() {
        let advance = parse("You have received Ksh50 Okoa Jahazi airtime credit");
        assert_eq!(advance.kind, TransactionType::CreditAdvance);
        assert_eq!(advance.amount, 50.0);
        assert_eq!(advance.balance, None);

        let debt = parse("Your Okoa debt is Ksh50. Please repay");
        assert_eq!(debt.kind, TransactionType::CreditDebt);
        assert_eq!(debt.balance, Some(50.0));

        let combined = parse("You have received Ksh 100.00 Okoa Jahazi. Your Okoa debt is Ksh 110.00.");
        assert_eq!(combined.kind, TransactionType::CreditAdvance);
        assert_eq!(combined.amount, 100.0);
        assert_eq!(combined.balance, Some(110.0));
    }

    #[test]
    fn test_savings() {
        let deposit = parse("M-Shwari. You have deposited Ksh1,000.00 to your savings");
        assert_eq!(deposit.kind, TransactionType::SavingsDeposit);
        assert_eq!(deposit.recipient(), Some("M-Shwari"));

        let withdraw = parse("M-Shwari. You have withdrawn Ksh500.00");
        assert_eq!(withdraw.kind, TransactionType::SavingsWithdraw);
        assert_eq!(withdraw.amount, 500.0);

        let kcb = parse("KCB M-PESA. You have deposited Ksh2,000.00");
        assert_eq!(kcb.recipient(), Some("KCB M-Pesa"));

        let mali = parse("Mali. You have invested Ksh500.00 in money market fund");
        assert_eq!(mali.kind, TransactionType::SavingsDeposit);
        assert_eq!(mali.recipient(), Some("Mali"));
    }

    #[test]
    fn test_digital_lenders() {
        let tala = parse("You have received Ksh5,000.00 from Tala");
        assert_eq!(tala.kind, TransactionType::LenderDisburse);
        assert_eq!(tala.lender(), Some("Tala"));

        let branch = parse("Disbursed Ksh3,000.00 from Branch to your M-Pesa");
        assert_eq!(branch.kind, TransactionType::LenderDisburse);
        assert_eq!(branch.amount, 3000.0);

        let zenka = parse("Ksh1,000.00 paid to Zenka successfully");
        assert_eq!(zenka.kind, TransactionType::LenderRepay);
        assert_eq!(zenka.lender(), Some("Zenka"));

        let generic = parse("Your TALA loan repayment of KES 750 is due tomorrow");
        assert_eq!(generic.kind, TransactionType::LenderRepay);
        assert_eq!(generic.lender(), Some("Tala"));
    }

    #[test]
    fn test_gambling() {
        let betika = parse("Betika: Your bet of Ksh100.00 has been placed");
        assert_eq!(betika.kind, TransactionType::Gambling);
        assert_eq!(betika.amount, 100.0);

        let no_amount = parse("SportPesa: jackpot closes tonight");
        assert_eq!(no_amount.kind, TransactionType::Gambling);
        assert_eq!(no_amount.amount, 0.0);
    }

    #[test]
    fn test_bank_transfers() {
        let deposit = parse("You have deposited Ksh5,000.00 to Equity Bank account");
        assert_eq!(deposit.kind, TransactionType::BankDeposit);
        assert_eq!(deposit.channel, Channel::Bank);
        assert_eq!(deposit.recipient(), Some("Equity"));

        let withdraw = parse("Withdrawn Ksh2,000.00 from NCBA savings");
        assert_eq!(withdraw.kind, TransactionType::BankWithdraw);
        assert_eq!(withdraw.amount, 2000.0);
    }

    #[test]
    fn test_unmatched_line_dropped() {
        let parser = SmsParser::new();
        assert!(parser.parse_line("Invalid log message that won't match").is_none());
        assert!(parser.parse_line("").is_none());
        // Routed by keyword but no matching wording
        assert!(parser.parse_line("Fuliza limit review in progress").is_none());
    }

    #[test]
    fn test_parse_batch() {
        let logs = [
            "UA1234ABCDEF Confirmed. You have received Ksh1,500.00 from JOHN DOE 0712345678",
            "Fuliza M-PESA. You have borrowed Ksh2,000.00",
            "Invalid log message that won't match",
            "Hustler Fund. You have been disbursed Ksh500.00",
            "M-Shwari. You have deposited Ksh1,000.00 to your savings",
        ];

        let batch = SmsParser::new().parse_batch(&logs, &NeverCancel).unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.skipped, 1);
        assert!(!batch.is_silent());

        let kinds: Vec<_> = batch.transactions.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionType::TransferReceived,
                TransactionType::OverdraftDraw,
                TransactionType::MicroloanDisburse,
                TransactionType::SavingsDeposit,
            ]
        );
    }

    #[test]
    fn test_parse_batch_silent() {
        let batch = SmsParser::new()
            .parse_batch(&["Invalid log message that won't match"], &NeverCancel)
            .unwrap();
        assert!(batch.is_empty());
        assert!(batch.is_silent());

        let empty: [&str; 0] = [];
        let batch = SmsParser::new().parse_batch(&empty, &NeverCancel).unwrap();
        assert!(!batch.is_silent());
    }

    #[test]
    fn test_parse_batch_cancelled() {
        let cancelled = AtomicBool::new(true);
        let logs = vec!["UA1234ABCDEF Confirmed. You have received Ksh100.00 from TEST"; 200];

        let result = SmsParser::new().parse_batch(&logs, &cancelled);
        assert_eq!(result.unwrap_err(), ParseError::Cancelled { at_line: 0 });
    }

    #[test]
    fn test_whole_word_routing() {
        assert!(has_word("MALI. YOU HAVE INVESTED", "MALI"));
        assert!(has_word("SAVED TO (STAWI)", "STAWI"));
        assert!(!has_word("SENT TO PETER KAMALI", "MALI"));
        assert!(!has_word("MALIKA", "MALI"));
        assert_eq!(route("SENT TO PETER KAMALI"), Route::Default);
        assert_eq!(route("MALI. YOU HAVE INVESTED KSH500.00"), Route::Savings);
    }

    #[test]
    fn test_airtel_txn_id_detection() {
        assert!(has_airtel_txn_id("TRANSACTION ID: AM12345678."));
        assert!(has_airtel_txn_id("(AM87654321) SENT"));
        assert!(!has_airtel_txn_id("QAM1XYZ CONFIRMED"));
        assert!(!has_airtel_txn_id("AMOUNT DUE"));
    }
}
