//! Pattern Table - Precompiled SMS matchers
//!
//! Immutable set of regexes grouped by provider. Compiled once on first use and
//! shared read-only by every parser instance.
//!
//! Named capture groups:
//! - `amt`: amount text (`1,500.00`)
//! - `refcode`: transaction reference code
//! - `sender` / `recipient` / `account` / `merchant` / `lender` / `bank`: counterparty

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// BUILDING BLOCKS
// ============================================================================

/// Currency prefix (`Ksh`, `KES`, `Ksh.`)
const CUR: &str = r"(?:Ksh|KES)\.?\s*";

/// Amount with thousands separators and optional decimals
const AMT: &str = r"(?P<amt>\d[\d,]*(?:\.\d+)?)";

/// Reference code followed by the "Confirmed" marker
const REF: &str = r"\b(?P<refcode>[A-Z0-9]{10,12})\s+confirmed\.?\s+";

/// Digital lenders with dedicated disbursement/repayment wording
const LENDERS: &str = r"tala|branch|zenka|zash|okolea";

/// Person name in any case: letters, apostrophes and hyphens, space separated.
/// Trailing connective words (`on`, `at`) are trimmed by the parser.
fn person(group: &str) -> String {
    format!(r"(?P<{group}>[A-Za-z][A-Za-z'\-]*(?: [A-Za-z][A-Za-z'\-]*)*)")
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

// ============================================================================
// PROVIDER GROUPS
// ============================================================================

/// M-Pesa (primary peer network)
pub struct MpesaPatterns {
    pub received: Regex,
    pub sent: Regex,
    pub buy_goods: Regex,
    pub paybill: Regex,
}

/// Airtel Money (alternate peer network)
pub struct AirtelPatterns {
    pub received: Regex,
    pub sent: Regex,
    pub keyword: Regex,
}

/// T-Kash (Telkom)
pub struct TkashPatterns {
    pub received: Regex,
    pub sent: Regex,
}

/// Fuliza overdraft
pub struct OverdraftPatterns {
    pub borrowed: Regex,
    pub repaid: Regex,
}

/// Hustler Fund government microloan
pub struct MicroloanPatterns {
    pub disbursed: Regex,
    pub repaid: Regex,
    pub sent_repayment: Regex,
    pub balance: Regex,
}

/// Okoa Jahazi prepaid credit
pub struct CreditPatterns {
    pub advance: Regex,
    pub debt: Regex,
    pub repaid: Regex,
}

/// Savings funds (M-Shwari, KCB M-Pesa, Mali, Stawi)
pub struct SavingsPatterns {
    pub mshwari_deposit: Regex,
    pub mshwari_withdraw: Regex,
    pub kcb_deposit: Regex,
    pub mali_deposit: Regex,
    pub stawi_deposit: Regex,
    pub keyword: Regex,
}

/// Third-party digital lenders
pub struct LenderPatterns {
    pub disbursement: Regex,
    pub repayment: Regex,
    pub keyword: Regex,
}

/// Bank transfers
pub struct BankPatterns {
    pub keyword: Regex,
    pub deposit: Regex,
    pub withdraw: Regex,
}

// ============================================================================
// PATTERN TABLE
// ============================================================================

/// Every matcher the parser uses
pub struct PatternTable {
    pub mpesa: MpesaPatterns,
    pub airtel: AirtelPatterns,
    pub tkash: TkashPatterns,
    pub overdraft: OverdraftPatterns,
    pub microloan: MicroloanPatterns,
    pub credit: CreditPatterns,
    pub savings: SavingsPatterns,
    pub lenders: LenderPatterns,
    pub bank: BankPatterns,
    pub gambling: Regex,
    pub utility: Regex,
    /// Fallback amount extractor for keyword-only matches
    pub amount: Regex,
}

static PATTERNS: Lazy<PatternTable> = Lazy::new(PatternTable::compile);

impl PatternTable {
    /// Shared table, compiled on first access
    pub fn global() -> &'static PatternTable {
        &PATTERNS
    }

    fn compile() -> Self {
        log::debug!("Compiling SMS pattern table");

        let mpesa = MpesaPatterns {
            received: compile(&format!(
                r"(?i){REF}you\s+have\s+received\s+{CUR}{AMT}\s+from\s+{}",
                person("sender")
            )),
            sent: compile(&format!(
                r"(?i){REF}{CUR}{AMT}\s+sent\s+to\s+{}",
                person("recipient")
            )),
            buy_goods: compile(&format!(
                r"(?i){REF}{CUR}{AMT}\s+paid\s+to\s+(?P<merchant>[^.]+?)\s+till\b"
            )),
            paybill: compile(&format!(
                r"(?i){REF}{CUR}{AMT}\s+paid\s+to\s+(?P<account>[^.]+?)(?:\s+(?:account|acc)\b|\s+for\s|\s+on\s|\.|$)"
            )),
        };

        let airtel = AirtelPatterns {
            received: compile(&format!(
                r"(?i)transaction\s+id[:\s]*(?P<refcode>AM[A-Z0-9]+).*?you\s+have\s+received\s+{CUR}{AMT}\s+from\s+{}",
                person("sender")
            )),
            sent: compile(&format!(
                r"(?i)transaction\s+id[:\s]*(?P<refcode>AM[A-Z0-9]+).*?{CUR}{AMT}\s+sent\s+to\s+{}",
                person("recipient")
            )),
            keyword: compile(r"(?i)airtel\s*money"),
        };

        let tkash = TkashPatterns {
            received: compile(&format!(
                r"(?i)t-kash.*?you\s+have\s+received\s+{CUR}{AMT}\s+from\s+{}",
                person("sender")
            )),
            sent: compile(&format!(
                r"(?i)t-kash.*?{CUR}{AMT}\s+sent\s+to\s+{}",
                person("recipient")
            )),
        };

        let overdraft = OverdraftPatterns {
            borrowed: compile(&format!(r"(?i)fuliza.*?you\s+have\s+borrowed\s+{CUR}{AMT}")),
            repaid: compile(&format!(r"(?i)fuliza.*?you\s+have\s+repaid\s+{CUR}{AMT}")),
        };

        let microloan = MicroloanPatterns {
            disbursed: compile(&format!(r"(?i)hustler\s+fund.*?(?:disbursed|received)\s+{CUR}{AMT}")),
            repaid: compile(&format!(r"(?i)hustler\s+fund.*?repaid\s+{CUR}{AMT}")),
            sent_repayment: compile(&format!(r"(?i)sent\s+{CUR}{AMT}\s+to\s+hustler\s+fund")),
            balance: compile(&format!(
                r"(?i)hustler\s+fund.*?(?:balance|limit)\s+(?:is\s+)?{CUR}{AMT}"
            )),
        };

        let credit = CreditPatterns {
            advance: compile(&format!(r"(?i)(?:received|got)\s+{CUR}{AMT}\s+okoa\s+jahazi")),
            debt: compile(&format!(r"(?i)okoa\s+(?:jahazi\s+)?debt\s+(?:is\s+)?{CUR}{AMT}")),
            repaid: compile(&format!(r"(?i)okoa\s+jahazi.*?repaid\s+{CUR}{AMT}")),
        };

        let savings = SavingsPatterns {
            mshwari_deposit: compile(&format!(
                r"(?i)m-shwari.*?(?:deposited|saved|transferred)\s+{CUR}{AMT}"
            )),
            mshwari_withdraw: compile(&format!(r"(?i)m-shwari.*?(?:withdrawn|withdrew)\s+{CUR}{AMT}")),
            kcb_deposit: compile(&format!(
                r"(?i)kcb\s*m-?pesa.*?(?:deposited|saved|transferred)\s+{CUR}{AMT}"
            )),
            mali_deposit: compile(&format!(r"(?i)\bmali\b.*?(?:deposited|invested|saved)\s+{CUR}{AMT}")),
            stawi_deposit: compile(&format!(r"(?i)\bstawi\b.*?(?:deposited|saved)\s+{CUR}{AMT}")),
            keyword: compile(r"(?i)(m-shwari|kcb\s*m-?pesa|\bmali\b|\bstawi\b|lock\s+savings)"),
        };

        let lenders = LenderPatterns {
            disbursement: compile(&format!(
                r"(?i)(?:received|disbursed)\s+{CUR}{AMT}\s+(?:from\s+)?(?P<lender>{LENDERS})\b"
            )),
            repayment: compile(&format!(
                r"(?i){CUR}{AMT}\s+(?:paid\s+(?:to\s+)?|received\s+by\s+)(?P<lender>{LENDERS})\b"
            )),
            keyword: compile(
                r"(?i)\b(tala|branch|zenka|zash|okolea|kcb-mpesa|fuliza|timiza|berry|kashway)\b",
            ),
        };

        let bank = BankPatterns {
            keyword: compile(
                r"(?i)\b(kcb|equity|co-?op(?:erative)?|ncba|stanbic|absa|dtb|i&m|family\s+bank|bank\s+of\s+africa)\b",
            ),
            deposit: compile(&format!(
                r"(?i)(?:deposited|transferred|sent)\s+{CUR}{AMT}\s+(?:to\s+)?(?P<bank>kcb|equity|co-?op|ncba|stanbic|absa)"
            )),
            withdraw: compile(&format!(
                r"(?i)(?:withdrawn|received)\s+{CUR}{AMT}\s+(?:from\s+)?(?P<bank>kcb|equity|co-?op|ncba|stanbic|absa)"
            )),
        };

        Self {
            mpesa,
            airtel,
            tkash,
            overdraft,
            microloan,
            credit,
            savings,
            lenders,
            bank,
            gambling: compile(
                r"(?i)(betika|sportpesa|mozzart|odibets|betway|1xbet|betin|dafabet|22bet|helabet)",
            ),
            utility: compile(
                r"(?i)(kplc|kenya\s+power|nairobi\s+water|safaricom\s+home|zuku|dstv|gotv|startimes)",
            ),
            amount: compile(&format!(r"(?i){CUR}{AMT}")),
        }
    }
}

/// Canonical spelling for a lender name captured in any case
pub fn canonical_lender(raw: &str) -> String {
    match raw.to_ascii_lowercase().as_str() {
        "tala" => "Tala".to_string(),
        "branch" => "Branch".to_string(),
        "zenka" => "Zenka".to_string(),
        "zash" => "Zash".to_string(),
        "okolea" => "Okolea".to_string(),
        "kcb-mpesa" => "KCB-MPESA".to_string(),
        "fuliza" => "Fuliza".to_string(),
        "timiza" => "Timiza".to_string(),
        "berry" => "Berry".to_string(),
        "kashway" => "Kashway".to_string(),
        _ => raw.trim().to_string(),
    }
}
