//! Credential risk scoring
//!
//! Scores are additive penalties clamped to 0..=100, then bucketed into a
//! category. All weights and thresholds are the constants below.

use std::fmt;

use tracing::debug;

use crate::breach::{BreachChecker, BreachQueryResult, HttpRangeClient, RangeClient};
use crate::strength;

/// Password contribution is this minus the password's entropy, floored at 0.
pub const PASSWORD_RISK_CEILING: u32 = 80;

/// Added when the password appears in the breach corpus at least once.
pub const BREACH_PENALTY: u32 = 30;

/// Emails shorter than this many characters are penalized.
pub const MIN_EMAIL_LEN: usize = 8;
pub const SHORT_EMAIL_PENALTY: u32 = 10;

/// Usernames shorter than this many characters are penalized.
pub const MIN_USERNAME_LEN: usize = 5;
pub const SHORT_USERNAME_PENALTY: u32 = 10;

/// Contact counts strictly above these thresholds each add [`CONTACTS_PENALTY`].
pub const LARGE_CONTACTS_THRESHOLD: u64 = 500;
pub const VERY_LARGE_CONTACTS_THRESHOLD: u64 = 5_000;
pub const CONTACTS_PENALTY: u32 = 10;

pub const MAX_SCORE: u32 = 100;

/// Inclusive upper bounds of the Low, Medium and High bands. Anything above
/// `HIGH_MAX` is Critical.
pub const LOW_MAX: u32 = 30;
pub const MEDIUM_MAX: u32 = 60;
pub const HIGH_MAX: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskCategory {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=LOW_MAX => RiskCategory::Low,
            _ if score <= MEDIUM_MAX => RiskCategory::Medium,
            _ if score <= HIGH_MAX => RiskCategory::High,
            _ => RiskCategory::Critical,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
            RiskCategory::Critical => "Critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    score: u32,
    category: RiskCategory,
    findings: Vec<String>,
    warnings: Vec<String>,
}

impl RiskAssessment {
    /// 0..=100
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn category(&self) -> RiskCategory {
        self.category
    }

    /// Reasons that contributed to the score, in evaluation order.
    pub fn findings(&self) -> &[String] {
        &self.findings
    }

    /// Non-fatal problems hit while scanning, such as an unreachable breach
    /// service.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// The inputs of one scan.
#[derive(Clone, Copy)]
pub struct RiskInput<'a> {
    pub password: &'a str,
    pub email: &'a str,
    pub username: &'a str,
    pub contacts: u64,
}

impl fmt::Debug for RiskInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskInput")
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("contacts", &self.contacts)
            .finish()
    }
}

/// Risk contributed by the password alone. Never increases as the password
/// gets longer or draws on more character classes.
pub fn password_risk(password: &str) -> u32 {
    PASSWORD_RISK_CEILING.saturating_sub(strength::entropy_bits(password))
}

/// Score a scan given an already completed breach lookup.
pub fn score(input: &RiskInput<'_>, breach: &BreachQueryResult) -> RiskAssessment {
    let mut total = 0u32;
    let mut findings = Vec::new();
    let mut warnings = Vec::new();

    let pw_risk = password_risk(input.password);
    total += pw_risk;
    findings.push(format!("Password risk: {}", pw_risk));

    if breach.is_breached() {
        total += BREACH_PENALTY;
        findings.push(format!("Breached {} times", breach.count));
    }
    if let Some(warning) = &breach.warning {
        warnings.push(warning.clone());
    }

    if input.email.chars().count() < MIN_EMAIL_LEN {
        total += SHORT_EMAIL_PENALTY;
        findings.push("Short email".to_owned());
    }

    if input.username.chars().count() < MIN_USERNAME_LEN {
        total += SHORT_USERNAME_PENALTY;
        findings.push("Short username".to_owned());
    }

    if input.contacts > LARGE_CONTACTS_THRESHOLD {
        total += CONTACTS_PENALTY;
        findings.push("Large contact surface".to_owned());
    }
    if input.contacts > VERY_LARGE_CONTACTS_THRESHOLD {
        total += CONTACTS_PENALTY;
        findings.push("Very large contact surface".to_owned());
    }

    let score = total.min(MAX_SCORE);
    RiskAssessment {
        score,
        category: RiskCategory::from_score(score),
        findings,
        warnings,
    }
}

/// Runs one breach lookup per assessment and scores the result.
pub struct RiskScorer<C = HttpRangeClient> {
    breach: Option<BreachChecker<C>>,
}

impl<C: RangeClient> RiskScorer<C> {
    pub fn new(breach: BreachChecker<C>) -> Self {
        Self {
            breach: Some(breach),
        }
    }

    /// A scorer that never touches the network; breach status is reported
    /// as unchecked.
    pub fn offline() -> Self {
        Self { breach: None }
    }

    pub async fn assess(&self, input: &RiskInput<'_>) -> RiskAssessment {
        let breach = match &self.breach {
            Some(checker) => checker.check(input.password).await,
            None => BreachQueryResult::unknown("breach check disabled"),
        };
        let assessment = score(input, &breach);
        debug!(
            score = assessment.score,
            category = %assessment.category,
            findings = assessment.findings.len(),
            "risk assessment complete"
        );
        assessment
    }
}
