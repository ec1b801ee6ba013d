//! Flaw filtering based on user flags and per-flaw attributes.
use std::fmt;
use veracode_platform::Flaw;

/// Module label carried by flaws found by dynamic analysis
pub const DYNAMIC_MODULE: &str = "dynamic_analysis";
/// Module label carried by flaws found by manual penetration testing
pub const MANUAL_MODULE: &str = "manual_analysis";

/// Remediation states that mean the flaw is no longer open
const CLOSED_REMEDIATION_STATUSES: &[&str] = &["Fixed", "Cannot Reproduce"];

/// Why a flaw was left out of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Closed,
    NotPolicyViolating,
    Mitigated,
    NotStatic,
    NotDynamic,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::Closed => "fixed or cannot reproduce",
            DropReason::NotPolicyViolating => "does not affect policy compliance",
            DropReason::Mitigated => "mitigation accepted",
            DropReason::NotStatic => "not a static flaw",
            DropReason::NotDynamic => "not a dynamic flaw",
        };
        f.write_str(reason)
    }
}

/// Which flaws make it into the report.
///
/// `include_non_policy_violating` and `include_mitigated` widen the default
/// selection (open, policy-violating, unmitigated flaws). `static_only` and
/// `dynamic_only` narrow it; setting both selects nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub include_non_policy_violating: bool,
    pub include_mitigated: bool,
    pub static_only: bool,
    pub dynamic_only: bool,
}

impl FilterOptions {
    /// The first rule that excludes `flaw`, if any.
    pub fn drop_reason(&self, flaw: &Flaw) -> Option<DropReason> {
        let is_dynamic = flaw.module == DYNAMIC_MODULE;

        if CLOSED_REMEDIATION_STATUSES.contains(&flaw.remediation_status.as_str()) {
            Some(DropReason::Closed)
        } else if !self.include_non_policy_violating && flaw.affects_policy_compliance == "false" {
            Some(DropReason::NotPolicyViolating)
        } else if !self.include_mitigated && flaw.mitigation_status == "accepted" {
            Some(DropReason::Mitigated)
        } else if self.static_only && is_dynamic {
            Some(DropReason::NotStatic)
        } else if self.dynamic_only && !is_dynamic {
            Some(DropReason::NotDynamic)
        } else {
            None
        }
    }

    /// Whether `flaw` belongs in the report.
    pub fn keeps(&self, flaw: &Flaw) -> bool {
        self.drop_reason(flaw).is_none()
    }
}
