//! Safety Classifier
//!
//! CHỈ chứa logic classify - không có types, không có rule data.
//! Input: ProcessRecord + Description + snapshot context
//! Output: SafetyVerdict (tier + impact)
//!
//! Rules are evaluated in order, most specific first, and folded monotonically:
//! the highest tier produced by any matching rule wins, and a tier never
//! downgrades within one evaluation. Classification never fails: a gap in
//! signal degrades to Caution, it must never hide a process from the user.

use std::collections::HashMap;

use crate::logic::process_intel::facts;
use crate::logic::process_intel::snapshot::ProcessSnapshot;
use crate::logic::process_intel::types::{Description, ProcessRecord};

use super::rules;
use super::types::{SafetyTier, SafetyVerdict};

// ============================================================================
// PER-RECORD CLASSIFICATION (rules 1-3, 5-7)
// ============================================================================

/// Classify một record độc lập. Rule 4 (Critical propagation qua parent
/// chain) là việc của [`classify_snapshot`] vì nó cần toàn bộ scan.
pub fn classify_record(record: &ProcessRecord, description: &Description) -> SafetyVerdict {
    let name_lower = record.name_lower();
    let fact = facts::lookup(&name_lower);
    let mut matches: Vec<SafetyVerdict> = Vec::new();

    // Rule 1: kernel / session manager / core subsystem
    if rules::RESERVED_SYSTEM_PIDS.contains(&record.pid) || rules::is_always_critical(&name_lower)
    {
        let impact = fact
            .filter(|f| !f.kill_impact.is_empty())
            .map(|f| f.kill_impact.to_string())
            .unwrap_or_else(|| rules::CRITICAL_IMPACT.to_string());
        matches.push(SafetyVerdict::new(SafetyTier::Critical, impact, "core-system-process"));
    }

    // Rule 2: hosts services essential to the running session
    let essential: Vec<&str> = record
        .hosted_services
        .iter()
        .filter(|s| rules::is_essential_service(s))
        .map(|s| s.as_str())
        .collect();
    if !essential.is_empty() {
        matches.push(SafetyVerdict::new(
            SafetyTier::Critical,
            format!("Hosts essential system services: {}", essential.join(", ")),
            "essential-service-host",
        ));
    }

    // Rule 3: fact base marks the executable Critical or Caution
    if let Some(fact) = fact {
        if fact.tier >= SafetyTier::Caution {
            let impact = if fact.kill_impact.is_empty() {
                format!("{} provides important functionality.", fact.description)
            } else {
                fact.kill_impact.to_string()
            };
            matches.push(SafetyVerdict::new(fact.tier, impact, "fact-base"));
        }
    }
    // Caution overrides ride along with the fact base tier data
    if rules::is_caution_override(&name_lower) {
        matches.push(SafetyVerdict::new(
            SafetyTier::Caution,
            "This process may affect system functionality if terminated.",
            "caution-override",
        ));
    }

    // Rule 5: unsigned executable in a temporary / uncommon-writable directory
    let path_lower = record
        .exe_path
        .as_ref()
        .map(|p| p.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let suspicious_location = rules::in_suspicious_path(&path_lower);
    if record.signature.is_unsigned() && suspicious_location {
        matches.push(SafetyVerdict::new(
            SafetyTier::Caution,
            "Unsigned executable running from a temporary directory.",
            "risk-signal",
        ));
    }

    // Rule 6: fact base says Safe, or user-owned with no risk signal
    if let Some(fact) = fact {
        if fact.tier == SafetyTier::Safe {
            matches.push(SafetyVerdict::new(
                SafetyTier::Safe,
                fact.kill_impact,
                "fact-base-safe",
            ));
        }
    } else {
        let risk_signal = record.signature.is_unsigned() || suspicious_location;
        if !risk_signal && !record.is_system_owned() && record.user.is_some() {
            matches.push(SafetyVerdict::new(
                SafetyTier::Safe,
                format!("User application ({}).", description.text),
                "user-owned",
            ));
        }
    }

    // Fold: highest tier wins, first rule at that tier keeps the explanation
    let mut verdict: Option<SafetyVerdict> = None;
    for candidate in matches {
        match verdict.as_mut() {
            None => verdict = Some(candidate),
            Some(current) => current.raise_to(candidate),
        }
    }

    // Rule 7: unknown is never silently Safe
    verdict.unwrap_or_else(|| {
        SafetyVerdict::new(SafetyTier::Caution, rules::UNKNOWN_IMPACT, "default-caution")
    })
}

// ============================================================================
// SNAPSHOT CLASSIFICATION (adds rule 4 propagation)
// ============================================================================

/// Classify toàn bộ snapshot, rồi propagate Critical lên ancestor chain.
///
/// Rule 4: a process that is an ancestor of a Critical process is itself
/// Critical. Walks are bounded by the snapshot's visited-set traversal, so
/// stale or recycled parent links cannot loop.
pub fn classify_snapshot(
    snapshot: &ProcessSnapshot,
    descriptions: &HashMap<u32, Description>,
) -> HashMap<u32, SafetyVerdict> {
    let fallback = Description::unknown("");
    let mut verdicts: HashMap<u32, SafetyVerdict> = HashMap::with_capacity(snapshot.len());

    for record in snapshot.records() {
        let description = descriptions.get(&record.pid).unwrap_or(&fallback);
        verdicts.insert(record.pid, classify_record(record, description));
    }

    // Upward propagation pass
    let critical_pids: Vec<u32> = verdicts
        .iter()
        .filter(|(_, v)| v.tier == SafetyTier::Critical)
        .map(|(pid, _)| *pid)
        .collect();

    for pid in critical_pids {
        for ancestor in snapshot.ancestry_chain(pid).into_iter().skip(1) {
            if let Some(verdict) = verdicts.get_mut(&ancestor) {
                verdict.raise_to(SafetyVerdict::new(
                    SafetyTier::Critical,
                    "Ancestor of a critical system process; terminating the tree would take the critical process down.",
                    "critical-ancestor",
                ));
            }
        }
    }

    verdicts
}
