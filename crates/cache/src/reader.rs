//! Validating cache loads and rule re-attachment.

use crate::format::{self, Snapshot};
use crate::CacheError;
use arena::packed;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tree::{Rule, Value};

/// Re-extraction seam for executable rules.
///
/// Rules cannot be serialized, so after a cache load the framework
/// re-evaluates whichever source files can produce executable values and
/// answers position queries through this trait. A position with no match
/// keeps its placeholder.
pub trait RuleSource {
    /// The re-extracted rule that lives at `(locale, flat_key)`, if any.
    fn rule_for(&self, locale: &str, flat_key: &str) -> Option<Rule>;
}

/// A [`RuleSource`] with no rules. For indices that never held executable
/// rules (the common case) this is all a caller needs.
pub struct NoRules;

impl RuleSource for NoRules {
    fn rule_for(&self, _locale: &str, _flat_key: &str) -> Option<Rule> {
        None
    }
}

/// Loads `path` if it is a valid cache for the given fingerprint and
/// separator. Every defect is a miss (`None`); the caller compacts from
/// scratch.
///
/// On a hit, recorded rule positions are patched through `rules` before the
/// snapshot is returned.
pub fn load(
    path: &Path,
    expected_fingerprint: &str,
    separator: &str,
    rules: &dyn RuleSource,
) -> Option<Snapshot> {
    let mut snapshot = match try_load(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cache miss");
            return None;
        }
    };

    if snapshot.fingerprint != expected_fingerprint {
        tracing::debug!(path = %path.display(), "cache miss: fingerprint changed");
        return None;
    }
    if snapshot.separator != separator {
        tracing::debug!(path = %path.display(), "cache miss: separator mismatch");
        return None;
    }
    if let Err(e) = validate(&snapshot) {
        tracing::debug!(path = %path.display(), error = %e, "cache miss: invalid snapshot");
        return None;
    }

    patch_rules(&mut snapshot, rules);
    Some(snapshot)
}

fn try_load(path: &Path) -> Result<Snapshot, CacheError> {
    let file = File::open(path)?;
    format::read_frame(&mut BufReader::new(file))
}

/// Range-checks every packed word and recorded rule position, so garbage on
/// disk can never turn into a panic inside the finalized index.
fn validate(snapshot: &Snapshot) -> Result<(), CacheError> {
    let arena_len = snapshot.arena.len() as u64;
    let object_count = snapshot.objects.len() as u32;
    let key_count = snapshot.keys.len();

    for (_, column) in &snapshot.columns {
        if column.len() > key_count {
            return Err(CacheError::Corrupt("column longer than schema"));
        }
        for &word in column {
            if !packed::is_valid(word, arena_len, object_count) {
                return Err(CacheError::Corrupt("packed reference out of range"));
            }
        }
    }

    for (index, _) in &snapshot.rule_positions {
        match snapshot.objects.get(*index as usize) {
            Some(Value::RulePlaceholder) => {}
            _ => return Err(CacheError::Corrupt("rule position does not hold a placeholder")),
        }
    }

    Ok(())
}

/// Replaces placeholders with re-extracted rules. The first position that
/// resolves wins; unmatched slots stay placeholders and surface as no-ops.
fn patch_rules(snapshot: &mut Snapshot, rules: &dyn RuleSource) {
    for (index, positions) in &snapshot.rule_positions {
        for (locale, key) in positions {
            if let Some(rule) = rules.rule_for(locale, key) {
                snapshot.objects[*index as usize] = Value::Rule(rule);
                break;
            }
        }
    }
}
