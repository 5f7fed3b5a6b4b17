//! Detection of build units writing the same output file

use crate::model::UnitKey;
use crate::validate::{FieldLocator, Problem, ProblemSink};
use std::collections::HashMap;
use tracing::debug;

/// Tracks which unit last claimed each output path.
///
/// Paths are lower-cased on case-insensitive file systems. A collision is
/// reported against the new claimant, which then owns the path.
#[derive(Debug, Default)]
pub struct OutputConflictDetector {
    case_sensitive: bool,
    claims: HashMap<String, UnitKey>,
}

impl OutputConflictDetector {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            claims: HashMap::new(),
        }
    }

    /// Claim `output_path` for `key`; returns true when a conflict was reported
    pub fn check(&mut self, key: &UnitKey, output_path: &str, sink: &mut dyn ProblemSink) -> bool {
        let normalized = if self.case_sensitive {
            output_path.to_string()
        } else {
            output_path.to_lowercase()
        };

        let Some(existing) = self.claims.insert(normalized, key.clone()) else {
            return false;
        };

        debug!("{} and {} both write {}", existing, key, output_path);
        let message = format!(
            "Build configuration '{}' of module '{}' has the same output file: {}",
            existing.unit, existing.module, output_path
        );
        sink.report(
            &key.module,
            &key.unit,
            Problem::general_option(&key.unit, message, FieldLocator::OutputFileName),
        );
        true
    }

    pub fn claimed_paths(&self) -> usize {
        self.claims.len()
    }
}
