//! # Engine Configuration
//!
//! `assignwise.toml` describes which apps and fields the engine works on.
//!
//! ## Example
//!
//! ```toml
//! reference_app = "42"
//! source_app = "7"
//! assignee_field = "Assignee"
//! counter_field = "Open_Tickets"
//! threshold = 5
//!
//! [[priority]]
//! field = "Open_Tickets"
//! rank = 1
//! direction = "minimize"
//! ```
//!
//! Every `[work_item]` key defaults to the field codes of the reference
//! support workflow (see `assignwise_core::primitives`).
//!
//! ## Environment Variables
//!
//! - `ASSIGNWISE_CONFIG`: config path when `--config` is not given
//!   (default: `assignwise.toml`)

use assignwise_core::{
    AppId, AssignwiseError, PriorityRule, StageStamp, StalenessCheck,
    primitives::{
        DEFAULT_ASSIGNMENT_DATE_FIELD, DEFAULT_DEADLINE_MIRRORS, DEFAULT_DEDICATED_ASSIGNEE_FIELD,
        DEFAULT_ELAPSED_DAYS_FIELD, DEFAULT_MAX_CAS_ATTEMPTS, DEFAULT_TERMINAL_STAMP_FIELD,
        MAX_CAS_ATTEMPTS_LIMIT, MAX_FIELD_CODE_LENGTH,
    },
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config path used when neither `--config` nor `ASSIGNWISE_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "assignwise.toml";

// =============================================================================
// WORK ITEM FIELDS
// =============================================================================

/// Copy `source` into `target` whenever the work item carries `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineMirror {
    pub source: String,
    pub target: String,
}

/// Field codes written on work items of the source app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkItemFields {
    pub assignment_date_field: String,
    pub assignee_field: String,
    pub terminal_stamp_field: String,
    pub elapsed_days_field: String,
    pub stage_stamps: Vec<StageStamp>,
    pub deadline_mirrors: Vec<DeadlineMirror>,
}

impl Default for WorkItemFields {
    fn default() -> Self {
        Self {
            assignment_date_field: DEFAULT_ASSIGNMENT_DATE_FIELD.to_string(),
            assignee_field: DEFAULT_DEDICATED_ASSIGNEE_FIELD.to_string(),
            terminal_stamp_field: DEFAULT_TERMINAL_STAMP_FIELD.to_string(),
            elapsed_days_field: DEFAULT_ELAPSED_DAYS_FIELD.to_string(),
            stage_stamps: StageStamp::defaults(),
            deadline_mirrors: DEFAULT_DEADLINE_MIRRORS
                .iter()
                .map(|(source, target)| DeadlineMirror {
                    source: (*source).to_string(),
                    target: (*target).to_string(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// ENGINE CONFIG
// =============================================================================

fn default_max_cas_attempts() -> u32 {
    DEFAULT_MAX_CAS_ATTEMPTS
}

/// Everything the assignment engine needs to know about the two apps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// App holding one record per candidate, with the load counter.
    pub reference_app: AppId,
    /// App holding the work items being assigned.
    pub source_app: AppId,
    /// User-selection field identifying the candidate on reference records.
    pub assignee_field: String,
    /// Load counter field on reference records.
    pub counter_field: String,
    /// Candidates at or above this load are not considered.
    pub threshold: f64,
    #[serde(default)]
    pub staleness_check: StalenessCheck,
    #[serde(default = "default_max_cas_attempts")]
    pub max_cas_attempts: u32,
    #[serde(default)]
    pub priority: Vec<PriorityRule>,
    #[serde(default)]
    pub work_item: WorkItemFields,
}

impl EngineConfig {
    /// Minimal configuration with default work-item fields and no rules.
    #[must_use]
    pub fn new(
        reference_app: AppId,
        source_app: AppId,
        assignee_field: impl Into<String>,
        counter_field: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            reference_app,
            source_app,
            assignee_field: assignee_field.into(),
            counter_field: counter_field.into(),
            threshold,
            staleness_check: StalenessCheck::default(),
            max_cas_attempts: DEFAULT_MAX_CAS_ATTEMPTS,
            priority: Vec::new(),
            work_item: WorkItemFields::default(),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: PriorityRule) -> Self {
        self.priority.push(rule);
        self
    }

    #[must_use]
    pub fn with_staleness_check(mut self, check: StalenessCheck) -> Self {
        self.staleness_check = check;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, AssignwiseError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AssignwiseError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self, AssignwiseError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AssignwiseError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        tracing::info!("Loading configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Resolve the config path: explicit flag, then `ASSIGNWISE_CONFIG`,
    /// then [`DEFAULT_CONFIG_PATH`].
    #[must_use]
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var("ASSIGNWISE_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Reject empty or oversized field codes, a non-finite threshold and
    /// an out-of-range attempt bound. An empty rule list is valid: every
    /// candidate then ties.
    pub fn validate(&self) -> Result<(), AssignwiseError> {
        let work_item = &self.work_item;
        let mut codes: Vec<(&str, &str)> = vec![
            ("assignee_field", self.assignee_field.as_str()),
            ("counter_field", self.counter_field.as_str()),
            (
                "work_item.assignment_date_field",
                work_item.assignment_date_field.as_str(),
            ),
            ("work_item.assignee_field", work_item.assignee_field.as_str()),
            (
                "work_item.terminal_stamp_field",
                work_item.terminal_stamp_field.as_str(),
            ),
            (
                "work_item.elapsed_days_field",
                work_item.elapsed_days_field.as_str(),
            ),
        ];
        codes.extend(self.priority.iter().map(|r| ("priority.field", r.field.as_str())));
        codes.extend(
            work_item
                .stage_stamps
                .iter()
                .map(|s| ("work_item.stage_stamps.field", s.field.as_str())),
        );
        for mirror in &work_item.deadline_mirrors {
            codes.push(("work_item.deadline_mirrors.source", mirror.source.as_str()));
            codes.push(("work_item.deadline_mirrors.target", mirror.target.as_str()));
        }

        for (key, code) in codes {
            if code.trim().is_empty() {
                return Err(AssignwiseError::Config(format!("{} must not be empty", key)));
            }
            if code.len() > MAX_FIELD_CODE_LENGTH {
                return Err(AssignwiseError::Config(format!(
                    "{} exceeds {} bytes",
                    key, MAX_FIELD_CODE_LENGTH
                )));
            }
        }

        if !self.threshold.is_finite() {
            return Err(AssignwiseError::Config("threshold must be finite".to_string()));
        }
        if !(1..=MAX_CAS_ATTEMPTS_LIMIT).contains(&self.max_cas_attempts) {
            return Err(AssignwiseError::Config(format!(
                "max_cas_attempts must be between 1 and {}",
                MAX_CAS_ATTEMPTS_LIMIT
            )));
        }
        Ok(())
    }

    /// Keys read from every reference record: the counter first, then each
    /// priority field once.
    #[must_use]
    pub fn metric_keys(&self) -> Vec<&str> {
        let mut keys = vec![self.counter_field.as_str()];
        for rule in &self.priority {
            if !keys.contains(&rule.field.as_str()) {
                keys.push(&rule.field);
            }
        }
        keys
    }

    /// Field projection of the candidate query, without duplicates.
    #[must_use]
    pub fn projected_fields(&self) -> Vec<String> {
        let mut fields = vec![self.assignee_field.clone()];
        for key in self.metric_keys() {
            if !fields.iter().any(|field| field == key) {
                fields.push(key.to_string());
            }
        }
        fields
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assignwise_core::Direction;

    const SAMPLE: &str = r#"
        reference_app = "42"
        source_app = "7"
        assignee_field = "Assignee"
        counter_field = "Open_Tickets"
        threshold = 5.0
        staleness_check = "aggregate-sum"

        [[priority]]
        field = "Open_Tickets"
        rank = 1
        direction = "lth"

        [[priority]]
        field = "Skill"
        rank = 2
        direction = "htl"

        [work_item]
        elapsed_days_field = "Elapsed"
    "#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = EngineConfig::from_toml_str(SAMPLE).expect("config");

        assert_eq!(config.reference_app, AppId::new("42"));
        assert_eq!(config.staleness_check, StalenessCheck::AggregateSum);
        assert_eq!(config.max_cas_attempts, DEFAULT_MAX_CAS_ATTEMPTS);
        assert_eq!(config.priority[1].direction, Direction::Maximize);
        assert_eq!(config.work_item.elapsed_days_field, "Elapsed");
        assert_eq!(config.work_item.terminal_stamp_field, "Resolved_Actual");
        assert_eq!(config.work_item.stage_stamps.len(), 2);
        assert_eq!(config.work_item.deadline_mirrors.len(), 3);
    }

    #[test]
    fn metric_keys_and_projection_are_unique() {
        let config = EngineConfig::from_toml_str(SAMPLE).expect("config");
        assert_eq!(config.metric_keys(), vec!["Open_Tickets", "Skill"]);
        assert_eq!(
            config.projected_fields(),
            vec!["Assignee", "Open_Tickets", "Skill"]
        );
    }

    #[test]
    fn counter_is_tracked_without_a_rule() {
        let config = EngineConfig::new(AppId::new("1"), AppId::new("2"), "A", "Load", 3.0)
            .with_rule(PriorityRule::new("Skill", 1, Direction::Maximize));
        assert_eq!(config.metric_keys(), vec!["Load", "Skill"]);
    }

    #[test]
    fn rejects_invalid_values() {
        let empty_field = SAMPLE.replace("counter_field = \"Open_Tickets\"", "counter_field = \"\"");
        assert!(matches!(
            EngineConfig::from_toml_str(&empty_field),
            Err(AssignwiseError::Config(_))
        ));

        let zero_attempts = format!("max_cas_attempts = 0\n{}", SAMPLE);
        assert!(EngineConfig::from_toml_str(&zero_attempts).is_err());

        let unknown_key = format!("colour = \"red\"\n{}", SAMPLE);
        assert!(EngineConfig::from_toml_str(&unknown_key).is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let path = EngineConfig::resolve_path(Some(PathBuf::from("custom.toml")));
        assert_eq!(path, PathBuf::from("custom.toml"));
    }
}
