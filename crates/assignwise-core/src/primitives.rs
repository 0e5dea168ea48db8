//! # Primitives
//!
//! Fixed defaults compiled into the engine. Every field code below can be
//! overridden through configuration; these values match the reference
//! support workflow the engine was first deployed against.

/// Work-item field holding the date of the assignment.
pub const DEFAULT_ASSIGNMENT_DATE_FIELD: &str = "Assignment_Date";

/// Work-item field holding the dedicated assignee.
pub const DEFAULT_DEDICATED_ASSIGNEE_FIELD: &str = "Dedicated_Assignee";

/// Work-item field stamped with the date the terminal stage was entered.
pub const DEFAULT_TERMINAL_STAMP_FIELD: &str = "Resolved_Actual";

/// Work-item field receiving the elapsed business-day count.
pub const DEFAULT_ELAPSED_DAYS_FIELD: &str = "Days_Taken";

/// Intermediate stages whose entry date is recorded: (stage, field).
pub const DEFAULT_STAGE_STAMPS: &[(&str, &str)] = &[
    ("In Progress", "In_Progress_Actual"),
    ("Awaiting Shipment", "Awaiting_Shipment_Actual"),
];

/// Deadline fields mirrored after assignment and on save: (source, target).
pub const DEFAULT_DEADLINE_MIRRORS: &[(&str, &str)] = &[
    ("In_Progress_Deadline_Final", "IPD"),
    ("Awaiting_Shipment_Deadline_Final", "ASD"),
    ("Resolved_Deadline_Final", "RD"),
];

/// Attempts at a conditional counter update before giving up.
///
/// Each attempt is a fresh read followed by a compare-and-swap.
pub const DEFAULT_MAX_CAS_ATTEMPTS: u32 = 3;

/// Upper bound accepted for configured CAS attempts.
pub const MAX_CAS_ATTEMPTS_LIMIT: u32 = 16;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a field code.
pub const MAX_FIELD_CODE_LENGTH: usize = 128;

/// Maximum number of candidates accepted back from a client with a commit
/// request.
pub const MAX_POOL_SIZE: usize = 10_000;
