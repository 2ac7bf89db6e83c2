//! Shared list view-model used by every tenant list endpoint:
//! debounced search, AND-ed filter chips, page windows.

pub mod debounce;
pub mod handlers;
pub mod view_model;

use serde::Deserialize;

/// Tenant-scoped record collections that can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Jobs,
    Candidates,
    Departments,
    TestSessions,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Jobs => "jobs",
            Resource::Candidates => "candidates",
            Resource::Departments => "departments",
            Resource::TestSessions => "test-sessions",
        }
    }
}
