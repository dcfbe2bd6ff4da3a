//! Common re-exports for convenient entity usage.

pub use super::account::{Account, AccountKind};
pub use super::activity::{Issue, PullRequest};
pub use super::gist::{Gist, GistFile};
pub use super::rate_budget::RateBudget;
pub use super::repository::{License, Repository};
