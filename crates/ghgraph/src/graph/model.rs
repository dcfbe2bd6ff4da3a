//! Closed vocabularies of the property graph.
//!
//! Labels and relationship types only ever reach Cypher through
//! [`NodeLabel::as_str`] and [`RelType::as_str`], so no query is built from
//! payload text.

use std::fmt;

use crate::entity::account::AccountKind;

/// Node labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeLabel {
    /// Every account, regardless of kind.
    Account,
    /// Individual accounts.
    User,
    Organization,
    Repository,
    License,
    Language,
    Topic,
    Gist,
    GistFile,
    Issue,
    PullRequest,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 11] = [
        NodeLabel::Account,
        NodeLabel::User,
        NodeLabel::Organization,
        NodeLabel::Repository,
        NodeLabel::License,
        NodeLabel::Language,
        NodeLabel::Topic,
        NodeLabel::Gist,
        NodeLabel::GistFile,
        NodeLabel::Issue,
        NodeLabel::PullRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "Account",
            Self::User => "User",
            Self::Organization => "Organization",
            Self::Repository => "Repository",
            Self::License => "License",
            Self::Language => "Language",
            Self::Topic => "Topic",
            Self::Gist => "Gist",
            Self::GistFile => "GistFile",
            Self::Issue => "Issue",
            Self::PullRequest => "PullRequest",
        }
    }

    /// The kind label an account carries next to [`NodeLabel::Account`].
    pub fn for_kind(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Individual => Self::User,
            AccountKind::Organization => Self::Organization,
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelType {
    /// Account → Repository
    Owns,
    /// Repository or GistFile → Language
    IsWrittenIn,
    /// Repository → Topic
    RelatesTo,
    /// Repository → License
    HasLicense,
    /// Repository → Issue or PullRequest
    Has,
    /// Account → Issue, PullRequest or Gist
    Created,
    /// Gist → GistFile
    Contains,
    /// Account → Repository
    ContributesTo,
    /// Account → Repository
    SubscribesTo,
}

impl RelType {
    pub const ALL: [RelType; 9] = [
        RelType::Owns,
        RelType::IsWrittenIn,
        RelType::RelatesTo,
        RelType::HasLicense,
        RelType::Has,
        RelType::Created,
        RelType::Contains,
        RelType::ContributesTo,
        RelType::SubscribesTo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owns => "OWNS",
            Self::IsWrittenIn => "IS_WRITTEN_IN",
            Self::RelatesTo => "RELATES_TO",
            Self::HasLicense => "HAS_LICENSE",
            Self::Has => "HAS",
            Self::Created => "CREATED",
            Self::Contains => "CONTAINS",
            Self::ContributesTo => "CONTRIBUTES_TO",
            Self::SubscribesTo => "SUBSCRIBES_TO",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a non-owner account relates to a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountLink {
    Contributes,
    Subscribes,
}

impl AccountLink {
    pub fn rel_type(self) -> RelType {
        match self {
            Self::Contributes => RelType::ContributesTo,
            Self::Subscribes => RelType::SubscribesTo,
        }
    }
}

/// Natural key of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Account { id: u64, login: String },
    Repository(u64),
    /// SPDX identifier.
    License(String),
    Language(String),
    Topic(String),
    Gist(String),
    GistFile { gist_id: String, name: String },
    Issue(u64),
    PullRequest(u64),
}

impl NodeKey {
    /// The primary label of nodes with this key.
    pub fn label(&self) -> NodeLabel {
        match self {
            Self::Account { .. } => NodeLabel::Account,
            Self::Repository(_) => NodeLabel::Repository,
            Self::License(_) => NodeLabel::License,
            Self::Language(_) => NodeLabel::Language,
            Self::Topic(_) => NodeLabel::Topic,
            Self::Gist(_) => NodeLabel::Gist,
            Self::GistFile { .. } => NodeLabel::GistFile,
            Self::Issue(_) => NodeLabel::Issue,
            Self::PullRequest(_) => NodeLabel::PullRequest,
        }
    }

    pub fn account(id: u64, login: impl Into<String>) -> Self {
        Self::Account {
            id,
            login: login.into(),
        }
    }
}
