//! GitHub accounts (individual users and organizations).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::non_empty;

/// The kind of account behind a login.
///
/// GitHub reports this in the `type` field as `"User"` or `"Organization"`
/// (and occasionally `"Bot"`). Anything that is not an organization is
/// treated as an individual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountKind {
    #[default]
    Individual,
    Organization,
}

impl AccountKind {
    /// Map the API's `type` string to a kind.
    pub fn from_api_type(value: &str) -> Self {
        if value.eq_ignore_ascii_case("Organization") {
            Self::Organization
        } else {
            Self::Individual
        }
    }

    /// The value GitHub uses for this kind in the `type` field.
    pub fn as_api_type(self) -> &'static str {
        match self {
            Self::Individual => "User",
            Self::Organization => "Organization",
        }
    }

    #[inline]
    pub fn is_organization(self) -> bool {
        matches!(self, Self::Organization)
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_type())
    }
}

impl Serialize for AccountKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_api_type())
    }
}

impl<'de> Deserialize<'de> for AccountKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .as_deref()
            .map(AccountKind::from_api_type)
            .unwrap_or_default())
    }
}

/// A user or organization as returned by the profile, contributor,
/// subscriber and embedded `owner`/`user` payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Individual or organization. Defaults to individual when absent.
    #[serde(rename = "type", default)]
    pub kind: AccountKind,
    /// Stable numeric identifier.
    pub id: u64,
    /// Login name.
    pub login: String,
    /// Website (`blog` in the API). Empty strings are normalized to `None`.
    #[serde(rename = "blog", default, deserialize_with = "non_empty")]
    pub website: Option<String>,
    /// Public email, if any.
    #[serde(default, deserialize_with = "non_empty")]
    pub email: Option<String>,
}

impl Account {
    #[inline]
    pub fn is_organization(&self) -> bool {
        self.kind.is_organization()
    }
}
