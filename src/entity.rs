//! Control-plane entities resolved while connecting.

use serde::{Deserialize, Serialize};

/// URN prefix of organization identifiers.
pub const ORG_URN_PREFIX: &str = "urn:vcloud:org:";

/// Reference to another entity, as embedded in `/cloudapi` payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRef {
    /// Entity URN
    #[serde(default)]
    pub id: String,
    /// Entity name
    #[serde(default)]
    pub name: String,
}

/// A tenant (or the provider) organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Org {
    /// Organization URN (`urn:vcloud:org:<uuid>`)
    pub id: String,

    /// Short name, as used in login and URLs
    pub name: String,

    /// Display name
    #[serde(default)]
    pub display_name: String,

    /// Whether the organization is enabled
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

impl Org {
    /// Creates an enabled organization.
    ///
    /// ```
    /// use vcdclient::Org;
    ///
    /// let org = Org::new("urn:vcloud:org:1", "tenant1");
    /// assert_eq!(org.display_name, "tenant1");
    /// assert!(org.is_enabled);
    /// ```
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            display_name: name.clone(),
            name,
            is_enabled: true,
        }
    }

    /// Reference to this organization.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// An organization virtual datacenter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vdc {
    /// VDC URN (`urn:vcloud:vdc:<uuid>`)
    pub id: String,

    /// VDC name
    pub name: String,

    /// Owning organization
    pub org: EntityRef,
}

impl Vdc {
    /// Creates a VDC owned by `org`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, org: &Org) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            org: org.entity_ref(),
        }
    }
}

/// Returns true if `name_or_id` is an organization URN rather than a name.
pub fn is_org_urn(name_or_id: &str) -> bool {
    name_or_id.starts_with(ORG_URN_PREFIX)
}

fn default_true() -> bool {
    true
}

/// Paged list envelope returned by `/cloudapi` collection queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub result_total: u64,
    #[serde(default)]
    pub values: Vec<T>,
}
