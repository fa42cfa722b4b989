use serde::{Deserialize, Serialize};

/// License tier.
///
/// Encoded on the wire as a number. Values outside the known tiers are kept
/// as `Other` so that a newer client does not fail payload parsing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "u8", into = "u8")]
pub enum LicenseType {
    Single,
    Cluster,
    Multi,
    Other(u8),
}

impl From<u8> for LicenseType {
    fn from(value: u8) -> Self {
        match value {
            0 => LicenseType::Single,
            1 => LicenseType::Cluster,
            2 => LicenseType::Multi,
            other => LicenseType::Other(other),
        }
    }
}

impl From<LicenseType> for u8 {
    fn from(value: LicenseType) -> Self {
        match value {
            LicenseType::Single => 0,
            LicenseType::Cluster => 1,
            LicenseType::Multi => 2,
            LicenseType::Other(other) => other,
        }
    }
}

/// A license declared by a joining worker or master.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct License {
    /// Holder id; repeated ids are what the terms count.
    pub i: String,
    /// Tier.
    pub t: LicenseType,
    /// Max instances, `-1` for unlimited.
    #[serde(default = "unlimited")]
    pub mi: i64,
    /// Holder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<String>,
    /// Holder email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// Level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<u8>,
    /// Format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<u32>,
    /// Created timestamp (ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<u64>,
}

impl License {
    pub fn new(id: impl Into<String>, tier: LicenseType, max_instances: i64) -> Self {
        Self {
            i: id.into(),
            t: tier,
            mi: max_instances,
            h: None,
            e: None,
            l: None,
            v: None,
            c: None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.mi == -1
    }
}

fn unlimited() -> i64 {
    -1
}
