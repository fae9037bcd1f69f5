use serde::{Deserialize, Serialize};

/// Lead status, independent of the pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Active,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Active => "active",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LeadStatus::Active),
            "converted" => Some(LeadStatus::Converted),
            "lost" => Some(LeadStatus::Lost),
            _ => None,
        }
    }
}

/// Prospective-student record tracked through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    /// References `Stage::stage_id`
    pub stage: String,
    pub status: LeadStatus,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub created_ts: i64,
    pub modified_ts: i64,
}

/// Payload for creating a lead. A `None` stage means the default stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub full_name: String,
    pub stage: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
}

impl NewLead {
    pub fn named(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            ..Default::default()
        }
    }
}

/// Activity note recorded alongside a stage change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadNote {
    pub id: i64,
    pub lead_id: i64,
    pub note: String,
    pub from_stage: Option<String>,
    pub to_stage: Option<String>,
    pub created_ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [LeadStatus::Active, LeadStatus::Converted, LeadStatus::Lost] {
            assert_eq!(LeadStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LeadStatus::from_str("pending"), None);
    }
}
