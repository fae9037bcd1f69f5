// Client-side filtering and sorting of fetched leads

use crate::models::{Lead, LeadStatus};
use std::str::FromStr;

/// Lead list filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    /// Case-insensitive substring of name, email, or phone
    pub query: Option<String>,
    pub stage: Option<String>,
    pub status: Option<LeadStatus>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(stage) = &self.stage {
            if &lead.stage != stage {
                return false;
            }
        }
        if let Some(status) = self.status {
            if lead.status != status {
                return false;
            }
        }
        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let needle = query.to_lowercase();
                [Some(&lead.full_name), lead.email.as_ref(), lead.phone.as_ref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeadSort {
    #[default]
    Newest,
    Oldest,
    Name,
}

impl FromStr for LeadSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "name" => Ok(Self::Name),
            _ => Err(format!("Invalid sort: '{}'. Expected newest, oldest, or name.", s)),
        }
    }
}

/// Filter and sort leads without touching the store
pub fn select<'a>(leads: &'a [Lead], filter: &LeadFilter, sort: LeadSort) -> Vec<&'a Lead> {
    let mut selected: Vec<&Lead> = leads.iter().filter(|l| filter.matches(l)).collect();
    match sort {
        LeadSort::Newest => selected.sort_by(|a, b| b.created_ts.cmp(&a.created_ts).then(b.id.cmp(&a.id))),
        LeadSort::Oldest => selected.sort_by(|a, b| a.created_ts.cmp(&b.created_ts).then(a.id.cmp(&b.id))),
        LeadSort::Name => selected.sort_by(|a, b| {
            a.full_name
                .to_lowercase()
                .cmp(&b.full_name.to_lowercase())
                .then(a.id.cmp(&b.id))
        }),
    }
    selected
}
