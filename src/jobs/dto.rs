use serde::Deserialize;

use crate::db::models::{JobPatch, NewJob};

/// Skills sent either as a JSON array or as one comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    List(Vec<String>),
    Csv(String),
}

impl SkillsInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            SkillsInput::List(v) => v
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            SkillsInput::Csv(s) => split_skills(&s),
        }
    }
}

pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills_required: Option<SkillsInput>,
    pub experience: Option<String>,
    pub company_name: Option<String>,
}

impl CreateJobRequest {
    /// `None` when any field is missing or blank.
    pub fn into_new_job(self) -> Option<NewJob> {
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let skills_required = self.skills_required.map(SkillsInput::into_vec)?;
        if skills_required.is_empty() {
            return None;
        }
        Some(NewJob {
            title: text(self.title)?,
            description: text(self.description)?,
            skills_required,
            experience: text(self.experience)?,
            company_name: text(self.company_name)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills_required: Option<SkillsInput>,
    pub experience: Option<String>,
    pub company_name: Option<String>,
}

impl From<UpdateJobRequest> for JobPatch {
    fn from(r: UpdateJobRequest) -> Self {
        JobPatch {
            title: r.title,
            description: r.description,
            skills_required: r.skills_required.map(SkillsInput::into_vec),
            experience: r.experience,
            company_name: r.company_name,
        }
    }
}
