use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend learning session; submissions reference it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: Uuid,
    pub student_level: Option<u32>,
    #[serde(default)]
    pub pace: Option<String>,
    #[serde(default)]
    pub scaffolding_mode: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_level: Option<u32>,
}

/// Learner level presets offered when starting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    Eli5,
    #[default]
    Elementary,
    HighSchool,
    College,
    Masters,
    Phd,
}

impl Persona {
    pub const ALL: [Persona; 6] = [
        Persona::Eli5,
        Persona::Elementary,
        Persona::HighSchool,
        Persona::College,
        Persona::Masters,
        Persona::Phd,
    ];

    pub fn grade_level(&self) -> u32 {
        match self {
            Persona::Eli5 => 1,
            Persona::Elementary => 5,
            Persona::HighSchool => 10,
            Persona::College => 13,
            Persona::Masters => 16,
            Persona::Phd => 20,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Persona::Eli5 => "eli5",
            Persona::Elementary => "elementary",
            Persona::HighSchool => "highschool",
            Persona::College => "college",
            Persona::Masters => "masters",
            Persona::Phd => "phd",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|persona| persona.slug() == value)
    }
}
