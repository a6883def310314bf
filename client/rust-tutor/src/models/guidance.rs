use serde::{Deserialize, Serialize};

/// Tutoring payload computed by the backend for a single problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    pub micro_explanation: String,
    #[serde(default)]
    pub step_breakdown: Vec<GuidanceStep>,
    #[serde(default)]
    pub error_warnings: Vec<String>,
    #[serde(default)]
    pub interactive_checks: Vec<InteractiveCheck>,
    #[serde(default)]
    pub reveal_sequence: Vec<RevealStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceStep {
    pub order: u32,
    pub text: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveCheck {
    pub text: String,
    pub expected_answer: Option<String>,
    pub explanation: String,
}

/// One disclosure level of the progressive hint sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealStep {
    pub level: u8,
    pub content: String,
    #[serde(rename = "reveal_type")]
    pub kind: RevealKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealKind {
    Hint,
    Partial,
    Full,
}

impl RevealKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevealKind::Hint => "hint",
            RevealKind::Partial => "partial",
            RevealKind::Full => "full",
        }
    }
}

impl Guidance {
    /// Entry whose level equals `level`, if the backend sent one.
    pub fn reveal_at(&self, level: u8) -> Option<&RevealStep> {
        self.reveal_sequence.iter().find(|step| step.level == level)
    }
}
