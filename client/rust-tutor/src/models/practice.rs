use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeProblem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub difficulty: String,
    pub variation_type: String,
    #[serde(default)]
    pub solution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PracticeResponse {
    pub submission_id: String,
    pub practice_problems: Vec<PracticeProblem>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct PracticeQuery {
    pub problem_index: usize,
    #[validate(range(min = 1, max = 10, message = "Practice count must be between 1 and 10"))]
    pub count: u32,
}
