//! Plain-text rendering of store contents for the terminal front-end.

use std::fmt::Write;

use crate::models::{
    ChatMessage, Guidance, MessageContent, MessageRole, PracticeProblem, RevealKind, Submission,
};
use crate::services::reveal::{self, RevealView};

pub fn render_message(message: &ChatMessage) -> String {
    let speaker = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "tutor",
    };
    match &message.content {
        MessageContent::Text(text) => format!("[{}] {}", speaker, text),
        MessageContent::Guidance(guidance) => {
            format!("[{}]\n{}", speaker, render_guidance(guidance))
        }
    }
}

pub fn render_guidance(guidance: &Guidance) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Understanding the concept: {}", guidance.micro_explanation);

    if !guidance.step_breakdown.is_empty() {
        let _ = writeln!(out, "Guided steps:");
        for step in &guidance.step_breakdown {
            let _ = writeln!(out, "  {}. {}", step.order, step.text);
            if let Some(hint) = &step.hint {
                let _ = writeln!(out, "     hint: {}", hint);
            }
        }
    }

    if !guidance.error_warnings.is_empty() {
        let _ = writeln!(out, "Common mistakes to avoid:");
        for warning in &guidance.error_warnings {
            let _ = writeln!(out, "  ! {}", warning);
        }
    }

    if !guidance.interactive_checks.is_empty() {
        let _ = writeln!(out, "Check your understanding:");
        for check in &guidance.interactive_checks {
            let _ = writeln!(out, "  ? {}", check.text);
        }
    }

    out.trim_end().to_string()
}

/// The hint panel for the current reveal level.
pub fn render_reveal(guidance: Option<&Guidance>, level: u8) -> String {
    let mut out = match reveal::view(guidance, level) {
        RevealView::CallToAction => {
            "Try working through the steps first. Type /hint when you need one.".to_string()
        }
        RevealView::Step(step) => {
            let title = match step.kind {
                RevealKind::Hint => format!("Hint {}", level),
                RevealKind::Partial => "Partial work".to_string(),
                RevealKind::Full => "Full solution".to_string(),
            };
            let total = reveal::ceiling(guidance);
            format!("{} ({}/{}):\n{}", title, level, total, step.content)
        }
        RevealView::Missing => String::new(),
    };

    if reveal::is_terminal(guidance, level) {
        out.push_str(
            "\nAcademic integrity: use this solution to understand the process, not to copy answers.",
        );
    } else if level > 0 && !reveal::can_advance(guidance, level) {
        out.push_str("\nNo more hints for this problem.");
    }
    out
}

/// Parsed problems of a submission, marking the one guidance is shown for.
pub fn render_problems(submission: &Submission, current: usize) -> String {
    if submission.parsed_problems.is_empty() {
        return "No problems were found in this submission.".to_string();
    }
    let mut out = String::new();
    for (i, problem) in submission.parsed_problems.iter().enumerate() {
        let marker = if i == current { '*' } else { ' ' };
        let _ = writeln!(out, "{} {}. {}", marker, i + 1, problem.text);
    }
    out.trim_end().to_string()
}

pub fn render_practice(problems: &[PracticeProblem]) -> String {
    if problems.is_empty() {
        return "No practice problems yet.".to_string();
    }
    let mut out = String::new();
    for (i, problem) in problems.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{} / {}] {}",
            i + 1,
            problem.difficulty,
            problem.variation_type,
            problem.text
        );
    }
    out.trim_end().to_string()
}
