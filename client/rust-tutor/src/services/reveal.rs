//! Progressive hint disclosure over a loaded [`Guidance`].
//!
//! Level 0 shows a call-to-action. Each advance discloses the entry whose
//! `level` matches the new counter, up to the length of the reveal sequence
//! (never more than [`MAX_REVEAL_LEVEL`]). Once a `full` entry is on screen the
//! sequence is terminal.

use crate::models::{Guidance, RevealKind, RevealStep};

pub const MAX_REVEAL_LEVEL: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RevealView<'a> {
    /// Nothing disclosed yet.
    CallToAction,
    Step(&'a RevealStep),
    /// The backend sent no entry for this level; render nothing.
    Missing,
}

/// Highest reachable level for `guidance`.
pub fn ceiling(guidance: Option<&Guidance>) -> u8 {
    match guidance {
        Some(guidance) => u8::try_from(guidance.reveal_sequence.len())
            .unwrap_or(u8::MAX)
            .min(MAX_REVEAL_LEVEL),
        None => MAX_REVEAL_LEVEL,
    }
}

pub fn view(guidance: Option<&Guidance>, level: u8) -> RevealView<'_> {
    if level == 0 {
        return RevealView::CallToAction;
    }
    match guidance.and_then(|guidance| guidance.reveal_at(level)) {
        Some(step) => RevealView::Step(step),
        None => RevealView::Missing,
    }
}

pub fn is_terminal(guidance: Option<&Guidance>, level: u8) -> bool {
    matches!(view(guidance, level), RevealView::Step(step) if step.kind == RevealKind::Full)
}

pub fn can_advance(guidance: Option<&Guidance>, level: u8) -> bool {
    level < ceiling(guidance) && !is_terminal(guidance, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(level: u8, kind: RevealKind) -> RevealStep {
        RevealStep {
            level,
            content: format!("level {level}"),
            kind,
        }
    }

    fn guidance(steps: Vec<RevealStep>) -> Guidance {
        Guidance {
            micro_explanation: "Balance both sides.".to_string(),
            step_breakdown: Vec::new(),
            error_warnings: Vec::new(),
            interactive_checks: Vec::new(),
            reveal_sequence: steps,
        }
    }

    #[test]
    fn level_zero_is_call_to_action() {
        let g = guidance(vec![step(1, RevealKind::Hint)]);
        assert_eq!(view(Some(&g), 0), RevealView::CallToAction);
        assert!(can_advance(Some(&g), 0));
    }

    #[test]
    fn three_step_sequence_ends_on_full() {
        let g = guidance(vec![
            step(1, RevealKind::Hint),
            step(2, RevealKind::Partial),
            step(3, RevealKind::Full),
        ]);
        assert_eq!(ceiling(Some(&g)), 3);
        assert!(can_advance(Some(&g), 2));

        match view(Some(&g), 3) {
            RevealView::Step(entry) => assert_eq!(entry.kind, RevealKind::Full),
            other => panic!("expected full entry, got {other:?}"),
        }
        assert!(is_terminal(Some(&g), 3));
        assert!(!can_advance(Some(&g), 3));
    }

    #[test]
    fn sparse_sequence_renders_nothing_for_gaps() {
        let g = guidance(vec![step(1, RevealKind::Hint), step(3, RevealKind::Full)]);
        assert_eq!(view(Some(&g), 2), RevealView::Missing);
        assert!(!is_terminal(Some(&g), 2));
        // Length is 2, so level 2 is already the ceiling.
        assert!(!can_advance(Some(&g), 2));
    }

    #[test]
    fn long_sequences_cap_at_four() {
        let g = guidance((1..=6).map(|l| step(l, RevealKind::Hint)).collect());
        assert_eq!(ceiling(Some(&g)), MAX_REVEAL_LEVEL);
        assert!(!can_advance(Some(&g), 4));
    }

    #[test]
    fn no_guidance_uses_default_ceiling() {
        assert_eq!(ceiling(None), MAX_REVEAL_LEVEL);
        assert_eq!(view(None, 2), RevealView::Missing);
        assert!(can_advance(None, 3));
        assert!(!can_advance(None, 4));
    }
}
