//! Wizard navigation
//!
//! [`transition`] maps (state, action) to the next state and the effects
//! declared for entering it. Step validity is computed from the session by
//! [`step_is_valid`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ImportKind, ImportProfile, RowStatus, StepEffect, WizardStep};
use crate::wizard::WizardSession;

const NO_EFFECTS: &[StepEffect] = &[];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "step", rename_all = "snake_case")]
pub enum WizardState {
    Active(WizardStep),
    /// Import submitted; no further transitions
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("Step {0:?} is not complete")]
    Blocked(WizardStep),

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Already at the last step, confirm the import instead")]
    AtLastStep,

    #[error("Step {0:?} is not part of this import")]
    UnknownStep(WizardStep),

    #[error("The import has been submitted")]
    Completed,
}

/// Outcome of a successful navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: WizardState,
    pub to: WizardState,
    /// Effects to run for the entered step (forward moves only)
    pub effects: &'static [StepEffect],
}

/// Next state for `action`, given whether the current step is valid
pub fn transition(
    profile: &ImportProfile,
    state: WizardState,
    action: WizardAction,
    current_valid: bool,
) -> Result<StateTransition, NavigationError> {
    let WizardState::Active(step) = state else {
        return Err(NavigationError::Completed);
    };
    let index = profile
        .step_index(step)
        .ok_or(NavigationError::UnknownStep(step))?;

    let (target, effects) = match action {
        WizardAction::Next => {
            if !current_valid {
                return Err(NavigationError::Blocked(step));
            }
            let next = profile
                .steps
                .get(index + 1)
                .ok_or(NavigationError::AtLastStep)?;
            (next.step, profile.effects_on_enter(next.step))
        }
        WizardAction::Previous => {
            let previous = index
                .checked_sub(1)
                .and_then(|i| profile.steps.get(i))
                .ok_or(NavigationError::AtFirstStep)?;
            (previous.step, NO_EFFECTS)
        }
    };

    Ok(StateTransition {
        from: state,
        to: WizardState::Active(target),
        effects,
    })
}

/// Whether `step` allows moving forward with the current session
pub fn step_is_valid(session: &WizardSession, step: WizardStep) -> bool {
    let profile = session.profile();
    let has_target = !profile.requires_legislation || session.legislation.is_some();

    match step {
        WizardStep::Load => !session.rows.is_empty() && session.parse_error.is_none() && has_target,
        WizardStep::Preview => {
            if session.rows.len() == 1 && session.rows[0].status == RowStatus::Exists {
                return false;
            }
            session
                .selected_rows()
                .any(|row| row.status != RowStatus::Exists)
        }
        // Link completeness is not enforced
        WizardStep::Link => has_target,
        WizardStep::Structure => {
            if profile.kind == ImportKind::ImportComplet {
                !session.drafts.is_empty()
                    && session.drafts.iter().all(|d| d.board.is_fully_structured())
            } else {
                session.legislation.is_some()
                    && session
                        .board
                        .as_ref()
                        .map_or(false, |board| board.is_fully_structured())
            }
        }
        WizardStep::Confirm => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_enters_following_step_with_its_effects() {
        let profile = ImportKind::Article.profile();
        let t = transition(
            profile,
            WizardState::Active(WizardStep::Preview),
            WizardAction::Next,
            true,
        )
        .unwrap();

        assert_eq!(t.to, WizardState::Active(WizardStep::Link));
        assert_eq!(t.effects, &[StepEffect::PrepopulateLinks]);
    }

    #[test]
    fn test_next_is_blocked_when_invalid() {
        let profile = ImportKind::Article.profile();
        assert_eq!(
            transition(profile, WizardState::Active(WizardStep::Structure), WizardAction::Next, false),
            Err(NavigationError::Blocked(WizardStep::Structure))
        );
    }

    #[test]
    fn test_previous_has_no_effects_and_ignores_validity() {
        let profile = ImportKind::Article.profile();
        let t = transition(
            profile,
            WizardState::Active(WizardStep::Confirm),
            WizardAction::Previous,
            false,
        )
        .unwrap();
        assert_eq!(t.to, WizardState::Active(WizardStep::Structure));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_bounds_and_terminal_state() {
        let profile = ImportKind::Legislation.profile();
        assert_eq!(
            transition(profile, WizardState::Active(WizardStep::Load), WizardAction::Previous, true),
            Err(NavigationError::AtFirstStep)
        );
        assert_eq!(
            transition(profile, WizardState::Active(WizardStep::Confirm), WizardAction::Next, true),
            Err(NavigationError::AtLastStep)
        );
        assert_eq!(
            transition(profile, WizardState::Active(WizardStep::Link), WizardAction::Next, true),
            Err(NavigationError::UnknownStep(WizardStep::Link))
        );
        assert_eq!(
            transition(profile, WizardState::Completed, WizardAction::Previous, true),
            Err(NavigationError::Completed)
        );
    }

    #[test]
    fn test_complet_skips_preview_and_link() {
        let profile = ImportKind::ImportComplet.profile();
        let t = transition(profile, WizardState::Active(WizardStep::Load), WizardAction::Next, true)
            .unwrap();
        assert_eq!(t.to, WizardState::Active(WizardStep::Structure));
        assert_eq!(t.effects, &[StepEffect::BuildStructure]);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(WizardState::Active(WizardStep::Link)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "active", "step": "link"}));
        let json = serde_json::to_value(WizardState::Completed).unwrap();
        assert_eq!(json, serde_json::json!({"status": "completed"}));
    }
}
