// SPDX-License-Identifier: GPL-3.0-only

//! Foreground/background lifecycle of the host application

/// Where the host application is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Constructed, not yet visible
    #[default]
    Created,
    /// Visible and interactive; GPU resources may be held
    Foreground,
    /// Hidden; GPU resources must be released
    Background,
    /// Torn down, terminal
    Destroyed,
}

/// Host lifecycle callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleTransition {
    Resume,
    Pause,
    Destroy,
}

impl LifecycleState {
    /// State after applying `transition`
    ///
    /// `None` when the transition does not apply (resume while already in
    /// the foreground, pause while not in the foreground, anything after
    /// destruction).
    pub fn next(self, transition: LifecycleTransition) -> Option<LifecycleState> {
        use LifecycleState::*;
        use LifecycleTransition::*;

        match (self, transition) {
            (Destroyed, _) => None,
            (_, Destroy) => Some(Destroyed),
            (Created | Background, Resume) => Some(Foreground),
            (Foreground, Pause) => Some(Background),
            (Foreground, Resume) | (Created | Background, Pause) => None,
        }
    }

    pub fn is_foreground(&self) -> bool {
        matches!(self, LifecycleState::Foreground)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Created => write!(f, "created"),
            LifecycleState::Foreground => write!(f, "foreground"),
            LifecycleState::Background => write!(f, "background"),
            LifecycleState::Destroyed => write!(f, "destroyed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleState::*;
    use super::LifecycleTransition::*;

    #[test]
    fn test_resume_pause_cycle() {
        let state = Created.next(Resume).unwrap();
        assert_eq!(state, Foreground);
        let state = state.next(Pause).unwrap();
        assert_eq!(state, Background);
        assert_eq!(state.next(Resume), Some(Foreground));
    }

    #[test]
    fn test_redundant_transitions_do_not_apply() {
        assert_eq!(Foreground.next(Resume), None);
        assert_eq!(Background.next(Pause), None);
        assert_eq!(Created.next(Pause), None);
    }

    #[test]
    fn test_destroyed_is_terminal() {
        assert_eq!(Background.next(Destroy), Some(Destroyed));
        assert_eq!(Destroyed.next(Resume), None);
        assert_eq!(Destroyed.next(Destroy), None);
    }
}
