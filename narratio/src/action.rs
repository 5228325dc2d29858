//! Actions and the patterns used to match them.
//!
//! An action is a plain value describing something that happened. Actions
//! are usually declared as an enum deriving [`Action`](macro@crate::Action),
//! which generates a field-less `Kind` enum so that watchers can match on the
//! variant without caring about its payload:
//!
//! ```rust,ignore
//! #[derive(Clone, Debug, narratio::Action)]
//! enum AppAction {
//!     ButtonClicked,
//!     Search(String),
//!     SetResult(Vec<String>),
//! }
//!
//! let pattern = Pattern::kind(AppActionKind::Search);
//! assert!(pattern.matches(&AppAction::Search("ab".into())));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A value that can be dispatched through a [`Store`](crate::Store).
///
/// Actions are cloned once per receiving waiter, so they should be cheap to
/// clone. They must be `Send` because stores may be shared with other
/// threads.
pub trait Action: Clone + Send + 'static {
    /// Field-less discriminant of the action.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Returns the kind of this action.
    fn kind(&self) -> Self::Kind;
}

/// Describes which actions a `take` or a watcher is interested in.
pub enum Pattern<A: Action> {
    /// Matches every action.
    Any,

    /// Matches actions of one kind.
    Kind(A::Kind),

    /// Matches actions whose kind is one of the listed kinds.
    OneOf(Vec<A::Kind>),

    /// Matches actions for which the predicate returns `true`.
    Predicate(Arc<dyn Fn(&A) -> bool + Send + Sync>),
}

impl<A: Action> Pattern<A> {
    /// Pattern matching every action.
    pub fn any() -> Self {
        Pattern::Any
    }

    /// Pattern matching a single kind.
    pub fn kind(kind: A::Kind) -> Self {
        Pattern::Kind(kind)
    }

    /// Pattern matching any of the given kinds.
    pub fn one_of(kinds: impl IntoIterator<Item = A::Kind>) -> Self {
        Pattern::OneOf(kinds.into_iter().collect())
    }

    /// Pattern matching through an arbitrary predicate.
    pub fn when(predicate: impl Fn(&A) -> bool + Send + Sync + 'static) -> Self {
        Pattern::Predicate(Arc::new(predicate))
    }

    /// Returns `true` if `action` matches this pattern.
    pub fn matches(&self, action: &A) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Kind(kind) => action.kind() == *kind,
            Pattern::OneOf(kinds) => kinds.contains(&action.kind()),
            Pattern::Predicate(predicate) => predicate(action),
        }
    }
}

impl<A: Action> Clone for Pattern<A> {
    fn clone(&self) -> Self {
        match self {
            Pattern::Any => Pattern::Any,
            Pattern::Kind(kind) => Pattern::Kind(*kind),
            Pattern::OneOf(kinds) => Pattern::OneOf(kinds.clone()),
            Pattern::Predicate(predicate) => Pattern::Predicate(predicate.clone()),
        }
    }
}

impl<A: Action> fmt::Debug for Pattern<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str("Any"),
            Pattern::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Pattern::OneOf(kinds) => f.debug_tuple("OneOf").field(kinds).finish(),
            Pattern::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Conversion into a [`Pattern`].
///
/// Implemented for patterns themselves, arrays and vectors of kinds, and by
/// `#[derive(Action)]` for the generated kind enum, so every API taking a
/// pattern also accepts a bare kind.
pub trait IntoPattern<A: Action> {
    fn into_pattern(self) -> Pattern<A>;
}

impl<A: Action> IntoPattern<A> for Pattern<A> {
    fn into_pattern(self) -> Pattern<A> {
        self
    }
}

impl<A: Action, const N: usize> IntoPattern<A> for [A::Kind; N] {
    fn into_pattern(self) -> Pattern<A> {
        Pattern::one_of(self)
    }
}

impl<A: Action> IntoPattern<A> for Vec<A::Kind> {
    fn into_pattern(self) -> Pattern<A> {
        Pattern::OneOf(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum Msg {
        Click,
        Search(String),
        Reset,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum MsgKind {
        Click,
        Search,
        Reset,
    }

    impl Action for Msg {
        type Kind = MsgKind;

        fn kind(&self) -> MsgKind {
            match self {
                Msg::Click => MsgKind::Click,
                Msg::Search(_) => MsgKind::Search,
                Msg::Reset => MsgKind::Reset,
            }
        }
    }

    #[test]
    fn kind_and_any() {
        assert!(Pattern::<Msg>::any().matches(&Msg::Reset));
        assert!(Pattern::kind(MsgKind::Click).matches(&Msg::Click));
        assert!(!Pattern::kind(MsgKind::Click).matches(&Msg::Reset));
    }

    #[test]
    fn one_of_from_array() {
        let pattern: Pattern<Msg> = [MsgKind::Click, MsgKind::Search].into_pattern();

        assert!(pattern.matches(&Msg::Search("a".into())));
        assert!(pattern.matches(&Msg::Click));
        assert!(!pattern.matches(&Msg::Reset));
    }

    #[test]
    fn predicate_sees_the_payload() {
        let pattern = Pattern::when(|msg: &Msg| matches!(msg, Msg::Search(q) if q.len() > 2));

        assert!(pattern.matches(&Msg::Search("abc".into())));
        assert!(!pattern.matches(&Msg::Search("ab".into())));
        assert_eq!(format!("{:?}", pattern.clone()), "Predicate(..)");
    }
}
