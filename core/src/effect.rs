//! Side effect descriptions returned by reducers.
//!
//! Effects are values. The runtime's store executes them after the
//! reducer has updated state, so a reducer stays a pure function of its
//! state, the action and the environment it reads.

use std::future::Future;
use std::pin::Pin;

/// Describes a side effect to be executed by the runtime
///
/// # Type Parameters
///
/// - `Action`: The action type that effects can feed back into the reducer
pub enum Effect<Action> {
    /// No-op effect
    None,

    /// Run effects concurrently
    Parallel(Vec<Effect<Action>>),

    /// Arbitrary async computation
    ///
    /// Returns `Option<Action>`; if `Some`, the action is fed back into the reducer
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
}

impl<Action> std::fmt::Debug for Effect<Action>
where
    Action: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "Effect::None"),
            Self::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Self::Future(_) => write!(f, "Effect::Future(<future>)"),
        }
    }
}

impl<Action> Effect<Action> {
    /// Wraps an async computation as an effect
    pub fn future<F>(fut: F) -> Self
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        Self::Future(Box::pin(fut))
    }

    /// Combine effects to run in parallel
    #[must_use]
    pub const fn merge(effects: Vec<Self>) -> Self {
        Self::Parallel(effects)
    }

    /// Whether executing this effect does nothing
    #[must_use]
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Parallel(effects) => effects.iter().all(Self::is_none),
            Self::Future(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_none_is_none() {
        let effect: Effect<()> = Effect::merge(vec![Effect::None, Effect::merge(vec![])]);
        assert!(effect.is_none());
        assert!(!Effect::<()>::future(async { None }).is_none());
    }

    #[test]
    fn test_debug_hides_future() {
        let effect: Effect<u8> = Effect::merge(vec![Effect::future(async { Some(1) })]);
        assert_eq!(format!("{effect:?}"), "Effect::Parallel([Effect::Future(<future>)])");
    }
}
