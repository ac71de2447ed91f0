//! The reducer trait: business logic as `(State, Action, Environment) → (State, Effects)`.

use crate::effect::Effect;
use smallvec::SmallVec;

/// Effects returned by one reduction; most actions yield at most a few
pub type Effects<Action> = SmallVec<[Effect<Action>; 4]>;

/// Core abstraction for business logic
///
/// # Type Parameters
///
/// - `State`: The domain state this reducer operates on
/// - `Action`: The action type this reducer processes
/// - `Environment`: The injected dependencies this reducer needs
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects
    ///
    /// Validates the action, updates state in place and returns effect
    /// descriptions for the runtime to execute. Performs no I/O itself.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action>;
}
