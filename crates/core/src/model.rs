use crate::{Action, SimulationState};

/// A plugin that reacts to [`Action`]s issued by the stepper and the solver.
///
/// Models describe problem data such as boundary conditions. They respond to
/// the closed set of actions in [`Action`], filling response values in place
/// when the action carries one.
///
/// A `Vec` of models is itself a model: every action is broadcast to every
/// element in order, and it counts as handled if any element handled it.
pub trait Model {
    /// Takes an action and returns whether it was handled.
    fn take_action(&mut self, action: &mut Action, state: &SimulationState) -> bool;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn take_action(&mut self, action: &mut Action, state: &SimulationState) -> bool {
        (**self).take_action(action, state)
    }
}

impl<M: Model + ?Sized> Model for &mut M {
    fn take_action(&mut self, action: &mut Action, state: &SimulationState) -> bool {
        (**self).take_action(action, state)
    }
}

impl<M: Model> Model for Vec<M> {
    fn take_action(&mut self, action: &mut Action, state: &SimulationState) -> bool {
        let mut handled = false;
        for model in self.iter_mut() {
            handled |= model.take_action(action, state);
        }
        handled
    }
}
