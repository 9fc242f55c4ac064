/// Watches a stepping loop and may ask it to change course.
///
/// A stepper reports each committed, continued or canceled step as an event
/// `E`. The observer can record the load path, log progress, or return
/// `Some(action)` to steer the run, for example to stop once a reaction force
/// crosses a threshold.
///
/// - A closure `|event| -> Option<A>` is an observer.
/// - `()` runs the stepper unwatched.
/// - A pair `(first, second)` shows every event to both observers. The first
///   observer's action wins, so a stop criterion can be paired with a logger.
pub trait Observer<E, A> {
    /// Observes an event and optionally returns a control action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

impl<E, A, O1, O2> Observer<E, A> for (O1, O2)
where
    O1: Observer<E, A>,
    O2: Observer<E, A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        let first = self.0.observe(event);
        let second = self.1.observe(event);
        first.or(second)
    }
}
