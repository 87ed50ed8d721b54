/// Actions scheduled for a future simulation time, polled once per tick.
#[derive(Debug, Clone)]
pub struct DeferredQueue<A> {
    entries: Vec<(f32, A)>,
}

impl<A> Default for DeferredQueue<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: PartialEq> DeferredQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schedule(&mut self, deadline: f32, action: A) {
        self.entries.push((deadline, action));
    }

    pub fn contains(&self, action: &A) -> bool {
        self.entries.iter().any(|(_, a)| a == action)
    }

    /// Removes every pending entry equal to `action`.
    pub fn cancel(&mut self, action: &A) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, a)| a != action);
        self.entries.len() != before
    }

    /// Removes and returns the actions whose deadline is at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: f32) -> Vec<A> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|(deadline, _)| *deadline <= now);
        self.entries = pending;
        due.sort_by(|a, b| a.0.total_cmp(&b.0));
        due.into_iter().map(|(_, action)| action).collect()
    }
}
