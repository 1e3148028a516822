use super::frames::Frame;

/// [`ContextStack`] is the call stack of one task graph invocation.
///
/// Frames are pushed in descend order; the top frame is the next one to
/// run. The stack is owned by exactly one run at a time (it travels
/// inside the work item hopping between runner queues) and is destroyed
/// when the last frame is popped.
///
/// A bare simple task needs no call stack at all, so its run uses the
/// `Solo` shape: a single slot, no vector allocation. The slot upgrades
/// itself to the `Deep` shape if anything ever descends.
pub(crate) enum ContextStack {
    Solo(Option<Box<dyn Frame>>),
    Deep(Vec<Box<dyn Frame>>),
}

impl ContextStack {
    pub(crate) fn fresh(solo: bool) -> Self {
        if solo {
            ContextStack::Solo(None)
        } else {
            ContextStack::Deep(Vec::new())
        }
    }

    pub(crate) fn push(&mut self, frame: Box<dyn Frame>) {
        match self {
            ContextStack::Solo(slot @ None) => *slot = Some(frame),
            ContextStack::Solo(slot @ Some(_)) => {
                let held = slot.take();
                let mut frames = Vec::with_capacity(2);
                if let Some(held) = held {
                    frames.push(held);
                }
                frames.push(frame);
                *self = ContextStack::Deep(frames);
            }
            ContextStack::Deep(frames) => frames.push(frame),
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Box<dyn Frame>> {
        match self {
            ContextStack::Solo(slot) => slot.take(),
            ContextStack::Deep(frames) => frames.pop(),
        }
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut (dyn Frame + 'static)> {
        match self {
            ContextStack::Solo(slot) => slot.as_deref_mut(),
            ContextStack::Deep(frames) => frames.last_mut().map(|frame| &mut **frame),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        match self {
            ContextStack::Solo(None) => 0,
            ContextStack::Solo(Some(_)) => 1,
            ContextStack::Deep(frames) => frames.len(),
        }
    }
}
