use std::sync::atomic::{AtomicU64, Ordering};

/// Counter shared by every identified object in the process. Objects of
/// different kinds draw from the same counter, so identifications of the
/// same kind are unique but not necessarily sequential.
static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// [`next_id`] allocates the next process-wide unique identification.
#[must_use]
pub fn next_id() -> u64 {
    INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// [`Tag`] is the diagnostic identity of a runner, queue or task
/// descriptor: a process-unique numeric id plus a `prefix-N` textual name
/// for logging.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    id: u64,
    label: String,
}

impl Tag {
    /// `scoped` allocates a fresh identity with the provided name prefix.
    #[must_use]
    pub fn scoped(prefix: &str) -> Self {
        let id = next_id();
        Self {
            id,
            label: format!("{prefix}-{id}"),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl core::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[cfg(test)]
mod test_tags {
    use super::*;

    #[test]
    fn tags_are_unique_and_prefixed() {
        let first = Tag::scoped("runner");
        let second = Tag::scoped("runner");

        assert_ne!(first.id(), second.id());
        assert!(first.label().starts_with("runner-"));
        assert_eq!(first.label(), format!("runner-{}", first.id()));
    }

    #[test]
    fn different_prefixes_share_the_counter() {
        let queue = Tag::scoped("queue");
        let task = Tag::scoped("task");
        assert_ne!(queue.id(), task.id());
    }
}
