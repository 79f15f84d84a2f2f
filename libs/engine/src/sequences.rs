use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::RecordId;

pub trait Sequence<T>: Send + Sync {
    fn following(&self) -> T;
}

pub struct DeterministicKeys {
    prefix: &'static str,
    sequence: AtomicU64,
}

impl DeterministicKeys {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            sequence: AtomicU64::new(0),
        }
    }
}

impl Sequence<RecordId> for DeterministicKeys {
    fn following(&self) -> RecordId {
        RecordId::from(format!(
            "{}-{}",
            self.prefix,
            self.sequence.fetch_add(1, Ordering::Relaxed)
        ))
    }
}

/// 21 character nanoid, roughly 126 bits of randomness.
#[derive(Default)]
pub struct RandomKeys {}

impl Sequence<RecordId> for RandomKeys {
    fn following(&self) -> RecordId {
        RecordId::from(nanoid::nanoid!())
    }
}
