mod collection;

pub mod errors;
pub mod events;
pub mod model;
pub mod notifications;
pub mod sequences;
pub mod storage;
pub mod users;

pub use collection::Collection;
pub use errors::*;
pub use events::Events;
pub use model::*;
pub use notifications::*;
pub use storage::*;
pub use users::Users;

pub mod prelude {
    pub use crate::errors::DomainError;
    pub use crate::events::Events;
    pub use crate::model::*;
    pub use crate::notifications::{DevNullNotifier, InvoiceCreated, Notifier};
    pub use crate::sequences::{RandomKeys, Sequence};
    pub use crate::storage::{JsonValue, RecordStore, StoreError};
    pub use crate::users::Users;
}
