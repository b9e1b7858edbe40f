macro_rules! impl_record {
    ($ty:ty, $table:expr) => {
        impl $crate::models::Record for $ty {
            const TABLE: $crate::database::Table = $table;

            fn id(&self) -> Option<i64> {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = Some(id);
            }
        }
    };
}

pub(crate) use impl_record;

mod activities;
mod cases;
mod institution;
mod interview;
mod pef;
mod people;
mod pregnancy;
mod violence;

pub use activities::*;
pub use cases::*;
pub use institution::*;
pub use interview::*;
pub use pef::*;
pub use people::*;
pub use pregnancy::*;
pub use violence::*;

use crate::database::Table;
use serde::{Serialize, de::DeserializeOwned};
use validator::Validate;

/// An entity stored as a JSON document in one of the store's tables.
///
/// The `id` is assigned by the store on insert and never serialized into the
/// document body; see [`crate::db`].
pub trait Record: Serialize + DeserializeOwned + Validate + Send + Sync + Unpin + 'static {
    const TABLE: Table;

    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
}
