//! Typed stage input and output records.
//!
//! Each stage declares four records (document input, page input, document
//! output, page output). A record knows its field names and types, so a
//! pipeline can check the whole chain before running it, and it knows how
//! to move itself in and out of a [`Slots`] table.

use super::store::Slots;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;

/// Name and type of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, unique within its scope across the whole pipeline
    pub name: &'static str,
    /// Field type
    pub type_id: TypeId,
    /// Field type name, for diagnostics
    pub type_name: &'static str,
}

impl FieldSpec {
    /// Describe a field of type `T`.
    pub fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A typed record of named fields.
///
/// Implemented by [`schema!`](crate::schema); records also serialize, which
/// is what the stage cache keys and stores.
pub trait Schema: Serialize + DeserializeOwned + Send + Sync + Sized + 'static {
    /// Declared fields.
    fn fields() -> Vec<FieldSpec>;

    /// Read every field from the table.
    fn load(slots: &Slots) -> Result<Self>;

    /// Write every field to the table.
    fn store(self, slots: &mut Slots, producer: &'static str) -> Result<()>;
}

/// Declare a [`Schema`] record.
///
/// ```
/// use flowpdf::schema;
/// use flowpdf::model::Range;
///
/// schema! {
///     /// Columns of the body text.
///     pub struct ColumnsOut {
///         big_text_columns: Vec<Range>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl $crate::pipeline::Schema for $name {
            fn fields() -> ::std::vec::Vec<$crate::pipeline::FieldSpec> {
                ::std::vec![ $( $crate::pipeline::FieldSpec::of::<$ty>(stringify!($field)), )* ]
            }

            #[allow(unused_variables)]
            fn load(slots: &$crate::pipeline::Slots) -> $crate::Result<Self> {
                Ok(Self {
                    $( $field: slots.get::<$ty>(stringify!($field))?, )*
                })
            }

            #[allow(unused_variables)]
            fn store(
                self,
                slots: &mut $crate::pipeline::Slots,
                producer: &'static str,
            ) -> $crate::Result<()> {
                $( slots.insert(stringify!($field), self.$field, producer)?; )*
                Ok(())
            }
        }
    };
}

crate::schema! {
    /// A record with no fields.
    pub struct Empty {}
}
