use serde::{Deserialize, Serialize};

/// Declares a database-assigned identifier newtype.
///
/// Identities are assigned by the store on first insert, so the wrapped
/// value is the row's sequence number. Wrapping it keeps product, order,
/// and line item ids from being mixed up.
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier value.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw identifier value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

record_id!(
    /// Identifier of a product in the catalog.
    ProductId
);

record_id!(
    /// Identifier of a persisted order.
    OrderId
);

record_id!(
    /// Identifier of a single order line item.
    LineItemId
);
