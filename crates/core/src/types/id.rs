//! Newtype IDs for type-safe entity references.
//!
//! The commerce API identifies every entity with an opaque string (a
//! 24-character hex object id in practice). Use the `define_id!` macro to
//! create wrappers that prevent accidentally passing a brand id where a
//! product id is expected.

/// Error returned when parsing an empty identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} cannot be empty")]
pub struct IdError {
    /// Name of the ID type that failed to parse.
    pub kind: &'static str,
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()` which rejects empty or whitespace-only input
/// - `Display`, `AsRef<str>`, `FromStr`
///
/// # Example
///
/// ```rust
/// # use freshcart_core::define_id;
/// define_id!(ProductId);
/// define_id!(BrandId);
///
/// let product = ProductId::parse("6428ebc6dc1175abc65ca0b9").unwrap();
/// assert_eq!(product.as_str(), "6428ebc6dc1175abc65ca0b9");
/// assert!(BrandId::parse("  ").is_err());
///
/// // These are different types, so this won't compile:
/// // let _: BrandId = product;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an ID, rejecting empty input.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is empty or only whitespace.
            pub fn parse(id: impl Into<String>) -> ::core::result::Result<Self, $crate::IdError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err($crate::IdError {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(id))
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(BrandId);
define_id!(CategoryId);
define_id!(SubcategoryId);
define_id!(CartId);
define_id!(UserId);
define_id!(OrderId);
