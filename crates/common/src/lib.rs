//! Plenário Common Library
//!
//! Shared code for the Plenário services including:
//! - Configuration and error handling
//! - Authentication (users, roles, 2FA, integration tokens)
//! - Hostname to chamber (tenant) resolution
//! - Legislative rules: status workflows, roll-call tallying, session numbering
//! - Database models and repository
//! - Scheduled report computation
//! - Metrics

/// Declares a closed set of upper-case status/type labels stored as text columns.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Label as stored in the database and sent over the API
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::errors::AppError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err($crate::errors::AppError::InvalidFormat {
                        message: format!("unknown {} value: {}", stringify!($name), other),
                    }),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod legislative;
pub mod metrics;
pub mod reports;
pub mod response;
pub mod tenancy;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound for `per_page`
pub const MAX_PAGE_SIZE: u64 = 100;
