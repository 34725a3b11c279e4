//! Display/FromStr generation for protocol enums
//!
//! Prompt behaviours, result statuses and policy flags all travel as
//! lower-case strings (configuration files, telemetry records). This macro
//! keeps the two directions of that mapping in one table.
//!
//! # Example
//!
//! ```rust
//! use authlink_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum CacheTier {
//!     Rt,
//!     Mrrt,
//!     Frt,
//! }
//!
//! impl_domain_status_conversions!(CacheTier {
//!     Rt => "rt",
//!     Mrrt => "mrrt",
//!     Frt => "frt",
//! });
//!
//! assert_eq!(CacheTier::Mrrt.to_string(), "mrrt");
//! assert_eq!("FRT".parse::<CacheTier>().unwrap(), CacheTier::Frt);
//! ```

/// Implements Display and FromStr for a fieldless enum
///
/// - `Display` writes the mapped string
/// - `FromStr` matches case-insensitively and reports the enum name on
///   failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
