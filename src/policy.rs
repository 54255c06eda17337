//! Construction timing policy.

use core::fmt;
use core::str::FromStr;

use crate::error::UnknownPolicy;

/// When an [`Instance`](crate::Instance) constructs its value.
///
/// With the `serde` feature enabled the policy reads from configuration as a
/// lowercase string:
///
/// ```toml
/// policy = "eager"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Policy {
   /// Construct when the instance is created. Reads never touch the claim path.
   Eager,
   /// Construct on first access behind a double-checked claim.
   #[default]
   Lazy,
}

impl Policy {
   /// The configuration spelling of this policy.
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Eager => "eager",
         Self::Lazy => "lazy",
      }
   }
}

impl fmt::Display for Policy {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

impl FromStr for Policy {
   type Err = UnknownPolicy;

   fn from_str(s: &str) -> Result<Self, Self::Err> {
      let trimmed = s.trim();
      if trimmed.eq_ignore_ascii_case("eager") {
         Ok(Self::Eager)
      } else if trimmed.eq_ignore_ascii_case("lazy") {
         Ok(Self::Lazy)
      } else {
         Err(UnknownPolicy(trimmed.to_owned()))
      }
   }
}
