use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Swipe decision. `Right` is a like, `Left` a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookingFor {
    Male,
    Female,
    Both,
    Other,
}

impl LookingFor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Both => "both",
            Self::Other => "other",
        }
    }

    /// Genders a profile may have to show up in this user's feed.
    pub fn accepted_genders(&self) -> &'static [Gender] {
        match self {
            Self::Male => &[Gender::Male],
            Self::Female => &[Gender::Female],
            Self::Both => &[Gender::Male, Gender::Female],
            Self::Other => &[Gender::Other],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError(pub String);

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized value '{}'", self.0)
    }
}

impl std::error::Error for ParseEnumError {}

macro_rules! impl_from_str {
    ($ty:ident { $($text:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError(other.to_string())),
                }
            }
        }
    };
}

impl_from_str!(Direction { "left" => Left, "right" => Right });
impl_from_str!(Gender { "male" => Male, "female" => Female, "other" => Other });
impl_from_str!(LookingFor { "male" => Male, "female" => Female, "both" => Both, "other" => Other });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_accepts_male_and_female_only() {
        let genders = LookingFor::Both.accepted_genders();
        assert!(genders.contains(&Gender::Male));
        assert!(genders.contains(&Gender::Female));
        assert!(!genders.contains(&Gender::Other));
    }

    #[test]
    fn direction_parses_stored_text() {
        assert_eq!("right".parse::<Direction>(), Ok(Direction::Right));
        assert!("up".parse::<Direction>().is_err());
    }
}
