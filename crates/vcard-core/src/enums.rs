//! Code tables shared between the draft model and the card interchange format
//!
//! Each enum has a lenient string parser (falling back to a named default) and,
//! where the interchange format stores integers, a bidirectional code table.

use serde::{Deserialize, Serialize};

/// Lowercase and fold `-`/space to `_` before matching enum names
fn fold(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Where a worldbook entry is injected into the prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    BeforeChar,
    #[default]
    AfterChar,
    BeforeAuthorNote,
    AfterAuthorNote,
    AtDepthSystem,
    AtDepthUser,
    AtDepthAssistant,
    BeforeExampleMessages,
    AfterExampleMessages,
    Outlet,
}

impl Position {
    pub const ALL: [Position; 10] = [
        Self::BeforeChar,
        Self::AfterChar,
        Self::BeforeAuthorNote,
        Self::AfterAuthorNote,
        Self::AtDepthSystem,
        Self::AtDepthUser,
        Self::AtDepthAssistant,
        Self::BeforeExampleMessages,
        Self::AfterExampleMessages,
        Self::Outlet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeChar => "before_char",
            Self::AfterChar => "after_char",
            Self::BeforeAuthorNote => "before_author_note",
            Self::AfterAuthorNote => "after_author_note",
            Self::AtDepthSystem => "at_depth_system",
            Self::AtDepthUser => "at_depth_user",
            Self::AtDepthAssistant => "at_depth_assistant",
            Self::BeforeExampleMessages => "before_example_messages",
            Self::AfterExampleMessages => "after_example_messages",
            Self::Outlet => "outlet",
        }
    }

    /// True for the three positions that carry a depth
    pub fn is_at_depth(&self) -> bool {
        matches!(
            self,
            Self::AtDepthSystem | Self::AtDepthUser | Self::AtDepthAssistant
        )
    }

    /// Interchange encoding: `(position, role)`; role is only set for at-depth positions
    pub fn to_code(&self) -> (i64, Option<i64>) {
        match self {
            Self::BeforeChar => (0, None),
            Self::AfterChar => (1, None),
            Self::BeforeAuthorNote => (2, None),
            Self::AfterAuthorNote => (3, None),
            Self::AtDepthSystem => (4, Some(0)),
            Self::AtDepthUser => (4, Some(1)),
            Self::AtDepthAssistant => (4, Some(2)),
            Self::BeforeExampleMessages => (5, None),
            Self::AfterExampleMessages => (6, None),
            Self::Outlet => (7, None),
        }
    }

    /// Decode `(position, role)`; unknown positions fall back to `after_char`,
    /// and depth 4 with an unknown role falls back to the system role
    pub fn from_code(position: i64, role: Option<i64>) -> Self {
        match position {
            0 => Self::BeforeChar,
            1 => Self::AfterChar,
            2 => Self::BeforeAuthorNote,
            3 => Self::AfterAuthorNote,
            4 => match role {
                Some(1) => Self::AtDepthUser,
                Some(2) => Self::AtDepthAssistant,
                _ => Self::AtDepthSystem,
            },
            5 => Self::BeforeExampleMessages,
            6 => Self::AfterExampleMessages,
            7 => Self::Outlet,
            _ => Self::AfterChar,
        }
    }

    /// Legacy two-valued text position used by v2 readers
    pub fn legacy_text(&self) -> &'static str {
        match self {
            Self::BeforeChar | Self::BeforeAuthorNote | Self::BeforeExampleMessages => {
                "before_char"
            }
            _ => "after_char",
        }
    }

    /// Parse a position name, falling back to `after_char`
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s);
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == folded)
            .ok_or_else(|| format!("Invalid position: {}", s))
    }
}

/// How secondary keys combine with primary keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryLogic {
    #[default]
    AndAny,
    AndAll,
    NotAll,
    NotAny,
}

impl SecondaryLogic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AndAny => "and_any",
            Self::AndAll => "and_all",
            Self::NotAll => "not_all",
            Self::NotAny => "not_any",
        }
    }

    pub fn to_code(&self) -> i64 {
        match self {
            Self::AndAny => 0,
            Self::NotAll => 1,
            Self::NotAny => 2,
            Self::AndAll => 3,
        }
    }

    /// Decode an interchange code, falling back to `and_any`
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::NotAll,
            2 => Self::NotAny,
            3 => Self::AndAll,
            _ => Self::AndAny,
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for SecondaryLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SecondaryLogic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "and_any" => Ok(Self::AndAny),
            "and_all" => Ok(Self::AndAll),
            "not_all" => Ok(Self::NotAll),
            "not_any" => Ok(Self::NotAny),
            _ => Err(format!("Invalid secondary logic: {}", s)),
        }
    }
}

/// Worldbook activation mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Light {
    /// Constant: always active
    Blue,
    /// Selective: keyword-gated
    #[default]
    Green,
}

impl Light {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

impl std::fmt::Display for Light {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Light {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "blue" | "constant" => Ok(Self::Blue),
            "green" | "selective" => Ok(Self::Green),
            _ => Err(format!("Invalid light: {}", s)),
        }
    }
}

/// How a regex `find` pattern is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindStyle {
    /// `/pattern/flags` literal
    Slash,
    /// Bare pattern text
    #[default]
    Raw,
}

impl FindStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slash => "slash",
            Self::Raw => "raw",
        }
    }
}

impl std::fmt::Display for FindStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FindStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "slash" => Ok(Self::Slash),
            "raw" => Ok(Self::Raw),
            _ => Err(format!("Invalid find style: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_code_table_is_bijective() {
        for position in Position::ALL {
            let (code, role) = position.to_code();
            assert_eq!(Position::from_code(code, role), position);
        }
    }

    #[test]
    fn test_position_fallbacks() {
        assert_eq!(Position::from_code(42, None), Position::AfterChar);
        assert_eq!(Position::from_code(-1, Some(2)), Position::AfterChar);
        assert_eq!(Position::from_code(4, None), Position::AtDepthSystem);
        assert_eq!(Position::from_code(4, Some(9)), Position::AtDepthSystem);
        assert_eq!(Position::from_str_lossy("nowhere"), Position::AfterChar);
    }

    #[test]
    fn test_position_parsing_is_lenient() {
        assert_eq!(
            "At-Depth-User".parse::<Position>().unwrap(),
            Position::AtDepthUser
        );
        assert_eq!(" outlet ".parse::<Position>().unwrap(), Position::Outlet);
    }

    #[test]
    fn test_secondary_logic_codes() {
        assert_eq!(SecondaryLogic::AndAny.to_code(), 0);
        assert_eq!(SecondaryLogic::NotAll.to_code(), 1);
        assert_eq!(SecondaryLogic::NotAny.to_code(), 2);
        assert_eq!(SecondaryLogic::AndAll.to_code(), 3);
        for code in 0..4 {
            assert_eq!(SecondaryLogic::from_code(code).to_code(), code);
        }
        assert_eq!(SecondaryLogic::from_code(17), SecondaryLogic::AndAny);
    }

    #[test]
    fn test_light_aliases() {
        assert_eq!("constant".parse::<Light>().unwrap(), Light::Blue);
        assert_eq!("GREEN".parse::<Light>().unwrap(), Light::Green);
        assert!("red".parse::<Light>().is_err());
    }

    #[test]
    fn test_legacy_text_position() {
        assert_eq!(Position::BeforeChar.legacy_text(), "before_char");
        assert_eq!(Position::AtDepthUser.legacy_text(), "after_char");
    }
}
