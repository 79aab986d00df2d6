//! Provider metadata model.
//!
//! # Responsibility
//! - Describe one exposed value (identifier, kind, subject shape, gates,
//!   presentation hints) after extraction has validated it.
//! - Own the length limits shared by extraction and storage.
//!
//! # Invariants
//! - Identifiers are at most [`MAX_IDENTIFIER_CHARS`] characters.
//! - Descriptions are at most [`MAX_DESCRIPTION_CHARS`] characters.
//! - Descriptors are immutable once built by the extractor.

use serde::{Deserialize, Serialize};

/// Maximum stored length of names, texts and icon identifiers.
pub const MAX_IDENTIFIER_CHARS: usize = 50;
/// Maximum stored length of provider descriptions.
pub const MAX_DESCRIPTION_CHARS: usize = 150;

/// Normalized kind of value a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `bool`; may also publish a condition.
    Boolean,
    /// `i64`, optionally formatted by [`FormatType`].
    Number,
    /// `f64`.
    Double,
    /// `f64` expected in `[0.0, 1.0]`.
    Percentage,
    /// Short text.
    String,
}

impl ValueKind {
    /// Stable string id used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Double => "double",
            Self::Percentage => "percentage",
            Self::String => "string",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "boolean" => Some(Self::Boolean),
            "number" => Some(Self::Number),
            "double" => Some(Self::Double),
            "percentage" => Some(Self::Percentage),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// Entity shape a provider's value is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectShape {
    Player,
    Group,
    Server,
}

impl SubjectShape {
    /// Stable string id used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Group => "group",
            Self::Server => "server",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "player" => Some(Self::Player),
            "group" => Some(Self::Group),
            "server" => Some(Self::Server),
            _ => None,
        }
    }
}

/// One declared parameter of a provider operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    PlayerUuid,
    PlayerName,
    Group,
    /// Any parameter the engine cannot supply, named by its declared type.
    Other(String),
}

/// Resolves the subject shape of a declared parameter list.
///
/// - `[]` -> server
/// - any duplicate-free mix of player uuid/name -> player
/// - `[group]` -> group
///
/// Returns `None` for every other combination.
pub fn subject_shape_of(params: &[ParamType]) -> Option<SubjectShape> {
    match params {
        [] => Some(SubjectShape::Server),
        [ParamType::Group] => Some(SubjectShape::Group),
        [ParamType::PlayerUuid] | [ParamType::PlayerName] => Some(SubjectShape::Player),
        [ParamType::PlayerUuid, ParamType::PlayerName]
        | [ParamType::PlayerName, ParamType::PlayerUuid] => Some(SubjectShape::Player),
        _ => None,
    }
}

/// Icon family hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Solid,
    Regular,
    Brand,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Regular => "regular",
            Self::Brand => "brand",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "solid" => Some(Self::Solid),
            "regular" => Some(Self::Regular),
            "brand" => Some(Self::Brand),
            _ => None,
        }
    }
}

/// Icon color hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    None,
    Red,
    Pink,
    Purple,
    Indigo,
    Blue,
    LightBlue,
    Cyan,
    Teal,
    Green,
    LightGreen,
    Lime,
    Yellow,
    Amber,
    Orange,
    DeepOrange,
    Brown,
    Grey,
    BlueGrey,
    Black,
}

const COLORS: &[(Color, &str)] = &[
    (Color::None, "none"),
    (Color::Red, "red"),
    (Color::Pink, "pink"),
    (Color::Purple, "purple"),
    (Color::Indigo, "indigo"),
    (Color::Blue, "blue"),
    (Color::LightBlue, "light_blue"),
    (Color::Cyan, "cyan"),
    (Color::Teal, "teal"),
    (Color::Green, "green"),
    (Color::LightGreen, "light_green"),
    (Color::Lime, "lime"),
    (Color::Yellow, "yellow"),
    (Color::Amber, "amber"),
    (Color::Orange, "orange"),
    (Color::DeepOrange, "deep_orange"),
    (Color::Brown, "brown"),
    (Color::Grey, "grey"),
    (Color::BlueGrey, "blue_grey"),
    (Color::Black, "black"),
];

impl Color {
    pub fn as_str(self) -> &'static str {
        COLORS
            .iter()
            .find(|(color, _)| *color == self)
            .map_or("none", |(_, name)| *name)
    }

    pub fn parse(value: &str) -> Option<Self> {
        COLORS
            .iter()
            .find(|(_, name)| *name == value)
            .map(|(color, _)| *color)
    }
}

/// Presentation icon attached to plugins, tabs and providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub name: String,
    pub family: Family,
    pub color: Color,
}

impl Icon {
    pub fn new(name: impl Into<String>, family: Family, color: Color) -> Self {
        Self {
            name: name.into(),
            family,
            color,
        }
    }
}

impl Default for Icon {
    fn default() -> Self {
        Self::new("question", Family::Solid, Color::None)
    }
}

/// Display formatting for number providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    #[default]
    None,
    /// Epoch milliseconds shown as a calendar date.
    DateYear,
    /// Epoch milliseconds shown with second precision.
    DateSecond,
    /// Duration in milliseconds.
    TimeMillis,
}

impl FormatType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DateYear => "date_year",
            Self::DateSecond => "date_second",
            Self::TimeMillis => "time_millis",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "date_year" => Some(Self::DateYear),
            "date_second" => Some(Self::DateSecond),
            "time_millis" => Some(Self::TimeMillis),
            _ => None,
        }
    }
}

/// Gate on a named condition published by a boolean provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conditional {
    pub name: String,
    /// When set, the gate opens only while the condition is `false`.
    pub negated: bool,
}

impl Conditional {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negated: false,
        }
    }

    pub fn negated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negated: true,
        }
    }
}

/// Extension identity marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Display identifier, also the registry key.
    pub name: String,
    pub icon: Icon,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: Icon::new("cube", Family::Solid, Color::None),
        }
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = icon;
        self
    }
}

/// Order of element groups inside one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementOrder {
    Values,
    Tables,
    Graphs,
}

impl ElementOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Values => "values",
            Self::Tables => "tables",
            Self::Graphs => "graphs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "values" => Some(Self::Values),
            "tables" => Some(Self::Tables),
            "graphs" => Some(Self::Graphs),
            _ => None,
        }
    }

    /// Default order used for tabs without explicit structure info.
    pub fn default_order() -> Vec<Self> {
        vec![Self::Values, Self::Graphs, Self::Tables]
    }
}

/// Validated display grouping for provider values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub name: String,
    pub icon: Icon,
    pub element_order: Vec<ElementOrder>,
    /// Lower sorts first.
    pub tab_priority: i32,
}

/// Validated description of one exposed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Storage identifier, derived from the declared method name.
    pub name: String,
    pub kind: ValueKind,
    pub subject: SubjectShape,
    /// Display label.
    pub text: String,
    pub description: Option<String>,
    /// Higher sorts first.
    pub priority: i32,
    pub icon: Icon,
    pub show_in_players_table: bool,
    /// Boolean only: value is used as a condition but not displayed.
    pub hidden: bool,
    /// Boolean only: condition this provider's result is published under.
    pub provided_condition: Option<String>,
    pub required_condition: Option<Conditional>,
    pub tab: Option<String>,
    /// Number only.
    pub format: FormatType,
}

/// Static metadata of one extension, independent of any subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    pub plugin: PluginInfo,
    pub providers: Vec<ProviderDescriptor>,
    pub tabs: Vec<TabDescriptor>,
}

/// Truncates `value` to its first `max_chars` characters.
///
/// Returns the (possibly shortened) value and whether truncation happened.
pub fn truncate_chars(value: &str, max_chars: usize) -> (String, bool) {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (value[..byte_index].to_string(), true),
        None => (value.to_string(), false),
    }
}
