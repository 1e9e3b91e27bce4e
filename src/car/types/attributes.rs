//! Rendition key attribute identifiers and theme states.
//!
//! Attribute identifiers are 16-bit values. Identifiers this reader does not
//! know are kept as [`AttributeId::Unknown`] so that keys from newer catalogs
//! still round-trip unchanged.

use std::fmt;

/// Value reserved for "no theme state applies".
pub const THEME_STATE_NONE: i64 = -1;

macro_rules! attribute_ids {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// Identifier half of a rendition key token.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum AttributeId {
            $($variant,)*
            /// An identifier outside the known table, preserved numerically.
            Unknown(u16),
        }

        impl AttributeId {
            /// Maps a raw identifier onto the known table.
            pub fn from_u16(value: u16) -> Self {
                match value {
                    $($value => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }

            /// Raw on-disk identifier.
            pub fn as_u16(self) -> u16 {
                match self {
                    $(Self::$variant => $value,)*
                    Self::Unknown(other) => other,
                }
            }

            /// Symbolic name, or `None` for unknown identifiers.
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($name),)*
                    Self::Unknown(_) => None,
                }
            }
        }
    };
}

attribute_ids! {
    Look = 0 => "look",
    Element = 1 => "element",
    Part = 2 => "part",
    Size = 3 => "size",
    Direction = 4 => "direction",
    Placeholder = 5 => "placeholder",
    Value = 6 => "value",
    Appearance = 7 => "appearance",
    Dimension1 = 8 => "dimension1",
    Dimension2 = 9 => "dimension2",
    State = 10 => "state",
    Layer = 11 => "layer",
    Scale = 12 => "scale",
    Localization = 13 => "localization",
    PresentationState = 14 => "presentation-state",
    Idiom = 15 => "idiom",
    Subtype = 16 => "subtype",
    Identifier = 17 => "identifier",
    PreviousValue = 18 => "previous-value",
    PreviousState = 19 => "previous-state",
    HorizontalSizeClass = 20 => "horizontal-size-class",
    VerticalSizeClass = 21 => "vertical-size-class",
    MemoryClass = 22 => "memory-class",
    GraphicsClass = 23 => "graphics-class",
    DisplayGamut = 24 => "display-gamut",
    DeploymentTarget = 25 => "deployment-target",
}

impl AttributeId {
    /// The canonical variant for this identifier's number, so that
    /// `Unknown(12)` and `Scale` are the same attribute.
    pub fn normalized(self) -> Self {
        Self::from_u16(self.as_u16())
    }

    /// Attributes that partition renditions by device and environment class.
    ///
    /// These carry the highest weight when scoring fallback candidates.
    pub fn is_device_class(self) -> bool {
        matches!(
            self,
            Self::Idiom
                | Self::Size
                | Self::Subtype
                | Self::Appearance
                | Self::HorizontalSizeClass
                | Self::VerticalSizeClass
                | Self::MemoryClass
                | Self::GraphicsClass
                | Self::DisplayGamut
                | Self::DeploymentTarget
        )
    }
}

impl From<u16> for AttributeId {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "attribute#{}", self.as_u16()),
        }
    }
}

/// Returns the symbolic name of a raw attribute identifier.
///
/// Unknown identifiers yield `None`; callers keep the number.
pub fn attribute_name(identifier: u16) -> Option<&'static str> {
    AttributeId::from_u16(identifier).name()
}

/// UI interaction state a rendition is drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeState {
    Normal,
    Rollover,
    Pressed,
    Inactive,
    Disabled,
    DeeplyPressed,
}

impl ThemeState {
    /// Maps a raw state value; anything outside `0..=5` has no symbolic state.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Rollover),
            2 => Some(Self::Pressed),
            3 => Some(Self::Inactive),
            4 => Some(Self::Disabled),
            5 => Some(Self::DeeplyPressed),
            _ => None,
        }
    }

    pub fn value(self) -> u16 {
        match self {
            Self::Normal => 0,
            Self::Rollover => 1,
            Self::Pressed => 2,
            Self::Inactive => 3,
            Self::Disabled => 4,
            Self::DeeplyPressed => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Rollover => "Rollover",
            Self::Pressed => "Pressed",
            Self::Inactive => "Inactive",
            Self::Disabled => "Disabled",
            Self::DeeplyPressed => "DeeplyPressed",
        }
    }
}

impl fmt::Display for ThemeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbolic name for a raw theme state.
///
/// Foreign or future values (and [`THEME_STATE_NONE`]) yield `None` rather
/// than an error, so they never abort decoding.
pub fn theme_state_name(state: i64) -> Option<&'static str> {
    ThemeState::from_value(state).map(ThemeState::name)
}
