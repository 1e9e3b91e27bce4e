//! Rendition keys: ordered lists of `(attribute, value)` tokens.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::attributes::{AttributeId, ThemeState};
use super::error::{CarError, Result};

/// Size of one serialized token: `identifier: u16, value: u16`.
pub const TOKEN_SIZE: usize = 4;

/// One `(attribute-identifier, value)` pair of a rendition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyToken {
    pub identifier: AttributeId,
    pub value: u16,
}

impl KeyToken {
    pub fn new(identifier: AttributeId, value: u16) -> Self {
        Self {
            identifier: identifier.normalized(),
            value,
        }
    }
}

/// An ordered set of key tokens with unique identifiers.
///
/// Insertion order is kept so keys serialize back exactly as read, but two
/// keys are equal (and hash equally) whenever they hold the same tokens in any
/// order.
#[derive(Debug, Clone, Default)]
pub struct RenditionKey {
    tokens: Vec<KeyToken>,
}

impl RenditionKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a key from tokens, rejecting repeated identifiers.
    pub fn from_tokens(tokens: impl IntoIterator<Item = KeyToken>) -> Result<Self> {
        let mut key = Self::new();
        for token in tokens {
            let token = KeyToken::new(token.identifier, token.value);
            if key.get(token.identifier).is_some() {
                return Err(CarError::DuplicateAttribute(token.identifier));
            }
            key.tokens.push(token);
        }
        Ok(key)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, identifier: AttributeId, value: u16) -> Self {
        self.set(identifier, value);
        self
    }

    /// Replaces the value of `identifier`, or appends it when absent.
    pub fn set(&mut self, identifier: AttributeId, value: u16) {
        let identifier = identifier.normalized();
        match self.tokens.iter_mut().find(|t| t.identifier == identifier) {
            Some(token) => token.value = value,
            None => self.tokens.push(KeyToken::new(identifier, value)),
        }
    }

    pub fn remove(&mut self, identifier: AttributeId) -> Option<u16> {
        let identifier = identifier.normalized();
        let pos = self.tokens.iter().position(|t| t.identifier == identifier)?;
        Some(self.tokens.remove(pos).value)
    }

    pub fn get(&self, identifier: AttributeId) -> Option<u16> {
        let identifier = identifier.normalized();
        self.tokens
            .iter()
            .find(|t| t.identifier == identifier)
            .map(|t| t.value)
    }

    pub fn contains(&self, token: &KeyToken) -> bool {
        self.get(token.identifier) == Some(token.value)
    }

    /// Tokens in insertion order.
    pub fn tokens(&self) -> &[KeyToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn theme_scale(&self) -> Option<u16> {
        self.get(AttributeId::Scale)
    }

    pub fn theme_state(&self) -> Option<u16> {
        self.get(AttributeId::State)
    }

    pub fn theme_direction(&self) -> Option<u16> {
        self.get(AttributeId::Direction)
    }

    pub fn theme_size(&self) -> Option<u16> {
        self.get(AttributeId::Size)
    }

    pub fn theme_element(&self) -> Option<u16> {
        self.get(AttributeId::Element)
    }

    pub fn theme_part(&self) -> Option<u16> {
        self.get(AttributeId::Part)
    }

    /// Symbolic theme state, if the key has one in the known range.
    pub fn state(&self) -> Option<ThemeState> {
        self.theme_state()
            .and_then(|value| ThemeState::from_value(i64::from(value)))
    }

    /// Tokens sorted by identifier; the basis of equality and hashing.
    fn canonical(&self) -> Vec<(u16, u16)> {
        let mut pairs: Vec<(u16, u16)> = self
            .tokens
            .iter()
            .map(|t| (t.identifier.as_u16(), t.value))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}

impl PartialEq for RenditionKey {
    fn eq(&self, other: &Self) -> bool {
        self.tokens.len() == other.tokens.len() && self.canonical() == other.canonical()
    }
}

impl Eq for RenditionKey {}

impl Hash for RenditionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl FromIterator<KeyToken> for RenditionKey {
    /// Collects tokens; a repeated identifier overwrites the earlier value.
    fn from_iter<I: IntoIterator<Item = KeyToken>>(iter: I) -> Self {
        let mut key = Self::new();
        for token in iter {
            key.set(token.identifier, token.value);
        }
        key
    }
}

impl fmt::Display for RenditionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", token.identifier, token.value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_token_order() {
        let a = RenditionKey::new()
            .with(AttributeId::Element, 42)
            .with(AttributeId::Scale, 2)
            .with(AttributeId::State, 0);
        let b = RenditionKey::new()
            .with(AttributeId::State, 0)
            .with(AttributeId::Element, 42)
            .with(AttributeId::Scale, 2);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn differing_values_or_extra_tokens_are_not_equal() {
        let base = RenditionKey::new().with(AttributeId::Element, 42).with(AttributeId::Scale, 2);
        assert_ne!(base, base.clone().with(AttributeId::Scale, 3));
        assert_ne!(base, base.clone().with(AttributeId::State, 0));
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let err = RenditionKey::from_tokens([
            KeyToken::new(AttributeId::Scale, 1),
            KeyToken::new(AttributeId::Scale, 2),
        ])
        .unwrap_err();
        assert!(matches!(err, CarError::DuplicateAttribute(AttributeId::Scale)));
    }

    #[test]
    fn set_replaces_in_place() {
        let mut key = RenditionKey::new()
            .with(AttributeId::Element, 7)
            .with(AttributeId::Scale, 1);
        key.set(AttributeId::Element, 8);
        assert_eq!(key.tokens()[0], KeyToken::new(AttributeId::Element, 8));
        assert_eq!(key.len(), 2);
        assert_eq!(key.remove(AttributeId::Scale), Some(1));
        assert_eq!(key.theme_scale(), None);
    }

    #[test]
    fn unknown_wrappers_of_known_ids_are_the_same_attribute() {
        let key = RenditionKey::new()
            .with(AttributeId::Element, 1)
            .with(AttributeId::Unknown(12), 2);
        assert_eq!(key.theme_scale(), Some(2));
        assert_eq!(key.tokens()[1].identifier, AttributeId::Scale);
        let named = RenditionKey::new()
            .with(AttributeId::Element, 1)
            .with(AttributeId::Scale, 2);
        assert_eq!(key, named);

        // A second spelling of Scale replaces the value instead of adding a token.
        let key = key.with(AttributeId::Scale, 3);
        assert_eq!(key.len(), 2);
        assert_eq!(key.get(AttributeId::Unknown(12)), Some(3));

        let err = RenditionKey::from_tokens([
            KeyToken { identifier: AttributeId::Scale, value: 1 },
            KeyToken { identifier: AttributeId::Unknown(12), value: 2 },
        ])
        .unwrap_err();
        assert!(matches!(err, CarError::DuplicateAttribute(AttributeId::Scale)));
    }

    #[test]
    fn display_lists_tokens_in_order() {
        let key = RenditionKey::new()
            .with(AttributeId::Element, 42)
            .with(AttributeId::Unknown(99), 3);
        assert_eq!(key.to_string(), "{element=42, attribute#99=3}");
    }
}
