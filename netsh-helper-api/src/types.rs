//! Helper identity and the attributes a helper registers with

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::HelperError;

/// Globally unique 128-bit helper identity.
///
/// Displays in registry form: braces around an upper-case hyphenated GUID,
/// e.g. `{0705ECA0-7AAC-11D2-89DC-006008B0E5B9}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HelperId(Uuid);

impl HelperId {
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Build an id from the four GUID fields
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self(Uuid::from_fields(data1, data2, data3, &data4))
    }

    /// Generate a fresh random id
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for HelperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:X}}}", self.0.hyphenated())
    }
}

impl FromStr for HelperId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);
        Uuid::parse_str(trimmed).map(Self)
    }
}

/// Callback invoked once to start a helper
pub type StartFn = Arc<dyn Fn() -> Result<(), HelperError> + Send + Sync>;

/// Callback invoked when a started helper is torn down
pub type StopFn = Arc<dyn Fn() -> Result<(), HelperError> + Send + Sync>;

/// What a helper declares about itself when it registers.
///
/// The registry copies this value at registration time; the module keeps no
/// reference to the registry's copy.
#[derive(Clone)]
pub struct HelperAttributes {
    /// Unique identity of the helper
    pub id: HelperId,
    /// Optional start routine
    pub start: Option<StartFn>,
    /// Optional stop routine
    pub stop: Option<StopFn>,
}

impl HelperAttributes {
    /// Attributes with no start or stop capability
    pub fn new(id: HelperId) -> Self {
        Self {
            id,
            start: None,
            stop: None,
        }
    }

    pub fn with_start<F>(mut self, start: F) -> Self
    where
        F: Fn() -> Result<(), HelperError> + Send + Sync + 'static,
    {
        self.start = Some(Arc::new(start));
        self
    }

    pub fn with_stop<F>(mut self, stop: F) -> Self
    where
        F: Fn() -> Result<(), HelperError> + Send + Sync + 'static,
    {
        self.stop = Some(Arc::new(stop));
        self
    }
}

impl fmt::Debug for HelperAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperAttributes")
            .field("id", &self.id)
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_id_display_is_braced_upper_case() {
        let id = HelperId::from_fields(
            0x0705eca0,
            0x7aac,
            0x11d2,
            [0x89, 0xdc, 0x00, 0x60, 0x08, 0xb0, 0xe5, 0xb9],
        );
        assert_eq!(id.to_string(), "{0705ECA0-7AAC-11D2-89DC-006008B0E5B9}");
    }

    #[test]
    fn test_helper_id_parses_with_and_without_braces() {
        let braced: HelperId = "{0705ECA0-7AAC-11D2-89DC-006008B0E5B9}".parse().unwrap();
        let bare: HelperId = "0705eca0-7aac-11d2-89dc-006008b0e5b9".parse().unwrap();
        assert_eq!(braced, bare);
        assert!("not-a-guid".parse::<HelperId>().is_err());
    }

    #[test]
    fn test_attributes_builder() {
        let id = HelperId::from_u128(7);
        let attrs = HelperAttributes::new(id).with_start(|| Ok(()));
        assert_eq!(attrs.id, id);
        assert!(attrs.start.is_some());
        assert!(attrs.stop.is_none());

        let debug = format!("{:?}", attrs);
        assert!(debug.contains("start: true"));
        assert!(debug.contains("stop: false"));
    }

    #[test]
    fn test_attributes_clone_shares_callbacks() {
        let attrs = HelperAttributes::new(HelperId::from_u128(1))
            .with_start(|| Err(HelperError::Status(9)));
        let copy = attrs.clone();
        let start = copy.start.unwrap();
        assert_eq!(start(), Err(HelperError::Status(9)));
    }
}
