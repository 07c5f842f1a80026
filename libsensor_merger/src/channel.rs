use std::fmt;
use std::str::FromStr;

use super::error::HeaderError;

/// Label of the channel carrying the row timestamps
pub const TIME_LABEL: &str = "Time";

/// ChannelName is the identity of a channel: the raw header text as it appears in a file.
///
/// Two files share a channel when their header fields are identical strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the header grammar of this name
    pub fn header(&self) -> Result<ChannelHeader, HeaderError> {
        ChannelHeader::from_str(&self.0)
    }

    /// Check if this is the timestamp channel
    pub fn is_time(&self) -> bool {
        match self.header() {
            Ok(header) => header.label == TIME_LABEL,
            Err(_) => false,
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The parsed form of a channel header.
///
/// Accepted forms are `label`, `label (unit)` and `label (unit)[display unit]`. The unit group
/// is the last parenthesized group, so labels may themselves contain parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHeader {
    pub label: String,
    pub unit: Option<String>,
    pub display_unit: Option<String>,
}

impl ChannelHeader {
    /// The unit used to group this channel: the display unit if given, else the measurement unit
    pub fn effective_unit(&self) -> Option<&str> {
        self.display_unit.as_deref().or(self.unit.as_deref())
    }
}

impl FromStr for ChannelHeader {
    type Err = HeaderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(HeaderError::EmptyLabel);
        }

        let (body, display_unit) = split_display_unit(text)?;
        let (label, unit) = split_unit(text, body)?;
        if unit.is_none() && display_unit.is_some() {
            return Err(HeaderError::MissingUnit(text.to_string()));
        }
        if label.is_empty() {
            return Err(HeaderError::EmptyLabel);
        }

        Ok(Self {
            label: label.to_string(),
            unit: unit.map(str::to_string),
            display_unit: display_unit.map(str::to_string),
        })
    }
}

/// Strip a trailing `[display unit]` group
fn split_display_unit(text: &str) -> Result<(&str, Option<&str>), HeaderError> {
    if let Some(without_close) = text.strip_suffix(']') {
        let open = without_close
            .rfind('[')
            .ok_or_else(|| HeaderError::Unmatched(text.to_string()))?;
        let inner = without_close[open + 1..].trim();
        if inner.is_empty() {
            return Err(HeaderError::EmptyUnit(text.to_string()));
        }
        let body = &without_close[..open];
        if body.contains('[') || body.contains(']') {
            return Err(HeaderError::Unmatched(text.to_string()));
        }
        Ok((body.trim_end(), Some(inner)))
    } else if text.contains('[') {
        Err(HeaderError::Unclosed(text.to_string()))
    } else if text.contains(']') {
        Err(HeaderError::Unmatched(text.to_string()))
    } else {
        Ok((text, None))
    }
}

/// Split `label (unit)` into its parts; a body without parentheses is a bare label
fn split_unit<'a>(text: &str, body: &'a str) -> Result<(&'a str, Option<&'a str>), HeaderError> {
    if let Some(without_close) = body.strip_suffix(')') {
        let open = without_close
            .rfind('(')
            .ok_or_else(|| HeaderError::Unmatched(text.to_string()))?;
        let unit = without_close[open + 1..].trim();
        if unit.is_empty() {
            return Err(HeaderError::EmptyUnit(text.to_string()));
        }
        if unit.contains(')') {
            return Err(HeaderError::Unmatched(text.to_string()));
        }
        Ok((without_close[..open].trim(), Some(unit)))
    } else if let Some(open) = body.rfind('(') {
        if body[open..].contains(')') {
            Err(HeaderError::TrailingText(text.to_string()))
        } else {
            Err(HeaderError::Unclosed(text.to_string()))
        }
    } else if body.contains(')') {
        Err(HeaderError::Unmatched(text.to_string()))
    } else {
        Ok((body.trim(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_label() {
        let header = ChannelHeader::from_str("Time").unwrap();
        assert_eq!(header.label, "Time");
        assert_eq!(header.unit, None);
        assert_eq!(header.effective_unit(), None);
        assert!(ChannelName::new("Time").is_time());
    }

    #[test]
    fn test_unit_and_display_unit() {
        let header = ChannelHeader::from_str("pH (pH)[pH]").unwrap();
        assert_eq!(header.label, "pH");
        assert_eq!(header.unit.as_deref(), Some("pH"));
        assert_eq!(header.display_unit.as_deref(), Some("pH"));

        let header = ChannelHeader::from_str(" Redox (mV) [V] ").unwrap();
        assert_eq!(header.label, "Redox");
        assert_eq!(header.effective_unit(), Some("V"));

        let header = ChannelHeader::from_str("Temp (probe 1) (degC)").unwrap();
        assert_eq!(header.label, "Temp (probe 1)");
        assert_eq!(header.effective_unit(), Some("degC"));
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(ChannelHeader::from_str("  "), Err(HeaderError::EmptyLabel));
        assert_eq!(ChannelHeader::from_str("(V)"), Err(HeaderError::EmptyLabel));
        assert!(matches!(
            ChannelHeader::from_str("Level (m"),
            Err(HeaderError::Unclosed(_))
        ));
        assert!(matches!(
            ChannelHeader::from_str("Level m)"),
            Err(HeaderError::Unmatched(_))
        ));
        assert!(matches!(
            ChannelHeader::from_str("Level ()"),
            Err(HeaderError::EmptyUnit(_))
        ));
        assert!(matches!(
            ChannelHeader::from_str("Level (m) extra"),
            Err(HeaderError::TrailingText(_))
        ));
        assert!(matches!(
            ChannelHeader::from_str("Level (m)[cm"),
            Err(HeaderError::Unclosed(_))
        ));
        assert!(matches!(
            ChannelHeader::from_str("Level[cm]"),
            Err(HeaderError::MissingUnit(_))
        ));
    }
}
