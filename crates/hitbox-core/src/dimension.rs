use serde::{Deserialize, Serialize};

/// The categorical axes a counter can be broken down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Path,
    Browser,
    Platform,
    Referrer,
}

impl DimensionKind {
    /// Stable storage string for the `dimensions.kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKind::Path => "path",
            DimensionKind::Browser => "browser",
            DimensionKind::Platform => "platform",
            DimensionKind::Referrer => "referrer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(DimensionKind::Path),
            "browser" => Some(DimensionKind::Browser),
            "platform" => Some(DimensionKind::Platform),
            "referrer" => Some(DimensionKind::Referrer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_storage_strings() {
        for kind in [
            DimensionKind::Path,
            DimensionKind::Browser,
            DimensionKind::Platform,
            DimensionKind::Referrer,
        ] {
            assert_eq!(DimensionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DimensionKind::parse("device"), None);
    }
}
