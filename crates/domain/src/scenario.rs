//! Request scenarios driven against the target service

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;
use crate::payloads::{LONG, LONG_PATH, SHORT, SHORT_PATH};

/// A fixed request shape with a known expected response body
///
/// Naming follows `<request payload><response payload><method>`, so
/// `ShortLongPost` posts the short payload and expects the long one back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// `GET /short`, expects the short payload
    #[default]
    ShortGet,
    /// `POST /short` with the short payload, expects the short payload
    ShortShortPost,
    /// `POST /long` with the short payload, expects the long payload
    ShortLongPost,
    /// `POST /long` with the long payload, expects the long payload
    LongLongPost,
}

impl Scenario {
    /// All scenarios in execution order
    pub const ALL: [Self; 4] = [
        Self::ShortGet,
        Self::ShortShortPost,
        Self::ShortLongPost,
        Self::LongLongPost,
    ];

    /// Request path
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::ShortGet | Self::ShortShortPost => SHORT_PATH,
            Self::ShortLongPost | Self::LongLongPost => LONG_PATH,
        }
    }

    /// Request body, `None` for GET scenarios
    #[must_use]
    pub const fn request_body(&self) -> Option<&'static str> {
        match self {
            Self::ShortGet => None,
            Self::ShortShortPost | Self::ShortLongPost => Some(SHORT),
            Self::LongLongPost => Some(LONG),
        }
    }

    /// Body the target is expected to answer with
    #[must_use]
    pub const fn expected_body(&self) -> &'static str {
        match self {
            Self::ShortGet | Self::ShortShortPost => SHORT,
            Self::ShortLongPost | Self::LongLongPost => LONG,
        }
    }

    /// Stable name used in metric keys and on the command line
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ShortGet => "short-get",
            Self::ShortShortPost => "short-short-post",
            Self::ShortLongPost => "short-long-post",
            Self::LongLongPost => "long-long-post",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownScenario(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_has_no_body() {
        assert_eq!(Scenario::ShortGet.request_body(), None);
        assert_eq!(Scenario::ShortGet.path(), "/short");
    }

    #[test]
    fn short_long_post_expects_long_payload() {
        let scenario = Scenario::ShortLongPost;
        assert_eq!(scenario.path(), "/long");
        assert_eq!(scenario.request_body(), Some(SHORT));
        assert_eq!(scenario.expected_body(), LONG);
    }

    #[test]
    fn parse_round_trips_names() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>(), Ok(scenario));
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(
            "long-get".parse::<Scenario>(),
            Err(DomainError::UnknownScenario("long-get".to_string()))
        );
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Scenario::LongLongPost).unwrap();
        assert_eq!(json, "\"long-long-post\"");
    }
}
