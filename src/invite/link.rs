//! Invite deep link parsing.
//!
//! Invite links have the shape `lunchbuddy://group/join?token=<opaque>`.
//! Anything else (other schemes, other paths, a missing or blank token)
//! is not an invite and yields `None`.

use url::Url;

use super::token::InviteToken;

/// Path segments of the join route.
const JOIN_PATH: [&str; 2] = ["group", "join"];

/// Query parameter carrying the token.
const TOKEN_PARAM: &str = "token";

/// Parser bound to the app's link scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLinkParser {
    scheme: String,
}

impl InviteLinkParser {
    /// Creates a parser accepting `scheme` (case-insensitive).
    #[must_use]
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: scheme.trim_end_matches("://").to_ascii_lowercase(),
        }
    }

    /// Returns the accepted scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Extracts the invite token from `raw`, or `None` if it is not an invite.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<InviteToken> {
        let url = Url::parse(raw.trim()).ok()?;
        if url.scheme() != self.scheme {
            return None;
        }

        // `scheme://group/join` puts "group" in the host slot while
        // `scheme:///group/join` keeps it in the path.
        let host = url.host_str().filter(|h| !h.is_empty());
        let path = url.path_segments().into_iter().flatten();
        let segments: Vec<&str> = host.into_iter().chain(path).filter(|s| !s.is_empty()).collect();

        let is_join_path = segments.len() == JOIN_PATH.len()
            && segments
                .iter()
                .zip(JOIN_PATH)
                .all(|(seg, expected)| seg.eq_ignore_ascii_case(expected));
        if !is_join_path {
            return None;
        }

        url.query_pairs()
            .find(|(key, value)| key == TOKEN_PARAM && !value.trim().is_empty())
            .and_then(|(_, value)| InviteToken::new(value.into_owned()))
    }

    /// Builds the invite link for `token`.
    #[must_use]
    pub fn link_for(&self, token: &InviteToken) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(TOKEN_PARAM, token.as_str())
            .finish();
        format!("{}://{}?{query}", self.scheme, JOIN_PATH.join("/"))
    }
}
