//! ICY/Icecast metadata headers eligible for forwarding.
//!
//! The allowlist is a closed enumeration so the set of forwarded headers can
//! be audited in one place. Each variant maps to exactly one native header
//! name, which is also the outbound header name.

use axum::http::HeaderName;

/// Header requesting the streaming protocol extension (metadata interleaving).
pub const ICY_METADATA_REQUEST: &str = "icy-metadata";

/// Metadata header that may be copied from the upstream probe response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IcyHeader {
    AudioInfo,
    Bitrate,
    Description,
    Genre,
    Name,
    Public,
    SampleRate,
    Url,
    Vbr,
    MetaInterval,
}

impl IcyHeader {
    /// Every allowlisted header, in forwarding order.
    pub const ALL: [IcyHeader; 10] = [
        IcyHeader::AudioInfo,
        IcyHeader::Bitrate,
        IcyHeader::Description,
        IcyHeader::Genre,
        IcyHeader::Name,
        IcyHeader::Public,
        IcyHeader::SampleRate,
        IcyHeader::Url,
        IcyHeader::Vbr,
        IcyHeader::MetaInterval,
    ];

    /// Native (lower-case) header name.
    pub const fn as_str(self) -> &'static str {
        match self {
            IcyHeader::AudioInfo => "ice-audio-info",
            IcyHeader::Bitrate => "icy-br",
            IcyHeader::Description => "icy-description",
            IcyHeader::Genre => "icy-genre",
            IcyHeader::Name => "icy-name",
            IcyHeader::Public => "icy-pub",
            IcyHeader::SampleRate => "icy-sr",
            IcyHeader::Url => "icy-url",
            IcyHeader::Vbr => "icy-vbr",
            IcyHeader::MetaInterval => "icy-metaint",
        }
    }

    /// Header name used on the outbound response.
    pub fn header_name(self) -> HeaderName {
        HeaderName::from_static(self.as_str())
    }
}

impl std::fmt::Display for IcyHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
