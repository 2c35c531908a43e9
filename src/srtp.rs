//! SRTP trailer sizes.
//
// SRTP layout
// [header, [rtp, (padding + pad_count)], mki, auth_tag]
//
// SRTCP layout
// [header, [rtcp], E + srtcp_index, mki, auth_tag]
//
// The MKI is optional and never negotiated by WebRTC endpoints, but a relay
// using a general purpose SRTP library must budget for the largest trailer
// the library is allowed to append.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest authentication tag any supported cipher suite produces.
pub const SRTP_MAX_TAG_LEN: usize = 16;

/// Largest master key identifier the SRTP library accepts.
pub const SRTP_MAX_MKI_LEN: usize = 128;

/// Largest trailer appended to a protected RTP packet.
pub const SRTP_MAX_TRAILER_LEN: usize = SRTP_MAX_TAG_LEN + SRTP_MAX_MKI_LEN;

/// E flag + 31 bit SRTCP index.
pub const SRTCP_INDEX_LEN: usize = 4;

/// Largest number of bytes protecting an RTCP packet adds to it.
pub const SRTP_MAX_RTCP_TRAILER_LEN: usize = SRTP_MAX_TRAILER_LEN + SRTCP_INDEX_LEN;

/// SRTP protection profiles, as negotiated via DTLS-SRTP (RFC 5764, RFC 7714).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SrtpProfile {
    /// SRTP_AES128_CM_HMAC_SHA1_80
    Aes128CmSha1_80,
    /// SRTP_AES128_CM_HMAC_SHA1_32
    Aes128CmSha1_32,
    /// SRTP_AEAD_AES_128_GCM
    AeadAes128Gcm,
    /// SRTP_AEAD_AES_256_GCM
    AeadAes256Gcm,
}

impl SrtpProfile {
    /// All the profiles we know trailer sizes for.
    pub const ALL: &'static [SrtpProfile] = &[
        SrtpProfile::AeadAes256Gcm,
        SrtpProfile::AeadAes128Gcm,
        SrtpProfile::Aes128CmSha1_80,
        SrtpProfile::Aes128CmSha1_32,
    ];

    /// Authentication tag length for SRTP packets.
    #[rustfmt::skip]
    pub const fn rtp_tag_len(&self) -> usize {
        match self {
            SrtpProfile::Aes128CmSha1_80 => 10,
            SrtpProfile::Aes128CmSha1_32 => 4,
            SrtpProfile::AeadAes128Gcm   => 16,
            SrtpProfile::AeadAes256Gcm   => 16,
        }
    }

    /// Authentication tag length for SRTCP packets.
    ///
    /// The _32 profile still uses an 80 bit tag for SRTCP (RFC 5764 4.1.2).
    pub const fn rtcp_tag_len(&self) -> usize {
        match self {
            SrtpProfile::Aes128CmSha1_32 => 10,
            _ => self.rtp_tag_len(),
        }
    }

    /// Bytes added to an RTP packet by protecting it.
    pub const fn rtp_trailer_len(&self, mki_len: usize) -> usize {
        self.rtp_tag_len() + mki_len
    }

    /// Bytes added to an RTCP packet by protecting it.
    pub const fn rtcp_trailer_len(&self, mki_len: usize) -> usize {
        self.rtcp_tag_len() + mki_len + SRTCP_INDEX_LEN
    }

    /// Name as used in the DTLS use_srtp extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            SrtpProfile::Aes128CmSha1_80 => "SRTP_AES128_CM_SHA1_80",
            SrtpProfile::Aes128CmSha1_32 => "SRTP_AES128_CM_SHA1_32",
            SrtpProfile::AeadAes128Gcm => "SRTP_AEAD_AES_128_GCM",
            SrtpProfile::AeadAes256Gcm => "SRTP_AEAD_AES_256_GCM",
        }
    }
}

impl fmt::Display for SrtpProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
