//! Size budgets for outbound packets.
//!
//! The relay builds packets before it knows which transport they leave
//! on, so every budget here is derived from the *worst case* overhead:
//!
//! ```text
//!   IPv4 | IPv6 header:   20 | 40 bytes.  IPv6 considered.
//!   UDP  | TCP  header:    8 | 20 bytes.  TCP considered.
//!   SRTCP trailer:               148 bytes (max tag + max MKI + SRTCP index).
//! ```
//!
//! A connection actually running IPv4/UDP wastes some capacity, in exchange
//! a single number is valid for every builder regardless of transport.

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ext::{ExtensionKind, MAX_ONE_BYTE_LEN};
use crate::net::{IpVersion, Protocol};
use crate::rtcp::LEN_HEADER;
use crate::srtp::{SrtpProfile, SRTP_MAX_RTCP_TRAILER_LEN};

/// Max MTU size.
pub const MTU_SIZE: usize = 1500;

/// Maximum size for an RTCP compound packet.
pub const RTCP_PACKET_MAX_SIZE: usize = MTU_SIZE - Overhead::WORST_CASE.total();

/// MID RTP header extension max length.
///
/// Only used when setting or updating the MID extension.
pub const MID_RTP_EXTENSION_MAX_LENGTH: u8 = 8;

const _: () = assert!(RTCP_PACKET_MAX_SIZE >= LEN_HEADER);
const _: () = assert!(RTCP_PACKET_MAX_SIZE + Overhead::WORST_CASE.total() == MTU_SIZE);
const _: () = assert!(MID_RTP_EXTENSION_MAX_LENGTH > 0);
const _: () = assert!(MID_RTP_EXTENSION_MAX_LENGTH as usize <= MAX_ONE_BYTE_LEN);

static PROCESS_DEFAULT: OnceCell<PacketBudget> = OnceCell::new();

/// Errors in budget configuration.
///
/// These are fatal. A relay that gets one of these must not start serving traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BudgetError {
    /// The MTU leaves no room for an RTCP packet after overhead.
    #[error("MTU {mtu} leaves no room for RTCP after {overhead} bytes of overhead")]
    MtuTooSmall {
        /// The configured MTU.
        mtu: usize,
        /// Sum of IP, transport and SRTP overhead.
        overhead: usize,
    },

    /// [`PacketBudget::install_process_default()`] was called twice, or after
    /// the default had already been read.
    #[error("process default packet budget is already set")]
    AlreadyInstalled,
}

/// Bytes added to a packet between the packet builder and the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Overhead {
    /// IP header.
    pub ip: IpVersion,
    /// UDP or TCP header.
    pub transport: Protocol,
    /// Bytes appended by SRTP/SRTCP protection.
    pub srtp_trailer: usize,
}

impl Overhead {
    /// IPv6 + TCP + the largest SRTCP trailer.
    pub const WORST_CASE: Overhead = Overhead {
        ip: IpVersion::WORST_CASE,
        transport: Protocol::WORST_CASE,
        srtp_trailer: SRTP_MAX_RTCP_TRAILER_LEN,
    };

    /// Creates a new overhead description.
    pub const fn new(ip: IpVersion, transport: Protocol, srtp_trailer: usize) -> Self {
        Overhead {
            ip,
            transport,
            srtp_trailer,
        }
    }

    /// Overhead of RTCP on a live connection with a negotiated profile (no MKI).
    pub const fn for_rtcp(ip: IpVersion, transport: Protocol, profile: SrtpProfile) -> Self {
        Overhead::new(ip, transport, profile.rtcp_trailer_len(0))
    }

    /// Total number of bytes.
    pub const fn total(&self) -> usize {
        self.ip
            .header_len()
            .saturating_add(self.transport.header_len())
            .saturating_add(self.srtp_trailer)
    }
}

impl Default for Overhead {
    fn default() -> Self {
        Overhead::WORST_CASE
    }
}

impl fmt::Display for Overhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}+{} ({} bytes)",
            self.ip,
            self.transport,
            self.srtp_trailer,
            self.total()
        )
    }
}

/// Frozen set of packet size budgets.
///
/// A `PacketBudget` can only be obtained through a checked constructor, and
/// has no setters. Pass it by value to packet builders; it is `Copy`.
///
/// ```
/// use relay_budget::{ExtensionKind, PacketBudget};
///
/// let budget = PacketBudget::DEFAULT;
///
/// assert_eq!(budget.mtu(), 1500);
/// assert_eq!(budget.rtcp_compound_budget(), 1292);
/// assert_eq!(budget.extension_field_limit(ExtensionKind::Mid), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketBudget {
    mtu: usize,
    rtcp_max: usize,
}

impl PacketBudget {
    /// The compiled in budget: 1500 bytes MTU with worst case overhead.
    pub const DEFAULT: PacketBudget = PacketBudget {
        mtu: MTU_SIZE,
        rtcp_max: RTCP_PACKET_MAX_SIZE,
    };

    /// Derive a budget from an MTU, reserving [`Overhead::WORST_CASE`].
    ///
    /// Fails if the MTU does not leave room for at least one RTCP header.
    pub fn new(mtu: usize) -> Result<PacketBudget, BudgetError> {
        let total = Overhead::WORST_CASE.total();

        match mtu.checked_sub(total) {
            Some(rtcp_max) if rtcp_max >= LEN_HEADER => Ok(PacketBudget { mtu, rtcp_max }),
            _ => Err(BudgetError::MtuTooSmall {
                mtu,
                overhead: total,
            }),
        }
    }

    /// Max size of any datagram we produce.
    pub const fn mtu(&self) -> usize {
        self.mtu
    }

    /// The overhead reserved between [`Self::mtu()`] and [`Self::rtcp_compound_budget()`].
    pub const fn overhead(&self) -> Overhead {
        Overhead::WORST_CASE
    }

    /// Max number of bytes in an unprotected RTCP compound packet.
    ///
    /// Builders may fill a compound up to exactly this size. Encryption and
    /// transport headers added afterwards stay within [`Self::mtu()`].
    pub const fn rtcp_compound_budget(&self) -> usize {
        self.rtcp_max
    }

    /// Max length of a single header extension value of the given kind.
    pub const fn extension_field_limit(&self, kind: ExtensionKind) -> u8 {
        kind.max_value_len()
    }

    /// Capacity left unused on a connection whose real overhead is `actual`.
    pub fn slack(&self, actual: Overhead) -> usize {
        self.overhead().total().saturating_sub(actual.total())
    }

    /// Tells whether a packet of `len` bytes, sent with `actual` overhead,
    /// fits in the MTU.
    pub fn fits_datagram(&self, len: usize, actual: Overhead) -> bool {
        let datagram = len.saturating_add(actual.total());
        let fits = datagram <= self.mtu;

        if !fits {
            warn!(
                "Datagram above MTU {}: {} ({} + {})",
                self.mtu, datagram, len, actual
            );
        }

        fits
    }

    /// Install this budget as the process-wide default.
    ///
    /// Must happen before the first [`PacketBudget::process_default()`], since
    /// the default is frozen on first read.
    pub fn install_process_default(self) -> Result<(), BudgetError> {
        PROCESS_DEFAULT
            .set(self)
            .map_err(|_| BudgetError::AlreadyInstalled)?;

        info!(
            "Installed packet budget: MTU {} RTCP {}",
            self.mtu, self.rtcp_max
        );

        Ok(())
    }

    /// The process-wide budget.
    ///
    /// [`PacketBudget::DEFAULT`] unless another was installed first.
    pub fn process_default() -> &'static PacketBudget {
        PROCESS_DEFAULT.get_or_init(|| PacketBudget::DEFAULT)
    }
}

impl Default for PacketBudget {
    fn default() -> Self {
        PacketBudget::DEFAULT
    }
}
