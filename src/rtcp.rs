//! RTCP compound packets kept within the packet budget.

#![allow(clippy::unusual_byte_groupings)]

use std::collections::VecDeque;
use std::mem;

use thiserror::Error;

use crate::budget::PacketBudget;

pub(crate) const LEN_HEADER: usize = 4;

/// Errors building RTCP compound packets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RtcpError {
    /// Appending would go over the compound budget. Start a new compound.
    #[error("RTCP compound full: need {needed} bytes, {remaining} remaining")]
    PacketFull {
        /// Size of the packet that didn't fit.
        needed: usize,
        /// Space left in the compound.
        remaining: usize,
    },

    /// The packet can't fit even an empty compound.
    #[error("RTCP packet of {len} bytes exceeds compound budget of {capacity}")]
    Oversized {
        /// Size of the packet.
        len: usize,
        /// Compound capacity.
        capacity: usize,
    },

    /// A packet wrote a different amount than it declared.
    #[error("RTCP packet declared {declared} bytes but wrote {written}")]
    LengthMismatch {
        /// Declared length in bytes.
        declared: usize,
        /// Bytes written.
        written: usize,
    },

    /// Failed to read an RTCP header.
    #[error("RTCP parse failed: {0}")]
    Parse(&'static str),
}

/// Kind of RTCP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcpType {
    /// RTCP_PT_SR
    SenderReport = 200,

    /// RTCP_PT_RR
    ReceiverReport = 201,

    /// RTCP_PT_SDES
    SourceDescription = 202,

    /// RTCP_PT_BYE
    Goodbye = 203,

    /// RTCP_PT_APP
    ApplicationDefined = 204,

    /// RTCP_PT_RTPFB
    // https://tools.ietf.org/html/rfc4585
    TransportLayerFeedback = 205,

    /// RTCP_PT_PSFB
    // https://tools.ietf.org/html/rfc4585
    PayloadSpecificFeedback = 206,

    /// RTCP_PT_XR
    ExtendedReport = 207,
}

impl TryFrom<u8> for RtcpType {
    type Error = &'static str;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        use RtcpType::*;
        match v {
            200 => Ok(SenderReport),   // sr
            201 => Ok(ReceiverReport), // rr
            202 => Ok(SourceDescription),
            203 => Ok(Goodbye),
            204 => Ok(ApplicationDefined),
            205 => Ok(TransportLayerFeedback),
            206 => Ok(PayloadSpecificFeedback),
            207 => Ok(ExtendedReport),
            _ => Err("Unknown RTCP type"),
        }
    }
}

/// The fixed 4 byte header starting every RTCP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcpHeader {
    rtcp_type: RtcpType,
    count: u8,
    words_less_one: u16,
}

impl RtcpHeader {
    /// Type of RTCP packet.
    pub fn rtcp_type(&self) -> RtcpType {
        self.rtcp_type
    }

    /// The 5 bit count/format field.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Length of entire RTCP packet (including header) in words (4 bytes).
    pub fn length_words(&self) -> usize {
        self.words_less_one as usize + 1
    }

    /// Length of entire RTCP packet (including header) in bytes.
    pub fn length_bytes(&self) -> usize {
        self.length_words() * 4
    }
}

impl<'a> TryFrom<&'a [u8]> for RtcpHeader {
    type Error = &'static str;

    fn try_from(buf: &'a [u8]) -> Result<Self, Self::Error> {
        if buf.len() < LEN_HEADER {
            return Err("Less than 4 bytes for RTCP header");
        }

        let version = (buf[0] & 0b11_0_00000) >> 6;
        if version != 2 {
            return Err("RTCP header version must be 2");
        }

        let count = buf[0] & 0b00_0_11111;
        let rtcp_type = buf[1].try_into()?;
        let words_less_one = u16::from_be_bytes([buf[2], buf[3]]);

        Ok(RtcpHeader {
            rtcp_type,
            count,
            words_less_one,
        })
    }
}

/// Something that serializes to one RTCP packet.
pub trait RtcpPacket {
    /// Length of entire RTCP packet (including header) in words (4 bytes).
    fn length_words(&self) -> usize;

    /// Write this packet to the buffer.
    ///
    /// The buffer is exactly `length_words() * 4` long.
    fn write_to(&self, buf: &mut [u8]) -> usize;
}

/// An already serialized RTCP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRtcp {
    header: RtcpHeader,
    data: Vec<u8>,
}

impl RawRtcp {
    /// The parsed header.
    pub fn header(&self) -> &RtcpHeader {
        &self.header
    }

    /// The serialized packet, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<'a> TryFrom<&'a [u8]> for RawRtcp {
    type Error = RtcpError;

    fn try_from(buf: &'a [u8]) -> Result<Self, Self::Error> {
        let header: RtcpHeader = buf.try_into().map_err(RtcpError::Parse)?;

        if header.length_bytes() != buf.len() {
            return Err(RtcpError::Parse("RTCP length does not match buffer"));
        }

        Ok(RawRtcp {
            header,
            data: buf.to_vec(),
        })
    }
}

impl RtcpPacket for RawRtcp {
    fn length_words(&self) -> usize {
        self.header.length_words()
    }

    fn write_to(&self, buf: &mut [u8]) -> usize {
        let len = self.data.len();
        buf[..len].copy_from_slice(&self.data);
        len
    }
}

/// An RTCP compound packet that never grows past its capacity.
///
/// ```
/// use relay_budget::rtcp::{CompoundPacket, RawRtcp};
/// use relay_budget::PacketBudget;
///
/// // Empty receiver report.
/// let rr = RawRtcp::try_from(&[0x80, 201, 0, 1, 0, 0, 0, 1][..]).unwrap();
///
/// let mut compound = CompoundPacket::new(&PacketBudget::DEFAULT);
/// compound.try_append(&rr).unwrap();
///
/// assert_eq!(compound.len(), 8);
/// assert_eq!(compound.remaining(), 1284);
/// ```
#[derive(Debug, Clone)]
pub struct CompoundPacket {
    buf: Vec<u8>,
    capacity: usize,
    count: usize,
}

impl CompoundPacket {
    /// New empty compound sized by the RTCP budget.
    pub fn new(budget: &PacketBudget) -> Self {
        CompoundPacket::with_capacity(budget.rtcp_compound_budget())
    }

    /// New empty compound with a capacity in bytes.
    ///
    /// RTCP lengths are in words, so the capacity is rounded down to a
    /// multiple of 4.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity / 4 * 4;

        CompoundPacket {
            buf: Vec::with_capacity(capacity),
            capacity,
            count: 0,
        }
    }

    /// Max number of bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes left before the compound is full.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Tells if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of RTCP packets in the compound.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Append a packet, if it fits.
    ///
    /// Nothing is written when this fails.
    pub fn try_append<P: RtcpPacket + ?Sized>(&mut self, packet: &P) -> Result<(), RtcpError> {
        let item_len = packet.length_words() * 4;

        if item_len > self.capacity {
            return Err(RtcpError::Oversized {
                len: item_len,
                capacity: self.capacity,
            });
        }

        let remaining = self.remaining();
        if item_len > remaining {
            return Err(RtcpError::PacketFull {
                needed: item_len,
                remaining,
            });
        }

        let offset = self.buf.len();
        self.buf.resize(offset + item_len, 0);

        let written = packet.write_to(&mut self.buf[offset..]);

        if written != item_len {
            self.buf.truncate(offset);
            return Err(RtcpError::LengthMismatch {
                declared: item_len,
                written,
            });
        }

        self.count += 1;

        Ok(())
    }

    /// The compound so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the serialized compound.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Drain queued packets into as many compounds as needed.
///
/// Packets keep their queue order. The queue is only drained when every
/// packet was written. On any error the queue is left untouched.
pub fn write_compounds<P: RtcpPacket>(
    queue: &mut VecDeque<P>,
    budget: &PacketBudget,
) -> Result<Vec<Vec<u8>>, RtcpError> {
    let mut out = vec![];
    let mut current = CompoundPacket::new(budget);

    for p in queue.iter() {
        match current.try_append(p) {
            Ok(()) => {}
            Err(RtcpError::PacketFull { needed, remaining }) => {
                debug!(
                    "RTCP compound full with {} packets, {} bytes ({} needed, {} remaining)",
                    current.count(),
                    current.len(),
                    needed,
                    remaining
                );
                let full = mem::replace(&mut current, CompoundPacket::new(budget));
                out.push(full.into_bytes());

                // Not oversized, so it fits the empty compound.
                current.try_append(p)?;
            }
            Err(e) => return Err(e),
        }
    }

    if !current.is_empty() {
        out.push(current.into_bytes());
    }

    queue.clear();

    Ok(out)
}
