//! Packet size budgets for RTP/RTCP in a media relay.
//!
//! A relay builds RTCP compound packets and rewrites RTP header extensions
//! long before it knows which transport (IPv4 or IPv6, UDP or TCP) and which
//! SRTP profile the packet leaves on. If a builder fills a packet based on
//! the overhead of the *cheapest* transport, the same packet ends up above
//! the MTU on a more expensive one, and is dropped by the network or refused
//! by the SRTP layer.
//!
//! This crate holds the budgets every builder must honor, derived from the
//! worst case overhead:
//!
//! | Budget | Value |
//! |---|---|
//! | [`MTU_SIZE`] | 1500 |
//! | [`RTCP_PACKET_MAX_SIZE`] | 1500 - 40 (IPv6) - 20 (TCP) - 148 (SRTCP) = 1292 |
//! | [`MID_RTP_EXTENSION_MAX_LENGTH`] | 8 |
//!
//! The constants are checked at compile time. For a non-default MTU, build
//! a [`PacketBudget`] via [`BudgetConfig`], which refuses configurations that
//! leave no room for RTCP.
//!
//! # Enforcing the budget
//!
//! ```
//! use std::collections::VecDeque;
//!
//! use relay_budget::rtcp::{write_compounds, RawRtcp};
//! use relay_budget::ext::{write_mid, Mid};
//! use relay_budget::PacketBudget;
//!
//! let budget = PacketBudget::DEFAULT;
//!
//! // Queued RTCP gets split into compounds, each within budget.
//! let mut queue: VecDeque<RawRtcp> = VecDeque::new();
//! queue.push_back(RawRtcp::try_from(&[0x80, 201, 0, 1, 0, 0, 0, 1][..]).unwrap());
//! let compounds = write_compounds(&mut queue, &budget).unwrap();
//! assert_eq!(compounds.len(), 1);
//!
//! // MIDs over the limit are refused.
//! assert!(Mid::new("toolongmid").is_err());
//!
//! let mid = Mid::new("0").unwrap();
//! let mut buf = [0_u8; 16];
//! let n = write_mid(&mut buf, 1, &mid).unwrap();
//! assert_eq!(n, 2);
//! ```
//!
//! # Process default
//!
//! A relay that reads its MTU from a config file installs the resulting
//! budget once at startup. Everything afterwards reads the same frozen value.
//!
//! ```no_run
//! use relay_budget::{BudgetConfig, PacketBudget};
//!
//! let budget = BudgetConfig::new().set_mtu(1280).build().expect("valid MTU");
//! budget.install_process_default().expect("installed once");
//!
//! assert_eq!(PacketBudget::process_default().mtu(), 1280);
//! ```
#![forbid(unsafe_code)]
#![allow(clippy::new_without_default)]
#![allow(clippy::assertions_on_constants)]
#![allow(clippy::manual_range_contains)]
#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod budget;
pub use budget::{BudgetError, Overhead, PacketBudget};
pub use budget::{MID_RTP_EXTENSION_MAX_LENGTH, MTU_SIZE, RTCP_PACKET_MAX_SIZE};

mod config;
pub use config::BudgetConfig;

pub mod ext;
pub use ext::{ExtensionError, ExtensionKind, Mid};

pub mod net;
pub use net::{IpVersion, Protocol};

pub mod rtcp;
pub use rtcp::{CompoundPacket, RtcpError};

pub mod srtp;
pub use srtp::SrtpProfile;
