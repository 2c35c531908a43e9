//! Tests for splitting RTCP into compounds within budget.

use std::collections::VecDeque;

use relay_budget::rtcp::{write_compounds, CompoundPacket, RawRtcp, RtcpHeader, RtcpPacket};
use relay_budget::{BudgetConfig, PacketBudget, RtcpError};

mod common;
use common::{init_log, receiver_report};

#[test]
fn full_budget_accepted_one_more_refused() {
    init_log();

    let mut compound = CompoundPacket::new(&PacketBudget::DEFAULT);

    // 1292 / 4 = 323 words
    compound.try_append(&receiver_report(200)).unwrap();
    compound.try_append(&receiver_report(123)).unwrap();
    assert_eq!(compound.len(), 1292);

    let err = compound.try_append(&receiver_report(2)).unwrap_err();
    assert_eq!(
        err,
        RtcpError::PacketFull {
            needed: 8,
            remaining: 0
        }
    );

    // Refused packet left no trace.
    assert_eq!(compound.as_bytes().len(), 1292);
    assert_eq!(compound.count(), 2);
}

#[test]
fn queue_split_into_compounds() {
    init_log();

    let budget = PacketBudget::DEFAULT;
    let mut queue: VecDeque<RawRtcp> = (0..10).map(|_| receiver_report(100)).collect();

    let compounds = write_compounds(&mut queue, &budget).unwrap();

    assert!(queue.is_empty());
    // 3 x 400 bytes per compound.
    assert_eq!(compounds.len(), 4);
    assert_eq!(compounds[0].len(), 1200);
    assert_eq!(compounds[3].len(), 400);

    for c in &compounds {
        assert!(c.len() <= budget.rtcp_compound_budget());

        // Every compound is a sequence of well formed RTCP packets.
        let mut buf = &c[..];
        while !buf.is_empty() {
            let h = RtcpHeader::try_from(buf).unwrap();
            buf = &buf[h.length_bytes()..];
        }
    }
}

#[test]
fn queue_order_kept() {
    init_log();

    let mut queue: VecDeque<RawRtcp> = [100, 200, 20, 3].into_iter().map(receiver_report).collect();
    let expected: Vec<u8> = queue.iter().flat_map(|p| p.as_bytes().to_vec()).collect();

    let compounds = write_compounds(&mut queue, &PacketBudget::DEFAULT).unwrap();

    assert_eq!(compounds.len(), 1);
    assert_eq!(compounds[0], expected);
}

#[test]
fn oversized_left_in_queue() {
    init_log();

    let budget = BudgetConfig::new().set_mtu(600).build().unwrap();
    let mut queue: VecDeque<RawRtcp> = VecDeque::new();
    queue.push_back(receiver_report(10));
    queue.push_back(receiver_report(200));

    let err = write_compounds(&mut queue, &budget).unwrap_err();
    assert_eq!(
        err,
        RtcpError::Oversized {
            len: 800,
            capacity: 392
        }
    );
    assert_eq!(queue.len(), 2);
}

#[test]
fn empty_queue() {
    init_log();

    let mut queue: VecDeque<RawRtcp> = VecDeque::new();
    let compounds = write_compounds(&mut queue, &PacketBudget::DEFAULT).unwrap();
    assert!(compounds.is_empty());
}

struct AppPacket(usize);

impl RtcpPacket for AppPacket {
    fn length_words(&self) -> usize {
        self.0
    }

    fn write_to(&self, buf: &mut [u8]) -> usize {
        let len = self.0 * 4;
        buf[0] = 0x80;
        buf[1] = 204;
        buf[2..4].copy_from_slice(&((self.0 - 1) as u16).to_be_bytes());
        buf[4..len].fill(0);
        len
    }
}

#[test]
fn custom_packet_type() {
    init_log();

    let mut queue: VecDeque<AppPacket> = [323, 1, 1].into_iter().map(AppPacket).collect();
    let compounds = write_compounds(&mut queue, &PacketBudget::DEFAULT).unwrap();

    assert_eq!(compounds.len(), 2);
    assert_eq!(compounds[0].len(), 1292);
    assert_eq!(compounds[1].len(), 8);
}

enum Queued {
    Report(RawRtcp),
    // Declares the given words but only writes a header.
    ShortWrite(usize),
}

impl RtcpPacket for Queued {
    fn length_words(&self) -> usize {
        match self {
            Queued::Report(p) => p.length_words(),
            Queued::ShortWrite(words) => *words,
        }
    }

    fn write_to(&self, buf: &mut [u8]) -> usize {
        match self {
            Queued::Report(p) => p.write_to(buf),
            Queued::ShortWrite(_) => {
                buf[..4].copy_from_slice(&[0x80, 203, 0, 0]);
                4
            }
        }
    }
}

#[test]
fn bad_length_keeps_queue() {
    init_log();

    let mut queue: VecDeque<Queued> = VecDeque::new();
    queue.push_back(Queued::Report(receiver_report(300)));
    queue.push_back(Queued::Report(receiver_report(100)));
    queue.push_back(Queued::ShortWrite(2));

    let err = write_compounds(&mut queue, &PacketBudget::DEFAULT).unwrap_err();
    assert_eq!(
        err,
        RtcpError::LengthMismatch {
            declared: 8,
            written: 4
        }
    );

    // Packets already packed before the failure are still queued.
    assert_eq!(queue.len(), 3);
    assert!(matches!(queue[0], Queued::Report(_)));
    assert!(matches!(queue[1], Queued::Report(_)));

    // Once the bad packet is dropped the rest goes out.
    queue.pop_back();
    let compounds = write_compounds(&mut queue, &PacketBudget::DEFAULT).unwrap();
    assert!(queue.is_empty());
    assert_eq!(compounds.len(), 2);
    assert_eq!(compounds[0].len(), 1200);
    assert_eq!(compounds[1].len(), 400);
}
