#![allow(unused)]
use std::sync::Once;

use relay_budget::rtcp::RawRtcp;

pub fn init_log() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    static START: Once = Once::new();

    START.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    });
}

/// A receiver report padded out to `words` 32 bit words.
pub fn receiver_report(words: u16) -> RawRtcp {
    assert!(words >= 2, "RR needs header and sender SSRC");

    let mut buf = vec![0_u8; words as usize * 4];
    buf[0] = 0x80;
    buf[1] = 201;
    buf[2..4].copy_from_slice(&(words - 1).to_be_bytes());
    buf[4..8].copy_from_slice(&0x1234_5678_u32.to_be_bytes());

    RawRtcp::try_from(&buf[..]).expect("valid RR")
}
