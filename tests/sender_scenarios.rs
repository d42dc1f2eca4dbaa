//! Scenario tests for the sender engine.
//!
//! Each test drives a [`SenderEngine`] over a scripted in-memory channel
//! that answers every transmission with a chosen kind of reply, then checks
//! exactly what went out on the wire and how long the engine waited.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use udp_arq::packet::{build_frame, Frame};
use udp_arq::{
    AdaptiveTimer, Channel, FixedTimeout, SendError, SenderConfig, SenderEngine,
};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

/// How the scripted peer answers the most recent transmission.
#[derive(Debug, Clone, Copy)]
enum Reply {
    /// The correct, in-order acknowledgment.
    Ack,
    /// The correct acknowledgment with one bit flipped.
    Corrupt,
    /// An acknowledgment carrying the in-flight sequence number.
    Stale,
    /// An acknowledgment number that matches nothing.
    OutOfOrder,
    /// The transmitted frame reflected back verbatim.
    Echo,
    /// The correct acknowledgment number on a frame with a three-byte
    /// payload.
    ThreeByteEcho,
    /// Nothing; the receive times out.
    Silence,
}

#[derive(Default)]
struct Scripted {
    script: VecDeque<Reply>,
    /// Used once the script runs out.
    fallback: Option<Reply>,
    sent: Vec<Vec<u8>>,
    waits: Vec<Duration>,
}

impl Scripted {
    fn new(script: &[Reply]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn forever(reply: Reply) -> Self {
        Self {
            fallback: Some(reply),
            ..Default::default()
        }
    }

    fn sent_frames(&self) -> Vec<Frame> {
        self.sent
            .iter()
            .map(|bytes| Frame::decode(bytes).expect("engine sent a bad frame"))
            .collect()
    }
}

impl Channel for Scripted {
    fn transmit(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.sent.push(datagram.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        let last = self.sent.last().expect("receive before transmit").clone();
        let frame = Frame::decode(&last).unwrap();
        let ack = Frame::ack(frame.seqnum, frame.payload.len());
        let reply = self
            .script
            .pop_front()
            .or(self.fallback)
            .unwrap_or(Reply::Ack);
        Ok(match reply {
            Reply::Ack => Some(ack.encode()),
            Reply::Corrupt => {
                let mut bytes = ack.encode();
                bytes[1] ^= 0x08;
                Some(bytes)
            }
            Reply::Stale => Some(build_frame(frame.seqnum, frame.seqnum, &[]).encode()),
            Reply::OutOfOrder => {
                Some(build_frame(frame.seqnum, ack.acknum.wrapping_add(1), &[]).encode())
            }
            Reply::Echo => Some(last),
            Reply::ThreeByteEcho => {
                Some(build_frame(frame.seqnum, ack.acknum, b"ack").encode())
            }
            Reply::Silence => None,
        })
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.waits.push(timeout);
        Ok(())
    }
}

fn engine(channel: Scripted) -> SenderEngine<Scripted, AdaptiveTimer> {
    let config = SenderConfig {
        initial_seqnum: Some(200),
        ..SenderConfig::default()
    };
    SenderEngine::new(channel, AdaptiveTimer::default(), config).expect("valid config")
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn empty_payload_completes_with_zero_transmissions() {
    let mut e = engine(Scripted::default());
    let stats = e.send(&[]).expect("send");
    assert_eq!(stats.transmissions, 0);
    assert!(e.channel().sent.is_empty());
}

#[test]
fn small_payload_over_clean_channel_is_one_segment() {
    let mut e = engine(Scripted::default());
    let payload = b"ten bytes!";
    let stats = e.send(payload).expect("send");

    assert_eq!(stats.segments, 1);
    assert_eq!(stats.transmissions, 1);
    assert_eq!(stats.retransmissions, 0);
    let frames = e.channel().sent_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].seqnum, 200);
    assert_eq!(frames[0].acknum, 0);
    assert_eq!(frames[0].payload, payload);
}

#[test]
fn one_corrupted_ack_costs_exactly_one_retransmission() {
    let payload: Vec<u8> = (0..300u16).map(|i| i as u8).collect();
    let mut e = engine(Scripted::new(&[Reply::Corrupt]));
    let stats = e.send(&payload).expect("send");

    assert_eq!(stats.segments, 2);
    assert_eq!(stats.retransmissions, 1);
    let sent = &e.channel().sent;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], sent[1], "retransmission must be verbatim");

    let frames = e.channel().sent_frames();
    assert_eq!(frames[2].seqnum, 194); // (200 + 250) mod 256
    assert_eq!(frames[2].payload, &payload[250..]);

    // One failure does not back off; the clean delivery shaves one step.
    assert_eq!(e.channel().waits, vec![ms(2_000), ms(2_000), ms(1_900)]);
    assert_eq!(stats.final_timeout, ms(1_800));
}

#[test]
fn endlessly_corrupted_acks_abort_after_three_backoffs() {
    let mut e = engine(Scripted::forever(Reply::Corrupt));
    let err = e.send(b"never acknowledged").unwrap_err();

    match err {
        SendError::TimeoutCeilingExceeded { timeout } => assert_eq!(timeout, ms(16_000)),
        other => panic!("unexpected error: {other}"),
    }
    let waits = &e.channel().waits;
    assert_eq!(waits.len(), 9);
    // Every failure is answered with a resend, the last one included.
    assert_eq!(e.channel().sent.len(), 10);
    assert!(waits[..3].iter().all(|w| *w == ms(2_000)));
    assert!(waits[3..6].iter().all(|w| *w == ms(4_000)));
    assert!(waits[6..].iter().all(|w| *w == ms(8_000)));
}

#[test]
fn out_of_order_acks_retransmit_without_touching_the_timer() {
    let script = [Reply::OutOfOrder; 5];
    let mut e = engine(Scripted::new(&script));
    let stats = e.send(b"x").expect("send");

    assert_eq!(stats.retransmissions, 5);
    // Five failures would have backed off once; out-of-order replies are
    // not failures.
    assert!(e.channel().waits.iter().all(|w| *w == ms(2_000)));
    assert_eq!(stats.final_timeout, ms(1_900));
}

#[test]
fn corrupted_acks_do_touch_the_timer() {
    let script = [Reply::Corrupt; 3];
    let mut e = engine(Scripted::new(&script));
    e.send(b"x").expect("send");
    assert_eq!(
        e.channel().waits,
        vec![ms(2_000), ms(2_000), ms(2_000), ms(4_000)]
    );
}

#[test]
fn stale_and_echoed_frames_trigger_verbatim_retransmission() {
    let mut e = engine(Scripted::new(&[Reply::Stale, Reply::Echo]));
    let stats = e.send(b"abc").expect("send");

    assert_eq!(stats.retransmissions, 2);
    let sent = &e.channel().sent;
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|s| s == &sent[0]));
    assert!(e.channel().waits.iter().all(|w| *w == ms(2_000)));
}

#[test]
fn three_byte_payload_with_expected_ack_is_not_an_acknowledgment() {
    let mut e = engine(Scripted::new(&[Reply::ThreeByteEcho, Reply::ThreeByteEcho]));
    let payload = vec![5u8; 260];
    let stats = e.send(&payload).expect("send");

    assert_eq!(stats.segments, 2);
    assert_eq!(stats.retransmissions, 2);
    let seqs: Vec<u8> = e.channel().sent_frames().iter().map(|f| f.seqnum).collect();
    assert_eq!(seqs, vec![200, 200, 200, 194]);
    // Echoes leave the timer alone; only the real ACK shaves a step.
    assert_eq!(
        e.channel().waits,
        vec![ms(2_000), ms(2_000), ms(2_000), ms(1_900)]
    );
}

#[test]
fn silence_is_a_failure_like_corruption() {
    let script = [Reply::Silence, Reply::Silence, Reply::Silence];
    let mut e = engine(Scripted::new(&script));
    e.send(b"quiet").expect("send");
    assert_eq!(e.channel().waits.last(), Some(&ms(4_000)));
}

#[test]
fn sequence_numbers_advance_by_mss_and_wrap() {
    let payload = vec![0xabu8; 1_000];
    let mut e = engine(Scripted::default());
    let stats = e.send(&payload).expect("send");

    assert_eq!(stats.segments, 4);
    let seqs: Vec<u8> = e.channel().sent_frames().iter().map(|f| f.seqnum).collect();
    assert_eq!(seqs, vec![200, 194, 188, 182]);
}

#[test]
fn adaptation_does_not_leak_between_sends() {
    let script = [Reply::Corrupt; 6];
    let mut e = engine(Scripted::new(&script));
    e.send(b"first").expect("first send");
    assert_eq!(e.channel().waits.last(), Some(&ms(8_000)));

    e.channel_mut().waits.clear();
    e.send(b"second").expect("second send");
    assert_eq!(e.channel().waits, vec![ms(2_000)]);
}

#[test]
fn fixed_policy_keeps_retrying() {
    let mut script = vec![Reply::Silence; 50];
    script.push(Reply::Ack);
    let config = SenderConfig {
        initial_seqnum: Some(0),
        ..SenderConfig::default()
    };
    let mut e = SenderEngine::new(
        Scripted::new(&script),
        FixedTimeout(Duration::from_millis(250)),
        config,
    )
    .unwrap();
    let stats = e.send(b"hope").expect("send");
    assert_eq!(stats.retransmissions, 50);
    assert!(e
        .channel()
        .waits
        .iter()
        .all(|w| *w == Duration::from_millis(250)));
}
