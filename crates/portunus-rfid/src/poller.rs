//! Card polling with presence debouncing.
//!
//! A card resting on the reader is read on every poll. The [`Debouncer`]
//! turns that stream of reads into one scan per presentation: a read of the
//! same UID within the dedupe window is suppressed, while a different UID or
//! a read after the window is reported.
//!
//! [`CardPoller`] combines the driver and the debouncer into one
//! synchronous poll step. The task that owns it decides how long to sleep
//! between steps using [`PollOutcome::pause`].

use crate::driver::Mfrc522;
use portunus_core::{Error, Uid, config::ReaderConfig};
use portunus_hardware::{Delay, RegisterBus};
use std::time::Duration;
use tokio::time::Instant;

/// Suppresses repeated reads of the same card.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<(Uid, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether a read of `uid` at `now` should be reported.
    ///
    /// Reported reads restart the window; suppressed reads do not.
    pub fn accept(&mut self, uid: Uid, now: Instant) -> bool {
        if let Some((last_uid, at)) = self.last
            && last_uid == uid
            && now.saturating_duration_since(at) < self.window
        {
            return false;
        }
        self.last = Some((uid, now));
        true
    }

    /// Last reported card, if any.
    pub fn last_uid(&self) -> Option<Uid> {
        self.last.map(|(uid, _)| uid)
    }
}

/// Result of one poll step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new presentation to report.
    Scanned(Uid),
    /// A read inside the dedupe window.
    Suppressed(Uid),
    /// Empty field.
    Idle,
    /// Any driver failure other than an empty field.
    Failed(Error),
}

impl PollOutcome {
    /// Whether the driver returned a UID.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Scanned(_) | Self::Suppressed(_))
    }

    /// Sleep before the next step: the poll interval, plus the re-read delay
    /// after a successful read.
    pub fn pause(&self, config: &ReaderConfig) -> Duration {
        if self.is_read() {
            config.poll_interval() + config.reread_delay()
        } else {
            config.poll_interval()
        }
    }
}

/// Driver plus debouncer.
#[derive(Debug)]
pub struct CardPoller<B, D> {
    reader: Mfrc522<B, D>,
    debouncer: Debouncer,
}

impl<B: RegisterBus, D: Delay> CardPoller<B, D> {
    pub fn new(reader: Mfrc522<B, D>, dedupe_window: Duration) -> Self {
        Self {
            reader,
            debouncer: Debouncer::new(dedupe_window),
        }
    }

    /// Read once. Every successful read halts the card.
    pub fn poll_once(&mut self, now: Instant) -> PollOutcome {
        match self.reader.read_card() {
            Ok(uid) => {
                self.reader.halt_card();
                if self.debouncer.accept(uid, now) {
                    PollOutcome::Scanned(uid)
                } else {
                    PollOutcome::Suppressed(uid)
                }
            }
            Err(Error::NoCard) => PollOutcome::Idle,
            Err(e) => PollOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn uid(last: u8) -> Uid {
        Uid::new(&[0x04, 0xA3, 0x2B, last]).unwrap()
    }

    #[rstest]
    #[case(0, false)]
    #[case(1_999, false)]
    #[case(2_000, true)]
    #[case(5_000, true)]
    fn test_same_card_window(#[case] after_ms: u64, #[case] reported: bool) {
        let mut debouncer = Debouncer::new(Duration::from_millis(2_000));
        let t0 = Instant::now();

        assert!(debouncer.accept(uid(1), t0));
        assert_eq!(
            debouncer.accept(uid(1), t0 + Duration::from_millis(after_ms)),
            reported
        );
    }

    #[test]
    fn test_different_card_is_reported_immediately() {
        let mut debouncer = Debouncer::new(Duration::from_millis(2_000));
        let t0 = Instant::now();

        assert!(debouncer.accept(uid(1), t0));
        assert!(debouncer.accept(uid(2), t0 + Duration::from_millis(10)));
        assert!(debouncer.accept(uid(1), t0 + Duration::from_millis(20)));
        assert_eq!(debouncer.last_uid(), Some(uid(1)));
    }

    #[test]
    fn test_suppressed_read_does_not_extend_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(2_000));
        let t0 = Instant::now();

        assert!(debouncer.accept(uid(1), t0));
        assert!(!debouncer.accept(uid(1), t0 + Duration::from_millis(1_500)));
        assert!(debouncer.accept(uid(1), t0 + Duration::from_millis(2_100)));
    }

    #[test]
    fn test_pause_after_read() {
        let config = ReaderConfig::default();
        assert_eq!(PollOutcome::Idle.pause(&config), Duration::from_millis(50));
        assert_eq!(
            PollOutcome::Suppressed(uid(1)).pause(&config),
            Duration::from_millis(550)
        );
        assert_eq!(
            PollOutcome::Failed(Error::Collision).pause(&config),
            Duration::from_millis(50)
        );
    }
}
