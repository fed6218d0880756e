//! Notification processor.
//!
//! Owns the single banner slot: debounces incoming messages, classifies
//! them, styles the banner and keeps at most one delayed speed change
//! pending. Side effects triggered by message text are handed back to the
//! caller as [`FollowUp`]s rather than invoked directly.

use haul_core::classify::ACCIDENT_BANNER;
use haul_core::{classify, triggers, NotificationType, SignalState, SimulationRules, Trigger};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const TEXT_BLACK: Rgb = Rgb(0, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerStyle {
    pub background: Rgb,
    pub text: Rgb,
}

impl BannerStyle {
    pub fn for_type(kind: NotificationType) -> Self {
        let background = match kind {
            NotificationType::Positive => Rgb(144, 238, 144),
            NotificationType::Neutral => Rgb(255, 236, 179),
            NotificationType::Negative => Rgb(255, 204, 203),
        };
        Self {
            background,
            text: TEXT_BLACK,
        }
    }
}

/// What the driver currently sees in the notification area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub text: String,
    pub kind: NotificationType,
    pub style: BannerStyle,
}

/// Side effect requested by a processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    AccidentReroute { after: Duration },
    ParkingAvailable { after: Duration },
    PullOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Processing is switched off.
    Disabled,
    /// Arrived inside the debounce window and was dropped.
    Debounced,
    Accepted {
        kind: NotificationType,
        follow_ups: Vec<FollowUp>,
    },
}

#[derive(Debug, Clone, Copy)]
struct PendingSpeedChange {
    due: Instant,
    kind: NotificationType,
}

pub struct NotificationProcessor {
    enabled: bool,
    debounce: Duration,
    speed_change_delay: Duration,
    direct_speed_change_delay: Duration,
    accident_delay: Duration,
    parking_delay: Duration,
    last_processed_at: Option<Instant>,
    last_type: Option<NotificationType>,
    banner: Option<Banner>,
    pending: Option<PendingSpeedChange>,
}

impl NotificationProcessor {
    pub fn new(rules: &SimulationRules) -> Self {
        Self {
            enabled: true,
            debounce: rules.debounce(),
            speed_change_delay: rules.speed_change_delay(),
            direct_speed_change_delay: rules.direct_speed_change_delay(),
            accident_delay: rules.accident_reroute_delay(),
            parking_delay: rules.parking_reroute_delay(),
            last_processed_at: None,
            last_type: None,
            banner: None,
            pending: None,
        }
    }

    /// Process a telemetry or alert message.
    ///
    /// An explicit signal state decides the type; otherwise the text is
    /// classified by keyword.
    pub fn process(
        &mut self,
        now: Instant,
        message: &str,
        state: Option<SignalState>,
    ) -> ProcessOutcome {
        if !self.enabled {
            return ProcessOutcome::Disabled;
        }

        if let Some(last) = self.last_processed_at {
            if now.saturating_duration_since(last) < self.debounce {
                tracing::debug!("Notification debounced: {}", message);
                return ProcessOutcome::Debounced;
            }
        }
        self.last_processed_at = Some(now);

        let kind = classify(message, state);
        tracing::debug!(
            "Processing notification: {} with state: {:?} -> {:?}",
            message,
            state.map(|s| s.code()),
            kind
        );

        let mut text = message.to_string();
        let follow_ups: Vec<FollowUp> = triggers(message)
            .into_iter()
            .map(|trigger| match trigger {
                Trigger::AccidentReroute => {
                    text = ACCIDENT_BANNER.to_string();
                    FollowUp::AccidentReroute {
                        after: self.accident_delay,
                    }
                }
                Trigger::ParkingAvailable => FollowUp::ParkingAvailable {
                    after: self.parking_delay,
                },
                Trigger::PullOver => FollowUp::PullOver,
            })
            .collect();

        self.show(text, kind);
        self.schedule_speed_change(now + self.speed_change_delay, kind);
        self.last_type = Some(kind);

        ProcessOutcome::Accepted { kind, follow_ups }
    }

    /// Show a system message with an explicit type.
    ///
    /// Skips classification and the debounce; the speed change is only
    /// scheduled while the vehicle is moving. Returns false when disabled.
    pub fn display(
        &mut self,
        now: Instant,
        message: &str,
        kind: NotificationType,
        vehicle_paused: bool,
    ) -> bool {
        if !self.enabled {
            return false;
        }

        tracing::debug!(
            "Displaying notification: {} (type: {:?}, paused: {})",
            message,
            kind,
            vehicle_paused
        );
        self.show(message.to_string(), kind);
        if !vehicle_paused {
            self.schedule_speed_change(now + self.direct_speed_change_delay, kind);
        }
        self.last_type = Some(kind);
        true
    }

    /// Take the pending speed change if it is due.
    pub fn poll_speed_change(&mut self, now: Instant) -> Option<NotificationType> {
        match self.pending {
            Some(pending) if pending.due <= now => {
                self.pending = None;
                Some(pending.kind)
            }
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.pending = None;
        }
        tracing::debug!(
            "Traffic notifications {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_notification_type(&self) -> Option<NotificationType> {
        self.last_type
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    fn show(&mut self, text: String, kind: NotificationType) {
        self.banner = Some(Banner {
            text,
            kind,
            style: BannerStyle::for_type(kind),
        });
    }

    fn schedule_speed_change(&mut self, due: Instant, kind: NotificationType) {
        // replaces any change still waiting
        self.pending = Some(PendingSpeedChange { due, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> NotificationProcessor {
        NotificationProcessor::new(&SimulationRules::default())
    }

    #[test]
    fn test_debounce_window() {
        let mut p = processor();
        let t0 = Instant::now();

        assert!(matches!(
            p.process(t0, "Caution ahead", None),
            ProcessOutcome::Accepted { .. }
        ));
        assert_eq!(
            p.process(t0 + Duration::from_millis(500), "Heavy traffic ahead", None),
            ProcessOutcome::Debounced
        );
        assert_eq!(p.banner().unwrap().text, "Caution ahead");

        assert!(matches!(
            p.process(t0 + Duration::from_millis(1000), "Clear road ahead", None),
            ProcessOutcome::Accepted { .. }
        ));
        assert_eq!(p.banner().unwrap().text, "Clear road ahead");
    }

    #[test]
    fn test_state_code_wins_over_keywords() {
        let mut p = processor();
        let outcome = p.process(Instant::now(), "Clear road ahead", Some(SignalState::Red));
        match outcome {
            ProcessOutcome::Accepted { kind, .. } => assert_eq!(kind, NotificationType::Negative),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            p.banner().unwrap().style.background,
            Rgb(255, 204, 203)
        );
    }

    #[test]
    fn test_accident_rewrites_banner_and_requests_reroute() {
        let mut p = processor();
        let outcome = p.process(Instant::now(), "Accident Ahead", Some(SignalState::Red));
        assert_eq!(
            outcome,
            ProcessOutcome::Accepted {
                kind: NotificationType::Negative,
                follow_ups: vec![FollowUp::AccidentReroute {
                    after: Duration::from_millis(1500)
                }],
            }
        );
        assert_eq!(p.banner().unwrap().text, ACCIDENT_BANNER);
    }

    #[test]
    fn test_parking_and_pull_over_follow_ups() {
        let mut p = processor();
        let t0 = Instant::now();
        match p.process(t0, "Aircraft delayed. Parking available at Terminal C.", None) {
            ProcessOutcome::Accepted { follow_ups, .. } => assert_eq!(
                follow_ups,
                vec![FollowUp::ParkingAvailable {
                    after: Duration::from_millis(800)
                }]
            ),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let later = t0 + Duration::from_secs(2);
        match p.process(
            later,
            "Aircraft delayed & no parking available. Pull over near rest area!",
            None,
        ) {
            ProcessOutcome::Accepted { follow_ups, .. } => {
                assert!(follow_ups.contains(&FollowUp::PullOver))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_single_pending_speed_change() {
        let mut p = processor();
        let t0 = Instant::now();
        p.process(t0, "Speed up! Green signal ahead", None);
        assert_eq!(p.next_deadline(), Some(t0 + Duration::from_millis(300)));

        // direct display replaces the telemetry change
        p.display(t0 + Duration::from_millis(100), "Route unavailable", NotificationType::Negative, false);
        assert_eq!(p.next_deadline(), Some(t0 + Duration::from_millis(300)));
        assert_eq!(p.poll_speed_change(t0 + Duration::from_millis(250)), None);
        assert_eq!(
            p.poll_speed_change(t0 + Duration::from_millis(300)),
            Some(NotificationType::Negative)
        );
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn test_display_while_paused_skips_speed_change() {
        let mut p = processor();
        assert!(p.display(Instant::now(), "Vehicle stopped", NotificationType::Neutral, true));
        assert_eq!(p.next_deadline(), None);
        assert_eq!(p.last_notification_type(), Some(NotificationType::Neutral));
    }

    #[test]
    fn test_disabled_processor_is_inert() {
        let mut p = processor();
        p.set_enabled(false);
        assert_eq!(p.process(Instant::now(), "Caution ahead", None), ProcessOutcome::Disabled);
        assert!(!p.display(Instant::now(), "Hello", NotificationType::Positive, false));
        assert!(p.banner().is_none());
    }
}
