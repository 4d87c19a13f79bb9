//! Sources of status observations
//!
//! The main loop polls every [`EventSource`] once per tick in a fixed order:
//! wake, periodic poll, MQTT trigger, buttons. A source either stays quiet or
//! returns an [`Observation`] for the reconciler.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDateTime;
use log::{info, warn};

use crate::config::MqttSettings;
use crate::display::Feedback;
use crate::input::{Button, ButtonInput, FeedAction};
use crate::status::{FeedTime, Slot, StatusSnapshot};

/// A fetched snapshot and whether it must be drawn even if unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub snapshot: StatusSnapshot,
    pub force: bool,
}

impl Observation {
    pub fn routine(snapshot: StatusSnapshot) -> Self {
        Self {
            snapshot,
            force: false,
        }
    }

    pub fn forced(snapshot: StatusSnapshot) -> Self {
        Self {
            snapshot,
            force: true,
        }
    }
}

/// What a source may use while it is polled
pub trait EventContext {
    /// Monotonic time of the current tick
    fn now(&self) -> Duration;
    fn local_now(&self) -> NaiveDateTime;
    /// Fetch with retries, `None` when the API could not be reached
    fn fetch_status(&mut self) -> Result<Option<StatusSnapshot>>;
    fn feedback(&mut self) -> &mut dyn Feedback;
    fn pause(&mut self, duration: Duration);
    /// Ask for an unconditional panel refresh at monotonic time `at`
    fn schedule_refresh(&mut self, at: Duration);
}

pub trait EventSource {
    fn name(&self) -> &'static str;

    fn poll(&mut self, ctx: &mut dyn EventContext) -> Result<Option<Observation>>;

    /// Release network clients before deep sleep
    fn shutdown(&mut self) {}
}

/// Startup fetch, forced. After a deep sleep wake it also schedules a second
/// refresh to clear ghosting built up while the panel sat unpowered.
pub struct WakeFromSleep {
    resumed: bool,
    fired: bool,
    second_refresh_after: Duration,
}

impl WakeFromSleep {
    pub fn new(resumed: bool, second_refresh_after: Duration) -> Self {
        Self {
            resumed,
            fired: false,
            second_refresh_after,
        }
    }
}

impl EventSource for WakeFromSleep {
    fn name(&self) -> &'static str {
        "wake"
    }

    fn poll(&mut self, ctx: &mut dyn EventContext) -> Result<Option<Observation>> {
        if self.fired {
            return Ok(None);
        }
        self.fired = true;

        if self.resumed {
            info!("Woke from deep sleep, fetching initial feeding status");
            let at = ctx.now() + self.second_refresh_after;
            ctx.schedule_refresh(at);
        } else {
            info!("Fresh start, fetching initial feeding status");
        }

        Ok(ctx.fetch_status()?.map(Observation::forced))
    }
}

/// Fallback poll of the API every `interval`
pub struct PeriodicPoll {
    interval: Duration,
    last_fetch: Duration,
}

impl PeriodicPoll {
    /// The first poll runs `interval` after `started`
    pub fn new(interval: Duration, started: Duration) -> Self {
        Self {
            interval,
            last_fetch: started,
        }
    }
}

impl EventSource for PeriodicPoll {
    fn name(&self) -> &'static str {
        "periodic"
    }

    fn poll(&mut self, ctx: &mut dyn EventContext) -> Result<Option<Observation>> {
        let now = ctx.now();
        if now.saturating_sub(self.last_fetch) < self.interval {
            return Ok(None);
        }
        info!("Periodic status check");
        self.last_fetch = now;
        Ok(ctx.fetch_status()?.map(Observation::routine))
    }
}

/// Message received on one of the feeding topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedingTrigger {
    pub topic: String,
    pub payload: String,
}

/// Queue of triggers filled by the MQTT client
pub trait TriggerSource {
    fn drain(&mut self) -> Vec<FeedingTrigger>;
}

impl TriggerSource for Receiver<FeedingTrigger> {
    fn drain(&mut self) -> Vec<FeedingTrigger> {
        self.try_iter().collect()
    }
}

/// Re-fetches the API whenever a feeding topic sees a message. The payload
/// is only logged, the API stays the source of truth.
pub struct MqttTrigger<T> {
    triggers: T,
}

impl<T: TriggerSource> MqttTrigger<T> {
    pub fn new(triggers: T) -> Self {
        Self { triggers }
    }
}

impl<T: TriggerSource> EventSource for MqttTrigger<T> {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn poll(&mut self, ctx: &mut dyn EventContext) -> Result<Option<Observation>> {
        let triggers = self.triggers.drain();
        if triggers.is_empty() {
            return Ok(None);
        }
        for trigger in &triggers {
            info!("Feeding trigger on {}: '{}'", trigger.topic, trigger.payload);
        }

        let observation = ctx.fetch_status()?.map(Observation::forced);
        if observation.is_none() {
            warn!("Failed to fetch status after MQTT trigger");
        }
        Ok(observation)
    }
}

/// Fire and forget publish of feeding changes
pub trait FeedPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;

    fn disconnect(&mut self) {}
}

/// Publishes the change a button asks for, then re-reads the API so the panel
/// shows what the remote side recorded
pub struct ButtonAction<B, F> {
    input: B,
    publisher: F,
    morning_topic: String,
    evening_topic: String,
    settle: Duration,
}

impl<B: ButtonInput, F: FeedPublisher> ButtonAction<B, F> {
    pub fn new(input: B, publisher: F, mqtt: &MqttSettings, settle: Duration) -> Self {
        Self {
            input,
            publisher,
            morning_topic: mqtt.morning_topic.clone(),
            evening_topic: mqtt.evening_topic.clone(),
            settle,
        }
    }

    fn topic(&self, slot: Slot) -> &str {
        match slot {
            Slot::Morning => &self.morning_topic,
            Slot::Evening => &self.evening_topic,
        }
    }

    fn handle(&mut self, button: Button, ctx: &mut dyn EventContext) {
        let slot = button.slot();
        if let Err(err) = ctx.feedback().flash_slot(slot) {
            warn!("Button flash failed: {:#}", err);
        }

        let payload = match button.action() {
            FeedAction::Fed => FeedTime::new(ctx.local_now().time()).payload(),
            FeedAction::Clear => String::new(),
        };
        let topic = self.topic(slot).to_owned();

        match self.publisher.publish(&topic, &payload) {
            Ok(()) => info!("Published {} to {}: '{}'", button, topic, payload),
            Err(err) => {
                warn!("Failed to publish {}: {:#}", button, err);
                if let Err(err) = ctx.feedback().flash_error() {
                    warn!("Error flash failed: {:#}", err);
                }
            }
        }
    }

    pub fn publisher(&self) -> &F {
        &self.publisher
    }
}

impl<B: ButtonInput, F: FeedPublisher> EventSource for ButtonAction<B, F> {
    fn name(&self) -> &'static str {
        "buttons"
    }

    fn poll(&mut self, ctx: &mut dyn EventContext) -> Result<Option<Observation>> {
        let now = ctx.now();
        let mut pressed = false;

        while let Some(button) = self.input.poll(now)? {
            pressed = true;
            self.handle(button, ctx);
            self.input.wait_release(button)?;
        }
        if !pressed {
            return Ok(None);
        }

        ctx.pause(self.settle);
        Ok(ctx.fetch_status()?.map(Observation::forced))
    }

    fn shutdown(&mut self) {
        self.publisher.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::mpsc;

    use chrono::NaiveDate;

    use crate::status::FeedingSlot;

    #[derive(Default)]
    struct Ctx {
        now: Duration,
        answers: VecDeque<Option<StatusSnapshot>>,
        fetches: u32,
        paused: Duration,
        scheduled: Option<Duration>,
        flashes: Vec<&'static str>,
    }

    impl Feedback for Ctx {
        fn flash_slot(&mut self, slot: Slot) -> Result<()> {
            self.flashes.push(slot.name());
            Ok(())
        }

        fn flash_error(&mut self) -> Result<()> {
            self.flashes.push("error");
            Ok(())
        }
    }

    impl EventContext for Ctx {
        fn now(&self) -> Duration {
            self.now
        }

        fn local_now(&self) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 8, 23)
                .unwrap()
                .and_hms_opt(7, 42, 9)
                .unwrap()
        }

        fn fetch_status(&mut self) -> Result<Option<StatusSnapshot>> {
            self.fetches += 1;
            Ok(self.answers.pop_front().unwrap_or(Some(StatusSnapshot::default())))
        }

        fn feedback(&mut self) -> &mut dyn Feedback {
            self
        }

        fn pause(&mut self, duration: Duration) {
            self.paused += duration;
        }

        fn schedule_refresh(&mut self, at: Duration) {
            self.scheduled = Some(at);
        }
    }

    struct Presses(VecDeque<Button>);

    impl ButtonInput for Presses {
        fn poll(&mut self, _now: Duration) -> Result<Option<Button>> {
            Ok(self.0.pop_front())
        }

        fn wait_release(&mut self, _button: Button) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Published {
        messages: Vec<(String, String)>,
        fail: bool,
        disconnected: bool,
    }

    impl FeedPublisher for Published {
        fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("not connected");
            }
            self.messages.push((topic.into(), payload.into()));
            Ok(())
        }

        fn disconnect(&mut self) {
            self.disconnected = true;
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn wake_fires_once_and_schedules_second_refresh() {
        let mut ctx = Ctx {
            now: secs(2),
            ..Ctx::default()
        };
        let mut wake = WakeFromSleep::new(true, secs(15));

        let first = wake.poll(&mut ctx).unwrap().unwrap();
        assert!(first.force);
        assert_eq!(ctx.scheduled, Some(secs(17)));
        assert_eq!(wake.poll(&mut ctx).unwrap(), None);
        assert_eq!(ctx.fetches, 1);
    }

    #[test]
    fn fresh_start_fetches_without_second_refresh() {
        let mut ctx = Ctx::default();
        let mut wake = WakeFromSleep::new(false, secs(15));
        assert!(wake.poll(&mut ctx).unwrap().unwrap().force);
        assert_eq!(ctx.scheduled, None);
    }

    #[test]
    fn periodic_poll_waits_for_interval() {
        let mut ctx = Ctx::default();
        let mut poll = PeriodicPoll::new(secs(300), secs(0));

        ctx.now = secs(299);
        assert_eq!(poll.poll(&mut ctx).unwrap(), None);
        ctx.now = secs(300);
        let observed = poll.poll(&mut ctx).unwrap().unwrap();
        assert!(!observed.force);
        ctx.now = secs(301);
        assert_eq!(poll.poll(&mut ctx).unwrap(), None);
        assert_eq!(ctx.fetches, 1);
    }

    #[test]
    fn failed_periodic_fetch_still_waits_a_full_interval() {
        let mut ctx = Ctx {
            now: secs(300),
            answers: VecDeque::from([None]),
            ..Ctx::default()
        };
        let mut poll = PeriodicPoll::new(secs(300), secs(0));
        assert_eq!(poll.poll(&mut ctx).unwrap(), None);
        ctx.now = secs(310);
        assert_eq!(poll.poll(&mut ctx).unwrap(), None);
        assert_eq!(ctx.fetches, 1);
    }

    #[test]
    fn burst_of_triggers_fetches_once() {
        let (tx, rx) = mpsc::channel();
        for topic in ["dog/fed/morning", "dog/fed/evening", "dog/fed/morning"] {
            tx.send(FeedingTrigger {
                topic: topic.into(),
                payload: "7:42:09 am".into(),
            })
            .unwrap();
        }
        let mut ctx = Ctx::default();
        let mut mqtt = MqttTrigger::new(rx);

        assert!(mqtt.poll(&mut ctx).unwrap().unwrap().force);
        assert_eq!(ctx.fetches, 1);
        assert_eq!(mqtt.poll(&mut ctx).unwrap(), None);
        assert_eq!(ctx.fetches, 1);
    }

    #[test]
    fn buttons_publish_then_refetch() {
        let mut ctx = Ctx::default();
        let fed = StatusSnapshot::new(
            FeedingSlot::fed_at(FeedTime::from_hms(7, 42, 9).unwrap()),
            FeedingSlot::NOT_FED,
        );
        ctx.answers.push_back(Some(fed));
        let presses = Presses(VecDeque::from([Button::MorningFed, Button::EveningClear]));
        let mut action = ButtonAction::new(
            presses,
            Published::default(),
            &MqttSettings::default(),
            Duration::from_millis(500),
        );

        let observed = action.poll(&mut ctx).unwrap().unwrap();
        assert_eq!(observed, Observation::forced(fed));
        assert_eq!(
            action.publisher().messages,
            vec![
                ("dog/fed/morning".to_string(), "7:42:09 am".to_string()),
                ("dog/fed/evening".to_string(), String::new()),
            ]
        );
        assert_eq!(ctx.flashes, vec!["morning", "evening"]);
        assert_eq!(ctx.paused, Duration::from_millis(500));
        assert_eq!(ctx.fetches, 1);

        assert_eq!(action.poll(&mut ctx).unwrap(), None);
    }

    #[test]
    fn failed_publish_flashes_error() {
        let mut ctx = Ctx::default();
        let mut action = ButtonAction::new(
            Presses(VecDeque::from([Button::EveningFed])),
            Published {
                fail: true,
                ..Published::default()
            },
            &MqttSettings::default(),
            Duration::ZERO,
        );
        action.poll(&mut ctx).unwrap();
        assert_eq!(ctx.flashes, vec!["evening", "error"]);

        action.shutdown();
        assert!(action.publisher().disconnected);
    }
}
