//! A morning on the device: boot, a button press, a remote change over MQTT,
//! then deep sleep once the window closes.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::delay::DelayNs;

use bowlwatch::display::{DisplayManager, Panel};
use bowlwatch::error::{FetchError, PanelError};
use bowlwatch::events::{
    ButtonAction, FeedPublisher, FeedingTrigger, MqttTrigger, PeriodicPoll, WakeFromSleep,
};
use bowlwatch::fetch::{StatusApi, StatusFetcher};
use bowlwatch::gate::RefreshGate;
use bowlwatch::health::ConnectionHealth;
use bowlwatch::indicator::{IndicatorStrip, PixelWriter, GREEN, RED};
use bowlwatch::input::{Button, ButtonInput};
use bowlwatch::render::{BowlArt, Framebuffer, StatusScreen};
use bowlwatch::status::parse_timestamp;
use bowlwatch::time::{Clock, TimeKeeper, TimeSync};
use bowlwatch::{Config, FeederApp, FeedingSlot, Reconciler, Slot, StatusSnapshot, TickOutcome};

#[derive(Clone, Copy)]
struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Clone)]
struct Clockwork {
    elapsed: Rc<Cell<Duration>>,
    wall: Rc<Cell<NaiveDateTime>>,
}

impl Clockwork {
    fn starting_at(h: u32, m: u32) -> Self {
        let wall = NaiveDate::from_ymd_opt(2025, 8, 23)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        Self {
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
            wall: Rc::new(Cell::new(wall)),
        }
    }

    fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
        self.wall
            .set(self.wall.get() + chrono::Duration::from_std(by).unwrap());
    }
}

impl Clock for Clockwork {
    fn monotonic(&self) -> Duration {
        self.elapsed.get()
    }

    fn local_now(&self) -> NaiveDateTime {
        self.wall.get()
    }
}

/// The remote feeding record, shared by the API and the publisher
#[derive(Clone, Default)]
struct Server(Rc<RefCell<StatusSnapshot>>);

impl Server {
    fn record(&self, slot: Slot, value: FeedingSlot) {
        let current = *self.0.borrow();
        *self.0.borrow_mut() = current.with_slot(slot, value);
    }
}

impl StatusApi for Server {
    fn fetch(&mut self) -> Result<StatusSnapshot, FetchError> {
        Ok(*self.0.borrow())
    }
}

struct ServerPublisher {
    server: Server,
    disconnected: Rc<Cell<bool>>,
}

impl FeedPublisher for ServerPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        let slot = if topic.ends_with("morning") {
            Slot::Morning
        } else {
            Slot::Evening
        };
        let value = match parse_timestamp(payload, 0) {
            Some(time) => FeedingSlot::fed_at(time),
            None => FeedingSlot::NOT_FED,
        };
        self.server.record(slot, value);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnected.set(true);
    }
}

#[derive(Clone, Default)]
struct Presses(Rc<RefCell<VecDeque<Button>>>);

impl ButtonInput for Presses {
    fn poll(&mut self, _now: Duration) -> Result<Option<Button>> {
        Ok(self.0.borrow_mut().pop_front())
    }

    fn wait_release(&mut self, _button: Button) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Epd {
    refreshes: Rc<Cell<u32>>,
    asleep: Rc<Cell<bool>>,
}

impl Panel for Epd {
    fn refresh(&mut self, _frame: &Framebuffer) -> Result<(), PanelError> {
        self.refreshes.set(self.refreshes.get() + 1);
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), PanelError> {
        self.asleep.set(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Leds(Rc<RefCell<Vec<Rgb888>>>);

impl PixelWriter for Leds {
    fn write(&mut self, colors: &[Rgb888]) -> Result<()> {
        *self.0.borrow_mut() = colors.to_vec();
        Ok(())
    }
}

impl Leds {
    fn lit(&self, index: usize) -> bool {
        self.0.borrow().get(index).map_or(false, |c| *c != Rgb888::new(0, 0, 0))
    }
}

struct Synced;

impl TimeSync for Synced {
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn a_morning_on_the_device() {
    let config = Config::default();
    let clock = Clockwork::starting_at(7, 0);
    let server = Server::default();
    let epd = Epd::default();
    let leds = Leds::default();
    let presses = Presses::default();
    let disconnected = Rc::new(Cell::new(false));
    let (triggers, inbox) = mpsc::channel();

    let strip = IndicatorStrip::new(leds.clone(), config.pixels.count, 1.0);
    let display = DisplayManager::new(
        epd.clone(),
        strip,
        NoDelay,
        StatusScreen::new(BowlArt::primitives()),
        config.pixels,
    );
    let reconciler = Reconciler::new(display, RefreshGate::new(config.min_refresh_interval));
    let fetcher = StatusFetcher::new(
        server.clone(),
        NoDelay,
        config.max_retries,
        config.retry_delay,
        ConnectionHealth::new(config.connection_failure_threshold),
    );
    let time = TimeKeeper::new(Synced, config.time_sync_interval);

    let mut app = FeederApp::new(&config, clock.clone(), fetcher, reconciler, time, NoDelay);
    app.add_source(WakeFromSleep::new(true, config.wake_refresh_delay));
    app.add_source(PeriodicPoll::new(config.status_fetch_interval, Duration::ZERO));
    app.add_source(MqttTrigger::new(inbox));
    app.add_source(ButtonAction::new(
        presses.clone(),
        ServerPublisher {
            server: server.clone(),
            disconnected: disconnected.clone(),
        },
        &config.mqtt,
        config.publish_settle,
    ));

    let morning_led = config.pixels.morning_index;
    let evening_led = config.pixels.evening_index;

    // boot draws the current state and shows both slots red
    assert_eq!(app.tick().unwrap(), TickOutcome::Continue);
    assert_eq!(epd.refreshes.get(), 1);
    assert_eq!(leds.0.borrow()[morning_led], RED);
    assert!(leds.lit(evening_led));

    // the morning button lands inside the refresh interval and waits
    clock.advance(Duration::from_secs(3));
    presses.0.borrow_mut().push_back(Button::MorningFed);
    app.tick().unwrap();
    assert_eq!(epd.refreshes.get(), 1);
    assert_eq!(leds.0.borrow()[morning_led], GREEN);
    assert_eq!(
        app.reconciler().store().get().morning.label(),
        "Fed at 7:00 AM"
    );

    // the gate opens again before the post-wake refresh is due
    clock.advance(Duration::from_secs(10));
    app.tick().unwrap();
    assert_eq!(epd.refreshes.get(), 2);

    // the post-wake refresh is due but still has to wait for the gate
    clock.advance(Duration::from_secs(3));
    app.tick().unwrap();
    assert_eq!(epd.refreshes.get(), 2);

    clock.advance(Duration::from_secs(7));
    app.tick().unwrap();
    assert_eq!(epd.refreshes.get(), 3);

    // evening fed from another device, announced over MQTT
    clock.advance(Duration::from_secs(60));
    server.record(Slot::Evening, FeedingSlot::fed_unknown_time());
    triggers
        .send(FeedingTrigger {
            topic: config.mqtt.evening_topic.clone(),
            payload: "7:01 am".into(),
        })
        .unwrap();
    app.tick().unwrap();
    assert_eq!(epd.refreshes.get(), 4);
    assert_eq!(leds.0.borrow()[evening_led], GREEN);
    assert_eq!(app.reconciler().store().get().evening.label(), "Fed");

    // nothing new on the periodic poll
    clock.advance(Duration::from_secs(300));
    app.tick().unwrap();
    assert_eq!(epd.refreshes.get(), 4);

    // window closes at 11:00, sleep until the evening window
    clock.advance(Duration::from_secs(4 * 3600));
    match app.tick().unwrap() {
        TickOutcome::Sleep(duration, reason) => {
            assert_eq!(reason, "between feeding windows");
            assert!(duration > Duration::from_secs(4 * 3600));
            assert!(duration <= Duration::from_secs(5 * 3600));
        }
        other => panic!("expected sleep, got {:?}", other),
    }

    app.prepare_sleep();
    assert!(epd.asleep.get());
    assert!(disconnected.get());
    assert!(!leds.lit(morning_led));
    assert!(!leds.lit(evening_led));
}
