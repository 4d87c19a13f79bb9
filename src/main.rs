#[cfg(target_os = "espidf")]
use anyhow::Context;

#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::delay::Delay;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio::{self, IOPin, PinDriver, Pull};
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripherals::Peripherals;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::prelude::*;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::spi;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;

#[cfg(target_os = "espidf")]
use bowlwatch::{
    display::DisplayManager,
    events::{ButtonAction, MqttTrigger, PeriodicPoll, WakeFromSleep},
    fetch::StatusFetcher,
    gate::RefreshGate,
    health::ConnectionHealth,
    indicator::IndicatorStrip,
    input::ButtonBank,
    net::{probe_connectivity, HttpStatusApi, MqttLink, SntpSync},
    platform::{resumed_from_sleep, EspPower, NeoPixels},
    render::{BowlArt, StatusScreen},
    ssd1680::Ssd1680,
    time::{Clock, SystemClock, TimeKeeper},
    wifi::WifiManager,
    Config, FeederApp, Reconciler,
};

// https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("Feeding tracker starting");
    let config = Config::from_build_env().context("invalid build configuration")?;
    let resumed = resumed_from_sleep();

    let peripherals = Peripherals::take().expect("Could not take peripherals");
    let pins = peripherals.pins;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // Kept alive for the whole run, the loop never returns
    let mut wifi = WifiManager::new(
        peripherals.modem,
        sys_loop,
        nvs,
        &config.wifi_ssid,
        &config.wifi_password,
    )?;
    if let Err(err) = wifi.connect() {
        log::error!("WiFi unavailable, continuing offline: {:#}", err);
    }

    probe_connectivity(
        &[
            ("Dog Feed API", config.status_url.clone()),
            ("MQTT HTTP", format!("http://{}:1880/", config.mqtt.broker)),
        ],
        config.http_timeout,
    );

    log::info!("Configuring SPI for the e-paper panel");
    let spi = spi::SpiDeviceDriver::new_single(
        peripherals.spi2,
        pins.gpio36,
        pins.gpio35,
        Option::<gpio::AnyIOPin>::None,
        Some(pins.gpio8),
        &spi::SpiDriverConfig::new(),
        &spi::SpiConfig::new().baudrate(4.MHz().into()),
    )
    .context("SPI for SSD1680")?;

    let delay = Delay::default();
    let panel = Ssd1680::new(
        spi,
        PinDriver::input(pins.gpio5)?,
        PinDriver::output(pins.gpio7)?,
        PinDriver::output(pins.gpio6)?,
        delay,
    )
    .context("initializing SSD1680")?;

    let neopixels = NeoPixels::new(peripherals.rmt.channel0, pins.gpio1, pins.gpio21)?;
    let strip = IndicatorStrip::new(neopixels, config.pixels.count, config.pixels.brightness);

    let display = DisplayManager::new(
        panel,
        strip,
        delay,
        StatusScreen::new(BowlArt::bundled()),
        config.pixels,
    );
    let reconciler = Reconciler::new(display, RefreshGate::new(config.min_refresh_interval));

    let api = HttpStatusApi::new(&config.status_url, config.http_timeout, config.utc_offset_hours);
    let fetcher = StatusFetcher::new(
        api,
        delay,
        config.max_retries,
        config.retry_delay,
        ConnectionHealth::new(config.connection_failure_threshold),
    );

    let time = TimeKeeper::new(SntpSync::new(config.http_timeout)?, config.time_sync_interval);
    let (mqtt, triggers) = MqttLink::start(&config.mqtt, config.mqtt_loop_timeout)?;

    let mut buttons = Vec::with_capacity(4);
    for pin in [
        pins.gpio15.downgrade(),
        pins.gpio14.downgrade(),
        pins.gpio12.downgrade(),
        pins.gpio11.downgrade(),
    ] {
        let mut button = PinDriver::input(pin)?;
        button.set_pull(Pull::Up)?;
        buttons.push(button);
    }
    let buttons: [_; 4] = buttons
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected four buttons"))?;

    let clock = SystemClock::new(config.utc_offset_hours);
    let started = clock.monotonic();

    let mut app = FeederApp::new(&config, clock, fetcher, reconciler, time, delay);
    app.add_source(WakeFromSleep::new(resumed, config.wake_refresh_delay));
    app.add_source(PeriodicPoll::new(config.status_fetch_interval, started));
    app.add_source(MqttTrigger::new(triggers));
    app.add_source(ButtonAction::new(
        ButtonBank::new(buttons, delay, config.button_debounce),
        mqtt,
        &config.mqtt,
        config.publish_settle,
    ));

    app.run(&mut EspPower)
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("bowlwatch only runs on the MagTag (target_os = \"espidf\"); run `cargo test` on the host");
}
