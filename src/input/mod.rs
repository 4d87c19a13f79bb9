//! Input handling module for the four feeding buttons
//!
//! Buttons are active low with pull-ups. A press is reported once per
//! debounce period and the caller waits for release before polling again,
//! so holding a button never repeats.

use std::time::Duration;

use anyhow::{anyhow, Result};
use embedded_hal::{delay::DelayNs, digital::InputPin};
use log::{info, warn};

// Re-export the public types
pub mod types;
pub use types::*;

const RELEASE_POLL_MS: u32 = 10;
/// Give up waiting after this long, the button counts as held
const RELEASE_TIMEOUT_MS: u32 = 10_000;

/// Source of debounced button presses
pub trait ButtonInput {
    /// First newly pressed button in left to right order
    fn poll(&mut self, now: Duration) -> Result<Option<Button>>;

    /// Block until `button` is released
    fn wait_release(&mut self, button: Button) -> Result<()>;
}

/// Four buttons on GPIO inputs
pub struct ButtonBank<P, D> {
    handlers: [ButtonHandler<P>; 4],
    delay: D,
    debounce: Duration,
}

/// Handler for individual buttons
struct ButtonHandler<P> {
    button: Button,
    pin: P,
    last_press: Option<Duration>,
    /// Still down after the release timeout
    held: bool,
}

impl<P: InputPin> ButtonHandler<P> {
    fn new(button: Button, pin: P) -> Self {
        Self {
            button,
            pin,
            last_press: None,
            held: false,
        }
    }

    fn state(&mut self) -> Result<ButtonState> {
        let low = self
            .pin
            .is_low()
            .map_err(|e| anyhow!("reading button {}: {:?}", self.button, e))?;
        Ok(if low {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        })
    }
}

impl<P: InputPin, D: DelayNs> ButtonBank<P, D> {
    /// Pins in left to right order: morning fed, morning clear, evening fed,
    /// evening clear
    pub fn new(pins: [P; 4], delay: D, debounce: Duration) -> Self {
        let [morning_fed, morning_clear, evening_fed, evening_clear] = pins;
        Self {
            handlers: [
                ButtonHandler::new(Button::MorningFed, morning_fed),
                ButtonHandler::new(Button::MorningClear, morning_clear),
                ButtonHandler::new(Button::EveningFed, evening_fed),
                ButtonHandler::new(Button::EveningClear, evening_clear),
            ],
            delay,
            debounce,
        }
    }

    fn handler(&mut self, button: Button) -> &mut ButtonHandler<P> {
        let index = Button::ALL
            .iter()
            .position(|b| *b == button)
            .unwrap_or_default();
        &mut self.handlers[index]
    }
}

impl<P: InputPin, D: DelayNs> ButtonInput for ButtonBank<P, D> {
    fn poll(&mut self, now: Duration) -> Result<Option<Button>> {
        for handler in &mut self.handlers {
            let state = handler.state()?;
            if handler.held {
                handler.held = state == ButtonState::Pressed;
                continue;
            }
            if state != ButtonState::Pressed {
                continue;
            }

            let debounced = handler
                .last_press
                .map_or(true, |last| now.saturating_sub(last) > self.debounce);
            if debounced {
                handler.last_press = Some(now);
                info!("Button {} pressed", handler.button);
                return Ok(Some(handler.button));
            }
        }
        Ok(None)
    }

    fn wait_release(&mut self, button: Button) -> Result<()> {
        let mut waited = 0;
        while self.handler(button).state()? == ButtonState::Pressed {
            if waited >= RELEASE_TIMEOUT_MS {
                warn!("Button {} still held after {} ms", button, waited);
                self.handler(button).held = true;
                return Ok(());
            }
            self.delay.delay_ms(RELEASE_POLL_MS);
            waited += RELEASE_POLL_MS;
        }
        Ok(())
    }
}
