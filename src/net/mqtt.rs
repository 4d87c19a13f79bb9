use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use log::{error, info, warn};

use crate::config::MqttSettings;
use crate::events::{FeedPublisher, FeedingTrigger};

const LISTENER_STACK: usize = 6144;

/// Taken out and dropped on disconnect
type SharedClient = Arc<Mutex<Option<EspMqttClient<'static>>>>;

/// Broker session: publishes button changes, forwards feeding topic
/// messages to the main loop
pub struct MqttLink {
    client: SharedClient,
    connected: Arc<AtomicBool>,
}

impl MqttLink {
    /// Connect and start the listener thread. Subscriptions are renewed on every
    /// (re)connect by the listener.
    pub fn start(
        settings: &MqttSettings,
        network_timeout: Duration,
    ) -> Result<(Self, Receiver<FeedingTrigger>)> {
        let url = settings.url();
        let config = MqttClientConfiguration {
            client_id: Some(&settings.client_id),
            username: settings.username.as_deref(),
            password: settings.password.as_deref(),
            keep_alive_interval: Some(settings.keep_alive),
            network_timeout,
            ..Default::default()
        };

        info!("Connecting to MQTT broker {}", url);
        let (client, connection) =
            EspMqttClient::new(&url, &config).with_context(|| format!("MQTT client for {}", url))?;

        let client = Arc::new(Mutex::new(Some(client)));
        let connected = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let topics = [settings.morning_topic.clone(), settings.evening_topic.clone()];
        let listener = Listener {
            client: client.clone(),
            connected: connected.clone(),
            topics,
            triggers: tx,
        };
        std::thread::Builder::new()
            .name("mqtt".into())
            .stack_size(LISTENER_STACK)
            .spawn(move || listener.run(connection))
            .context("spawning MQTT listener")?;

        Ok((Self { client, connected }, rx))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl FeedPublisher for MqttLink {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(anyhow!("MQTT not connected"));
        }
        let mut guard = self
            .client
            .lock()
            .map_err(|_| anyhow!("MQTT client lock poisoned"))?;
        let client = guard.as_mut().ok_or_else(|| anyhow!("MQTT client closed"))?;
        client
            .enqueue(topic, QoS::AtLeastOnce, false, payload.as_bytes())
            .with_context(|| format!("publishing to {}", topic))?;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected.store(false, Ordering::Relaxed);
        match self.client.lock() {
            Ok(mut guard) => {
                if guard.take().is_some() {
                    info!("MQTT disconnected");
                }
            }
            Err(_) => warn!("MQTT client lock poisoned"),
        }
    }
}

struct Listener {
    client: SharedClient,
    connected: Arc<AtomicBool>,
    topics: [String; 2],
    triggers: Sender<FeedingTrigger>,
}

impl Listener {
    fn run(self, mut connection: EspMqttConnection) {
        info!("MQTT listener started");
        while let Ok(event) = connection.next() {
            match event.payload() {
                EventPayload::Connected(_) => {
                    info!("Connected to MQTT broker");
                    self.connected.store(true, Ordering::Relaxed);
                    self.subscribe();
                }
                EventPayload::Disconnected => {
                    warn!("Disconnected from MQTT broker");
                    self.connected.store(false, Ordering::Relaxed);
                }
                EventPayload::Received { topic, data, .. } => {
                    let Some(topic) = topic else { continue };
                    if !self.topics.iter().any(|t| t == topic) {
                        continue;
                    }
                    let trigger = FeedingTrigger {
                        topic: topic.to_owned(),
                        payload: String::from_utf8_lossy(data).into_owned(),
                    };
                    if self.triggers.send(trigger).is_err() {
                        break;
                    }
                }
                EventPayload::Error(err) => error!("MQTT error: {:?}", err),
                _ => {}
            }
        }
        info!("MQTT connection closed");
    }

    fn subscribe(&self) {
        let Ok(mut guard) = self.client.lock() else {
            warn!("MQTT client lock poisoned");
            return;
        };
        let Some(client) = guard.as_mut() else {
            return;
        };
        for topic in &self.topics {
            match client.subscribe(topic, QoS::AtLeastOnce) {
                Ok(_) => info!("Subscribed to {}", topic),
                Err(err) => warn!("Subscribe to {} failed: {}", topic, err),
            }
        }
    }
}
