//! Network clients on top of ESP-IDF

pub mod http;
pub mod mqtt;
pub mod sntp;

pub use http::{probe_connectivity, HttpStatusApi};
pub use mqtt::MqttLink;
pub use sntp::SntpSync;
