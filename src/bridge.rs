//! MQTT to store ingestion.

use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono_tz::Tz;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    sensor::{SensorValues, now_in},
    store::ReadingStore,
};

pub const DEFAULT_TOPIC: &str = "esp32/sensor";

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const REQUEST_CHANNEL_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// `mqtt://host:port`, optionally with rumqttc query options.
    pub broker_url: String,

    pub topic: String,

    pub username: Option<String>,

    pub password: Option<String>,

    pub timezone: Tz,
}

impl BridgeConfig {
    pub fn mqtt_options(&self) -> Result<MqttOptions> {
        let url = with_client_id(&self.broker_url);
        let mut options = MqttOptions::parse_url(url)
            .with_context(|| format!("invalid MQTT broker URL: {}", self.broker_url))?;

        options.set_keep_alive(KEEP_ALIVE);

        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }

        Ok(options)
    }
}

// rumqttc requires a client id in the URL; generate one unless given.
fn with_client_id(url: &str) -> String {
    if url.contains("client_id=") {
        return url.to_owned();
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    let suffix = Uuid::new_v4().simple().to_string();

    format!("{url}{separator}client_id=db-sensor-{}", &suffix[..8])
}

/// Runs the bridge until the process exits.
pub async fn run_bridge<S: ReadingStore>(store: S, config: BridgeConfig) -> Result<()> {
    let options = config.mqtt_options()?;
    let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

    info!(broker = %config.broker_url, topic = %config.topic, "starting MQTT bridge");

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("MQTT connected");
                if let Err(err) = client.try_subscribe(&config.topic, QoS::AtMostOnce) {
                    error!(topic = %config.topic, "failed to subscribe: {err}");
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                debug!(return_codes = ?suback.return_codes, "subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if publish.topic != config.topic {
                    continue;
                }

                let store = store.clone();
                let timezone = config.timezone;
                tokio::spawn(async move {
                    if let Err(err) = handle_message(&store, timezone, &publish.payload).await {
                        error!("MQTT error: {err:#}");
                    }
                });
            }
            Ok(_) => {}
            Err(err) => {
                warn!("MQTT connection error: {err}");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Stores one payload, returning the new row id or `None` when the payload
/// was discarded for carrying non-numeric values.
pub async fn handle_message<S: ReadingStore>(
    store: &S,
    timezone: Tz,
    payload: &[u8],
) -> Result<Option<u64>> {
    let Some(values) = parse_payload(payload)? else {
        debug!("discarding MQTT payload with non-numeric fields");
        return Ok(None);
    };

    let reading = values.at(now_in(timezone));
    let id = store
        .insert_reading(&reading)
        .await
        .context("failed to insert reading from MQTT")?;

    info!(
        id,
        suhu = reading.suhu,
        humidity = reading.humidity,
        lux = reading.lux,
        "inserted reading from MQTT"
    );

    Ok(Some(id))
}

/// Extracts the sensor values, or `None` if any of them is not a finite number.
pub fn parse_payload(payload: &[u8]) -> Result<Option<SensorValues>> {
    let data: Value =
        serde_json::from_slice(payload).context("failed to parse MQTT payload as JSON")?;

    Ok(SensorValues::from_fields(
        data.get("suhu"),
        data.get("humidity"),
        data.get("lux"),
    ))
}
