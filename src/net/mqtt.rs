//! MQTT connection wrapper.
//!
//! `begin(broker_url)` establishes the session; `publish`/`subscribe`
//! fail with [`NetError::MqttNotConnected`] until it succeeds.  On
//! ESP-IDF a background thread drains the event connection so the client
//! keeps servicing acknowledgements.

use log::info;

use crate::error::NetError;

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPublish {
    pub topic: String,
    pub payload: String,
}

pub struct MqttConnection {
    connected: bool,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    publishes: Vec<RecordedPublish>,
    #[cfg(not(target_os = "espidf"))]
    subscriptions: Vec<String>,
}

impl Default for MqttConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttConnection {
    pub fn new() -> Self {
        Self {
            connected: false,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            publishes: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            subscriptions: Vec::new(),
        }
    }

    /// Connect to the broker (e.g. `mqtt://broker.emqx.io`).
    pub fn begin(&mut self, broker_url: &str) -> Result<(), NetError> {
        self.platform_begin(broker_url)?;
        self.connected = true;
        info!("mqtt: session up ({broker_url})");
        Ok(())
    }

    /// Publish `payload` on `topic` (QoS 0, not retained).
    pub fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NetError> {
        if !self.connected {
            return Err(NetError::MqttNotConnected);
        }
        self.platform_publish(topic, payload)
    }

    /// Subscribe to `topic` at the given QoS (0–2).
    pub fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), NetError> {
        if !self.connected {
            return Err(NetError::MqttNotConnected);
        }
        self.platform_subscribe(topic, qos)
    }

    /// Publishes recorded by the simulation backend (host builds only).
    #[cfg(not(target_os = "espidf"))]
    pub fn recorded_publishes(&self) -> &[RecordedPublish] {
        &self.publishes
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self, broker_url: &str) -> Result<(), NetError> {
        use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};

        let config = MqttClientConfiguration {
            client_id: Some("rangesentry"),
            ..Default::default()
        };
        let (client, mut connection) = EspMqttClient::new(broker_url, &config)
            .map_err(|_| NetError::MqttOperationFailed)?;

        // Drain broker events so the client keeps making progress; the
        // loop ends when the client (and with it the connection) drops.
        std::thread::Builder::new()
            .name("mqtt-events".into())
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    info!("mqtt: event {:?}", event.payload());
                }
            })
            .map_err(|_| NetError::MqttOperationFailed)?;

        self.client = Some(client);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), NetError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(NetError::MqttNotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| NetError::MqttOperationFailed)
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str, qos: u8) -> Result<(), NetError> {
        use esp_idf_svc::mqtt::client::QoS;

        let qos = match qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        };
        let client = self.client.as_mut().ok_or(NetError::MqttNotConnected)?;
        client
            .subscribe(topic, qos)
            .map(|_| ())
            .map_err(|_| NetError::MqttOperationFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self, broker_url: &str) -> Result<(), NetError> {
        info!("mqtt(sim): begin {broker_url}");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), NetError> {
        self.publishes.push(RecordedPublish {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        });
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, topic: &str, _qos: u8) -> Result<(), NetError> {
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }
}
