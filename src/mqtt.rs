use crate::configuration::Mqtt;
use crate::home_assistant::{DeviceDescriptor, DiscoveryConfig, Sensor, host_slug};
use crate::report::Report;
use crate::status::StatusMessage;
use log::{debug, info, trace};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::error::Error;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::time::timeout;

/// A message to publish
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub payload: String,

    /// Retained messages are kept by the broker and sent to every new subscriber
    pub retain: bool,
}

/// Sends the report to Home Assistant through one MQTT session
pub struct MqttPublisher {
    config: Mqtt,
    descriptor: DeviceDescriptor,
}

impl MqttPublisher {
    /// Constructs a publisher from the MQTT configuration
    ///
    /// ```
    /// use x728_ups_monitor::{Configuration, MqttPublisher, PublishTarget, Report};
    ///
    /// let config = Configuration::load("conf/x728-ups-monitor.conf").expect("Cannot load configuration");
    /// let PublishTarget::Mqtt(mqtt) = config.publish else { unreachable!() };
    /// let publisher = MqttPublisher::new(mqtt);
    ///
    /// // 5 discovery messages and the state
    /// assert_eq!(publisher.messages(&Report::default()).len(), 6);
    /// ```
    pub fn new(config: Mqtt) -> MqttPublisher {
        MqttPublisher {
            descriptor: DeviceDescriptor::new(&config),
            config,
        }
    }

    /// Returns the device descriptor
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Messages of one run: the retained discovery documents, then the state
    pub fn messages(&self, report: &Report) -> Vec<Message> {
        let mut messages: Vec<Message> = Sensor::iter()
            .map(|sensor| Message {
                topic: self.descriptor.discovery_topic(sensor),
                payload: DiscoveryConfig::new(sensor, &self.descriptor).to_string(),
                retain: true,
            })
            .collect();

        messages.push(Message {
            topic: self.descriptor.state_topic().to_string(),
            payload: StatusMessage::from(report).to_string(),
            retain: false,
        });

        messages
    }

    /// Client id of the session, the configured one or one derived from the hostname
    pub fn client_id(&self) -> String {
        match &self.config.client_id {
            Some(id) => id.clone(),
            None => format!(
                "{}-{}",
                env!("CARGO_PKG_NAME"),
                host_slug(&self.config.hostname)
            ),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id(), &self.config.host, self.config.port);
        if !self.config.user.is_empty() {
            options.set_credentials(&self.config.user, &self.config.password);
        }
        options
    }

    /// Connects, publishes every message and disconnects once the broker acknowledged them
    pub async fn publish(&self, report: &Report) -> Result<(), Box<dyn Error>> {
        let messages = self.messages(report);
        let deadline = Duration::from_secs(self.config.timeout);

        info!(
            "Connecting to MQTT broker {}:{}",
            self.config.host, self.config.port
        );
        let (client, mut event_loop) = AsyncClient::new(self.options(), messages.len() + 1);

        for message in &messages {
            debug!(
                "Publishing to topic {} : {}",
                message.topic, message.payload
            );
            client
                .publish(
                    &message.topic,
                    QoS::AtLeastOnce,
                    message.retain,
                    message.payload.as_bytes(),
                )
                .await?;
        }

        timeout(deadline, Self::wait_for_acks(&mut event_loop, messages.len())).await??;
        info!("{} messages acknowledged by the broker", messages.len());

        client.disconnect().await?;
        timeout(deadline, Self::wait_for_disconnect(&mut event_loop)).await?;

        Ok(())
    }

    /// Drives the event loop until the connection and `expected` publications are acknowledged
    async fn wait_for_acks(
        event_loop: &mut EventLoop,
        expected: usize,
    ) -> Result<(), Box<dyn Error>> {
        let mut acknowledged = 0;
        while acknowledged < expected {
            match event_loop.poll().await? {
                Event::Incoming(Packet::ConnAck(ack)) => {
                    debug!("Connection acknowledged: {:?}", ack.code)
                }
                Event::Incoming(Packet::PubAck(ack)) => {
                    trace!("Publication {} acknowledged", ack.pkid);
                    acknowledged += 1;
                }
                notification => trace!("MQTT notification received: {notification:?}"),
            }
        }
        Ok(())
    }

    /// Drives the event loop until the disconnection is sent
    async fn wait_for_disconnect(event_loop: &mut EventLoop) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return,
                Ok(notification) => trace!("MQTT notification received: {notification:?}"),
                Err(e) => {
                    debug!("Connection closed: {e}");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Configuration, PublishTarget};
    use crate::host::HostMetrics;
    use crate::ups::BatteryReading;
    use serde_json::Value;

    fn mqtt(hostname: &str) -> Mqtt {
        let config = Configuration::load("conf/x728-ups-monitor.conf")
            .expect("Failed to load default config");
        let PublishTarget::Mqtt(mut mqtt) = config.publish else {
            panic!("the default target should be MQTT");
        };
        mqtt.hostname = hostname.to_string();
        mqtt
    }

    fn publisher() -> MqttPublisher {
        MqttPublisher::new(mqtt("raspberrypi"))
    }

    /// Hosts sharing a broker must not take over each other's session
    #[test]
    fn test_client_id_per_host() {
        let garage = MqttPublisher::new(mqtt("Pi Garage"));
        let attic = MqttPublisher::new(mqtt("pi-attic"));

        assert_eq!(garage.options().client_id(), "x728-ups-monitor-pi_garage");
        assert_eq!(attic.options().client_id(), "x728-ups-monitor-pi-attic");
        assert_ne!(garage.options().client_id(), attic.options().client_id());

        let mut configured = mqtt("pi-attic");
        configured.client_id = Some("ups-attic".to_string());
        assert_eq!(MqttPublisher::new(configured).options().client_id(), "ups-attic");
    }

    fn report() -> Report {
        Report {
            battery: BatteryReading {
                voltage: 4.1562,
                capacity: 87.3,
            },
            host: HostMetrics {
                cpu_temp: Some(45.0),
                cpu_usage: None,
                core_voltage: Some(0.8563),
            },
        }
    }

    #[test]
    fn test_messages() -> Result<(), Box<dyn Error>> {
        let messages = publisher().messages(&report());

        assert_eq!(messages.len(), 6);

        let (state, discovery) = messages.split_last().expect("no message");
        assert!(discovery.iter().all(|m| m.retain));
        assert!(
            discovery
                .iter()
                .all(|m| m.topic.starts_with("homeassistant/sensor/raspberrypi_x728_ups_"))
        );
        assert!(discovery.iter().all(|m| m.topic.ends_with("/config")));

        assert!(!state.retain);
        assert_eq!(state.topic, "geekworm/sensor/raspberrypi/x728_ups/state");
        let json: Value = serde_json::from_str(&state.payload)?;
        assert_eq!(json["voltage"], 4.16);
        assert_eq!(json["capacity"], 87.0);
        assert_eq!(json["cpu_temp"], 45.0);
        assert_eq!(json["cpu_usage"], 0.0);
        assert_eq!(json["system_voltage"], 0.86);

        Ok(())
    }

    /// Renders the templates the way Home Assistant does on the state payload
    #[test]
    fn test_value_templates() -> Result<(), Box<dyn Error>> {
        let messages = publisher().messages(&report());
        let (state, discovery) = messages.split_last().expect("no message");
        let state: Value = serde_json::from_str(&state.payload)?;
        let env = minijinja::Environment::new();

        for (message, sensor) in discovery.iter().zip(Sensor::iter()) {
            let config: Value = serde_json::from_str(&message.payload)?;
            let template = config["value_template"].as_str().expect("no value_template");

            let rendered =
                env.render_str(template, minijinja::context! { value_json => state.clone() })?;

            assert_eq!(
                rendered.parse::<f64>()?,
                state[sensor.as_str()].as_f64().expect("not a number")
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_broker() -> Result<(), Box<dyn Error>> {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
            listener.local_addr()?.port()
        };

        let mut publisher = publisher();
        publisher.config.host = "127.0.0.1".to_string();
        publisher.config.port = port;
        publisher.config.timeout = 2;

        assert!(publisher.publish(&report()).await.is_err());

        Ok(())
    }
}
