use jack::{AsyncClient, Client, ClientOptions};
use log::{error, info, warn};

use crate::engine::{EngineError, RtProcessor};
use crate::io::processor::JackProcessor;
use crate::settings::AudioSettings;

const CLIENT_NAME: &str = "ampstack";

/// JACK notifications handler
struct Notifications;
impl jack::NotificationHandler for Notifications {}

/// Owns the inactive JACK client so the engine can be constructed with
/// the device's real sample rate before audio starts. Device or
/// permission trouble surfaces here as `SourceUnavailable`.
pub struct Manager {
    client: Client,
    settings: AudioSettings,
}

impl Manager {
    pub fn new(settings: &AudioSettings) -> Result<Self, EngineError> {
        let (client, _) = Client::new(CLIENT_NAME, ClientOptions::NO_START_SERVER)
            .map_err(|e| EngineError::SourceUnavailable(format!("JACK client: {e}")))?;

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    pub fn sample_rate(&self) -> usize {
        self.client.sample_rate() as usize
    }

    pub fn buffer_size(&self) -> usize {
        self.client.buffer_size() as usize
    }

    /// Hand the audio-side processor to the callback and go live.
    pub fn activate(self, rt: RtProcessor) -> Result<ActiveManager, EngineError> {
        let handler = JackProcessor::new(&self.client, rt)
            .map_err(|e| EngineError::SourceUnavailable(e.to_string()))?;

        let active_client = self
            .client
            .activate_async(Notifications, handler)
            .map_err(|e| EngineError::SourceUnavailable(format!("JACK activation: {e}")))?;

        let manager = ActiveManager {
            active_client,
            settings: self.settings,
        };

        if manager.settings.auto_connect {
            manager.connect_ports();
        }

        Ok(manager)
    }
}

pub struct ActiveManager {
    active_client: AsyncClient<Notifications, JackProcessor>,
    settings: AudioSettings,
}

impl ActiveManager {
    /// Connect our ports to the configured system ports. Failures are
    /// logged, not fatal; the user may patch manually.
    fn connect_ports(&self) {
        let client = self.active_client.as_client();

        let pairs = [
            (self.settings.input_port.as_str(), "ampstack:in_port"),
            ("ampstack:out_port_left", self.settings.output_left_port.as_str()),
            ("ampstack:out_port_right", self.settings.output_right_port.as_str()),
        ];
        for (from, to) in pairs {
            if let Err(e) = client.connect_ports_by_name(from, to) {
                warn!("failed to connect {from} -> {to}: {e}");
            } else {
                info!("connected {from} -> {to}");
            }
        }
    }

    /// Disconnect all audio connections
    pub fn disconnect_all(&self) {
        let client = self.active_client.as_client();
        for name in [
            "ampstack:in_port",
            "ampstack:out_port_left",
            "ampstack:out_port_right",
        ] {
            if let Some(port) = client.port_by_name(name) {
                client.disconnect(&port).unwrap_or_else(|e| {
                    error!("failed to disconnect {name}: {e}");
                });
            }
        }
    }

    /// Get available input ports
    pub fn get_available_inputs(&self) -> Vec<String> {
        self.active_client
            .as_client()
            .ports(None, Some("audio"), jack::PortFlags::IS_OUTPUT)
            .into_iter()
            .filter(|p| !p.starts_with("ampstack:"))
            .collect()
    }

    /// Get available output ports
    pub fn get_available_outputs(&self) -> Vec<String> {
        self.active_client
            .as_client()
            .ports(None, Some("audio"), jack::PortFlags::IS_INPUT)
            .into_iter()
            .filter(|p| !p.starts_with("ampstack:"))
            .collect()
    }

    pub fn sample_rate(&self) -> usize {
        self.active_client.as_client().sample_rate() as usize
    }

    pub fn buffer_size(&self) -> usize {
        self.active_client.as_client().buffer_size() as usize
    }
}
