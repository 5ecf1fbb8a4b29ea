use crate::config::ClientConfig;
use crate::controller::{InputManager, Key, Wanderer};
use crate::game::{ClientGameState, SessionStatus};
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode, encode, timestamp_ms, ClientMessage, ServerMessage};
use std::time::Duration;
use tokio::time::{interval, sleep};
use tokio_tungstenite::tungstenite::{self, Message};

pub struct Client {
    config: ClientConfig,

    game_state: ClientGameState,
    input_manager: InputManager,
    wanderer: Option<Wanderer>,

    frames_rendered: u64,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let wanderer = config.wander.then(Wanderer::new);
        Client {
            config,
            game_state: ClientGameState::new(),
            input_manager: InputManager::new(),
            wanderer,
            frames_rendered: 0,
        }
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    /// Feeds a key transition from an external input source.
    pub fn key_event(&mut self, key: Key, pressed: bool) -> Option<ClientMessage> {
        if pressed {
            self.input_manager.press(key);
            None
        } else if self.input_manager.release(key) {
            self.game_state.attack()
        } else {
            None
        }
    }

    async fn send_messages<S>(
        &self,
        sink: &mut S,
        messages: Vec<ClientMessage>,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        if messages.is_empty() {
            return Ok(());
        }
        if let Some(delay) = self.one_way_delay() {
            sleep(delay).await;
        }

        for message in messages {
            let data = encode(&message)?;
            sink.feed(Message::Binary(data)).await?;
        }
        sink.flush().await?;
        Ok(())
    }

    /// Half of the simulated round trip, applied once on each side
    fn one_way_delay(&self) -> Option<Duration> {
        if self.config.fake_ping.is_zero() {
            None
        } else {
            Some(self.config.fake_ping / 2)
        }
    }

    fn handle_frame(&mut self, data: &[u8]) -> Vec<ClientMessage> {
        match decode::<ServerMessage>(data) {
            Ok(message) => {
                debug!("Received {:?}", message);
                self.game_state.handle(message, timestamp_ms())
            }
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    fn movement_tick(&mut self) -> Vec<ClientMessage> {
        let mut outgoing = Vec::new();

        if let Some(wanderer) = self.wanderer.as_mut() {
            if wanderer.drive(&mut self.input_manager) {
                outgoing.extend(self.game_state.attack());
            }
        }

        let keys = self.input_manager.keys();
        outgoing.extend(self.game_state.movement_tick(keys, timestamp_ms()));
        outgoing
    }

    fn render_tick(&mut self) {
        self.game_state.advance_frame();
        self.frames_rendered += 1;

        // one snapshot a second is enough for a headless client
        if self.frames_rendered % 60 == 0 {
            for drawable in self.game_state.drawables() {
                debug!(
                    "{}{} at ({:.1}, {:.1}) facing {:?}",
                    drawable.hash,
                    if drawable.is_own { " (you)" } else { "" },
                    drawable.x,
                    drawable.y,
                    drawable.direction
                );
            }
        }
    }

    /// Runs the session until it ends and returns how it ended
    pub async fn run(&mut self) -> Result<SessionStatus, Box<dyn std::error::Error>> {
        let url = self.config.url();
        info!("Connecting to {}...", url);
        let (websocket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        info!("Connected");

        let (mut sink, mut frames) = websocket.split();

        let mut sweep_interval = interval(self.config.sweep_interval);
        let mut movement_interval = interval(self.config.movement_interval);
        let mut frame_interval = interval(self.config.frame_interval);

        loop {
            tokio::select! {
                frame = frames.next() => {
                    match frame {
                        Some(Ok(Message::Binary(data))) => {
                            if let Some(delay) = self.one_way_delay() {
                                sleep(delay).await;
                            }
                            let outgoing = self.handle_frame(&data);
                            self.send_messages(&mut sink, outgoing).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Connection closed by relay");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("Error receiving frame: {}", e);
                            break;
                        }
                    }
                },

                _ = sweep_interval.tick() => {
                    let notices = self.game_state.sweep_tick(timestamp_ms());
                    self.send_messages(&mut sink, notices).await?;
                },

                _ = movement_interval.tick() => {
                    let outgoing = self.movement_tick();
                    self.send_messages(&mut sink, outgoing).await?;
                },

                _ = frame_interval.tick() => {
                    self.render_tick();
                },
            }

            if self.game_state.is_terminal() {
                break;
            }
        }

        match self.game_state.status {
            SessionStatus::YouDied => info!("You died. Game over"),
            SessionStatus::HostLeft => info!("The host left. Game over"),
            _ => {}
        }

        if let Err(e) = sink.close().await {
            debug!("Error closing connection: {}", e);
        }

        Ok(self.game_state.status)
    }
}
