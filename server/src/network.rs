//! Server network layer handling TCP sessions and tick/broadcast coordination.

use crate::session::SessionManager;
use crate::sim::Simulation;
use crate::world::World;
use log::{debug, error, info, warn};
use shared::protocol::{Command, Event};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        stream: TcpStream,
        addr: SocketAddr,
    },
    LineReceived {
        session_id: u32,
        line: String,
    },
    Disconnected {
        session_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Main server coordinating networking and the physics simulation.
///
/// The run loop is the single writer for both the world and the session set:
/// reader, writer and acceptor tasks communicate with it exclusively through
/// [`ServerMessage`] values, so no shared collection is ever iterated while
/// another task mutates it.
pub struct Server {
    listener: Arc<TcpListener>,
    sessions: SessionManager,
    sim: Simulation,
    tick_duration: Duration,

    // Communication channel from network tasks
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Binds the listener and builds an empty world.
    ///
    /// A bind failure is fatal and surfaces here; everything after this point
    /// only fails per session.
    pub async fn new(
        addr: &str,
        tick_rate: u32,
        width: f32,
        height: f32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = Arc::new(TcpListener::bind(addr).await?);
        info!("Server listening on {}", listener.local_addr()?);

        // A zero rate would make the tick duration infinite.
        let tick_rate = tick_rate.max(1);
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let world = World::new(width, height);

        Ok(Server {
            listener,
            sessions: SessionManager::new(),
            sim: Simulation::new(world, tick_rate as f32),
            tick_duration: Duration::from_secs_f32(1.0 / tick_rate as f32),
            server_tx,
            server_rx,
        })
    }

    /// The bound listener address, useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the task that accepts inbound connections indefinitely.
    ///
    /// An accept failure is fatal to the accept loop and surfaced to the
    /// operator; existing sessions and the tick driver keep running.
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if server_tx
                            .send(ServerMessage::Connected { stream, addr })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Accept loop failed: {}", e);
                        break;
                    }
                }
            }
        });
    }

    /// Registers a new session and spawns its reader and writer tasks.
    ///
    /// The full snapshot is queued before this function returns, so it is
    /// ordered ahead of any broadcast the main loop produces later.
    fn handle_connected(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (read_half, mut write_half) = stream.into_split();
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        let session_id = self.sessions.add_session(addr, line_tx);

        // Writer task: drains this session's queue. Any failed write tears
        // the session down.
        let server_tx = self.server_tx.clone();
        tokio::spawn(async move {
            while let Some(line) = line_rx.recv().await {
                if let Err(e) = write_half.write_all(line.as_bytes()).await {
                    error!("Failed to write to session {}: {}", session_id, e);
                    break;
                }
            }
            let _ = server_tx.send(ServerMessage::Disconnected { session_id });
        });

        // Reader task: forwards inbound lines until EOF or a read failure.
        let server_tx = self.server_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if server_tx
                            .send(ServerMessage::LineReceived { session_id, line })
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Read error on session {}: {}", session_id, e);
                        break;
                    }
                }
            }
            let _ = server_tx.send(ServerMessage::Disconnected { session_id });
        });

        // Full snapshot: one add line per existing ball, establishing the
        // client's state before any incremental update reaches it.
        for ball in self.sim.world().balls() {
            self.sessions.send_to(session_id, &Event::added(ball).encode());
        }
    }

    /// Decodes and dispatches one inbound line. A malformed line is logged
    /// and dropped; it never ends the session.
    fn handle_line(&mut self, session_id: u32, line: &str) {
        match Command::parse(line) {
            Ok(command) => self.apply_command(session_id, command),
            Err(e) => {
                warn!(
                    "Ignoring malformed line from session {}: {:?} ({})",
                    session_id, line, e
                );
            }
        }
    }

    /// Applies one decoded command to the world or the driver.
    fn apply_command(&mut self, session_id: u32, command: Command) {
        match command {
            Command::Add {
                mass,
                radius,
                position,
                velocity,
            } => {
                let finite = mass.is_finite()
                    && radius.is_finite()
                    && position.x.is_finite()
                    && position.y.is_finite()
                    && velocity.x.is_finite()
                    && velocity.y.is_finite();
                // A non-finite position or velocity would poison every later
                // comparison, so the ball could never collide or clamp.
                if !finite || mass <= 0.0 || radius < 0.0 {
                    warn!(
                        "Rejecting ball from session {}: mass={} radius={} pos=({}, {}) vel=({}, {})",
                        session_id, mass, radius, position.x, position.y, velocity.x, velocity.y
                    );
                    return;
                }

                let id = self.sim.world_mut().add_ball(mass, radius, position, velocity);
                self.broadcast_event(&Event::Added {
                    id,
                    mass,
                    radius,
                    position,
                    velocity,
                });
            }

            Command::Remove { id } => {
                if self.sim.world_mut().remove_ball(id) {
                    self.broadcast_event(&Event::Removed { id });
                } else {
                    debug!(
                        "Session {} removed unknown ball {}, ignoring",
                        session_id, id
                    );
                }
            }

            Command::Scatter => {
                let mut rng = rand::thread_rng();
                self.sim.world_mut().scatter(&mut rng);
                info!("Scattered {} balls", self.sim.world().len());
            }

            Command::TogglePause => {
                let paused = self.sim.toggle_pause();
                info!("Simulation {}", if paused { "paused" } else { "resumed" });
            }

            Command::ZeroVelocities => {
                self.sim.world_mut().zero_velocities();
                info!("Zeroed all ball velocities");
            }

            Command::ToggleGravity => {
                let gravity = self.sim.world_mut().toggle_gravity();
                info!("Gravity set to {}", gravity);
            }

            Command::ToggleCollisions => {
                let enabled = self.sim.world_mut().toggle_collisions();
                info!(
                    "Collision detection {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }

            Command::ToggleRestitution => {
                let restitution = self.sim.world_mut().toggle_restitution();
                info!("Restitution set to {}", restitution);
            }
        }
    }

    /// Sends one line to every live session, removing dead sessions after
    /// the delivery pass completes.
    fn broadcast_line(&mut self, line: &str) {
        let dead = self.sessions.broadcast(line);
        for session_id in dead {
            self.sessions.remove_session(&session_id);
        }
    }

    fn broadcast_event(&mut self, event: &Event) {
        self.broadcast_line(&event.encode());
    }

    /// Broadcasts one update line per changed ball, consuming dirty flags.
    ///
    /// The read-and-clear scan runs even with zero sessions so each change
    /// is announced at most once per dirty transition.
    fn broadcast_updates(&mut self) {
        let mut lines = Vec::new();
        for ball in self.sim.world_mut().balls_mut() {
            if ball.take_dirty() {
                lines.push(Event::updated(ball).encode());
            }
        }

        for line in lines {
            self.broadcast_line(&line);
        }
    }

    /// Main server loop coordinating all operations.
    pub async fn run(&mut self) {
        self.spawn_acceptor();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Connected { stream, addr }) => {
                            self.handle_connected(stream, addr);
                        },
                        Some(ServerMessage::LineReceived { session_id, line }) => {
                            self.handle_line(session_id, &line);
                        },
                        Some(ServerMessage::Disconnected { session_id }) => {
                            self.sessions.remove_session(&session_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Advance the simulation and fan out changes. The dirty scan
                // runs at tick cadence even while paused so commands issued
                // during a pause (scatter, zero velocity) remain visible.
                _ = tick_interval.tick() => {
                    self.sim.step();
                    self.broadcast_updates();

                    let tick = self.sim.world().tick;
                    if tick > 0 && tick % 300 == 0 {
                        debug!(
                            "Tick {}: {} balls, {} sessions",
                            tick,
                            self.sim.world().len(),
                            self.sessions.len()
                        );
                    }
                },
            }
        }
    }
}
