//! The hub: single control loop that owns all world mutation
//!
//! Connection tasks never touch the world directly. They forward decoded
//! events over a channel; the hub applies them one at a time between ticks,
//! runs the simulation step on a fixed interval and broadcasts the result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLock, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::intent::{self, Applied};
use super::registry::{Frame, Registry, SendFailure, SessionId};
use super::rules::GAME_EVENT_TARGET;
use super::snapshot::SnapshotBroadcaster;
use super::step;
use super::world::GameState;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ActionRequest, JoinRequest, ServerMsg};

/// Capacity of the inbound event queue shared by all connections
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Events forwarded from connection tasks into the hub
#[derive(Debug)]
pub enum HubEvent {
    /// A connection was accepted; frames for it go to `outbound`
    Connect {
        session: SessionId,
        outbound: mpsc::Sender<Frame>,
    },
    Join {
        session: SessionId,
        request: JoinRequest,
    },
    Action {
        session: SessionId,
        request: ActionRequest,
    },
    /// The connection's read loop ended
    Disconnect { session: SessionId },
}

/// The hub task has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("game hub is not running")]
pub struct HubClosed;

/// Point-in-time headline numbers for health reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSummary {
    pub players: usize,
    pub red_score: u32,
    pub blue_score: u32,
    pub game_ended: bool,
}

/// Cloneable handle used by connection tasks and HTTP handlers
#[derive(Clone)]
pub struct HubHandle {
    events_tx: mpsc::Sender<HubEvent>,
    world: Arc<RwLock<GameState>>,
    session_count: Arc<AtomicUsize>,
}

impl HubHandle {
    /// Queue an event for the hub, waiting if the queue is full
    pub async fn submit(&self, event: HubEvent) -> Result<(), HubClosed> {
        self.events_tx.send(event).await.map_err(|_| HubClosed)
    }

    /// Serialize the current world under the read lock
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        let world = self.world.read();
        serde_json::to_string(&*world)
    }

    pub fn summary(&self) -> HubSummary {
        let world = self.world.read();
        HubSummary {
            players: world.players.len(),
            red_score: world.scores.red,
            blue_score: world.scores.blue,
            game_ended: world.game_ended,
        }
    }

    pub fn session_count(&self) -> usize {
        self.session_count.load(Ordering::Relaxed)
    }
}

/// The authoritative game loop
pub struct GameHub {
    world: Arc<RwLock<GameState>>,
    registry: Registry,
    broadcaster: SnapshotBroadcaster,
    events_rx: mpsc::Receiver<HubEvent>,
    session_count: Arc<AtomicUsize>,
    tick_interval: Duration,
}

impl GameHub {
    /// Create a hub with a fresh world starting now
    pub fn new(tick_interval: Duration) -> (Self, HubHandle) {
        Self::with_world(GameState::new(unix_millis()), tick_interval)
    }

    pub fn with_world(world: GameState, tick_interval: Duration) -> (Self, HubHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let world = Arc::new(RwLock::new(world));
        let session_count = Arc::new(AtomicUsize::new(0));

        let handle = HubHandle {
            events_tx,
            world: world.clone(),
            session_count: session_count.clone(),
        };

        let hub = Self {
            world,
            registry: Registry::new(),
            broadcaster: SnapshotBroadcaster::new(),
            events_rx,
            session_count,
            tick_interval,
        };

        (hub, handle)
    }

    /// Run until every handle has been dropped
    pub async fn run(mut self) {
        info!(tick_ms = self.tick_interval.as_millis() as u64, "Game hub started");

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event, unix_millis()),
                    None => break,
                },
                _ = ticker.tick() => {
                    // Intents received before this tick apply before it runs
                    while let Ok(event) = self.events_rx.try_recv() {
                        self.handle_event(event, unix_millis());
                    }
                    self.tick(unix_millis());
                }
            }
        }

        let stats = self.broadcaster.stats();
        info!(
            snapshots = stats.total_snapshots,
            bytes = stats.total_bytes,
            avg_sessions = stats.avg_sessions_per_snapshot,
            "Game hub stopped"
        );
    }

    /// Apply one inbound event
    pub fn handle_event(&mut self, event: HubEvent, now: u64) {
        match event {
            HubEvent::Connect { session, outbound } => self.handle_connect(session, outbound),
            HubEvent::Join { session, request } => self.handle_join(session, request, now),
            HubEvent::Action { session, request } => self.handle_action(session, request, now),
            HubEvent::Disconnect { session } => self.teardown(session, now),
        }
    }

    /// Run the simulation step and broadcast the result
    pub fn tick(&mut self, now: u64) {
        let mut world = self.world.write();
        step::run_tick(&mut world, now);

        // Readers may serialize concurrently with the broadcast
        let world = RwLockWriteGuard::downgrade(world);
        let closed = self.broadcaster.broadcast(&world, &self.registry);
        drop(world);

        for session in closed {
            debug!(session_id = %session, "Snapshot delivery failed, disconnecting");
            self.teardown(session, now);
        }
    }

    /// Nothing is sent until the session joins or the next broadcast
    fn handle_connect(&mut self, session: SessionId, outbound: mpsc::Sender<Frame>) {
        self.registry.register(session, outbound);
        self.sync_session_count();
        info!(session_id = %session, sessions = self.registry.len(), "Session connected");
    }

    fn handle_join(&mut self, session: SessionId, request: JoinRequest, now: u64) {
        let JoinRequest { id, team, name } = request;
        let mut world = self.world.write();
        let result = self
            .registry
            .join(&mut world, session, id.clone(), team, name.clone(), now);

        match result {
            Ok(()) => {
                let delivered = SnapshotBroadcaster::send_state(&world, &self.registry, &session);
                drop(world);
                if delivered == Err(SendFailure::Closed) {
                    self.teardown(session, now);
                }
            }
            Err(e) => {
                drop(world);
                info!(
                    target: GAME_EVENT_TARGET,
                    event = "player_join_failed",
                    player_id = %id,
                    team = %team,
                    name = %name,
                    reason = %e,
                );
                let msg = ServerMsg::Error {
                    message: e.to_string(),
                };
                self.send_msg(session, &msg, now);
            }
        }
    }

    fn handle_action(&mut self, session: SessionId, request: ActionRequest, now: u64) {
        let Some(bound) = self.registry.player_for(&session) else {
            debug!(session_id = %session, "Action before join, ignoring");
            return;
        };
        if *bound != request.player_id {
            warn!(
                session_id = %session,
                bound_player = %bound,
                claimed_player = %request.player_id,
                "Action for another player, ignoring"
            );
            return;
        }

        let kind = request.action.kind();
        let result = {
            let mut world = self.world.write();
            intent::apply(&mut world, &request.player_id, request.action, now)
        };

        match result {
            Ok(Applied::Attacked(Some(hit))) => {
                debug!(
                    attacker = %hit.attacker_id,
                    target = %hit.target_id,
                    distance = hit.distance_sq.sqrt(),
                    dropped_flag = ?hit.dropped_flag,
                    "Attack landed"
                );
            }
            Ok(_) => {}
            Err(rejection) => {
                debug!(
                    player_id = %request.player_id,
                    intent = kind,
                    reason = %rejection,
                    "Intent rejected"
                );
                if rejection.notifies_client() {
                    let msg = ServerMsg::Error {
                        message: rejection.to_string(),
                    };
                    self.send_msg(session, &msg, now);
                }
            }
        }
    }

    /// Remove a session and its player. Safe to call more than once.
    fn teardown(&mut self, session: SessionId, now: u64) {
        let departure = {
            let mut world = self.world.write();
            self.registry.unregister(&mut world, session, now)
        };
        let Some(departure) = departure else {
            return;
        };
        self.sync_session_count();
        match departure.player {
            Some(player) => info!(
                session_id = %session,
                player_id = %player.id,
                name = %player.name,
                sessions = self.registry.len(),
                "Session closed"
            ),
            None => info!(session_id = %session, sessions = self.registry.len(), "Session closed"),
        }
    }

    fn send_msg(&mut self, session: SessionId, msg: &ServerMsg, now: u64) {
        let Some(frame) = SnapshotBroadcaster::encode_msg(msg) else {
            return;
        };
        match self.registry.send_to(&session, frame) {
            Ok(()) => {}
            Err(SendFailure::Lagging) => {
                warn!(session_id = %session, "Client lagging, dropping message");
            }
            Err(SendFailure::Closed) => self.teardown(session, now),
        }
    }

    fn sync_session_count(&self) {
        self.session_count
            .store(self.registry.len(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Intent, Team};
    use tokio_test::assert_ok;
    use uuid::Uuid;

    const NOW: u64 = 1_000_000;

    fn hub() -> (GameHub, HubHandle) {
        GameHub::with_world(GameState::new(NOW), Duration::from_millis(16))
    }

    fn connect(hub: &mut GameHub) -> (SessionId, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(64);
        let session = Uuid::new_v4();
        hub.handle_event(
            HubEvent::Connect {
                session,
                outbound: tx,
            },
            NOW,
        );
        (session, rx)
    }

    fn join(hub: &mut GameHub, session: SessionId, id: &str, team: Team, name: &str) {
        hub.handle_event(
            HubEvent::Join {
                session,
                request: JoinRequest {
                    id: id.into(),
                    team,
                    name: name.into(),
                },
            },
            NOW,
        );
    }

    fn act(hub: &mut GameHub, session: SessionId, id: &str, action: Intent) {
        hub.handle_event(
            HubEvent::Action {
                session,
                request: ActionRequest {
                    player_id: id.into(),
                    action,
                },
            },
            NOW,
        );
    }

    fn next_json(rx: &mut mpsc::Receiver<Frame>) -> serde_json::Value {
        let frame = rx.try_recv().expect("expected a queued frame");
        serde_json::from_str(&frame).unwrap()
    }

    async fn recv_json(rx: &mut mpsc::Receiver<Frame>) -> serde_json::Value {
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("hub should keep sending")
            .expect("channel open");
        serde_json::from_str(&frame).unwrap()
    }

    #[test]
    fn connect_is_silent_and_join_sends_state_to_joiner() {
        let (mut hub, handle) = hub();
        let (session, mut rx) = connect(&mut hub);
        assert_eq!(handle.session_count(), 1);
        assert!(rx.try_recv().is_err());

        join(&mut hub, session, "p1", Team::Red, "Ann");

        // The first frame a client sees is already state-shaped
        let state = next_json(&mut rx);
        assert!(state.get("type").is_none());
        assert_eq!(state["players"]["p1"]["name"], "Ann");
        assert_eq!(handle.summary().players, 1);
    }

    #[test]
    fn second_join_with_same_name_gets_error_only() {
        let (mut hub, handle) = hub();
        let (first, mut rx1) = connect(&mut hub);
        let (second, mut rx2) = connect(&mut hub);

        join(&mut hub, first, "p1", Team::Red, "Ann");
        join(&mut hub, second, "p2", Team::Blue, "Ann");

        let err = next_json(&mut rx2);
        assert_eq!(err["type"], "error");
        assert_eq!(err["data"]["message"], "Player name 'Ann' is already taken");
        // Only the joiner was sent anything
        next_json(&mut rx1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(handle.summary().players, 1);
    }

    #[test]
    fn blocked_move_is_reported_to_submitter() {
        let (mut hub, _handle) = hub();
        let (session, mut rx) = connect(&mut hub);
        join(&mut hub, session, "p1", Team::Red, "Ann");
        next_json(&mut rx);

        act(&mut hub, session, "p1", Intent::Move { x: 400.0, y: 300.0 });

        let err = next_json(&mut rx);
        assert_eq!(err["data"]["message"], "Cannot move to target: position blocked by wall");
        let world = hub.world.read();
        assert_eq!((world.players["p1"].x, world.players["p1"].y), (50.0, 300.0));
    }

    #[test]
    fn actions_only_drive_the_sessions_own_player() {
        let (mut hub, _handle) = hub();
        let (a, _rx_a) = connect(&mut hub);
        let (b, _rx_b) = connect(&mut hub);
        join(&mut hub, a, "pa", Team::Red, "Ann");
        join(&mut hub, b, "pb", Team::Blue, "Bob");

        act(&mut hub, b, "pa", Intent::Move { x: 60.0, y: 300.0 });
        assert!(!hub.world.read().players["pa"].is_moving);

        act(&mut hub, a, "pa", Intent::Move { x: 60.0, y: 300.0 });
        assert!(hub.world.read().players["pa"].is_moving);
    }

    #[test]
    fn tick_broadcasts_to_all_and_drops_dead_writers() {
        let (mut hub, handle) = hub();
        let (a, mut rx_a) = connect(&mut hub);
        let (b, rx_b) = connect(&mut hub);
        join(&mut hub, b, "pb", Team::Blue, "Bob");
        assert!(rx_a.try_recv().is_err());
        drop(rx_b);

        hub.tick(NOW + 16);

        assert_eq!(next_json(&mut rx_a)["gameTime"], NOW + 16);
        assert_eq!(handle.session_count(), 1);
        assert_eq!(handle.summary().players, 0);
        assert!(hub.registry.session_ids().eq([&a]));
    }

    #[test]
    fn disconnect_is_idempotent_and_frees_name() {
        let (mut hub, handle) = hub();
        let (session, _rx) = connect(&mut hub);
        join(&mut hub, session, "p1", Team::Red, "Ann");

        hub.handle_event(HubEvent::Disconnect { session }, NOW);
        hub.handle_event(HubEvent::Disconnect { session }, NOW);

        assert_eq!(handle.session_count(), 0);
        assert_eq!(handle.summary().players, 0);
        let (again, _rx2) = connect(&mut hub);
        join(&mut hub, again, "p2", Team::Blue, "Ann");
        assert_eq!(handle.summary().players, 1);
    }

    #[tokio::test]
    async fn queued_intents_apply_before_first_tick() {
        let (hub, handle) = GameHub::new(Duration::from_millis(5));
        let (tx, mut rx) = mpsc::channel(256);
        let session = Uuid::new_v4();

        // Everything is queued before the loop starts, so the first tick must drain it all
        assert_ok!(
            handle
                .submit(HubEvent::Connect {
                    session,
                    outbound: tx,
                })
                .await
        );
        assert_ok!(
            handle
                .submit(HubEvent::Join {
                    session,
                    request: JoinRequest {
                        id: "p1".into(),
                        team: Team::Red,
                        name: "Ann".into(),
                    },
                })
                .await
        );
        assert_ok!(
            handle
                .submit(HubEvent::Action {
                    session,
                    request: ActionRequest {
                        player_id: "p1".into(),
                        action: Intent::Move { x: 200.0, y: 300.0 },
                    },
                })
                .await
        );

        let task = tokio::spawn(hub.run());

        let joined = recv_json(&mut rx).await;
        assert_eq!(joined["players"]["p1"]["isMoving"], false);
        assert_eq!(joined["players"]["p1"]["x"], 50.0);

        let first_tick = recv_json(&mut rx).await;
        assert_eq!(first_tick["players"]["p1"]["isMoving"], true);
        assert_eq!(first_tick["players"]["p1"]["x"], 55.0);

        drop(handle);
        task.abort();
    }

    #[tokio::test]
    async fn running_hub_streams_snapshots() {
        let (hub, handle) = GameHub::new(Duration::from_millis(5));
        let task = tokio::spawn(hub.run());

        let (tx, mut rx) = mpsc::channel(256);
        let session = Uuid::new_v4();
        assert_ok!(
            handle
                .submit(HubEvent::Connect {
                    session,
                    outbound: tx,
                })
                .await
        );
        assert_ok!(
            handle
                .submit(HubEvent::Join {
                    session,
                    request: JoinRequest {
                        id: "p1".into(),
                        team: Team::Blue,
                        name: "Bea".into(),
                    },
                })
                .await
        );

        let mut saw_player = false;
        for _ in 0..20 {
            let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("hub should keep sending")
                .expect("channel open");
            let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
            if json["players"]["p1"]["team"] == "blue" {
                saw_player = true;
                break;
            }
        }
        assert!(saw_player);

        let snapshot: serde_json::Value =
            serde_json::from_str(&handle.snapshot_json().unwrap()).unwrap();
        assert_eq!(snapshot["players"]["p1"]["name"], "Bea");

        assert_ok!(handle.submit(HubEvent::Disconnect { session }).await);
        drop(handle);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("hub stops once handles are gone")
            .unwrap();
    }
}
