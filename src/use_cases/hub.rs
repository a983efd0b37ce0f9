// Hub: single point of serialization for one game's room. Everything that
// touches room state runs inside `Hub::run`'s dispatcher loop; no lock is
// ever held across an await point because nothing outside this loop ever
// touches `members`, `next_num`, or `replay`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::domain::{now_ms, ClientId, Envelope};
use crate::use_cases::registry::Registry;
use crate::use_cases::types::{AddOutcome, HubCommand, HubHandle};

struct Member {
    outbound_tx: mpsc::Sender<Envelope>,
    token: u64,
    replaced_signal: Arc<Notify>,
}

pub struct Hub {
    game_id: String,
    members: HashMap<ClientId, Member>,
    next_num: u64,
    next_token: u64,
    replay: VecDeque<Envelope>,
    replay_cap: usize,
    input_rx: mpsc::Receiver<HubCommand>,
    active_connections: Arc<AtomicUsize>,
    registry: Arc<Registry>,
}

impl Hub {
    /// Spawns the dispatcher task and returns the handle the directory keeps.
    /// `registry` lets the hub remove its own directory entry the instant its
    /// member set empties, so `Registry::get_or_create` can never hand out a
    /// handle to a hub that already exited.
    pub fn spawn(
        game_id: String,
        input_capacity: usize,
        replay_cap: usize,
        registry: Arc<Registry>,
    ) -> HubHandle {
        let (input_tx, input_rx) = mpsc::channel(input_capacity);
        let active_connections = Arc::new(AtomicUsize::new(0));
        let hub = Hub {
            game_id,
            members: HashMap::new(),
            next_num: 0,
            next_token: 0,
            replay: VecDeque::with_capacity(replay_cap.min(1024)),
            replay_cap,
            input_rx,
            active_connections: active_connections.clone(),
            registry,
        };
        tokio::spawn(hub.run());
        HubHandle {
            input_tx,
            active_connections,
        }
    }

    async fn run(mut self) {
        info!(game_id = %self.game_id, "hub started");
        while let Some(cmd) = self.input_rx.recv().await {
            match cmd {
                HubCommand::Add {
                    client_id,
                    lastnum,
                    outbound_tx,
                    reply_tx,
                } => self.handle_add(client_id, lastnum, outbound_tx, reply_tx).await,
                HubCommand::Stop { client_id, token } => self.handle_stop(client_id, token),
                HubCommand::Message {
                    client_id,
                    token,
                    body,
                } => self.handle_message(client_id, token, body),
            }
            if self.members.is_empty() {
                self.registry.reap(&self.game_id, &self.active_connections).await;
                break;
            }
        }
        info!(game_id = %self.game_id, "hub idle, exiting");
    }

    fn allocate_num(&mut self) -> u64 {
        let num = self.next_num;
        self.next_num += 1;
        num
    }

    fn allocate_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    /// Delivers `env` to every member named in `env.to` that is still
    /// present, and retains it for replay. Delivery is best-effort: a full
    /// or closed outbound queue marks that member for eviction so one slow
    /// client never stalls the room.
    fn emit(&mut self, env: Envelope) {
        let mut stale = Vec::new();
        for rid in &env.to {
            if let Some(m) = self.members.get(rid) {
                if m.outbound_tx.try_send(env.clone()).is_err() {
                    stale.push(rid.clone());
                }
            }
        }
        self.retain(env);
        for rid in stale {
            warn!(game_id = %self.game_id, client_id = %rid, "outbound queue saturated, evicting");
            self.evict(rid);
        }
    }

    fn retain(&mut self, env: Envelope) {
        self.replay.push_back(env);
        while self.replay.len() > self.replay_cap {
            self.replay.pop_front();
        }
    }

    fn replay_for(&self, client_id: &ClientId, lastnum: u64) -> Result<Vec<Envelope>, ()> {
        let earliest = self.replay.front().map(|e| e.num);
        let replayable = match earliest {
            Some(e) => lastnum.saturating_add(1) >= e,
            None => lastnum.saturating_add(1) >= self.next_num,
        };
        if !replayable {
            return Err(());
        }
        Ok(self
            .replay
            .iter()
            .filter(|e| e.num > lastnum && e.to.contains(client_id))
            .cloned()
            .collect())
    }

    async fn handle_add(
        &mut self,
        client_id: ClientId,
        lastnum: Option<u64>,
        outbound_tx: mpsc::Sender<Envelope>,
        reply_tx: tokio::sync::oneshot::Sender<AddOutcome>,
    ) {
        if let Some(n) = lastnum {
            match self.replay_for(&client_id, n) {
                Ok(envs) => {
                    // `try_send`, never an awaited send: the new connection's
                    // read loop hasn't started draining this channel yet (it
                    // only starts after `reply_tx` fires below), so an
                    // awaited send here would block the dispatcher forever
                    // once replay outgrows the fresh channel's capacity.
                    let total = envs.len();
                    for (delivered, e) in envs.into_iter().enumerate() {
                        if outbound_tx.try_send(e).is_err() {
                            warn!(
                                game_id = %self.game_id,
                                client_id = %client_id,
                                delivered,
                                total,
                                "replay exceeds fresh outbound queue capacity, truncating"
                            );
                            break;
                        }
                    }
                }
                Err(()) => {
                    debug!(game_id = %self.game_id, client_id = %client_id, lastnum = n, "lastnum predates replay window");
                    let _ = reply_tx.send(AddOutcome::RejectedLastNum);
                    return;
                }
            }
        }

        let is_reconnect = self.members.contains_key(&client_id);
        if let Some(old) = self.members.get(&client_id) {
            old.replaced_signal.notify_waiters();
        }

        let existing_members: Vec<ClientId> = self
            .members
            .keys()
            .filter(|k| **k != client_id)
            .cloned()
            .collect();

        let token = self.allocate_token();
        let replaced_signal = Arc::new(Notify::new());
        self.members.insert(
            client_id.clone(),
            Member {
                outbound_tx,
                token,
                replaced_signal: replaced_signal.clone(),
            },
        );

        if !is_reconnect && !existing_members.is_empty() {
            let num = self.allocate_num();
            let joiner = Envelope::joiner(client_id.clone(), existing_members.clone(), num, now_ms());
            self.emit(joiner);
        }

        let num = self.allocate_num();
        let welcome = Envelope::welcome(existing_members, client_id.clone(), num, now_ms());
        self.emit(welcome);

        info!(game_id = %self.game_id, client_id = %client_id, reconnect = is_reconnect, "admitted");
        let _ = reply_tx.send(AddOutcome::Admitted { token, replaced_signal });
    }

    fn handle_stop(&mut self, client_id: ClientId, token: u64) {
        match self.members.get(&client_id) {
            Some(m) if m.token == token => {}
            _ => return,
        }
        self.evict(client_id);
    }

    fn evict(&mut self, client_id: ClientId) {
        if self.members.remove(&client_id).is_none() {
            return;
        }
        let survivors: Vec<ClientId> = self.members.keys().cloned().collect();
        if !survivors.is_empty() {
            let num = self.allocate_num();
            let leaver = Envelope::leaver(client_id.clone(), survivors, num, now_ms());
            self.emit(leaver);
        }
        info!(game_id = %self.game_id, client_id = %client_id, "left");
    }

    fn handle_message(&mut self, client_id: ClientId, token: u64, body: Vec<u8>) {
        match self.members.get(&client_id) {
            Some(m) if m.token == token => {}
            _ => return,
        }
        let num = self.allocate_num();
        let time_ms = now_ms();
        let others: Vec<ClientId> = self
            .members
            .keys()
            .filter(|k| **k != client_id)
            .cloned()
            .collect();

        let receipt = Envelope::receipt(client_id.clone(), num, time_ms, body.clone());
        self.emit(receipt);

        if !others.is_empty() {
            let peer = Envelope::peer(client_id, others, num, time_ms, body);
            self.emit(peer);
        }
    }
}
