//! One live connection: holds the registered identity and turns inbound
//! frames into coordinator calls.

use axum::extract::ws::Message;
use dispatch_core::geo::GeoPoint;
use dispatch_core::ride::{Actor, UserId};
use dispatch_core::{DispatchError, DispatchResult};
use uuid::Uuid;

use crate::connections::Outbound;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

pub struct Session {
    conn_id: Uuid,
    actor: Option<Actor>,
    outbound: Outbound,
}

impl Session {
    pub fn new(conn_id: Uuid, outbound: Outbound) -> Self {
        Self {
            conn_id,
            actor: None,
            outbound,
        }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.actor.as_ref().map(|actor| &actor.user_id)
    }

    /// Handle one text frame and queue exactly one reply.
    pub fn handle_text(&mut self, state: &AppState, text: &str) {
        let reply = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => {
                let request = message.kind();
                match self.dispatch(state, message) {
                    Ok(reply) => reply,
                    Err(err) => {
                        tracing::debug!(
                            conn_id = %self.conn_id,
                            request,
                            code = err.code(),
                            error = %err,
                            "request refused"
                        );
                        ServerMessage::error(Some(request), &err)
                    }
                }
            }
            Err(err) => ServerMessage::error(
                None,
                &DispatchError::invalid_input(format!("malformed frame: {err}")),
            ),
        };
        self.reply(&reply);
    }

    /// Drop the registry entry and take the driver out of matching.
    pub fn close(self, state: &AppState) {
        let Some(actor) = self.actor else {
            return;
        };
        Self::release(state, &actor.user_id, self.conn_id);
        tracing::info!(conn_id = %self.conn_id, user_id = %actor.user_id, "connection closed");
    }

    /// Unbind `user` from `conn_id`. Only the connection that still owns the
    /// entry takes the user offline.
    pub fn release(state: &AppState, user: &UserId, conn_id: Uuid) {
        if state.connections.unregister(user, conn_id) {
            state.coordinator.handle_disconnect(user);
        }
    }

    fn dispatch(&mut self, state: &AppState, message: ClientMessage) -> DispatchResult<ServerMessage> {
        let request = message.kind();
        let coordinator = &state.coordinator;

        let reply = match message {
            ClientMessage::Register { user_id, role } => {
                self.register(state, Actor::new(user_id, role))?
            }
            ClientMessage::GoOnline { location } => {
                ServerMessage::ack(request, coordinator.go_online(self.registered()?, location)?)
            }
            ClientMessage::GoOffline => {
                ServerMessage::ack(request, coordinator.go_offline(self.registered()?)?)
            }
            ClientMessage::LocationUpdate { lat, lng } => {
                coordinator.update_location(self.registered()?, GeoPoint { lat, lng })?;
                ServerMessage::ack(request, ())
            }
            ClientMessage::RequestRide(ride) => {
                ServerMessage::ack(request, coordinator.create_ride(self.registered()?, ride)?)
            }
            ClientMessage::AcceptRide { ride_id } => {
                ServerMessage::ack(request, coordinator.accept_ride(self.registered()?, ride_id)?)
            }
            ClientMessage::RejectRide { ride_id } => {
                coordinator.reject_ride(self.registered()?, ride_id)?;
                ServerMessage::ack(request, serde_json::json!({ "ride_id": ride_id }))
            }
            ClientMessage::CancelRide { ride_id } => {
                ServerMessage::ack(request, coordinator.cancel_ride(self.registered()?, ride_id)?)
            }
            ClientMessage::CompleteRide { ride_id } => {
                ServerMessage::ack(request, coordinator.complete_ride(self.registered()?, ride_id)?)
            }
            ClientMessage::SubmitPickupCode { ride_id, code } => ServerMessage::ack(
                request,
                coordinator.verify_pickup_code(self.registered()?, ride_id, &code)?,
            ),
            ClientMessage::ShareLocation { ride_id, lat, lng } => {
                coordinator.share_location(self.registered()?, ride_id, GeoPoint { lat, lng })?;
                ServerMessage::ack(request, ())
            }
            ClientMessage::PendingRides => ServerMessage::PendingRides {
                rides: serde_json::to_value(coordinator.pending_rides(self.registered()?)?)
                    .map_err(|err| DispatchError::Storage(err.to_string()))?,
            },
        };
        Ok(reply)
    }

    fn registered(&self) -> DispatchResult<&Actor> {
        self.actor
            .as_ref()
            .ok_or_else(|| DispatchError::not_authorized("register before sending requests"))
    }

    fn register(&mut self, state: &AppState, actor: Actor) -> DispatchResult<ServerMessage> {
        state.coordinator.register(&actor)?;
        if let Some(previous) = self.actor.take() {
            if previous.user_id != actor.user_id
                && state.connections.unregister(&previous.user_id, self.conn_id)
            {
                state.coordinator.handle_disconnect(&previous.user_id);
            }
        }
        let replaced = state.connections.register(
            actor.user_id.clone(),
            self.conn_id,
            self.outbound.clone(),
        );
        if let Some(replaced) = replaced {
            tracing::info!(user_id = %actor.user_id, %replaced, "newer connection took over");
        }
        tracing::info!(conn_id = %self.conn_id, user_id = %actor.user_id, role = %actor.role, "connection registered");

        let reply = ServerMessage::Registered {
            user_id: actor.user_id.clone(),
            role: actor.role,
        };
        self.actor = Some(actor);
        Ok(reply)
    }

    fn reply(&self, message: &ServerMessage) {
        match message.to_text() {
            Ok(text) => {
                if self.outbound.send(Message::Text(text)).is_err() {
                    tracing::debug!(conn_id = %self.conn_id, "writer closed before reply");
                }
            }
            Err(error) => tracing::error!(%error, "failed to serialize reply"),
        }
    }
}
