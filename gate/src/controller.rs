//! Gate controller: the session state machine.
//!
//! The controller never performs I/O or waits on timers. A driver (see
//! [`GateRunner`](crate::GateRunner)) performs capability calls and feeds
//! the results back through the transition functions below; each one
//! returns a [`Decision`] telling the driver what to do next. This keeps the
//! state machine callable from tests without any runtime.
//!
//! Phases move forward only:
//!
//! ```text
//! AwaitingNetwork ──► NetworkBlocked ──(explicit re-check)──► AwaitingNetwork
//!        │
//!        ▼
//! AwaitingLocation ──► LocationBlocked ──(next tick)──► AwaitingLocation
//!        │
//!        ▼
//!      Ready
//! ```

use geogate_geofence::{FenceDecision, GeofenceConfig, LocationError};
use geogate_network::{classify, NetworkError};
use geogate_types::classification::NO_INTERNET_MESSAGE;
use geogate_types::{ConnectivitySnapshot, Coordinate, NetworkClassification, SessionToken};

use crate::config::{GateConfig, OutsidePolicy};
use crate::event::{Advisory, CapabilityKind, GateEvent};
use crate::state::{GatePhase, GateState};
use crate::GateError;

/// What the driver should do after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Request one connectivity snapshot.
    CheckNetwork,
    /// Network blocked. Do nothing until an explicit re-check.
    NetworkBlocked { message: &'static str },
    /// Network passed; start the recurring location poll.
    StartLocationPoll,
    /// A poll tick is due: request permission and position now.
    PollLocation,
    /// Wait for the next poll tick.
    KeepPolling,
    /// Gate open. Stop polling and hand off to verification.
    Advance,
    /// The callback did not belong to the active session, or arrived in a
    /// phase that no longer accepts it. Nothing changed.
    Stale,
}

/// Owns the active [`GateState`] and every transition applied to it.
pub struct GateController {
    fence: GeofenceConfig,
    outside_policy: OutsidePolicy,
    next_token: SessionToken,
    session: Option<GateState>,
    /// Pending events for the driver to publish.
    pending_events: Vec<GateEvent>,
}

impl GateController {
    /// Build a controller. Fails with [`GateError::InvalidConfiguration`]
    /// before any session can exist.
    pub fn new(config: &GateConfig) -> Result<Self, GateError> {
        let fence = config.validate()?;
        Ok(Self {
            fence,
            outside_policy: config.polling.outside_policy,
            next_token: SessionToken::new(1),
            session: None,
            pending_events: Vec::new(),
        })
    }

    /// The active session's state, if any.
    pub fn state(&self) -> Option<&GateState> {
        self.session.as_ref()
    }

    pub fn active_session(&self) -> Option<SessionToken> {
        self.session.as_ref().map(|s| s.session)
    }

    /// Take all events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<GateEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Enter the gate sequence. Any active session is superseded and its
    /// callbacks become stale.
    pub fn begin_session(&mut self) -> (SessionToken, Decision) {
        if let Some(previous) = self.session.take() {
            tracing::info!(
                session = %previous.session,
                phase = %previous.phase,
                "superseding active gate session"
            );
        }
        let token = self.next_token;
        self.next_token = token.next();
        self.session = Some(GateState::new(token));
        self.pending_events.push(GateEvent::PhaseChanged {
            session: token,
            phase: GatePhase::AwaitingNetwork,
        });
        tracing::info!(session = %token, "gate session started");
        (token, Decision::CheckNetwork)
    }

    /// Apply the result of a connectivity fetch.
    ///
    /// A failed fetch counts as [`NetworkClassification::None`] for this
    /// cycle and is additionally surfaced as an advisory.
    pub fn on_network_snapshot(
        &mut self,
        token: SessionToken,
        result: Result<ConnectivitySnapshot, NetworkError>,
    ) -> Decision {
        let events = &mut self.pending_events;
        let Some(state) = active(&mut self.session, token) else {
            tracing::debug!(session = %token, "dropping stale network snapshot");
            return Decision::Stale;
        };
        if state.phase != GatePhase::AwaitingNetwork {
            tracing::debug!(session = %token, phase = %state.phase, "snapshot outside network phase");
            return Decision::Stale;
        }
        state.poll_attempt += 1;

        let classification = match result {
            Ok(snapshot) => classify(&snapshot),
            Err(e) => {
                tracing::warn!(session = %token, "network capability failed: {e}");
                events.push(GateEvent::Advisory {
                    session: token,
                    advisory: Advisory::CapabilityUnavailable {
                        capability: CapabilityKind::Network,
                        reason: e.to_string(),
                    },
                });
                NetworkClassification::None
            }
        };
        state.last_classification = Some(classification);
        events.push(GateEvent::NetworkClassified {
            session: token,
            classification,
        });

        if classification.permits_advance() {
            enter(state, GatePhase::AwaitingLocation, events);
            tracing::info!(session = %token, "network gate passed");
            return Decision::StartLocationPoll;
        }

        let message = classification.block_message().unwrap_or(NO_INTERNET_MESSAGE);
        state.block_message = Some(message.to_string());
        enter(state, GatePhase::NetworkBlocked, events);
        events.push(GateEvent::NetworkBlocked {
            session: token,
            classification,
            message: message.to_string(),
        });
        tracing::info!(session = %token, %classification, "network gate blocked");
        Decision::NetworkBlocked { message }
    }

    /// Operator-requested re-check after a network block. The only way
    /// out of [`GatePhase::NetworkBlocked`].
    pub fn recheck_network(&mut self, token: SessionToken) -> Result<Decision, GateError> {
        let events = &mut self.pending_events;
        let state = match &mut self.session {
            Some(state) if state.session == token => state,
            Some(_) => return Err(GateError::StaleSession(token)),
            None => return Err(GateError::NoActiveSession),
        };
        if state.phase != GatePhase::NetworkBlocked {
            return Err(GateError::InvalidPhase {
                phase: state.phase,
                operation: "re-check the network",
            });
        }
        state.block_message = None;
        enter(state, GatePhase::AwaitingNetwork, events);
        tracing::info!(session = %token, "network re-check requested");
        Ok(Decision::CheckNetwork)
    }

    /// A location poll tick fired.
    pub fn on_location_tick(&mut self, token: SessionToken) -> Decision {
        let events = &mut self.pending_events;
        let Some(state) = active(&mut self.session, token) else {
            return Decision::Stale;
        };
        match state.phase {
            GatePhase::AwaitingLocation => Decision::PollLocation,
            GatePhase::LocationBlocked => {
                enter(state, GatePhase::AwaitingLocation, events);
                Decision::PollLocation
            }
            _ => Decision::Stale,
        }
    }

    /// Apply the result of one location poll cycle.
    pub fn on_position(
        &mut self,
        token: SessionToken,
        result: Result<Coordinate, LocationError>,
    ) -> Decision {
        let fence = self.fence;
        let outside_policy = self.outside_policy;
        let events = &mut self.pending_events;
        let Some(state) = active(&mut self.session, token) else {
            tracing::debug!(session = %token, "dropping stale position");
            return Decision::Stale;
        };
        if state.phase != GatePhase::AwaitingLocation {
            tracing::debug!(session = %token, phase = %state.phase, "position outside location phase");
            return Decision::Stale;
        }
        state.poll_attempt += 1;

        let position = match result.and_then(|p| {
            p.validate()
                .map(|_| p)
                .map_err(|e| LocationError::PositionUnavailable(e.to_string()))
        }) {
            Ok(position) => position,
            Err(LocationError::PermissionDenied) => {
                tracing::warn!(session = %token, "location permission denied");
                raise(state, Advisory::PermissionDenied, events);
                return Decision::KeepPolling;
            }
            Err(e) => {
                tracing::warn!(session = %token, "location capability failed: {e}");
                raise(
                    state,
                    Advisory::CapabilityUnavailable {
                        capability: CapabilityKind::Location,
                        reason: e.to_string(),
                    },
                    events,
                );
                return Decision::KeepPolling;
            }
        };

        state.advisory = None;
        let (distance_km, decision) = fence.locate(&position);
        state.last_position = Some(position);
        state.last_distance_km = Some(distance_km);
        events.push(GateEvent::PositionUpdated {
            session: token,
            position,
            distance_km,
        });

        match decision {
            FenceDecision::Inside => {
                enter(state, GatePhase::Ready, events);
                events.push(GateEvent::Ready { session: token });
                tracing::info!(session = %token, distance_km, "inside geofence, gate open");
                Decision::Advance
            }
            FenceDecision::Outside => {
                events.push(GateEvent::LocationOutOfRange {
                    session: token,
                    distance_km,
                });
                tracing::info!(
                    session = %token,
                    distance_km,
                    radius_km = fence.radius_km(),
                    "outside geofence"
                );
                if outside_policy == OutsidePolicy::Block {
                    enter(state, GatePhase::LocationBlocked, events);
                }
                Decision::KeepPolling
            }
        }
    }

    /// Leave the gate sequence. Returns `false` when `token` was not active.
    pub fn abandon(&mut self, token: SessionToken) -> bool {
        if self.active_session() != Some(token) {
            return false;
        }
        self.session = None;
        tracing::info!(session = %token, "gate session abandoned");
        true
    }

    /// Hand a `Ready` session off to verification, destroying its state.
    pub fn complete(&mut self, token: SessionToken) -> Result<SessionToken, GateError> {
        let state = match &self.session {
            Some(state) if state.session == token => state,
            Some(_) => return Err(GateError::StaleSession(token)),
            None => return Err(GateError::NoActiveSession),
        };
        if state.phase != GatePhase::Ready {
            return Err(GateError::InvalidPhase {
                phase: state.phase,
                operation: "hand off to verification",
            });
        }
        self.session = None;
        tracing::info!(session = %token, "gate session handed off");
        Ok(token)
    }
}

fn active(session: &mut Option<GateState>, token: SessionToken) -> Option<&mut GateState> {
    session.as_mut().filter(|s| s.session == token)
}

fn enter(state: &mut GateState, next: GatePhase, events: &mut Vec<GateEvent>) {
    debug_assert!(
        state.phase.can_transition_to(next),
        "illegal gate transition {} -> {}",
        state.phase,
        next
    );
    state.phase = next;
    events.push(GateEvent::PhaseChanged {
        session: state.session,
        phase: next,
    });
}

/// Record an advisory. The event fires only when the advisory changes, so a
/// persistent condition is not re-announced every poll.
fn raise(state: &mut GateState, advisory: Advisory, events: &mut Vec<GateEvent>) {
    if state.advisory.as_ref() == Some(&advisory) {
        return;
    }
    state.advisory = Some(advisory.clone());
    events.push(GateEvent::Advisory {
        session: state.session,
        advisory,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use geogate_types::Transport;

    fn controller() -> GateController {
        GateController::new(&GateConfig::default()).unwrap()
    }

    fn center() -> Coordinate {
        let s = GateConfig::default().geofence;
        Coordinate::new(s.latitude, s.longitude).unwrap()
    }

    /// A point `km` due north of the default center.
    fn north_of_center(km: f64) -> Coordinate {
        let c = center();
        let degrees = km / (geogate_geofence::EARTH_RADIUS_KM * std::f64::consts::PI / 180.0);
        Coordinate::new(c.latitude + degrees, c.longitude).unwrap()
    }

    fn phases(events: &[GateEvent]) -> Vec<GatePhase> {
        events
            .iter()
            .filter_map(|e| match e {
                GateEvent::PhaseChanged { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect()
    }

    fn to_location_phase(c: &mut GateController) -> SessionToken {
        let (token, _) = c.begin_session();
        let d = c.on_network_snapshot(token, Ok(ConnectivitySnapshot::online(Transport::Wifi)));
        assert_eq!(d, Decision::StartLocationPoll);
        c.drain_events();
        token
    }

    #[test]
    fn rejects_invalid_radius_at_construction() {
        let mut config = GateConfig::default();
        config.geofence.radius_km = -1.0;
        assert!(matches!(
            GateController::new(&config),
            Err(GateError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn session_starts_awaiting_network() {
        let mut c = controller();
        let (token, decision) = c.begin_session();
        assert_eq!(decision, Decision::CheckNetwork);
        assert_eq!(c.state().unwrap().phase, GatePhase::AwaitingNetwork);
        assert_eq!(phases(&c.drain_events()), vec![GatePhase::AwaitingNetwork]);
        assert_eq!(c.active_session(), Some(token));
    }

    #[test]
    fn unreachable_blocks_with_internet_message() {
        let mut c = controller();
        let (token, _) = c.begin_session();
        let d = c.on_network_snapshot(token, Ok(ConnectivitySnapshot::offline()));
        assert_eq!(
            d,
            Decision::NetworkBlocked {
                message: "Check your internet connection"
            }
        );
        let state = c.state().unwrap();
        assert_eq!(state.phase, GatePhase::NetworkBlocked);
        assert_eq!(state.last_classification, Some(NetworkClassification::None));
        assert_eq!(
            state.block_message.as_deref(),
            Some("Check your internet connection")
        );
    }

    #[test]
    fn vpn_blocks_with_vpn_message() {
        let mut c = controller();
        let (token, _) = c.begin_session();
        let d = c.on_network_snapshot(
            token,
            Ok(ConnectivitySnapshot::new(Some(true), Transport::Vpn, true)),
        );
        assert_eq!(
            d,
            Decision::NetworkBlocked {
                message: "Please turn off your VPN"
            }
        );
        assert_eq!(
            c.state().unwrap().last_classification,
            Some(NetworkClassification::Vpn)
        );
    }

    #[test]
    fn both_is_blocked_like_vpn() {
        let mut c = controller();
        let (token, _) = c.begin_session();
        let d = c.on_network_snapshot(
            token,
            Ok(ConnectivitySnapshot::new(Some(true), Transport::Wifi, true)),
        );
        assert_eq!(
            d,
            Decision::NetworkBlocked {
                message: "Please turn off your VPN"
            }
        );
        let events = c.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GateEvent::NetworkBlocked {
                classification: NetworkClassification::Both,
                ..
            }
        )));
    }

    #[test]
    fn only_internet_advances_and_every_block_has_a_message() {
        for transport in [
            Transport::Wifi,
            Transport::Cellular,
            Transport::Vpn,
            Transport::Other,
            Transport::None,
        ] {
            for reachable in [None, Some(true), Some(false)] {
                for vpn in [false, true] {
                    let snapshot = ConnectivitySnapshot::new(reachable, transport, vpn);
                    let mut c = controller();
                    let (token, _) = c.begin_session();
                    let d = c.on_network_snapshot(token, Ok(snapshot));
                    let state = c.state().unwrap();
                    if classify(&snapshot).permits_advance() {
                        assert_eq!(d, Decision::StartLocationPoll);
                        assert!(state.block_message.is_none());
                    } else {
                        assert!(matches!(d, Decision::NetworkBlocked { .. }));
                        assert_eq!(state.phase, GatePhase::NetworkBlocked);
                        assert!(state.block_message.is_some());
                    }
                }
            }
        }
    }

    #[test]
    fn capability_failure_counts_as_no_internet() {
        let mut c = controller();
        let (token, _) = c.begin_session();
        let d = c.on_network_snapshot(token, Err(NetworkError::Timeout));
        assert!(matches!(d, Decision::NetworkBlocked { .. }));
        let events = c.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GateEvent::Advisory {
                advisory: Advisory::CapabilityUnavailable {
                    capability: CapabilityKind::Network,
                    ..
                },
                ..
            }
        )));
    }

    #[test]
    fn blocked_network_only_leaves_through_recheck() {
        let mut c = controller();
        let (token, _) = c.begin_session();
        c.on_network_snapshot(token, Ok(ConnectivitySnapshot::offline()));

        // A late snapshot does not unblock.
        let late = c.on_network_snapshot(token, Ok(ConnectivitySnapshot::online(Transport::Wifi)));
        assert_eq!(late, Decision::Stale);
        assert_eq!(c.state().unwrap().phase, GatePhase::NetworkBlocked);

        assert_eq!(c.recheck_network(token), Ok(Decision::CheckNetwork));
        assert_eq!(c.state().unwrap().phase, GatePhase::AwaitingNetwork);
        assert!(c.state().unwrap().block_message.is_none());

        let d = c.on_network_snapshot(token, Ok(ConnectivitySnapshot::online(Transport::Wifi)));
        assert_eq!(d, Decision::StartLocationPoll);
        assert_eq!(c.state().unwrap().poll_attempt, 2);
    }

    #[test]
    fn recheck_requires_blocked_phase() {
        let mut c = controller();
        let (token, _) = c.begin_session();
        assert_eq!(
            c.recheck_network(token),
            Err(GateError::InvalidPhase {
                phase: GatePhase::AwaitingNetwork,
                operation: "re-check the network",
            })
        );
    }

    #[test]
    fn recheck_with_foreign_token_fails() {
        let mut c = controller();
        assert_eq!(
            c.recheck_network(SessionToken::new(1)),
            Err(GateError::NoActiveSession)
        );
        let (token, _) = c.begin_session();
        c.on_network_snapshot(token, Ok(ConnectivitySnapshot::offline()));
        assert_eq!(
            c.recheck_network(token.next()),
            Err(GateError::StaleSession(token.next()))
        );
    }

    #[test]
    fn in_range_position_reaches_ready_once() {
        let mut c = controller();
        let token = to_location_phase(&mut c);

        assert_eq!(c.on_location_tick(token), Decision::PollLocation);
        let d = c.on_position(token, Ok(north_of_center(0.5)));
        assert_eq!(d, Decision::Advance);

        let events = c.drain_events();
        assert_eq!(phases(&events), vec![GatePhase::Ready]);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GateEvent::Ready { .. }))
                .count(),
            1
        );
        let distance = c.state().unwrap().last_distance_km.unwrap();
        assert!((distance - 0.5).abs() < 1e-6);

        // Ready ignores everything that follows.
        assert_eq!(c.on_location_tick(token), Decision::Stale);
        assert_eq!(c.on_position(token, Ok(center())), Decision::Stale);
        assert_eq!(
            c.on_network_snapshot(token, Ok(ConnectivitySnapshot::offline())),
            Decision::Stale
        );
        assert!(c.drain_events().is_empty());
        assert_eq!(c.state().unwrap().phase, GatePhase::Ready);
    }

    #[test]
    fn outside_keeps_polling_and_republishes_distance() {
        let mut c = controller();
        let token = to_location_phase(&mut c);

        for _ in 0..2 {
            let d = c.on_position(token, Ok(north_of_center(3.0)));
            assert_eq!(d, Decision::KeepPolling);
            let events = c.drain_events();
            assert!(phases(&events).is_empty());
            assert!(events
                .iter()
                .any(|e| matches!(e, GateEvent::PositionUpdated { .. })));
            assert_eq!(
                events
                    .iter()
                    .filter(|e| matches!(e, GateEvent::LocationOutOfRange { .. }))
                    .count(),
                1
            );
        }
        assert_eq!(c.state().unwrap().phase, GatePhase::AwaitingLocation);
    }

    #[test]
    fn block_policy_round_trips_through_location_blocked() {
        let mut config = GateConfig::default();
        config.polling.outside_policy = OutsidePolicy::Block;
        let mut c = GateController::new(&config).unwrap();
        let token = to_location_phase(&mut c);

        c.on_position(token, Ok(north_of_center(3.0)));
        assert_eq!(c.state().unwrap().phase, GatePhase::LocationBlocked);
        // Positions are not accepted while blocked.
        assert_eq!(c.on_position(token, Ok(center())), Decision::Stale);

        assert_eq!(c.on_location_tick(token), Decision::PollLocation);
        assert_eq!(c.state().unwrap().phase, GatePhase::AwaitingLocation);
        assert_eq!(c.on_position(token, Ok(center())), Decision::Advance);
    }

    #[test]
    fn permission_denied_keeps_polling_with_persistent_advisory() {
        let mut c = controller();
        let token = to_location_phase(&mut c);

        for _ in 0..3 {
            let d = c.on_position(token, Err(LocationError::PermissionDenied));
            assert_eq!(d, Decision::KeepPolling);
        }
        let advisories = c
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GateEvent::Advisory { .. }))
            .count();
        assert_eq!(advisories, 1);
        let state = c.state().unwrap();
        assert_eq!(state.phase, GatePhase::AwaitingLocation);
        assert_eq!(state.advisory, Some(Advisory::PermissionDenied));

        // Granting permission later clears the advisory.
        c.on_position(token, Ok(north_of_center(5.0)));
        assert!(c.state().unwrap().advisory.is_none());
    }

    #[test]
    fn unavailable_position_is_non_fatal() {
        let mut c = controller();
        let token = to_location_phase(&mut c);
        let d = c.on_position(
            token,
            Err(LocationError::PositionUnavailable("no fix".into())),
        );
        assert_eq!(d, Decision::KeepPolling);
        assert_eq!(c.state().unwrap().phase, GatePhase::AwaitingLocation);
    }

    #[test]
    fn invalid_position_is_treated_as_unavailable() {
        let mut c = controller();
        let token = to_location_phase(&mut c);
        let bogus = Coordinate {
            latitude: 95.0,
            longitude: 0.0,
        };
        assert_eq!(c.on_position(token, Ok(bogus)), Decision::KeepPolling);
        assert!(c.state().unwrap().last_distance_km.is_none());
        assert!(matches!(
            c.state().unwrap().advisory,
            Some(Advisory::CapabilityUnavailable { .. })
        ));
    }

    #[test]
    fn superseded_session_callbacks_are_stale() {
        let mut c = controller();
        let (old, _) = c.begin_session();
        let (new, _) = c.begin_session();
        assert_ne!(old, new);
        c.drain_events();

        let d = c.on_network_snapshot(old, Ok(ConnectivitySnapshot::online(Transport::Wifi)));
        assert_eq!(d, Decision::Stale);
        assert!(c.drain_events().is_empty());
        assert_eq!(c.state().unwrap().phase, GatePhase::AwaitingNetwork);
        assert_eq!(c.state().unwrap().session, new);
    }

    #[test]
    fn abandoned_session_ignores_late_position() {
        let mut c = controller();
        let token = to_location_phase(&mut c);
        assert!(c.abandon(token));
        assert!(!c.abandon(token));
        assert!(c.state().is_none());

        assert_eq!(c.on_position(token, Ok(center())), Decision::Stale);
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn complete_requires_ready() {
        let mut c = controller();
        let token = to_location_phase(&mut c);
        assert!(matches!(
            c.complete(token),
            Err(GateError::InvalidPhase { .. })
        ));
        c.on_position(token, Ok(center()));
        assert_eq!(c.complete(token), Ok(token));
        assert!(c.state().is_none());
        assert_eq!(c.complete(token), Err(GateError::NoActiveSession));
    }

    #[test]
    fn position_exactly_on_radius_passes() {
        let edge = north_of_center(2.0);
        let exact = geogate_geofence::distance_km(&edge, &center());

        let mut config = GateConfig::default();
        config.geofence.radius_km = exact;
        let mut c = GateController::new(&config).unwrap();
        let token = to_location_phase(&mut c);
        assert_eq!(c.on_position(token, Ok(edge)), Decision::Advance);
    }

    #[test]
    fn position_just_past_radius_fails() {
        let edge = north_of_center(2.0);
        let exact = geogate_geofence::distance_km(&edge, &center());

        let mut config = GateConfig::default();
        config.geofence.radius_km = exact - 0.001;
        let mut c = GateController::new(&config).unwrap();
        let token = to_location_phase(&mut c);
        assert_eq!(c.on_position(token, Ok(edge)), Decision::KeepPolling);
    }
}
