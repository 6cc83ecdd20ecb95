//! Handshake and subscription state machine.
//!
//! The machine has no I/O. The driver feeds it the open event and every
//! inbound text frame; each call returns the actions to execute, in order.
//! Because every frame goes through [`Protocol::on_frame`], the current stage
//! alone decides how a frame is read.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ open  ┌─────────────┐ connected ┌──────────┐ result: truthy ┌──────────┐
//! │ Init │──────>│ ConnectSent │──────────>│ AuthSent │───────────────>│ Querying │
//! └──────┘       └─────────────┘  (login)  └──────────┘   (query)      └──────────┘
//!                                                │                           │ result
//!                                                │ result: falsy             │ (subscribe)
//!                                                ↓                           ↓
//!                                         ┌────────────┐              ┌────────────┐
//!                                         │ AuthFailed │              │ Subscribed │
//!                                         └────────────┘              └────────────┘
//! ```

use nas_monitor_core::{
    ConnectionState, EventKind, InboundMessage, OutboundMessage, ResultContext, SessionToken,
    Status,
};
use tracing::{debug, error, info, warn};

use crate::session::Session;

/// Actions returned by the protocol state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolAction {
    /// Encode and send this request
    Send(OutboundMessage),
    /// Forward this status to the status sink
    Notify(Status),
    /// Close the link; the attempt is over and must not be retried
    Close,
}

/// Protocol stage of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Link not open yet
    Init,
    /// Connect frame sent, waiting for `connected`
    ConnectSent,
    /// Login sent, waiting for the auth result
    AuthSent,
    /// Authenticated, state query outstanding
    Querying,
    /// Query answered, subscription requested
    Subscribed,
    /// Login rejected (terminal)
    AuthFailed,
}

/// Protocol state machine for a single link.
///
/// A new `Protocol` is created for every transport; the [`Session`] it
/// drives is passed in by the caller and survives reconnections.
#[derive(Debug, Clone)]
pub struct Protocol {
    stage: Stage,
    last_status: Option<Status>,
}

impl Protocol {
    /// Create a machine in [`Stage::Init`].
    pub fn new() -> Self {
        Self {
            stage: Stage::Init,
            last_status: None,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether the login was rejected on this link.
    pub fn is_terminal(&self) -> bool {
        self.stage == Stage::AuthFailed
    }

    /// Whether a reply to one of our requests is outstanding.
    pub fn is_awaiting_reply(&self) -> bool {
        matches!(
            self.stage,
            Stage::ConnectSent | Stage::AuthSent | Stage::Querying
        )
    }

    /// Connection state derived from the stage and the last status.
    pub fn connection_state(&self) -> ConnectionState {
        match self.stage {
            Stage::Init | Stage::ConnectSent => ConnectionState::Connecting,
            Stage::AuthSent => ConnectionState::Authenticating,
            Stage::Querying | Stage::Subscribed => self
                .last_status
                .as_ref()
                .map_or(ConnectionState::Ready, ConnectionState::from_status),
            Stage::AuthFailed => ConnectionState::Dead,
        }
    }

    /// The link is open: start the handshake.
    pub fn on_open(&mut self, session: &mut Session) -> Vec<ProtocolAction> {
        if self.stage != Stage::Init {
            warn!(
                "Open event in stage {:?} ignored: session={}",
                self.stage,
                session.id()
            );
            return Vec::new();
        }

        session.clear_token();
        self.stage = Stage::ConnectSent;
        debug!("Link open, sending connect: session={}", session.id());
        vec![ProtocolAction::Send(OutboundMessage::Connect)]
    }

    /// Dispatch one inbound text frame.
    ///
    /// Frames that cannot be classified are logged and dropped without
    /// changing the stage.
    pub fn on_frame(&mut self, session: &mut Session, frame: &str) -> Vec<ProtocolAction> {
        let context = if self.stage == Stage::AuthSent {
            ResultContext::Login
        } else {
            ResultContext::Query
        };

        let message = match InboundMessage::classify(frame, context) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "Dropping frame: session={}, stage={:?}, {}",
                    session.id(),
                    self.stage,
                    e
                );
                return Vec::new();
            }
        };

        match self.stage {
            Stage::Init => {
                debug!("Frame before open ignored: session={}", session.id());
                Vec::new()
            }
            Stage::ConnectSent => self.on_connect_reply(session, message),
            Stage::AuthSent => self.on_auth_result(session, message),
            Stage::Querying | Stage::Subscribed => self.on_subscription_frame(session, message),
            Stage::AuthFailed => Vec::new(),
        }
    }

    fn on_connect_reply(
        &mut self,
        session: &mut Session,
        message: InboundMessage,
    ) -> Vec<ProtocolAction> {
        let InboundMessage::Connected { session: token } = message else {
            debug!(
                "Waiting for connected, frame ignored: session={}",
                session.id()
            );
            return Vec::new();
        };

        debug!("Session token bound: session={}", session.id());
        session.bind_token(token.clone());
        self.stage = Stage::AuthSent;

        vec![ProtocolAction::Send(OutboundMessage::Login {
            token,
            credential: session.credential().clone(),
        })]
    }

    fn on_auth_result(
        &mut self,
        session: &mut Session,
        message: InboundMessage,
    ) -> Vec<ProtocolAction> {
        let InboundMessage::AuthResult { success } = message else {
            return Vec::new();
        };

        if !success {
            error!("Authentication rejected: session={}", session.id());
            self.stage = Stage::AuthFailed;
            self.last_status = Some(Status::Dead);
            return vec![ProtocolAction::Notify(Status::Dead), ProtocolAction::Close];
        }

        info!("Authenticated: session={}", session.id());
        self.stage = Stage::Querying;
        self.request(session, |token| OutboundMessage::QueryState { token })
    }

    fn on_subscription_frame(
        &mut self,
        session: &mut Session,
        message: InboundMessage,
    ) -> Vec<ProtocolAction> {
        session.reset_retries();

        match message {
            InboundMessage::QueryResult { state } => {
                let status = Status::from_query_result(&state);
                let mut actions = vec![self.notify(status)];
                if self.stage == Stage::Querying {
                    self.stage = Stage::Subscribed;
                    actions.extend(self.request(session, |token| OutboundMessage::Subscribe {
                        token,
                    }));
                }
                actions
            }
            InboundMessage::Event {
                kind: EventKind::Ready,
                ..
            } => {
                debug!("Subscription confirmed: session={}", session.id());
                Vec::new()
            }
            InboundMessage::Event { id: Some(id), .. } => {
                vec![self.notify(Status::from_event_id(&id))]
            }
            InboundMessage::Event { kind, id: None } => {
                debug!(
                    "Event without id ignored: session={}, kind={:?}",
                    session.id(),
                    kind
                );
                Vec::new()
            }
            InboundMessage::Connected { .. } | InboundMessage::AuthResult { .. } => {
                debug!("Handshake frame after login ignored: session={}", session.id());
                Vec::new()
            }
        }
    }

    fn notify(&mut self, status: Status) -> ProtocolAction {
        self.last_status = Some(status.clone());
        ProtocolAction::Notify(status)
    }

    fn request(
        &self,
        session: &Session,
        build: impl FnOnce(SessionToken) -> OutboundMessage,
    ) -> Vec<ProtocolAction> {
        match session.require_token() {
            Ok(token) => vec![ProtocolAction::Send(build(token.clone()))],
            Err(e) => {
                error!("{}: session={}", e, session.id());
                Vec::new()
            }
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new()
    }
}
