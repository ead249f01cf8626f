//! Core types for BDB commissioning: Event, Action, and StateMachine trait.
//!
//! Every commissioning procedure is a synchronous state machine that turns
//! [`Event`]s into [`Action`]s. The runner owns time, timers, the external
//! network stack and the application callbacks:
//!
//! ```text
//!   NetworkStack ──confirms──┐          ┌──▶ SetTimer / CancelTimer
//!   Timers ───TimerFired─────┼─▶ handle ┼──▶ Stack(StackRequest) ──▶ NetworkStack
//!   EnqueueInternal ─────────┘          ├──▶ EnqueueInternal
//!                                       └──▶ Notify(Notification) ──▶ application
//! ```

mod action;
mod event;
mod message;
mod notification;
mod timer;
mod traits;

pub use action::Action;
pub use event::Event;
pub use message::{BindDestination, StackRequest};
pub use notification::Notification;
pub use timer::TimerId;
pub use traits::{KeyStore, KeyStoreError, NetworkStack, StackReply, StateMachine};
