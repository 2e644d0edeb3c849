//! autobattle-core
//!
//! Core building blocks for automating turn-based card battles.
//!
//! # モジュール構成
//! - **domain**: battle model (screen state, context, cards, skills, decisions, stats, errors)
//! - **ports**: abstractions over the outside world (capture, perception, actuation, clock, ids, decider)
//! - **engine**: the decision engine (card scoring, skill and NP prioritisation, history)
//! - **app**: the automation controller (state machine, loop, error policy, gestures, status)
//! - **impls**: in-process implementations of the ports (simulated device for development)

pub mod domain;
pub mod ports;
pub mod engine;
pub mod app;
pub mod impls;

pub use app::{AutomationConfig, AutomationController, ControllerBuilder, StatusSnapshot};
pub use domain::{AutomationState, BattleContext, BattleState, Decision};
pub use engine::DecisionEngine;
