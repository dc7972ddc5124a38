//! Telemenu - stateful inline-keyboard menus for chat bots
//!
//! Menus are declared once, frozen into a [`menu::Registry`], and driven by a
//! pure state machine. Each conversation is served by its own runtime task
//! that persists state before anything is rendered.

pub mod api;
pub mod config;
pub mod demo;
pub mod menu;
pub mod render;
pub mod runtime;
pub mod state_machine;
pub mod store;
