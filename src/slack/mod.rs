//! Slack bridge layer modules.

pub mod blocks;
pub mod client;
pub mod commands;
pub mod events;

use std::future::Future;
use std::pin::Pin;

use crate::models::work_item::{CommandPayload, LinkEventPayload};
use crate::queue::consumer::WorkProcessor;
use crate::state::AppState;

impl WorkProcessor for AppState {
    fn process_command<'a>(
        &'a self,
        payload: &'a CommandPayload,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(commands::process_command(payload, self))
    }

    fn process_link_event<'a>(
        &'a self,
        payload: &'a LinkEventPayload,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(events::process_event(payload, self))
    }
}
