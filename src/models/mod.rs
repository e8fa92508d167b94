//! Domain model module declarations.

pub mod metadata;
pub mod slack_event;
pub mod work_item;
