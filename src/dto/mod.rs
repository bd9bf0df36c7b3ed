use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod admin;
pub mod commands;
pub mod events;
pub mod gateway;
pub mod health;
pub mod rooms;
pub mod skill;

fn format_time(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
