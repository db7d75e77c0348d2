use chrono::Utc;

use lanseat_db::models::{EventRow, RosterEntry, UserRow};
use lanseat_types::api::{CommandSchema, Embed, OptionKind, OptionSpec, Reply, SubcommandSchema};
use lanseat_types::countries;
use lanseat_types::events::Invoker;

use super::status::display_date;
use super::unknown_subcommand;
use crate::error::ApiError;
use crate::options::{Options, autocomplete, opt};
use crate::permissions::require_admin;
use crate::replies::{self, colors};
use crate::state::AppState;

/// Description limit of a single embed.
pub const EMBED_LIMIT: usize = 4096;
pub const LEGEND: &str = ":small_red_triangle: Reserve :small_orange_diamond: Unpaid entry fee\n\n";

const EVENT: OptionSpec = autocomplete(opt("event", "Only users of this event", OptionKind::String));
const OUTPUT: OptionSpec = opt("output", "Output format: short (default) or full", OptionKind::String);
const ALL: OptionSpec = opt("all", "Show all events including archived", OptionKind::Boolean);
const ARCHIVED: OptionSpec = opt("archived", "Show only archived events", OptionKind::Boolean);

pub const SCHEMA: CommandSchema = CommandSchema {
    name: "adminlist",
    description: "List events or users",
    options: &[],
    subcommands: &[
        SubcommandSchema {
            name: "users",
            description: "List users, optionally of one event",
            options: &[EVENT, OUTPUT],
        },
        SubcommandSchema {
            name: "events",
            description: "List events",
            options: &[ALL, ARCHIVED],
        },
    ],
};

pub async fn run(
    state: &AppState,
    invoker: &Invoker,
    subcommand: Option<&str>,
    options: &Options<'_>,
) -> Result<Reply, ApiError> {
    require_admin(state, invoker).await?;
    match subcommand {
        Some("users") => list_users(state, options).await,
        Some("events") => list_events(state, options).await,
        other => Err(unknown_subcommand("adminlist", other)),
    }
}

fn output_is_full(options: &Options<'_>) -> Result<bool, ApiError> {
    match options.string(&OUTPUT)?.as_deref() {
        None | Some("") => Ok(false),
        Some(raw) if raw.eq_ignore_ascii_case("short") => Ok(false),
        Some(raw) if raw.eq_ignore_ascii_case("full") => Ok(true),
        Some(_) => Err(ApiError::Validation("`output` must be `short` or `full`.".into())),
    }
}

async fn list_users(state: &AppState, options: &Options<'_>) -> Result<Reply, ApiError> {
    let full = output_is_full(options)?;

    let (title, lines) = match options.event_id(&EVENT)? {
        Some(event_id) => {
            let (event, entries) = state
                .db(move |db| Ok((db.get_event(event_id)?, db.event_entries(event_id)?)))
                .await?;
            let Some(event) = event else {
                return Err(ApiError::NotFound("The specified event does not exist.".into()));
            };
            let mut lines = Vec::with_capacity(entries.len());
            for entry in &entries {
                let name = platform_name(state, &entry.user_id).await;
                lines.push(if full {
                    entry_line_full(entry, &name)
                } else {
                    entry_line_short(entry, &name)
                });
            }
            (format!("User List ({})", event.name), lines)
        }
        None => {
            let users = state
                .db(|db| {
                    let mut users = Vec::new();
                    for user in db.list_users()? {
                        let events = db.events_for_user(&user.id)?;
                        users.push((user, events));
                    }
                    Ok(users)
                })
                .await?;
            let mut lines = Vec::with_capacity(users.len());
            for (user, events) in &users {
                let name = platform_name(state, &user.id).await;
                lines.push(if full {
                    user_line_full(user, &name, events)
                } else {
                    format!("{} **{}** ({})\n", countries::flag(&user.country), user.nickname, name)
                });
            }
            ("User List (All Users)".to_string(), lines)
        }
    };

    if lines.is_empty() {
        return Ok(replies::info(&title, "No users found.").ephemeral());
    }
    let mut reply = Reply::default().ephemeral();
    for embed in split_embeds(&title, &lines) {
        reply = reply.with_embed(embed);
    }
    Ok(reply)
}

async fn platform_name(state: &AppState, user_id: &str) -> String {
    state
        .dispatcher
        .username(user_id)
        .await
        .unwrap_or_else(|| "Unknown".to_string())
}

fn markers(entry: &RosterEntry) -> String {
    let mut out = String::new();
    if entry.reserve {
        out.push_str(" :small_red_triangle:");
    } else if !entry.has_paid {
        out.push_str(" :small_orange_diamond:");
    }
    out
}

pub fn entry_line_short(entry: &RosterEntry, platform_name: &str) -> String {
    let seat = match entry.seat {
        Some(seat) if !entry.reserve => format!(" [#{}]", seat),
        _ => String::new(),
    };
    format!(
        "{} **{}** ({}){}{}\n",
        countries::flag(&entry.country),
        entry.nickname,
        platform_name,
        seat,
        markers(entry)
    )
}

fn entry_line_full(entry: &RosterEntry, platform_name: &str) -> String {
    let seat = match entry.seat {
        Some(seat) if !entry.reserve => format!("Seat: {}\n", seat),
        _ => String::new(),
    };
    format!(
        "**{}**{}\nUser ID: {}\nPlatform Name: {}\nReserve: {}\n{}Paid: {}\nFull Name: {} {}\nEmail: {}\nCountry: {}\n\n",
        entry.nickname,
        markers(entry),
        entry.user_id,
        platform_name,
        yes_no(entry.reserve),
        seat,
        yes_no(entry.has_paid),
        entry.firstname,
        entry.lastname,
        entry.email,
        countries::flag(&entry.country)
    )
}

fn user_line_full(user: &UserRow, platform_name: &str, events: &[EventRow]) -> String {
    let event_list = if events.is_empty() {
        ":white_small_square: -".to_string()
    } else {
        events
            .iter()
            .map(|e| format!(":white_small_square: {}", e.name))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "**{}**\nUser ID: {}\nPlatform Name: {}\nFull Name: {} {}\nEmail: {}\nCountry: {}\nIn Event(s):\n{}\n\n",
        user.nickname,
        user.id,
        platform_name,
        user.firstname,
        user.lastname,
        user.email,
        countries::flag(&user.country),
        event_list
    )
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Pack lines into as few embeds as the description limit allows. The
/// legend heads the first one.
pub fn split_embeds(title: &str, lines: &[String]) -> Vec<Embed> {
    let mut descriptions = Vec::new();
    let mut current = String::from(LEGEND);
    let mut length = LEGEND.chars().count();

    for line in lines {
        let line_length = line.chars().count();
        if length + line_length > EMBED_LIMIT && length > 0 {
            descriptions.push(std::mem::take(&mut current));
            length = 0;
        }
        current.push_str(line);
        length += line_length;
    }
    if !current.is_empty() {
        descriptions.push(current);
    }

    descriptions
        .into_iter()
        .map(|d| Embed::new(title, colors::INFO).description(d))
        .collect()
}

async fn list_events(state: &AppState, options: &Options<'_>) -> Result<Reply, ApiError> {
    let all = options.boolean(&ALL)?.unwrap_or(false);
    let archived_only = options.boolean(&ARCHIVED)?.unwrap_or(false);
    let now = Utc::now().naive_utc();

    let events: Vec<EventRow> = state
        .db(|db| db.list_events())
        .await?
        .into_iter()
        .filter(|e| {
            if archived_only {
                e.is_archived(now)
            } else {
                all || !e.is_archived(now)
            }
        })
        .collect();

    let mut embed = Embed::new("List of Events", colors::INFO);
    if events.is_empty() {
        embed = embed.description("No events found.");
    }
    for event in &events {
        embed = embed.field(&event.name, event_summary(event));
    }
    Ok(Reply::embed(embed).ephemeral())
}

pub fn event_summary(event: &EventRow) -> String {
    let channel = event
        .participant_channel
        .as_deref()
        .map(|id| format!("<#{}>", id))
        .unwrap_or_else(|| "None".to_string());
    format!(
        "Event ID: {}\nLocation: {}\nStart Date: {}\nEnd Date: {}\nSeats: {}\nEntry Fee: €{}\nParticipant Channel: {}",
        event.id,
        event.location,
        display_date(&event.start_at),
        display_date(&event.end_at),
        event.total_seats,
        event.entry_fee,
        channel
    )
}
