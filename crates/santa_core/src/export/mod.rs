//! Administrative CSV exports.
//!
//! # Responsibility
//! - Render the assignment table and the link table for manual review and
//!   distribution.
//!
//! # Invariants
//! - A header row is always written, even for empty tables.
//! - Fields containing `,`, `"`, CR or LF are quoted with inner quotes doubled.
//! - Lines end with `\n`.

use crate::model::assignment::Assignment;
use crate::model::participant::{Participant, ParticipantSeed};
use crate::model::token::Token;

pub const ASSIGNMENTS_HEADER: [&str; 7] = [
    "giver",
    "giver_birthday",
    "giver_anniversary",
    "receiver",
    "receiver_birthday",
    "receiver_anniversary",
    "link",
];

pub const LINKS_HEADER: [&str; 2] = ["name", "link"];

/// Builds the claim link a participant opens to see their assignment.
pub fn claim_link(base_url: &str, token: &Token) -> String {
    format!("{}/reveal/{}", base_url.trim_end_matches('/'), token)
}

/// Renders stored assignments joined with roster details.
///
/// `lookup` maps a participant name to its roster entry; names missing from
/// the roster export with empty date columns.
pub fn assignments_csv<'a>(
    assignments: &[Assignment],
    lookup: impl Fn(&str) -> Option<&'a ParticipantSeed>,
    base_url: &str,
) -> String {
    let mut out = String::new();
    push_record(&mut out, &ASSIGNMENTS_HEADER);

    for assignment in assignments {
        let giver = lookup(&assignment.giver_name);
        let receiver = lookup(&assignment.receiver_name);
        let link = claim_link(base_url, &assignment.giver_token);
        push_record(
            &mut out,
            &[
                assignment.giver_name.as_str(),
                date(giver.and_then(|seed| seed.birthday.as_deref())),
                date(giver.and_then(|seed| seed.anniversary.as_deref())),
                assignment.receiver_name.as_str(),
                date(receiver.and_then(|seed| seed.birthday.as_deref())),
                date(receiver.and_then(|seed| seed.anniversary.as_deref())),
                link.as_str(),
            ],
        );
    }

    out
}

/// Renders one claim link per participant.
pub fn links_csv(participants: &[Participant], base_url: &str) -> String {
    let mut out = String::new();
    push_record(&mut out, &LINKS_HEADER);
    for participant in participants {
        let link = claim_link(base_url, &participant.token);
        push_record(&mut out, &[participant.name.as_str(), link.as_str()]);
    }
    out
}

fn date(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn push_record(out: &mut String, fields: &[&str]) {
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push('\n');
}

fn push_field(out: &mut String, field: &str) {
    if !field.contains([',', '"', '\r', '\n']) {
        out.push_str(field);
        return;
    }
    out.push('"');
    out.push_str(&field.replace('"', "\"\""));
    out.push('"');
}
