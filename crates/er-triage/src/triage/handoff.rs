use std::fmt::Write as _;

use super::geo::Coordinates;
use super::ranking::{Placement, RankedCandidate};
use super::rules::SymptomRule;

/// Scene details included in a handoff note.
#[derive(Debug, Clone, Copy)]
pub struct HandoffContext<'a> {
    pub rule: &'a SymptomRule,
    pub origin: Coordinates,
    pub address: Option<&'a str>,
    pub field_note: Option<&'a str>,
}

/// Plain-text SBAR draft for the receiving hospital.
pub fn sbar_note(context: &HandoffContext<'_>, candidates: &[RankedCandidate]) -> String {
    let mut note = String::new();

    let _ = write!(
        note,
        "[S] Emergency transport in progress. Presenting complaint: {}. Location: ({:.5}, {:.5})",
        context.rule.label, context.origin.latitude, context.origin.longitude
    );
    if let Some(address) = context.address.filter(|value| !value.trim().is_empty()) {
        let _ = write!(note, " / {}", address.trim());
    }
    note.push('.');
    if let Some(field_note) = context.field_note.filter(|value| !value.trim().is_empty()) {
        let _ = write!(note, "\n    Field note: {}", field_note.trim());
    }

    note.push_str("\n[B] History: to be confirmed on scene. Medications/allergies: unknown.");
    let _ = write!(
        note,
        "\n[A] Candidates ranked on live equipment and bed availability ({} considered).",
        candidates.len()
    );

    note.push_str("\n[R] ");
    if candidates.is_empty() {
        note.push_str("No candidate hospital available; escalate to dispatch.");
        return note;
    }

    let lines: Vec<String> = candidates.iter().map(candidate_line).collect();
    note.push_str(&lines.join(",\n    "));
    note.push_str(". Please pre-notify the receiving emergency department.");
    note
}

fn candidate_line(candidate: &RankedCandidate) -> String {
    let mut line = format!(
        "#{} {} ({:.2} km, score {:.1})",
        candidate.rank,
        candidate.record.display_name(),
        candidate.distance_km,
        candidate.score
    );
    match candidate.placement {
        Placement::Qualified => {}
        Placement::Padding | Placement::Fallback => line.push_str(" [requirements not met]"),
    }
    line
}
