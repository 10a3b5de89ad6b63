//! The winning-card tally: pure, client-local.

use pointdeck_room::Participant;

/// Tallies revealed selections into a display string.
///
/// - `None` unless `revealed`, and `None` when nobody has selected.
/// - Cards are counted in first-seen roster order, which is also the
///   order ties are reported in.
/// - One winner formats as `"M (3 votes)"` (singular `vote` at one);
///   ties format as `"M / S (2 votes each)"`.
pub fn winning_card(participants: &[Participant], revealed: bool) -> Option<String> {
    if !revealed {
        return None;
    }

    // Vec over HashMap: the roster is at most ten entries and the
    // first-seen order is part of the contract.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for card in participants.iter().filter_map(|p| p.selected_card) {
        let label = card.label();
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let max = counts.iter().map(|(_, count)| *count).max()?;
    let winners: Vec<&str> = counts
        .iter()
        .filter(|(_, count)| *count == max)
        .map(|(card, _)| *card)
        .collect();

    let plural = if max == 1 { "" } else { "s" };
    if winners.len() > 1 {
        Some(format!(
            "{} ({max} vote{plural} each)",
            winners.join(" / ")
        ))
    } else {
        Some(format!("{} ({max} vote{plural})", winners.join("")))
    }
}
