use serde::Serialize;

use crate::models::agenda::{Agenda, AgendaId};
use crate::tally::resolve_meeting_context;

/// Document and page to open for an agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationTarget {
    pub url: String,
    pub page: u32,
}

/// An item's own deck wins; otherwise the meeting's master deck is opened at
/// the item's start page. Pages are 1-based.
pub fn resolve_presentation(agendas: &[Agenda], agenda_id: AgendaId) -> Option<PresentationTarget> {
    let agenda = agendas.iter().find(|a| a.id() == agenda_id)?;
    match agenda {
        Agenda::Folder(f) => f.presentation_url.clone().map(|url| PresentationTarget { url, page: 1 }),
        Agenda::Item(i) => {
            let page = i.start_page.unwrap_or(1).max(1);
            if let Some(url) = &i.presentation_url {
                return Some(PresentationTarget { url: url.clone(), page });
            }
            let meeting_id = i.meeting_id.or_else(|| resolve_meeting_context(agendas, i.id))?;
            agendas
                .iter()
                .find_map(|a| match a {
                    Agenda::Folder(f) if f.id == meeting_id => f.presentation_url.clone(),
                    _ => None,
                })
                .map(|url| PresentationTarget { url, page })
        }
    }
}
