use crate::models::agenda::{Agenda, AgendaId};

/// Owning meeting (folder) of `agenda_id` by list position.
///
/// A folder owns itself; an item belongs to the nearest folder before it.
/// Orphan items and unknown ids resolve to `None`.
pub fn resolve_meeting_context(agendas: &[Agenda], agenda_id: AgendaId) -> Option<AgendaId> {
    let pos = agendas.iter().position(|a| a.id() == agenda_id)?;
    agendas[..=pos]
        .iter()
        .rev()
        .find(|a| a.is_folder())
        .map(Agenda::id)
}

/// Sort by list order and stamp every item with its owning folder.
///
/// Run after any insert, reorder or delete so reads can use `Item::meeting_id`
/// directly instead of scanning.
pub fn assign_meeting_ids(agendas: &mut [Agenda]) {
    agendas.sort_by_key(|a| (a.order_index(), a.id()));
    let mut current: Option<AgendaId> = None;
    for agenda in agendas.iter_mut() {
        match agenda {
            Agenda::Folder(f) => current = Some(f.id),
            Agenda::Item(i) => i.meeting_id = current,
        }
    }
}

/// Items owned by `meeting_id`, in list order.
pub fn items_of_meeting(agendas: &[Agenda], meeting_id: AgendaId) -> Vec<&Agenda> {
    agendas
        .iter()
        .filter(|a| a.as_item().is_some_and(|i| i.meeting_id == Some(meeting_id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agenda::{ItemKind, NewAgenda};

    fn folder(id: AgendaId, order: i32) -> Agenda {
        NewAgenda::Folder { title: format!("folder {id}"), presentation_url: None }.into_agenda(id, order)
    }

    fn item(id: AgendaId, order: i32) -> Agenda {
        NewAgenda::Item {
            kind: ItemKind::Majority,
            title: format!("item {id}"),
            presentation_url: None,
            start_page: None,
        }
        .into_agenda(id, order)
    }

    #[test]
    fn orphan_items_have_no_meeting() {
        let mut list = vec![item(1, 0), folder(2, 1), item(3, 2)];
        assign_meeting_ids(&mut list);
        assert_eq!(list[0].as_item().unwrap().meeting_id, None);
        assert_eq!(list[2].as_item().unwrap().meeting_id, Some(2));
        assert_eq!(resolve_meeting_context(&list, 1), None);
        assert_eq!(resolve_meeting_context(&list, 99), None);
    }

    #[test]
    fn assignment_follows_order_index_not_vec_order() {
        let mut list = vec![item(3, 2), folder(1, 0), folder(4, 3), item(2, 1)];
        assign_meeting_ids(&mut list);
        let ids: Vec<_> = list.iter().map(Agenda::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(items_of_meeting(&list, 1).len(), 2);
        assert!(items_of_meeting(&list, 4).is_empty());
    }
}
