use crate::annotation::AnnotationId;
use crate::store::AnnotationStore;
use std::collections::BTreeSet;

/// Presentation state kept beside the store, keyed by annotation id.
///
/// Nothing in here is persisted with the annotation records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    open_notes: BTreeSet<AnnotationId>,
    selected: Option<AnnotationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    ToggleNote(AnnotationId),
    OpenNote(AnnotationId),
    CloseNote(AnnotationId),
    Select(AnnotationId),
    ClearSelection,
}

impl ViewState {
    pub fn is_note_open(&self, id: AnnotationId) -> bool {
        self.open_notes.contains(&id)
    }

    pub fn open_notes(&self) -> impl Iterator<Item = AnnotationId> + '_ {
        self.open_notes.iter().copied()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn is_selected(&self, id: AnnotationId) -> bool {
        self.selected == Some(id)
    }

    /// Returns the new open state.
    pub fn toggle_note(&mut self, id: AnnotationId) -> bool {
        if self.open_notes.remove(&id) {
            false
        } else {
            self.open_notes.insert(id);
            true
        }
    }

    pub fn open_note(&mut self, id: AnnotationId) {
        self.open_notes.insert(id);
    }

    pub fn close_note(&mut self, id: AnnotationId) {
        self.open_notes.remove(&id);
    }

    pub fn select(&mut self, id: Option<AnnotationId>) {
        self.selected = id;
    }

    /// Forget ids that are no longer in `store`.
    pub fn prune(&mut self, store: &AnnotationStore) {
        self.open_notes.retain(|id| store.get(*id).is_some());
        if self.selected.is_some_and(|id| store.get(id).is_none()) {
            self.selected = None;
        }
    }
}

pub fn apply_view_action(state: &mut ViewState, action: ViewAction) {
    match action {
        ViewAction::ToggleNote(id) => {
            state.toggle_note(id);
        }
        ViewAction::OpenNote(id) => state.open_note(id),
        ViewAction::CloseNote(id) => state.close_note(id),
        ViewAction::Select(id) => state.select(Some(id)),
        ViewAction::ClearSelection => state.select(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DocPoint;
    use crate::store::NewAnnotation;

    #[test]
    fn toggle_note_flips_open_state() {
        let mut state = ViewState::default();
        let id = AnnotationId::new_v4();

        assert!(state.toggle_note(id));
        assert!(state.is_note_open(id));
        assert!(!state.toggle_note(id));
        assert!(!state.is_note_open(id));
    }

    #[test]
    fn actions_drive_selection_and_notes() {
        let mut state = ViewState::default();
        let id = AnnotationId::new_v4();

        apply_view_action(&mut state, ViewAction::OpenNote(id));
        apply_view_action(&mut state, ViewAction::Select(id));
        assert!(state.is_note_open(id));
        assert!(state.is_selected(id));

        apply_view_action(&mut state, ViewAction::CloseNote(id));
        apply_view_action(&mut state, ViewAction::ClearSelection);
        assert_eq!(state, ViewState::default());
    }

    #[test]
    fn prune_drops_deleted_annotations() {
        let mut store = AnnotationStore::new();
        let kept = store.create(NewAnnotation::note(1, DocPoint::new(1.0, 1.0), "a")).expect("create").id();
        let removed = store.create(NewAnnotation::note(1, DocPoint::new(2.0, 2.0), "b")).expect("create").id();

        let mut state = ViewState::default();
        state.open_note(kept);
        state.open_note(removed);
        state.select(Some(removed));

        assert!(store.delete(removed).is_deleted());
        state.prune(&store);

        assert_eq!(state.open_notes().collect::<Vec<_>>(), vec![kept]);
        assert_eq!(state.selected(), None);
    }
}
