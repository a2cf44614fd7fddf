#![forbid(unsafe_code)]

//! End-to-end undo behavior of the note workspace.
//!
//! Validates:
//! - Grouped edits undo in one step
//! - Ignored operations stay out of history
//! - A new edit after undo drops the redo future
//! - Provisional sessions roll back to the exact starting state
//! - Snapshots are unaffected by later edits
//! - Cross-module cascades undo per module
//! - Navigation histories are independent per pane

use std::cell::RefCell;
use std::rc::Rc;

use quire_notes::navigation::NavTarget;
use quire_notes::notebooks::{self, Notebooks};
use quire_notes::notes::{self, Notes};
use quire_notes::tags;
use quire_notes::{ModuleConfig, NotebookId, NotesError, Workspace, WorkspaceConfig};
use quire_undo::UndoError;

fn workspace() -> Workspace {
    Workspace::new(WorkspaceConfig::default()).unwrap()
}

fn names(ws: &Workspace) -> Vec<String> {
    ws.notebooks()
        .unwrap()
        .notebooks
        .iter()
        .map(|nb| nb.name.clone())
        .collect()
}

fn notes_history(ws: &Workspace) -> usize {
    ws.store()
        .registry()
        .context::<Notes>(notes::NAMESPACE)
        .unwrap()
        .history()
        .len()
}

fn notebook_history(ws: &Workspace) -> usize {
    ws.store()
        .registry()
        .context::<Notebooks>(notebooks::NAMESPACE)
        .unwrap()
        .history()
        .len()
}

// ============================================================================
// Groups
// ============================================================================

#[test]
fn grouped_create_rename_expand_undoes_in_one_step() {
    let mut ws = workspace();
    let id = ws
        .group(notebooks::NAMESPACE, |ws| {
            let id = ws.create_notebook("A", None)?;
            ws.rename_notebook(id, "B")?;
            ws.set_notebook_expanded(id, true)?;
            Ok(id)
        })
        .unwrap();

    assert_eq!(names(&ws), vec!["B"]);
    assert_eq!(notebook_history(&ws), 1);

    ws.undo(notebooks::NAMESPACE).unwrap();
    assert!(names(&ws).is_empty());
    assert!(!ws.can_undo(notebooks::NAMESPACE));

    ws.redo(notebooks::NAMESPACE).unwrap();
    let nb = ws.notebooks().unwrap().get(id).unwrap().clone();
    assert_eq!(nb.name, "B");
    assert!(nb.expanded);
}

#[test]
fn failed_group_leaves_nothing_behind() {
    let mut ws = workspace();
    ws.create_notebook("Keep", None).unwrap();

    let result = ws.group(notebooks::NAMESPACE, |ws| {
        let id = ws.create_notebook("Temp", None)?;
        ws.rename_notebook(id, "Renamed")?;
        ws.rename_notebook(NotebookId::from_raw(999), "nope")?;
        Ok(())
    });

    assert!(matches!(result, Err(NotesError::UnknownNotebook(_))));
    assert_eq!(names(&ws), vec!["Keep"]);
    assert_eq!(notebook_history(&ws), 1);

    ws.undo(notebooks::NAMESPACE).unwrap();
    assert!(names(&ws).is_empty());
}

#[test]
fn cascading_delete_inside_same_module_group_fails() {
    let mut ws = workspace();
    let id = ws.create_notebook("A", None).unwrap();
    let note = ws.create_note("n", Some(id)).unwrap();
    assert_eq!(notes_history(&ws), 1);

    let result = ws.group(notebooks::NAMESPACE, |ws| ws.delete_notebook(id));
    assert!(matches!(
        result,
        Err(NotesError::Undo(UndoError::GroupInProgress { .. }))
    ));
    assert_eq!(names(&ws), vec!["A"]);
    assert_eq!(ws.notes().unwrap().get(note).unwrap().notebook, Some(id));
    assert_eq!(notes_history(&ws), 1);
    assert!(ws.can_undo(notes::NAMESPACE));
}

#[test]
fn cascading_delete_inside_notes_group_commits_nothing() {
    let mut ws = workspace();
    let urgent = ws.create_tag("urgent").unwrap();
    let note = ws.create_note("call", None).unwrap();
    ws.tag_note(note, urgent).unwrap();

    let result = ws.group(notes::NAMESPACE, |ws| {
        ws.retitle_note(note, "call back")?;
        ws.delete_tag(urgent)
    });
    assert!(matches!(
        result,
        Err(NotesError::Undo(UndoError::GroupInProgress { .. }))
    ));
    let kept = ws.notes().unwrap().get(note).unwrap().clone();
    assert_eq!(kept.title, "call");
    assert!(kept.tags.contains(&urgent));
    assert!(ws.tags().unwrap().contains(urgent));
    assert_eq!(notes_history(&ws), 2);
}

// ============================================================================
// Ignore list, truncation, snapshots
// ============================================================================

#[test]
fn selection_is_not_undoable() {
    let mut ws = workspace();
    ws.select_notebook(None).unwrap();
    assert!(!ws.can_undo(notebooks::NAMESPACE));

    let id = ws.create_notebook("A", None).unwrap();
    ws.select_notebook(Some(id)).unwrap();
    assert_eq!(ws.notebooks().unwrap().selected, Some(id));
    assert_eq!(notebook_history(&ws), 1);
}

#[test]
fn edit_after_undo_drops_redo_future() {
    let mut ws = workspace();
    ws.create_notebook("A", None).unwrap();
    ws.create_notebook("B", None).unwrap();
    ws.undo(notebooks::NAMESPACE).unwrap();
    assert!(ws.can_redo(notebooks::NAMESPACE));

    ws.create_notebook("C", None).unwrap();
    assert_eq!(names(&ws), vec!["A", "C"]);
    assert!(!ws.can_redo(notebooks::NAMESPACE));
    assert_eq!(notebook_history(&ws), 2);
}

#[test]
fn snapshots_survive_later_edits() {
    let config = WorkspaceConfig {
        notebooks: ModuleConfig::new(1),
        ..WorkspaceConfig::default()
    };
    let mut ws = Workspace::new(config).unwrap();

    let id = ws.create_notebook("A", None).unwrap();
    ws.rename_notebook(id, "B").unwrap();
    ws.rename_notebook(id, "C").unwrap();

    let report = ws.undo(notebooks::NAMESPACE).unwrap();
    assert_eq!(report.replayed, 0);
    assert_eq!(names(&ws), vec!["B"]);
    ws.undo(notebooks::NAMESPACE).unwrap();
    assert_eq!(names(&ws), vec!["A"]);
}

// ============================================================================
// Provisional sessions
// ============================================================================

#[test]
fn discarding_provisional_edits_restores_start() {
    let mut ws = workspace();
    let id = ws.create_notebook("A", None).unwrap();
    let before = ws.notebooks().unwrap().clone();

    ws.begin_provisional(notebooks::NAMESPACE).unwrap();
    assert!(!ws.can_undo(notebooks::NAMESPACE));
    ws.rename_notebook(id, "Draft").unwrap();
    ws.create_notebook("Scratch", Some(id)).unwrap();

    ws.discard_provisional(notebooks::NAMESPACE).unwrap();
    assert_eq!(ws.notebooks().unwrap(), &before);
    assert!(!ws.can_redo(notebooks::NAMESPACE));
    assert!(ws.can_undo(notebooks::NAMESPACE));
    assert!(!ws.commit_provisional(notebooks::NAMESPACE).unwrap());
}

#[test]
fn committed_provisional_edits_stay_undoable() {
    let mut ws = workspace();
    ws.begin_provisional(notebooks::NAMESPACE).unwrap();
    ws.create_notebook("A", None).unwrap();
    assert!(ws.commit_provisional(notebooks::NAMESPACE).unwrap());

    ws.undo(notebooks::NAMESPACE).unwrap();
    assert!(names(&ws).is_empty());
    assert!(matches!(
        ws.discard_provisional(notebooks::NAMESPACE),
        Err(NotesError::Undo(UndoError::NoCheckpoint))
    ));
}

// ============================================================================
// Cascades
// ============================================================================

#[test]
fn delete_notebook_cascades_per_module() {
    let mut ws = workspace();
    let work = ws.create_notebook("Work", None).unwrap();
    let projects = ws.create_notebook("Projects", Some(work)).unwrap();
    let home = ws.create_notebook("Home", None).unwrap();
    let n1 = ws.create_note("plan", Some(work)).unwrap();
    let n2 = ws.create_note("roadmap", Some(projects)).unwrap();
    let n3 = ws.create_note("groceries", Some(home)).unwrap();

    assert_eq!(ws.delete_notebook(work).unwrap(), 2);
    assert_eq!(names(&ws), vec!["Home"]);
    let notes = ws.notes().unwrap();
    assert_eq!(notes.get(n1).unwrap().notebook, None);
    assert_eq!(notes.get(n2).unwrap().notebook, None);
    assert_eq!(notes.get(n3).unwrap().notebook, Some(home));

    ws.undo(notebooks::NAMESPACE).unwrap();
    assert_eq!(names(&ws), vec!["Work", "Projects", "Home"]);

    ws.undo(notes::NAMESPACE).unwrap();
    let notes = ws.notes().unwrap();
    assert_eq!(notes.get(n1).unwrap().notebook, Some(work));
    assert_eq!(notes.get(n2).unwrap().notebook, Some(projects));
}

#[test]
fn delete_tag_untags_notes() {
    let mut ws = workspace();
    let urgent = ws.create_tag("urgent").unwrap();
    let note = ws.create_note("call", None).unwrap();
    ws.tag_note(note, urgent).unwrap();

    ws.delete_tag(urgent).unwrap();
    assert!(ws.tags().unwrap().tags.is_empty());
    assert!(ws.notes().unwrap().get(note).unwrap().tags.is_empty());

    ws.undo(tags::NAMESPACE).unwrap();
    ws.undo(notes::NAMESPACE).unwrap();
    assert!(ws.tags().unwrap().contains(urgent));
    assert!(ws.notes().unwrap().get(note).unwrap().tags.contains(&urgent));
}

#[test]
fn note_lifecycle_undoes_step_by_step() {
    let mut ws = workspace();
    let nb = ws.create_notebook("Inbox", None).unwrap();
    let note = ws.create_note("draft", None).unwrap();
    ws.retitle_note(note, "final").unwrap();
    ws.move_note(note, Some(nb)).unwrap();
    ws.trash_note(note).unwrap();
    ws.restore_note(note).unwrap();

    let expect = |ws: &Workspace, title: &str, notebook: Option<NotebookId>, trashed: bool| {
        let n = ws.notes().unwrap().get(note).unwrap().clone();
        assert_eq!((n.title.as_str(), n.notebook, n.trashed), (title, notebook, trashed));
    };

    expect(&ws, "final", Some(nb), false);
    ws.undo(notes::NAMESPACE).unwrap();
    expect(&ws, "final", Some(nb), true);
    ws.undo(notes::NAMESPACE).unwrap();
    expect(&ws, "final", Some(nb), false);
    ws.undo(notes::NAMESPACE).unwrap();
    expect(&ws, "final", None, false);
    ws.undo(notes::NAMESPACE).unwrap();
    expect(&ws, "draft", None, false);
    ws.undo(notes::NAMESPACE).unwrap();
    assert!(ws.notes().unwrap().notes.is_empty());

    // Notebooks kept their own history.
    assert_eq!(names(&ws), vec!["Inbox"]);
}

// ============================================================================
// Navigation, focus, observers
// ============================================================================

#[test]
fn panes_navigate_independently() {
    let config = WorkspaceConfig {
        panes: vec!["main".into(), "sidebar".into()],
        ..WorkspaceConfig::default()
    };
    let mut ws = Workspace::new(config).unwrap();
    let nb = ws.create_notebook("A", None).unwrap();

    ws.navigate("main", NavTarget::Notebook(nb)).unwrap();
    ws.navigate("sidebar", NavTarget::Trash).unwrap();
    ws.undo("localNavigation:main").unwrap();

    assert_eq!(ws.navigation("main").unwrap().active, NavTarget::AllNotes);
    assert_eq!(ws.navigation("sidebar").unwrap().active, NavTarget::Trash);

    assert!(matches!(
        ws.navigate("main", NavTarget::Notebook(NotebookId::from_raw(77))),
        Err(NotesError::UnknownNotebook(_))
    ));
}

#[test]
fn observers_see_focus_and_replays() {
    let mut ws = workspace();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    ws.subscribe(move |event| {
        sink.borrow_mut()
            .push(format!("{}:{}:{}", event.namespace, event.operation, event.replay));
    });

    ws.focus(Some("main")).unwrap();
    ws.create_note("n", None).unwrap();
    ws.undo(notes::NAMESPACE).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            "focus:FOCUS:false",
            "notes:CREATE:false",
            "notes:SET_STATE:true",
        ]
    );
    assert!(!ws.can_undo("focus"));
}

#[test]
fn module_state_persists_as_json() {
    let mut ws = workspace();
    let nb = ws.create_notebook("Inbox", None).unwrap();
    let tag = ws.create_tag("urgent").unwrap();
    let note = ws.create_note("call", Some(nb)).unwrap();
    ws.tag_note(note, tag).unwrap();
    ws.navigate("main", NavTarget::Note(note)).unwrap();

    let json = serde_json::to_string(ws.notes().unwrap()).unwrap();
    let restored: quire_notes::notes::NotesState = serde_json::from_str(&json).unwrap();
    assert_eq!(&restored, ws.notes().unwrap());

    let nav = serde_json::to_value(ws.navigation("main").unwrap()).unwrap();
    assert_eq!(nav, serde_json::json!({ "active": { "Note": note.raw() } }));
}
