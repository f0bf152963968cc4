//! Notes panel: list, composer, and delete actions for free-form notes.

use dioxus::prelude::*;
use store::LoadPhase;

use crate::icons::{FaPlus, FaSpinner, FaTrashCan};
use crate::remote::ChangeFeedPump;
use crate::use_collection_sync;
use crate::Icon;

/// Live list of notes with an inline composer.
///
/// Pure presenter: every piece of state it renders comes out of the
/// synchronizer, and every user intent dispatches straight back into it.
#[component]
pub fn NotesPanel() -> Element {
    let pump = use_context::<ChangeFeedPump>();
    let (state, sync) = use_collection_sync(move || pump.notes());
    let snap = state();

    if snap.phase == LoadPhase::Loading {
        return rsx! {
            section { class: "panel panel-loading",
                Icon { icon: FaSpinner, width: 20, height: 20 }
            }
        };
    }

    let toggle_composer = {
        let sync = sync.clone();
        move |_| {
            let composing = sync.snapshot().composing;
            sync.set_composing(!composing);
        }
    };

    let submit = {
        let sync = sync.clone();
        move |_| {
            let sync = sync.clone();
            spawn(async move {
                sync.create().await;
            });
        }
    };

    rsx! {
        section { class: "panel",
            header { class: "panel-header",
                h3 { "Notes" }
                button {
                    class: "icon-button accent round",
                    title: "New note",
                    onclick: toggle_composer,
                    Icon { icon: FaPlus, width: 16, height: 16 }
                }
            }

            if snap.composing {
                div { class: "composer",
                    input {
                        r#type: "text",
                        class: "composer-title",
                        placeholder: "Title",
                        value: "{snap.draft.title}",
                        oninput: {
                            let sync = sync.clone();
                            move |evt: FormEvent| sync.update_draft(|d| d.title = evt.value())
                        },
                    }
                    textarea {
                        class: "composer-body",
                        placeholder: "Write your note here...",
                        value: "{snap.draft.content}",
                        oninput: {
                            let sync = sync.clone();
                            move |evt: FormEvent| sync.update_draft(|d| d.content = evt.value())
                        },
                    }
                    div { class: "composer-actions",
                        button { class: "primary", onclick: submit, "Add" }
                    }
                }
            }

            div { class: "panel-list",
                if snap.items.is_empty() && !snap.composing {
                    div { class: "panel-empty", "No notes yet." }
                }

                for note in snap.items.iter() {
                    article { key: "{note.id}", class: "note-card",
                        div { class: "note-card-head",
                            if !note.title.is_empty() {
                                h4 { "{note.title}" }
                            }
                            button {
                                class: "icon-button subtle",
                                title: "Delete note",
                                onclick: {
                                    let sync = sync.clone();
                                    let id = note.id.clone();
                                    move |_| {
                                        let sync = sync.clone();
                                        let id = id.clone();
                                        spawn(async move {
                                            sync.remove(&id).await;
                                        });
                                    }
                                },
                                Icon { icon: FaTrashCan, width: 14, height: 14 }
                            }
                        }
                        p { class: "note-card-body", "{note.content}" }
                    }
                }
            }
        }
    }
}
