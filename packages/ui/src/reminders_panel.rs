//! Reminders panel: agenda list with due dates and completion toggles.

use chrono::NaiveDate;
use dioxus::prelude::*;
use store::LoadPhase;

use crate::icons::{FaCalendar, FaCircleCheck, FaPlus, FaRegCircle, FaSpinner, FaTrashCan};
use crate::remote::ChangeFeedPump;
use crate::use_collection_sync;
use crate::Icon;

fn format_due(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Live list of reminders with an inline composer.
///
/// Completed rows render dimmed with a strikethrough; the toggle sends the
/// negation of whatever completion value the cached row holds.
#[component]
pub fn RemindersPanel() -> Element {
    let pump = use_context::<ChangeFeedPump>();
    let (state, sync) = use_collection_sync(move || pump.reminders());
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
                h3 { "Reminders" }
                button {
                    class: "icon-button accent round",
                    title: "New reminder",
                    onclick: toggle_composer,
                    Icon { icon: FaPlus, width: 16, height: 16 }
                }
            }

            if snap.composing {
                div { class: "composer",
                    input {
                        r#type: "text",
                        class: "composer-title",
                        placeholder: "What needs doing?",
                        value: "{snap.draft.title}",
                        autofocus: true,
                        oninput: {
                            let sync = sync.clone();
                            move |evt: FormEvent| sync.update_draft(|d| d.title = evt.value())
                        },
                    }
                    div { class: "composer-actions spread",
                        input {
                            r#type: "date",
                            class: "composer-date",
                            value: snap
                                .draft
                                .due_date
                                .map(|d| d.format("%Y-%m-%d").to_string())
                                .unwrap_or_default(),
                            oninput: {
                                let sync = sync.clone();
                                move |evt: FormEvent| {
                                    let parsed =
                                        NaiveDate::parse_from_str(&evt.value(), "%Y-%m-%d").ok();
                                    sync.update_draft(|d| d.due_date = parsed);
                                }
                            },
                        }
                        button { class: "primary", onclick: submit, "Add" }
                    }
                }
            }

            div { class: "panel-list",
                if snap.items.is_empty() && !snap.composing {
                    div { class: "panel-empty", "Nothing to remember." }
                }

                for reminder in snap.items.iter() {
                    div {
                        key: "{reminder.id}",
                        class: if reminder.is_completed { "reminder-row completed" } else { "reminder-row" },
                        button {
                            class: "icon-button toggle",
                            title: if reminder.is_completed { "Mark as open" } else { "Mark as done" },
                            onclick: {
                                let sync = sync.clone();
                                let reminder = reminder.clone();
                                move |_| {
                                    let sync = sync.clone();
                                    let reminder = reminder.clone();
                                    spawn(async move {
                                        sync.update(&reminder.id, reminder.toggle_completion())
                                            .await;
                                    });
                                }
                            },
                            if reminder.is_completed {
                                Icon { icon: FaCircleCheck, width: 20, height: 20 }
                            } else {
                                Icon { icon: FaRegCircle, width: 20, height: 20 }
                            }
                        }

                        div { class: "reminder-text",
                            div { class: "reminder-title", "{reminder.title}" }
                            {reminder.due_date.map(|due| rsx! {
                                div { class: "reminder-due",
                                    Icon { icon: FaCalendar, width: 10, height: 10 }
                                    "{format_due(due)}"
                                }
                            })}
                        }

                        button {
                            class: "icon-button subtle",
                            title: "Delete reminder",
                            onclick: {
                                let sync = sync.clone();
                                let id = reminder.id.clone();
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
                }
            }
        }
    }
}
