//! The authenticated dashboard: notes and reminders side by side.

use api::UserInfo;
use dioxus::prelude::*;
use ui::{use_auth, ChangeFeedPump, LogoutButton, NotesPanel, RemindersPanel};

use crate::Route;

/// Session gate in front of the dashboard.
///
/// Waits for the auth check, bounces anonymous visitors to the login page,
/// and only mounts the panel shell once a user is present.
#[component]
pub fn Dashboard() -> Element {
    let auth = use_auth();
    let nav = use_navigator();

    if auth().loading {
        return rsx! {
            div { class: "page-loading", "Loading..." }
        };
    }

    let Some(user) = auth().user else {
        nav.replace(Route::Login {});
        return rsx! {};
    };

    rsx! {
        DashboardShell { user }
    }
}

/// Panel layout plus the shared change-feed pump.
///
/// The pump is provided through context so both panels subscribe to the same
/// long-poll loop; its task dies with this component, closing the feed.
#[component]
fn DashboardShell(user: UserInfo) -> Element {
    let pump = use_context_provider(ChangeFeedPump::new);
    use_future(move || {
        let pump = pump.clone();
        async move {
            pump.run().await;
        }
    });

    rsx! {
        main { class: "dashboard",
            header { class: "dashboard-header",
                h1 { "Daydesk" }
                div { class: "dashboard-session",
                    span { class: "dashboard-user", "{user.display_name()}" }
                    LogoutButton { class: "secondary" }
                }
            }

            div { class: "dashboard-grid",
                NotesPanel {}
                RemindersPanel {}
            }
        }
    }
}
