//! Login page view with email + password form.

use dioxus::prelude::*;
use ui::{use_auth, AuthState};

use crate::Route;

/// Login page component.
#[component]
pub fn Login() -> Element {
    let mut auth = use_auth();
    let nav = use_navigator();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut failed = use_signal(|| false);

    // Already signed in: straight to the dashboard.
    if !auth().loading && auth().user.is_some() {
        nav.replace(Route::Dashboard {});
        return rsx! {};
    }

    let submit = move |evt: FormEvent| {
        evt.prevent_default();
        async move {
            match api::login_password(email(), password()).await {
                Ok(user) => {
                    auth.set(AuthState {
                        user: Some(user),
                        loading: false,
                    });
                    nav.replace(Route::Dashboard {});
                }
                Err(e) => {
                    tracing::error!("Login failed: {}", e);
                    failed.set(true);
                }
            }
        }
    };

    rsx! {
        div { class: "login-page",
            div { class: "login-card",
                h1 { "Sign in" }

                if failed() {
                    div { class: "login-error",
                        "Could not sign in. Check your credentials."
                    }
                }

                form { class: "login-form", onsubmit: submit,
                    div { class: "form-field",
                        label { r#for: "email", "Email" }
                        input {
                            id: "email",
                            name: "email",
                            r#type: "email",
                            required: true,
                            placeholder: "user@example.com",
                            value: "{email}",
                            oninput: move |evt| email.set(evt.value()),
                        }
                    }

                    div { class: "form-field",
                        label { r#for: "password", "Password" }
                        input {
                            id: "password",
                            name: "password",
                            r#type: "password",
                            required: true,
                            placeholder: "••••••••",
                            value: "{password}",
                            oninput: move |evt| password.set(evt.value()),
                        }
                    }

                    button { class: "primary wide", r#type: "submit", "Sign in" }
                }

                div { class: "login-footer",
                    p { "\"Ideas are bulletproof.\"" }
                }
            }
        }
    }
}
