#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use reform_core::{FormError, Validations, validate::required};
    use reform_navigation::{AlwaysAnswer, ConfirmPrompt, Router};
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};

    use crate::state::*;
    use crate::view::FieldKind;

    fn submit_echo(data: &Value) -> Result<Option<Value>, reform_core::BoxError> {
        Ok(Some(data.clone()))
    }

    fn plain_config(router: &Router) -> FormConfig {
        FormConfig::new(router.clone(), Rc::new(AlwaysAnswer(true)), submit_echo)
    }

    #[test]
    fn test_required_text_field_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();

        let state = FormState::with_data(json!({ "name": "" }));
        let field = state
            .text(TextConfig {
                validations: Validations::Single(required()),
                ..TextConfig::new("name")
            })
            .unwrap();

        let FieldKind::Text { on_input, value, .. } = &field.kind else {
            panic!("expected a text field");
        };
        let errors = &field.errors;

        on_input("");
        assert!(!errors().is_empty());
        assert_eq!(state.get(), json!({ "name": "" }));
        assert!(!state.is_dirty().get());

        on_input("Alice");
        assert!(errors().is_empty());
        assert_eq!(value(), "Alice");
        assert_eq!(state.get(), json!({ "name": "Alice" }));
        assert!(state.is_dirty().get());
    }

    #[test]
    fn test_field_binding_seeds_default_silently() {
        let state = FormState::with_data(json!({}));
        state
            .text(TextConfig {
                initial_value: "anonymous".into(),
                ..TextConfig::new("name")
            })
            .unwrap();

        assert_eq!(state.get(), json!({ "name": "anonymous" }));
        assert!(!state.is_dirty().get());

        // a second bind must not clobber the stored value
        state
            .text(TextConfig {
                initial_value: "other".into(),
                ..TextConfig::new("name")
            })
            .unwrap();
        assert_eq!(state.get(), json!({ "name": "anonymous" }));
    }

    #[test]
    fn test_set_marks_dirty_commit_clears_it() {
        let state = FormState::with_data(json!({}));

        state.set(json!({ "a": 1 }));
        assert!(state.is_dirty().get());

        state.commit(json!({ "a": 2 }));
        assert!(!state.is_dirty().get());
        assert_eq!(state.get(), json!({ "a": 2 }));
    }

    #[test]
    fn test_clear_restores_latest_edit_default() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));

        let mut cfg = plain_config(&router);
        cfg.is_edit = true;
        state.form(cfg, vec![]).unwrap();
        assert!(state.is_edit().get());

        state.is_edit().set(false);
        state.set(json!({ "x": 1 }));
        state.clear();

        assert!(!state.is_dirty().get());
        assert!(state.is_edit().get());
    }

    #[test]
    fn test_disabled_binding_follows_edit_mode() {
        let state = FormState::with_data(json!({}));
        let field = state.text(TextConfig::new("name")).unwrap();

        assert!((field.disabled)());
        state.is_edit().set(true);
        assert!(!(field.disabled)());
    }

    #[test]
    fn test_submit_commits_result_and_notifies() {
        let router = Router::new();
        let state = FormState::with_data(json!({ "n": 1 }));
        state.set(json!({ "n": 2 }));

        let success = Rc::new(RefCell::new(None));
        let mut cfg = FormConfig::new(router, Rc::new(AlwaysAnswer(true)), |_| {
            Ok(Some(json!({ "n": 3 })))
        });
        let s = success.clone();
        cfg.on_success = Some(Rc::new(move |v: &Value| {
            *s.borrow_mut() = Some(v.clone());
        }));

        let form = state.form(cfg, vec![]).unwrap();
        let result = (form.on_submit)().unwrap();

        assert_eq!(result, Some(json!({ "n": 3 })));
        assert_eq!(state.get(), json!({ "n": 3 }));
        assert!(!state.is_dirty().get());
        assert_eq!(*success.borrow(), Some(json!({ "n": 3 })));
    }

    #[test]
    fn test_submit_falsy_result_leaves_state_alone() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));
        state.set(json!({ "n": 1 }));

        let cfg = FormConfig::new(router, Rc::new(AlwaysAnswer(true)), |_| Ok(None));
        let form = state.form(cfg, vec![]).unwrap();
        assert_eq!((form.on_submit)().unwrap(), None);
        assert!(state.is_dirty().get());
        assert_eq!(state.get(), json!({ "n": 1 }));
    }

    #[test]
    fn test_submit_error_propagates_unless_handled() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));

        let cfg = FormConfig::new(router.clone(), Rc::new(AlwaysAnswer(true)), |_| {
            Err("backend down".into())
        });
        let form = state.form(cfg, vec![]).unwrap();
        assert!(matches!((form.on_submit)(), Err(FormError::Submit(_))));

        let handled = Rc::new(RefCell::new(None));
        let mut cfg = FormConfig::new(router, Rc::new(AlwaysAnswer(true)), |_| {
            Err("backend down".into())
        });
        let h = handled.clone();
        cfg.on_error = Some(Rc::new(move |e: &reform_core::BoxError| {
            *h.borrow_mut() = Some(e.to_string());
        }));
        let form = state.form(cfg, vec![]).unwrap();
        assert_eq!((form.on_submit)().unwrap(), None);
        assert_eq!(handled.borrow().as_deref(), Some("backend down"));
    }

    #[test]
    fn test_second_submit_while_pending_is_rejected() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));

        type SubmitRc = Rc<dyn Fn() -> Result<Option<Value>, FormError>>;
        let reentry: Rc<RefCell<Option<SubmitRc>>> = Rc::new(RefCell::new(None));
        let verdict = Rc::new(RefCell::new(None));

        let r = reentry.clone();
        let v = verdict.clone();
        let cfg = FormConfig::new(router, Rc::new(AlwaysAnswer(true)), move |_| {
            if let Some(submit) = r.borrow().as_ref() {
                *v.borrow_mut() = Some(matches!(submit(), Err(FormError::SubmitPending)));
            }
            Ok(None)
        });

        let form = state.form(cfg, vec![]).unwrap();
        *reentry.borrow_mut() = Some(form.on_submit.clone());
        (form.on_submit)().unwrap();

        assert_eq!(*verdict.borrow(), Some(true));
        // the guard resets once the first submit finishes
        assert!((form.on_submit)().is_ok());
    }

    #[test]
    fn test_dirty_navigation_guard_veto_and_accept() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));

        let mut cfg = plain_config(&router);
        cfg.prompt = Rc::new(AlwaysAnswer(false));
        state.form(cfg, vec![]).unwrap();
        state.set(json!({ "x": 1 }));

        // declined: a catchable cancellation, dirty stays true
        let err = router.navigate("/away").unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(router.current(), "/");
        assert!(state.is_dirty().get());

        // accepted: state clears and navigation goes through
        let mut cfg = plain_config(&router);
        cfg.prompt = Rc::new(AlwaysAnswer(true));
        state.form(cfg, vec![]).unwrap();
        router.navigate("/away").unwrap();
        assert_eq!(router.current(), "/away");
        assert!(!state.is_dirty().get());
    }

    #[test]
    fn test_clean_form_does_not_prompt() {
        struct PanicPrompt;
        impl ConfirmPrompt for PanicPrompt {
            fn confirm(&self, _message: &str) -> bool {
                panic!("prompted without dirty state");
            }
        }

        let router = Router::new();
        let state = FormState::with_data(json!({}));
        let mut cfg = plain_config(&router);
        cfg.prompt = Rc::new(PanicPrompt);
        state.form(cfg, vec![]).unwrap();

        router.navigate("/elsewhere").unwrap();
        assert_eq!(router.current(), "/elsewhere");
    }

    #[test]
    fn test_guard_when_bypasses_prompt_without_clearing() {
        struct PanicPrompt;
        impl ConfirmPrompt for PanicPrompt {
            fn confirm(&self, _message: &str) -> bool {
                panic!("prompt should be gated off");
            }
        }

        let router = Router::new();
        let state = FormState::with_data(json!({}));
        let mut cfg = plain_config(&router);
        cfg.prompt = Rc::new(PanicPrompt);
        cfg.guard_when = Some(Rc::new(|| false));
        state.form(cfg, vec![]).unwrap();
        state.set(json!({ "x": 1 }));

        router.navigate("/away").unwrap();
        assert!(state.is_dirty().get());
    }

    #[test]
    fn test_guards_released_after_successful_navigation() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));
        state.form(plain_config(&router), vec![]).unwrap();

        router.navigate("/first").unwrap();

        // registrations are gone: a dirty form no longer guards this router
        state.set(json!({ "x": 1 }));
        assert!(router.check_unload().is_none());
        router.navigate("/second").unwrap();
        assert!(state.is_dirty().get());
    }

    #[test]
    fn test_unload_guard_reports_while_dirty() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));
        state.form(plain_config(&router), vec![]).unwrap();

        assert!(router.check_unload().is_none());
        state.set(json!({ "x": 1 }));
        assert!(router.check_unload().is_some());

        state.clear();
        assert!(router.check_unload().is_none());
    }

    #[test]
    fn test_rebinding_form_replaces_guards() {
        let router = Router::new();
        let state = FormState::with_data(json!({}));

        state.form(plain_config(&router), vec![]).unwrap();
        state.form(plain_config(&router), vec![]).unwrap();
        state.set(json!({ "x": 1 }));

        // exactly one unload guard answers, not a leaked pair
        assert!(router.check_unload().is_some());
        state.clear();
        assert!(router.check_unload().is_none());
    }

    #[test]
    fn test_keyed_form_loads_on_key_change() {
        let router = Router::new();
        let state = FormState::keyed(|data| {
            data.get("id").and_then(|v| v.as_str()).map(String::from)
        });

        let loads = Rc::new(RefCell::new(Vec::new()));
        let make_cfg = |key: &str| {
            let mut cfg = plain_config(&router);
            cfg.key = Some(key.to_string());
            let loads = loads.clone();
            cfg.load = Some(Rc::new(move |key: &str| {
                loads.borrow_mut().push(key.to_string());
                Ok(json!({ "id": key, "score": 10 }))
            }));
            cfg
        };

        state.form(make_cfg("a"), vec![]).unwrap();
        assert_eq!(state.get(), json!({ "id": "a", "score": 10 }));
        assert!(!state.is_dirty().get());

        // same key: no reload; new key: reload
        state.form(make_cfg("a"), vec![]).unwrap();
        state.form(make_cfg("b"), vec![]).unwrap();
        assert_eq!(*loads.borrow(), vec!["a", "b"]);
        assert_eq!(state.get(), json!({ "id": "b", "score": 10 }));
    }

    #[test]
    fn test_keyed_form_requires_load_callback() {
        let router = Router::new();
        let state = FormState::keyed(|data| {
            data.get("id").and_then(|v| v.as_str()).map(String::from)
        });

        let mut cfg = plain_config(&router);
        cfg.key = Some("a".into());
        assert!(matches!(state.form(cfg, vec![]), Err(FormError::Config(_))));
    }

    #[test]
    fn test_typed_roundtrip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Profile {
            name: String,
            age: u8,
        }

        let state = FormState::with_data(json!({}));
        state
            .set_from(&Profile { name: "Ada".into(), age: 36 })
            .unwrap();
        assert!(state.is_dirty().get());

        let profile: Profile = state.get_as().unwrap();
        assert_eq!(profile, Profile { name: "Ada".into(), age: 36 });
    }

    #[test]
    fn test_drop_down_seeds_first_option() {
        let state = FormState::with_data(json!({}));
        let field = state
            .drop_down(DropDownConfig::new(
                "level",
                vec!["LOW".into(), "HIGH".into()],
            ))
            .unwrap();

        assert_eq!(state.get(), json!({ "level": "LOW" }));
        assert!(!state.is_dirty().get());

        let FieldKind::DropDown { on_input, selected, .. } = &field.kind else {
            panic!("expected a drop-down");
        };
        on_input("HIGH");
        assert_eq!(selected().as_deref(), Some("HIGH"));
        assert!(state.is_dirty().get());

        assert!(
            state
                .drop_down(DropDownConfig::new("level", vec![]))
                .is_err()
        );
    }

    #[test]
    fn test_multiselect_field_toggles() {
        let state = FormState::with_data(json!({}));
        let field = state
            .multiselect(MultiSelectConfig::new(
                "colors",
                vec!["red".into(), "green".into(), "blue".into()],
            ))
            .unwrap();

        let FieldKind::MultiSelect { on_toggle, selected, .. } = &field.kind else {
            panic!("expected a multiselect");
        };
        on_toggle("blue");
        on_toggle("red");
        assert_eq!(selected(), vec!["blue", "red"]);
        on_toggle("blue");
        assert_eq!(selected(), vec!["red"]);
        assert!(state.is_dirty().get());

        let bad = FormState::with_data(json!({ "colors": "nope" }));
        assert!(
            bad.multiselect(MultiSelectConfig::new("colors", vec!["red".into()]))
                .is_err()
        );
    }

    #[test]
    fn test_tags_field_rejects_duplicates_and_bad_storage() {
        let state = FormState::with_data(json!({}));
        let field = state.tags(TagsConfig::new("labels")).unwrap();

        let FieldKind::Tags { on_add, on_remove, tags, .. } = &field.kind else {
            panic!("expected a tags field");
        };
        assert!(on_add("red"));
        assert!(!on_add("red"));
        on_remove("missing");
        assert_eq!(tags(), vec!["red"]);

        let bad = FormState::with_data(json!({ "labels": [1, 2] }));
        assert!(matches!(
            bad.tags(TagsConfig::new("labels")),
            Err(FormError::Config(_))
        ));
    }

    #[test]
    fn test_group_expand_state_is_shared_per_key() {
        let state = FormState::with_data(json!({}));
        let group = state.group(
            GroupConfig {
                expand_key: Some("details".into()),
                ..GroupConfig::new()
            },
            vec![],
        );

        let FieldKind::Group { expanded, on_toggle, .. } = &group.kind else {
            panic!("expected a group");
        };
        assert!(!expanded());
        on_toggle();
        assert!(expanded());
        // the same key sees the same cell
        assert!(state.expanded("details").get());

        let pinned = state.group(
            GroupConfig {
                expandable: false,
                ..GroupConfig::new()
            },
            vec![],
        );
        let FieldKind::Group { expanded, on_toggle, .. } = &pinned.kind else {
            panic!("expected a group");
        };
        assert!(expanded());
        on_toggle();
        assert!(expanded());
    }

    #[test]
    fn test_bad_path_is_a_config_error() {
        let state = FormState::with_data(json!({}));
        assert!(matches!(
            state.text(TextConfig::new("a..b")),
            Err(FormError::Config(_))
        ));
    }
}
