use fallback_core::{Config, DiagnosticCode, Factory, Fallback, LoadError, LoadState, ResolveError};
use fallback_test_helpers::fixtures::{counting, sum};
use fallback_test_helpers::{MockDiagnosticHandler, MockFetcher, Recorder};
use serde_json::json;
use std::error::Error as _;
use std::sync::Arc;

fn fallback_with_handler() -> (Fallback, Arc<MockDiagnosticHandler>) {
    let handler = MockDiagnosticHandler::new();
    let fallback = Fallback::with_dependencies(Config::default(), handler.clone());
    (fallback, handler)
}

#[test]
fn test_two_module_cycle() {
    let mut fallback = Fallback::default();
    fallback.define("a", sum(0), &["b"]);
    fallback.define("b", sum(0), &["a"]);

    let recorder = Recorder::new();
    fallback.require("a", recorder.callback());

    assert_eq!(
        recorder.results(),
        vec![Err(ResolveError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()]
        })]
    );
    assert!(!fallback.lookup("a").unwrap().invoked());
    assert!(!fallback.lookup("b").unwrap().invoked());
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let mut fallback = Fallback::default();
    fallback.define("narcissus", sum(0), &["narcissus"]);

    let recorder = Recorder::new();
    fallback.require("narcissus", recorder.callback());

    let Some(Err(err)) = recorder.last() else {
        panic!("expected a failure");
    };
    assert_eq!(err.to_string(), "cyclic dependency: narcissus -> narcissus");
}

#[test]
fn test_cycle_through_fetched_module() {
    let mut fallback = Fallback::default();
    let mut fetcher = MockFetcher::new().function("remote", &["local"], |_| Ok(json!(null)));
    fallback.define("local", sum(0), &["remote"]);

    let recorder = Recorder::new();
    fallback.require("local", recorder.callback());
    fallback.run_until_stalled(&mut fetcher);

    assert_eq!(
        recorder.results(),
        vec![Err(ResolveError::CyclicDependency {
            cycle: vec!["local".into(), "remote".into(), "local".into()]
        })]
    );
}

#[test]
fn test_cycle_does_not_poison_unrelated_modules() {
    let mut fallback = Fallback::default();
    fallback.define("a", sum(0), &["b"]);
    fallback.define("b", sum(0), &["a"]);
    fallback.define("ok", Factory::value(1), &[]);

    let recorder = Recorder::new();
    fallback.require("a", recorder.callback());
    fallback.require("ok", recorder.callback());

    assert_eq!(recorder.last(), Some(Ok(vec![json!(1)])));
}

#[test]
fn test_missing_module_reports_load_failure() {
    let mut fallback = Fallback::default();
    let mut fetcher = MockFetcher::new();

    let recorder = Recorder::new();
    fallback.require("ghost", recorder.callback());
    fallback.run_until_stalled(&mut fetcher);

    let expected = ResolveError::UnresolvedDependency {
        name: "ghost".into(),
        cause: Some(LoadError::new("ghost.js", "404 Not Found")),
    };
    assert_eq!(recorder.results(), vec![Err(expected.clone())]);

    let source = expected.source().map(ToString::to_string);
    assert_eq!(
        source.as_deref(),
        Some("failed to load `ghost.js`: 404 Not Found")
    );

    let loader = fallback.lookup("ghost").unwrap().loader();
    assert_eq!(loader.state(), LoadState::Failed);
    assert_eq!(loader.success(), Some(false));
    assert_eq!(loader.failed().len(), 1);
    assert!(loader.duration().is_some());
}

#[test]
fn test_missing_dependency_fails_dependent() {
    let mut fallback = Fallback::default();
    let mut fetcher = MockFetcher::new().fail("cdn-lib", "connection reset");
    let (factory, calls) = counting(1);
    fallback.define("app", factory, &["cdn-lib"]);

    let recorder = Recorder::new();
    fallback.require("app", recorder.callback());
    fallback.run_until_stalled(&mut fetcher);

    assert!(matches!(
        recorder.last(),
        Some(Err(ResolveError::UnresolvedDependency { name, cause: Some(_) })) if name == "cdn-lib"
    ));
    assert_eq!(calls.get(), 0);
    assert!(!fallback.lookup("app").unwrap().invoked());
    assert_eq!(fallback.stats().batches.unsuccessful, 1);
}

#[test]
fn test_script_that_defines_nothing() {
    let mut fallback = Fallback::default();
    let mut fetcher = MockFetcher::new().empty("blank");

    let recorder = Recorder::new();
    fallback.require("blank", recorder.callback());
    fallback.run_until_stalled(&mut fetcher);

    assert_eq!(
        recorder.results(),
        vec![Err(ResolveError::UnresolvedDependency {
            name: "blank".into(),
            cause: None
        })]
    );
}

#[test]
fn test_script_defining_another_name() {
    let mut fallback = Fallback::default();
    let mut fetcher =
        MockFetcher::new().serving("jquery", "jquery-3.7", &[], Factory::value("$"));

    let recorder = Recorder::new();
    fallback.require("jquery", recorder.callback());
    fallback.run_until_stalled(&mut fetcher);

    assert!(matches!(
        recorder.last(),
        Some(Err(ResolveError::UnresolvedDependency { name, .. })) if name == "jquery"
    ));
    assert!(fallback.lookup("jquery-3.7").unwrap().is_defined());
}

#[test]
fn test_later_require_of_failed_module_fails_without_refetch() {
    let mut fallback = Fallback::default();
    let mut fetcher = MockFetcher::new();

    fallback.require("ghost", |_, _| {});
    fallback.run_until_stalled(&mut fetcher);

    let recorder = Recorder::new();
    fallback.require("ghost", recorder.callback());

    assert_eq!(recorder.calls(), 1);
    assert!(recorder.last().unwrap().is_err());
    assert!(fallback.take_fetches().is_empty());
    assert_eq!(fetcher.fetch_count("ghost"), 1);
}

#[test]
fn test_factory_error_is_memoized_and_propagates() {
    let mut fallback = Fallback::default();
    let (consumer, consumer_calls) = counting(0);
    fallback.define("broken", Factory::function(|_| anyhow::bail!("boom")), &[]);
    fallback.define("consumer", consumer, &["broken"]);

    let recorder = Recorder::new();
    fallback.require("consumer", recorder.callback());
    fallback.require("broken", recorder.callback());

    let expected = Err(ResolveError::FactoryError {
        name: "broken".into(),
        message: "boom".into(),
    });
    assert_eq!(recorder.results(), vec![expected.clone(), expected]);
    assert_eq!(consumer_calls.get(), 0);

    let broken = fallback.lookup("broken").unwrap();
    assert!(broken.invoked());
    assert_eq!(broken.error(), Some("boom"));
}

#[test]
fn test_first_failure_in_request_order_wins() {
    let mut fallback = Fallback::default();
    fallback.define("cyclic", sum(0), &["cyclic"]);
    fallback.define("broken", Factory::function(|_| anyhow::bail!("nope")), &[]);

    let recorder = Recorder::new();
    fallback.require(["broken", "cyclic"], recorder.callback());

    assert!(matches!(
        recorder.last(),
        Some(Err(ResolveError::FactoryError { name, .. })) if name == "broken"
    ));
    assert!(fallback.take_fetches().is_empty());
}

#[test]
fn test_failed_request_does_not_block_other_pending_requests() {
    let mut fallback = Fallback::default();
    let mut fetcher = MockFetcher::new().module("good", &[], "fine");

    let failing = Recorder::new();
    let passing = Recorder::new();
    fallback.require(["good", "ghost"], failing.callback());
    fallback.require("good", passing.callback());
    fallback.run_until_stalled(&mut fetcher);

    assert!(failing.last().unwrap().is_err());
    assert_eq!(passing.results(), vec![Ok(vec![json!("fine")])]);
}

#[test]
fn test_redefinition_after_invoke_is_ignored() {
    let (mut fallback, handler) = fallback_with_handler();
    fallback.define("a", Factory::value(1), &[]);
    fallback.require("a", |_, _| {});

    fallback.define("a", Factory::value(2), &[]);

    let recorder = Recorder::new();
    fallback.require("a", recorder.callback());
    assert_eq!(recorder.last(), Some(Ok(vec![json!(1)])));
    assert_eq!(handler.codes(), vec![DiagnosticCode::Redefinition]);
}

#[test]
fn test_redefinition_before_invoke_replaces() {
    let (mut fallback, handler) = fallback_with_handler();
    fallback.define("a", Factory::value(1), &[]);
    fallback.define("a", Factory::value(2), &[]);

    let recorder = Recorder::new();
    fallback.require("a", recorder.callback());

    assert_eq!(recorder.last(), Some(Ok(vec![json!(2)])));
    assert!(handler.codes().is_empty());
}

#[test]
fn test_alias_collision_keeps_first_binding() {
    let (mut fallback, handler) = fallback_with_handler();
    fallback.define("jquery", Factory::value("jq"), &[]);
    fallback.define("zepto", Factory::value("zp"), &[]);
    fallback.alias("jquery", "$");
    fallback.alias("zepto", "$");

    let recorder = Recorder::new();
    fallback.require("$", recorder.callback());

    assert_eq!(recorder.last(), Some(Ok(vec![json!("jq")])));
    assert_eq!(handler.codes(), vec![DiagnosticCode::AliasCollision]);
}

#[test]
fn test_alias_of_unknown_module() {
    let (mut fallback, handler) = fallback_with_handler();
    fallback.alias("nothing", "nil");

    assert!(fallback.lookup("nil").is_none());
    assert_eq!(handler.codes(), vec![DiagnosticCode::UnknownModule]);
}

#[test]
fn test_defining_an_alias_name_is_rejected() {
    let (mut fallback, handler) = fallback_with_handler();
    fallback.define("jquery", Factory::value("jq"), &[]);
    fallback.alias("jquery", "$");
    fallback.define("$", Factory::value("other"), &[]);

    assert_eq!(fallback.lookup("$").unwrap().name(), "jquery");
    assert_eq!(handler.codes(), vec![DiagnosticCode::AliasCollision]);
}

#[test]
fn test_invalid_names_are_dropped_with_warning() {
    let (mut fallback, handler) = fallback_with_handler();
    fallback.define("real", Factory::value(true), &[]);

    let recorder = Recorder::new();
    fallback.require(vec!["", "real", "  "], recorder.callback());
    fallback.define("   ", Factory::value(1), &[]);

    assert_eq!(recorder.last(), Some(Ok(vec![json!(true)])));
    assert_eq!(
        handler.codes(),
        vec![DiagnosticCode::InvalidName, DiagnosticCode::InvalidName]
    );
}

#[test]
fn test_unexpected_completion_is_ignored() {
    let (mut fallback, handler) = fallback_with_handler();
    fallback.define("done", Factory::value(1), &[]);

    fallback.complete("done", Err(LoadError::new("done.js", "late failure")));
    fallback.complete("never-requested", Err(LoadError::new("x.js", "?")));

    let loader = fallback.lookup("done").unwrap().loader();
    assert_eq!(loader.state(), LoadState::Unloaded);
    assert!(loader.failed().is_empty());
    assert_eq!(
        handler.codes(),
        vec![
            DiagnosticCode::UnexpectedCompletion,
            DiagnosticCode::UnexpectedCompletion
        ]
    );
}

#[test]
fn test_config_warnings() {
    let (mut fallback, handler) = fallback_with_handler();

    let config = fallback.config(&json!({ "base": 7 })).clone();
    fallback.config(&json!(["not", "an", "object"]));
    fallback.config(&json!({ "amd": true }));

    assert_eq!(config, Config::default());
    assert_eq!(
        handler.codes(),
        vec![
            DiagnosticCode::InvalidValue,
            DiagnosticCode::InvalidValue,
            DiagnosticCode::ConfigRejected
        ]
    );
}
