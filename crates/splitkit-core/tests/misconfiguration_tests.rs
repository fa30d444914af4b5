//! Misconfiguration handling per environment

use parking_lot::Mutex;
use splitkit_core::{ClientConfig, ClientError, SplitClient};
use splitkit_registry::VisitorId;
use splitkit_test_utils::{capture_logs, client, clown, RecordingAnalytics, StaticIdentifierService};
use splitkit_vary::{AlertSink, Environment, Misconfiguration};
use std::sync::Arc;
use tracing::Level;

const UNCOVERED: &str = "vary for \"button_size\" does not configure variants three and four";

fn vary_button_size(client: &SplitClient) -> Result<&'static str, ClientError> {
    client.vary(None, &clown(), "button_size", "header", |v| {
        v.when(["one"], || "one")?;
        v.default("two", || "two")?;
        Ok(())
    })
}

#[test]
fn development_raises() {
    let client = client(
        ClientConfig::new(),
        RecordingAnalytics::new(),
        StaticIdentifierService::new(),
    );

    let err = vary_button_size(&client).unwrap_err();
    assert!(!err.is_configuration());
    assert_eq!(err.to_string(), UNCOVERED);
}

#[test]
fn production_logs_and_keeps_running() {
    let analytics = RecordingAnalytics::new();
    let config = ClientConfig::new().with_environment(Environment::Production);
    let client = client(config, analytics.clone(), StaticIdentifierService::new());

    let (result, logs) = capture_logs(|| vary_button_size(&client));

    assert_eq!(result.unwrap(), "one");
    assert_eq!(logs.messages_at(Level::ERROR), vec![UNCOVERED.to_string()]);
    assert_eq!(analytics.tracked_splits(), vec!["button_size"]);
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<String>>);

impl AlertSink for RecordingSink {
    fn notify(&self, error: &Misconfiguration, error_message: &str) {
        assert_eq!(error.message(), error_message);
        self.0.lock().push(error_message.to_string());
    }
}

#[test]
fn production_forwards_to_alert_sink() {
    let sink = Arc::new(RecordingSink::default());
    let config = ClientConfig::new().with_environment(Environment::Production);
    let client = client(config, RecordingAnalytics::new(), StaticIdentifierService::new())
        .with_alert_sink(sink.clone());

    let mut session = client.online_session(Some(VisitorId::new("fake_visitor_id")));
    let current = splitkit_test_utils::StaticCurrentIdentity::found(&clown());
    let mut web = splitkit_core::WebContext::new(&mut session, &current);

    let value = client
        .vary(Some(&mut web), &clown(), "button_size", "header", |v| {
            v.when(["one", "bogus"], || 1)?;
            v.default("two", || 2)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(value, 1);
    assert_eq!(
        *sink.0.lock(),
        vec![
            "vary for \"button_size\" configures unknown variant \"bogus\"".to_string(),
            UNCOVERED.to_string(),
        ]
    );
}

#[test]
fn unknown_split_is_fatal_everywhere() {
    for environment in [Environment::Development, Environment::Production] {
        let config = ClientConfig::new().with_environment(environment);
        let client = client(config, RecordingAnalytics::new(), StaticIdentifierService::new());

        let err = client
            .vary(None, &clown(), "not_a_real_split", "header", |v| {
                v.default("one", || ())?;
                Ok(())
            })
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "unknown split: not_a_real_split");
    }
}
