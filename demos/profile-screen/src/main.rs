//! Profile screen demo
//!
//! Drives a [`FetchController`] the way a view would over its lifetime:
//! mount, a dependency change, overlapping requests, an error response,
//! a manual override, a background refetch and finally unmount.

use composable_fetch_core::{
    FetchConfig, FetchState, NoticeDuration, Notifier, OperationError, Response, deps,
};
use composable_fetch_runtime::metrics::MetricsExporter;
use composable_fetch_runtime::{ControllerSettings, FetchController, TriggerOptions};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Profile {
    name: String,
    followers: u32,
}

/// Prints notices the way a toast would show them
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, duration: NoticeDuration) {
        println!("  [toast:{duration}] {message}");
    }

    fn session_expired(&self) {
        println!("  [session] expired, the host would sign out here");
    }
}

/// Simulated backend: user ids map to canned responses, with latency
/// decreasing for later ids so that overlapping requests settle out of order.
async fn fetch_profile(params: Vec<Value>) -> Result<Response, OperationError> {
    let user = params.first().and_then(Value::as_u64).unwrap_or_default();
    tokio::time::sleep(Duration::from_millis(200_u64.saturating_sub(user * 40))).await;

    match user {
        1..=3 => Ok(Response::ok(json!({
            "value": { "name": format!("user-{user}"), "followers": user * 100 }
        }))),
        4 => Ok(Response::with_status(404)
            .data(json!({ "msg": "Profile not found", "description": "It may have been deleted" }))),
        5 => Ok(Response::with_status(401).message("Session expired")),
        _ => Err(OperationError::without_message()),
    }
}

fn render(label: &str, state: &FetchState<Profile>) {
    let data = state
        .data
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| format!("{} ({} followers)", p.name, p.followers));
    println!(
        "{label:<28} loading={:<5} refetching={:<5} error={:<24} data={data}",
        state.loading,
        state.refetching,
        state.error.as_deref().unwrap_or("-"),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profile_screen=info,composable_fetch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut exporter = MetricsExporter::new();
    exporter.install()?;

    println!("=== Profile Screen: fetch controller lifecycle ===\n");

    let settings = ControllerSettings::from_env()?;
    let controller = FetchController::<Profile>::with_settings(
        FetchConfig::new()
            .default_params(vec![json!(1)])
            .dependencies(deps![1])
            .run_on_activation(true)
            .show_loader_on_activation(true),
        fetch_profile,
        ConsoleNotifier,
        &settings,
    );
    let mut watch = controller.subscribe();

    println!(">>> Mount (user 1)");
    controller.activate(deps![1]).await?;
    render("after mount", &watch.current());
    let state = watch.wait_until(|state| !state.is_busy()).await?;
    render("settled", &state);

    println!("\n>>> Re-render with the same user: no request");
    controller.activate(deps![1]).await?;
    render("same dependencies", &watch.current());

    println!("\n>>> User changes twice in quick succession (2, then 3)");
    let mut first = controller
        .trigger(TriggerOptions::loading().params(vec![json!(2)]))
        .await?;
    let mut second = controller
        .trigger(TriggerOptions::loading().params(vec![json!(3)]))
        .await?;
    second.wait().await;
    render("newest settled", &watch.current());
    first.wait().await;
    render("older settled late", &watch.current());

    println!("\n>>> Missing profile (404)");
    controller
        .trigger(TriggerOptions::loading().params(vec![json!(4)]))
        .await?
        .wait()
        .await;
    render("not found", &watch.current());

    println!("\n>>> Expired session (401)");
    controller
        .trigger(TriggerOptions::silent().params(vec![json!(5)]))
        .await?
        .wait()
        .await;
    render("expired", &watch.current());

    println!("\n>>> Transport failure");
    controller
        .trigger(TriggerOptions::silent().params(vec![json!(9)]))
        .await?
        .wait()
        .await;
    render("transport failure", &watch.current());

    println!("\n>>> Optimistic local edit");
    controller
        .set_data(Profile {
            name: "user-1 (edited)".to_string(),
            followers: 101,
        })
        .await?;
    render("manual data", &watch.current());

    println!("\n>>> Pull to refresh");
    let mut refresh = controller.refetch().await?;
    render("refreshing", &watch.current());
    refresh.wait().await;
    render("refreshed", &watch.current());

    println!("\n>>> Unmount with a request in flight");
    let mut orphan = controller.trigger(TriggerOptions::loading()).await?;
    controller.teardown().await?;
    orphan.wait().await;
    render("after unmount", &controller.state().await);
    if let Err(error) = controller.trigger(TriggerOptions::loading()).await {
        println!("  trigger after unmount rejected: {error}");
    }

    if let Some(rendered) = exporter.render() {
        println!("\n=== Metrics ===\n");
        rendered
            .lines()
            .filter(|line| line.starts_with("fetch_"))
            .for_each(|line| println!("{line}"));
    }

    Ok(())
}
