//! S6: notification fan-out isolation — a hanging channel records a
//! timeout failure without delaying a fast channel or later events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use printernizer_core::notification::{ChannelType, DeliveryStatus, NotificationChannel};
use printernizer_core::{ChannelId, Event, FakeClock, JobId, PrinterId};
use printernizer_drivers::notify::{FakeNotifyAdapter, NotifyAdapter, NotifyError};
use printernizer_engine::{AdapterFactory, DispatcherSettings, EventBus, NotificationDispatcher};
use printernizer_storage::{InMemoryNotificationRepository, NotificationRepository};

struct ScriptedFactory {
    adapters: Mutex<HashMap<ChannelId, Arc<dyn NotifyAdapter>>>,
}

impl AdapterFactory for ScriptedFactory {
    fn adapter_for(&self, channel: &NotificationChannel) -> Arc<dyn NotifyAdapter> {
        self.adapters
            .lock()
            .get(&channel.id)
            .cloned()
            .unwrap_or_else(|| Arc::new(FakeNotifyAdapter::new()))
    }
}

struct HangingAdapter;

#[async_trait]
impl NotifyAdapter for HangingAdapter {
    async fn send(&self, _event_type: &str, _payload: &serde_json::Value) -> Result<(), NotifyError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

async fn channel(
    repo: &InMemoryNotificationRepository,
    id: &str,
    channel_type: ChannelType,
    topic: Option<&str>,
) -> ChannelId {
    let channel_id = ChannelId::new(id);
    let mut channel = NotificationChannel::new(
        channel_id.clone(),
        id,
        channel_type,
        "https://hooks.example/endpoint",
        topic.map(Into::into),
    )
    .unwrap();
    channel.subscriptions = ["job_completed".to_string()].into_iter().collect();
    repo.create_channel(channel).await.unwrap();
    channel_id
}

fn completed(job: &str) -> Event {
    Event::JobCompleted {
        job_id: JobId::new(job),
        printer_id: PrinterId::new("p-1"),
        status: printernizer_core::job::JobStatus::Completed,
        timestamp: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn hanging_ntfy_channel_does_not_delay_discord_or_later_events() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    let discord_id = channel(&repo, "discord", ChannelType::Discord, None).await;
    let ntfy_id = channel(&repo, "ntfy", ChannelType::Ntfy, Some("prints")).await;

    let fast = FakeNotifyAdapter::new();
    let factory = ScriptedFactory {
        adapters: Mutex::new(HashMap::new()),
    };
    factory.adapters.lock().insert(discord_id.clone(), Arc::new(fast.clone()));
    factory.adapters.lock().insert(ntfy_id.clone(), Arc::new(HangingAdapter));

    let dispatcher = NotificationDispatcher::new(
        Arc::clone(&repo) as Arc<dyn NotificationRepository>,
        Arc::new(factory),
        FakeClock::new(),
        DispatcherSettings {
            send_timeout: Duration::from_millis(100),
            retention_days: 30,
        },
    );

    // Wire through the bus the way the daemon does.
    let bus = EventBus::new();
    Arc::clone(&dispatcher).register(&bus);

    bus.emit(completed("job-1"));
    bus.emit(completed("job-2"));

    // The fast channel receives both events while the hanging one is still
    // inside its first send.
    for _ in 0..10_000 {
        if fast.calls().len() == 2 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(fast.calls().len(), 2);

    // Once the timeout lapses, both outcomes are in history: Discord sent,
    // ntfy failed with a timeout message.
    assert!(dispatcher.drain(Duration::from_secs(5)).await);
    let discord_history = repo.history(Some(&discord_id), 10, 0).await.unwrap();
    assert_eq!(discord_history.len(), 2);
    assert!(discord_history.iter().all(|e| e.status == DeliveryStatus::Sent));

    let ntfy_history = repo.history(Some(&ntfy_id), 10, 0).await.unwrap();
    assert_eq!(ntfy_history.len(), 2);
    assert!(ntfy_history.iter().all(|e| e.status == DeliveryStatus::Failed));
    assert!(ntfy_history[0].error.as_deref().unwrap().contains("timed out"));

    bus.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn ntfy_channels_require_a_topic() {
    let err = NotificationChannel::new(
        ChannelId::new("bad"),
        "bad",
        ChannelType::Ntfy,
        "https://ntfy.sh",
        None,
    )
    .unwrap_err();
    assert!(err.to_string().contains("topic"));
}
