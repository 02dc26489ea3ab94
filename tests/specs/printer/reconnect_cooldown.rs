//! S4: a flapping MQTT broker cannot trigger a reconnect storm — the
//! cooldown since the last attempt gates every new scheduling pass.

use std::time::Duration;

use chrono::{DateTime, Utc};
use printernizer_drivers::bambu::reconnect::{
    ConnectionState, ReconnectDecision, ReconnectPolicy, ReconnectState,
};

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

#[test]
fn flapping_broker_follows_the_s4_timeline() {
    // Connected at T=0 with the default 5s reconnect delay / 10s cooldown.
    let mut state = ReconnectState::new(ReconnectPolicy::default());
    state.on_connecting();
    state.on_connected();
    assert_eq!(state.state(), ConnectionState::Connected);

    // T=1s: broker drops (rc=7). The reconnect schedules for T=6s.
    let decision = state.on_connection_lost(at(1_000));
    assert_eq!(decision, ReconnectDecision::Schedule { delay: Duration::from_secs(5) });
    assert_eq!(state.state(), ConnectionState::Reconnecting);

    // T=6s: the scheduled attempt starts.
    state.on_attempt(at(6_000));

    // T=6.2s: broker drops again before the attempt completes. Only 200ms
    // since the last attempt, so the cooldown suppresses rescheduling.
    let decision = state.on_connection_lost(at(6_200));
    assert_eq!(
        decision,
        ReconnectDecision::CooldownActive { remaining: Duration::from_millis(9_800) }
    );

    // T=16s: the cooldown has elapsed; a new attempt runs.
    state.on_attempt(at(16_000));
    assert_eq!(state.state(), ConnectionState::Connecting);
}

#[test]
fn intentional_disconnect_wins_over_any_pending_reconnect() {
    let mut state = ReconnectState::new(ReconnectPolicy::default());
    state.on_connecting();
    state.on_connected();
    let _ = state.on_connection_lost(at(1_000));

    // disconnect() clears the flag before closing the transport, so the
    // event loop's next error is read as intentional and the loop exits.
    state.begin_disconnect();
    assert_eq!(state.on_connection_lost(at(1_500)), ReconnectDecision::Suppressed);
    state.on_closed();
    assert_eq!(state.state(), ConnectionState::Disconnected);
}

#[test]
fn custom_pacing_comes_from_the_mqtt_settings() {
    let mut state = ReconnectState::new(ReconnectPolicy {
        auto_reconnect_delay: Duration::from_secs(2),
        cooldown: Duration::from_secs(30),
    });
    state.on_connecting();
    state.on_connected();

    assert_eq!(
        state.on_connection_lost(at(0)),
        ReconnectDecision::Schedule { delay: Duration::from_secs(2) }
    );
    state.on_attempt(at(2_000));
    assert_eq!(
        state.on_connection_lost(at(10_000)),
        ReconnectDecision::CooldownActive { remaining: Duration::from_secs(22) }
    );
}
