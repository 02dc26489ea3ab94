//! Monitor backoff properties: growth to the cap within four failures, and
//! a single success snapping the interval back to base (property 8).

use std::sync::Arc;
use std::time::Duration;

use printernizer_core::{backoff, FakeClock, PrinterId};
use printernizer_drivers::FakePrinterDriver;
use printernizer_engine::{MonitorSettings, PrinterMonitor};

use crate::prelude::online_update;

fn monitor(driver: &FakePrinterDriver) -> Arc<PrinterMonitor<FakeClock>> {
    PrinterMonitor::new(
        PrinterId::new("p-1"),
        Arc::new(driver.clone()),
        FakeClock::new(),
        MonitorSettings {
            base_interval: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(60),
            deadline: Duration::from_secs(1),
        },
    )
}

#[tokio::test]
async fn any_failure_streak_followed_by_a_success_resets_to_base() {
    for failures in [1u32, 3, 7] {
        let driver = FakePrinterDriver::new(vec![online_update()]);
        let monitor = monitor(&driver);

        for _ in 0..failures {
            driver.fail_status_next();
            monitor.poll_once().await;
        }
        assert!(monitor.current_interval() > Duration::from_secs(5), "after {failures} failures");

        monitor.poll_once().await;
        assert_eq!(monitor.current_interval(), Duration::from_secs(5), "after {failures} failures");
        assert_eq!(monitor.metrics().consecutive_failures, 0);
    }
}

#[tokio::test]
async fn five_second_base_reaches_the_sixty_second_cap_in_four_failures() {
    let driver = FakePrinterDriver::new(vec![online_update()]);
    let monitor = monitor(&driver);

    let mut intervals = Vec::new();
    for _ in 0..5 {
        driver.fail_status_next();
        monitor.poll_once().await;
        intervals.push(monitor.current_interval());
    }

    // 10, 20, 40, 60, 60 — within the +-10% jitter band.
    let jitter_band = |nominal: u64, actual: Duration| {
        let nominal = Duration::from_secs(nominal);
        actual >= nominal.mul_f64(0.9) && actual <= nominal.mul_f64(1.1)
    };
    assert!(jitter_band(10, intervals[0]), "{intervals:?}");
    assert!(jitter_band(20, intervals[1]), "{intervals:?}");
    assert!(jitter_band(40, intervals[2]), "{intervals:?}");
    assert!(jitter_band(60, intervals[3]), "{intervals:?}");
    assert!(jitter_band(60, intervals[4]), "{intervals:?}");
}

#[test]
fn backoff_delays_are_floored_at_half_a_second() {
    let tiny = backoff::next_delay(Duration::from_millis(1), 2.0, Duration::from_secs(60), 0, -1.0);
    assert_eq!(tiny, Duration::from_millis(500));
}

#[tokio::test]
async fn failure_metrics_accumulate_across_recoveries() {
    let driver = FakePrinterDriver::new(vec![online_update()]);
    let monitor = monitor(&driver);

    driver.fail_status_next();
    monitor.poll_once().await;
    monitor.poll_once().await; // recovery
    driver.fail_status_next();
    monitor.poll_once().await;

    let metrics = monitor.metrics();
    assert_eq!(metrics.total_failures, 2);
    assert_eq!(metrics.consecutive_failures, 1);
}
