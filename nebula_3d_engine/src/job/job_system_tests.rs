use super::*;
use std::sync::atomic::AtomicU32;
use std::thread;
use std::time::Instant;

// ============================================================================
// Helpers
// ============================================================================

/// Payload whose drop count is observable, to verify exactly-once ownership
struct CountedPayload {
    drops: Arc<AtomicU32>,
}

impl Drop for CountedPayload {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn counted_payload() -> (CountedPayload, Arc<AtomicU32>) {
    let drops = Arc::new(AtomicU32::new(0));
    (
        CountedPayload {
            drops: drops.clone(),
        },
        drops,
    )
}

/// Pump `update()` until `predicate` holds or a 2-second deadline passes
fn pump_until(jobs: &mut JobSystem, predicate: impl Fn() -> bool) {
    let deadline = Instant::now() + std::time::Duration::from_secs(2);
    while !predicate() {
        jobs.update();
        if Instant::now() > deadline {
            panic!("job system did not reach the expected state in time");
        }
        thread::sleep(std::time::Duration::from_millis(2));
    }
}

// ============================================================================
// Inline mode tests
// ============================================================================

#[test]
fn test_inline_failure_routes_to_on_failure_exactly_once() {
    let mut jobs = JobSystem::new(JobSystemConfig::default()).unwrap();
    assert!(jobs.is_inline());

    let successes = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(AtomicU32::new(0));
    let (payload, drops) = counted_payload();

    let s = successes.clone();
    let f = failures.clone();
    jobs.submit(Job::new(
        JobTypeFlags::GENERAL,
        JobPriority::Normal,
        payload,
        |_, _| false,
        Some(Box::new(move |_p| {
            s.fetch_add(1, Ordering::SeqCst);
        })),
        Some(Box::new(move |_p| {
            f.fetch_add(1, Ordering::SeqCst);
        })),
    ))
    .unwrap();

    assert_eq!(successes.load(Ordering::SeqCst), 0);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_inline_success_runs_callback_immediately() {
    let mut jobs = JobSystem::new(JobSystemConfig::default()).unwrap();

    let successes = Arc::new(AtomicU32::new(0));
    let s = successes.clone();
    jobs.submit(Job::new(
        JobTypeFlags::GENERAL,
        JobPriority::High,
        42u32,
        |_, value| {
            *value += 1;
            true
        },
        Some(Box::new(move |value| {
            assert_eq!(value, 43);
            s.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    ))
    .unwrap();

    assert_eq!(successes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_inline_missing_callback_still_drops_payload_once() {
    let mut jobs = JobSystem::new(JobSystemConfig::default()).unwrap();
    let (payload, drops) = counted_payload();

    jobs.submit(Job::new(
        JobTypeFlags::GENERAL,
        JobPriority::Normal,
        payload,
        |_, _| true,
        None,
        None,
    ))
    .unwrap();

    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Multi-threaded mode tests
// ============================================================================

#[test]
fn test_completions_run_only_inside_update_on_calling_thread() {
    let mut jobs = JobSystem::new(JobSystemConfig::with_threads(2)).unwrap();
    assert!(!jobs.is_inline());

    let main_thread = thread::current().id();
    let completed = Arc::new(AtomicU32::new(0));
    let c = completed.clone();

    jobs.submit(Job::new(
        JobTypeFlags::RESOURCE_LOAD,
        JobPriority::Normal,
        (),
        |_, _| true,
        Some(Box::new(move |_| {
            assert_eq!(
                thread::current().id(),
                main_thread,
                "completion ran off the update thread"
            );
            c.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    ))
    .unwrap();

    pump_until(&mut jobs, || completed.load(Ordering::SeqCst) == 1);
}

#[test]
fn test_entry_runs_on_worker_thread() {
    let mut jobs = JobSystem::new(JobSystemConfig::with_threads(1)).unwrap();

    let main_thread = thread::current().id();
    let checked = Arc::new(AtomicU32::new(0));
    let c = checked.clone();

    jobs.submit(Job::new(
        JobTypeFlags::GENERAL,
        JobPriority::Normal,
        (),
        move |_, _| thread::current().id() != main_thread,
        Some(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })),
        Some(Box::new(|_| {
            panic!("entry reported running on the main thread");
        })),
    ))
    .unwrap();

    pump_until(&mut jobs, || checked.load(Ordering::SeqCst) == 1);
}

#[test]
fn test_unmatchable_type_flags_rejected() {
    // No worker carries GPU_RESOURCE in this layout
    let config = JobSystemConfig {
        thread_count: 1,
        type_masks: vec![JobTypeFlags::GENERAL],
    };
    let mut jobs = JobSystem::new(config).unwrap();

    let result = jobs.submit(Job::new(
        JobTypeFlags::GPU_RESOURCE,
        JobPriority::Normal,
        (),
        |_, _| true,
        None,
        None,
    ));
    assert!(result.is_err());
}

#[test]
fn test_many_jobs_all_complete_exactly_once() {
    let mut jobs = JobSystem::new(JobSystemConfig::with_threads(3)).unwrap();

    let completed = Arc::new(AtomicU32::new(0));
    let drop_counters: Vec<Arc<AtomicU32>> = (0..20)
        .map(|i| {
            let (payload, drops) = counted_payload();
            let c = completed.clone();
            let priority = match i % 3 {
                0 => JobPriority::High,
                1 => JobPriority::Normal,
                _ => JobPriority::Low,
            };
            jobs.submit(Job::new(
                JobTypeFlags::RESOURCE_LOAD,
                priority,
                payload,
                |_, _| true,
                Some(Box::new(move |_p| {
                    c.fetch_add(1, Ordering::SeqCst);
                })),
                None,
            ))
            .unwrap();
            drops
        })
        .collect();

    pump_until(&mut jobs, || completed.load(Ordering::SeqCst) == 20);
    assert_eq!(jobs.queued_job_count(), 0);
    for drops in drop_counters {
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_failure_entry_routes_to_on_failure() {
    let mut jobs = JobSystem::new(JobSystemConfig::with_threads(1)).unwrap();

    let failures = Arc::new(AtomicU32::new(0));
    let f = failures.clone();
    jobs.submit(Job::new(
        JobTypeFlags::GENERAL,
        JobPriority::Normal,
        (),
        |_, _| false,
        Some(Box::new(|_| panic!("on_success must not run"))),
        Some(Box::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        })),
    ))
    .unwrap();

    pump_until(&mut jobs, || failures.load(Ordering::SeqCst) == 1);
}

#[test]
fn test_shutdown_joins_workers() {
    let jobs = JobSystem::new(JobSystemConfig::with_threads(2)).unwrap();
    // Dropping must not hang or panic
    drop(jobs);
}
