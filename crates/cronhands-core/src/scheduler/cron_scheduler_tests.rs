use super::*;
use std::time::Duration;

const EVERY_SECOND: &str = "* * * * * ?";
const FAR_FUTURE: &str = "0 0 0 1 1 ? 2099";

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Panic,
}

struct TestJob {
    runs: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
    behavior: Behavior,
}

impl TestJob {
    fn new(behavior: Behavior) -> Arc<Self> {
        Self::slow(behavior, Duration::ZERO)
    }

    fn slow(behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay,
            behavior,
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Job for TestJob {
    fn execute(&self, ctx: &JobContext) -> Result<(), JobExecutionError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(JobExecutionError::Failed {
                key: ctx.job_key.clone(),
                message: "bad input".to_string(),
            }),
            Behavior::Panic => panic!("job exploded"),
        }
    }
}

#[derive(Default)]
struct RecordingListener {
    started: AtomicUsize,
    outcomes: Mutex<Vec<(JobKey, Result<(), JobExecutionError>)>>,
}

impl JobListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    fn on_job_started(&self, _ctx: &JobContext) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_job_completed(&self, ctx: &JobContext, result: &Result<(), JobExecutionError>) {
        self.outcomes.lock().push((ctx.job_key.clone(), result.clone()));
    }
}

struct PanickingListener;

impl JobListener for PanickingListener {
    fn name(&self) -> &str {
        "panicking"
    }

    fn on_job_completed(&self, _ctx: &JobContext, _result: &Result<(), JobExecutionError>) {
        panic!("listener exploded");
    }
}

fn key(name: &str) -> JobKey {
    JobKey::new(name, "tests")
}

fn detail(name: &str, job: Arc<TestJob>) -> JobDetail {
    JobDetail::new(key(name), job)
}

fn scheduler() -> CronScheduler {
    CronScheduler::new(CronSchedulerConfig {
        instance_name: "test".to_string(),
        thread_count: 4,
    })
}

#[test]
fn test_parse_cron_quartz_dialect() {
    assert!(parse_cron("0/10 * * * * ?").is_ok());
    assert!(parse_cron("*/10 * * * * ?").is_ok());
    assert!(parse_cron("0 0 12 ? * MON-FRI").is_ok());
    assert!(parse_cron(FAR_FUTURE).is_ok());

    match parse_cron("not a cron") {
        Err(SchedulerError::InvalidCron { expression, .. }) => assert_eq!(expression, "not a cron"),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_config_from_scheduler_section() {
    let section = SchedulerConfig {
        instance_name: "batch".to_string(),
        thread_count: 3,
        wait_for_jobs_on_shutdown: true,
    };
    let config = CronSchedulerConfig::from(&section);
    assert_eq!(config.instance_name, "batch");
    assert_eq!(config.thread_count, 3);
}

#[tokio::test]
async fn test_schedule_and_query() {
    let scheduler = scheduler();
    let job = TestJob::new(Behavior::Succeed);

    let first = scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();
    assert!(first.is_some());

    assert!(scheduler.check_exists(&key("A.run")).await.unwrap());
    assert!(!scheduler.check_exists(&key("B.run")).await.unwrap());
    assert_eq!(scheduler.job_group_names().await.unwrap(), vec!["tests"]);
    assert_eq!(scheduler.job_keys("tests").await.unwrap(), vec![key("A.run")]);
    assert!(scheduler.job_keys("other").await.unwrap().is_empty());

    let triggers = scheduler.triggers_of_job(&key("A.run")).await.unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].key.name, "A.runTrigger");
    assert_eq!(triggers[0].next_fire_time, first);
    assert!(triggers[0].previous_fire_time.is_none());

    let state = scheduler.trigger_state(&triggers[0].key).await.unwrap();
    assert_eq!(state, TriggerState::Normal);
    let missing = TriggerKey::new("nope", "tests");
    assert_eq!(scheduler.trigger_state(&missing).await.unwrap(), TriggerState::Unknown);
    assert!(scheduler.triggers_of_job(&key("B.run")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_key_rejected() {
    let scheduler = scheduler();
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    let result = scheduler
        .schedule_job(detail("A.run", job), Trigger::cron(&key("A.run"), EVERY_SECOND))
        .await;
    assert!(matches!(result, Err(SchedulerError::AlreadyExists(k)) if k == key("A.run")));
    assert_eq!(scheduler.job_count(), 1);
}

#[tokio::test]
async fn test_invalid_and_expired_cron() {
    let scheduler = scheduler();
    let job = TestJob::new(Behavior::Succeed);

    let result = scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), "bogus"))
        .await;
    assert!(matches!(result, Err(SchedulerError::InvalidCron { .. })));

    let result = scheduler
        .schedule_job(detail("A.run", job), Trigger::cron(&key("A.run"), "0 0 0 1 1 ? 2000"))
        .await;
    assert!(matches!(result, Err(SchedulerError::InvalidCron { .. })));
    assert_eq!(scheduler.job_count(), 0);
}

#[tokio::test]
async fn test_trigger_before_start() {
    let scheduler = scheduler();
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(detail("A.run", job), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    let result = scheduler.trigger_job(&key("A.run")).await;
    assert!(matches!(result, Err(SchedulerError::NotStarted)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_manual_fire_notifies_listeners() {
    let scheduler = scheduler();
    let listener = Arc::new(RecordingListener::default());
    scheduler.add_listener(listener.clone());
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(
            detail("A.run", job.clone()).with_data(vec!["x".to_string()].into()),
            Trigger::cron(&key("A.run"), FAR_FUTURE),
        )
        .await
        .unwrap();
    scheduler.start().await.unwrap();

    scheduler.trigger_job(&key("A.run")).await.unwrap();
    scheduler.shutdown(true).await.unwrap();

    assert_eq!(job.runs(), 1);
    assert_eq!(listener.started.load(Ordering::SeqCst), 1);
    let outcomes = listener.outcomes.lock();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, key("A.run"));
    assert!(outcomes[0].1.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_trigger_unknown_job() {
    let scheduler = scheduler();
    scheduler.start().await.unwrap();
    let result = scheduler.trigger_job(&key("Missing.run")).await;
    assert!(matches!(result, Err(SchedulerError::JobNotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cron_fires() {
    let scheduler = scheduler();
    scheduler.start().await.unwrap();
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), EVERY_SECOND))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.shutdown(true).await.unwrap();

    assert!(job.runs() >= 2, "expected at least 2 fires, got {}", job.runs());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_jobs_scheduled_before_start_fire_after_start() {
    let scheduler = scheduler();
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), EVERY_SECOND))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(job.runs(), 0);

    scheduler.start().await.unwrap();
    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    scheduler.shutdown(true).await.unwrap();

    assert!(job.runs() >= 1);
    let triggers = scheduler.inner.jobs.read()[&key("A.run")].info();
    assert!(triggers.previous_fire_time.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pause_and_resume() {
    let scheduler = scheduler();
    scheduler.start().await.unwrap();
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), EVERY_SECOND))
        .await
        .unwrap();
    scheduler.pause_job(&key("A.run")).await.unwrap();

    let trigger = TriggerKey::for_job(&key("A.run"));
    assert_eq!(scheduler.trigger_state(&trigger).await.unwrap(), TriggerState::Paused);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(job.runs(), 0);

    scheduler.resume_job(&key("A.run")).await.unwrap();
    assert_eq!(scheduler.trigger_state(&trigger).await.unwrap(), TriggerState::Normal);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    scheduler.shutdown(true).await.unwrap();
    assert!(job.runs() >= 1);

    let after_shutdown = scheduler.pause_job(&key("A.run")).await;
    assert!(matches!(after_shutdown, Err(SchedulerError::ShutDown)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_non_concurrent_job_blocks() {
    let scheduler = scheduler();
    scheduler.start().await.unwrap();
    let job = TestJob::slow(Behavior::Succeed, Duration::from_millis(300));
    scheduler
        .schedule_job(
            detail("A.run", job.clone()).with_allow_concurrent(false),
            Trigger::cron(&key("A.run"), FAR_FUTURE),
        )
        .await
        .unwrap();

    scheduler.trigger_job(&key("A.run")).await.unwrap();
    let trigger = TriggerKey::for_job(&key("A.run"));
    assert_eq!(scheduler.trigger_state(&trigger).await.unwrap(), TriggerState::Blocked);

    scheduler.trigger_job(&key("A.run")).await.unwrap();
    scheduler.shutdown(true).await.unwrap();

    assert_eq!(job.runs(), 2);
    assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_manual_fires_on_busy_job_run_in_turn() {
    let scheduler = scheduler();
    scheduler.start().await.unwrap();
    let job = TestJob::slow(Behavior::Succeed, Duration::from_millis(200));
    scheduler
        .schedule_job(
            detail("A.run", job.clone()).with_allow_concurrent(false),
            Trigger::cron(&key("A.run"), FAR_FUTURE),
        )
        .await
        .unwrap();

    for _ in 0..3 {
        scheduler.trigger_job(&key("A.run")).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(job.runs(), 0);

    scheduler.shutdown(true).await.unwrap();
    assert_eq!(job.runs(), 3);
    assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_thread_count_bounds_parallelism() {
    let scheduler = CronScheduler::new(CronSchedulerConfig {
        instance_name: "single".to_string(),
        thread_count: 1,
    });
    scheduler.start().await.unwrap();
    let job = TestJob::slow(Behavior::Succeed, Duration::from_millis(100));
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    for _ in 0..3 {
        scheduler.trigger_job(&key("A.run")).await.unwrap();
    }
    scheduler.shutdown(true).await.unwrap();

    assert_eq!(job.runs(), 3);
    assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_reported_to_listener() {
    let scheduler = scheduler();
    let listener = Arc::new(RecordingListener::default());
    scheduler.add_listener(listener.clone());
    scheduler.start().await.unwrap();
    let job = TestJob::new(Behavior::Fail);
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    scheduler.trigger_job(&key("A.run")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let trigger = TriggerKey::for_job(&key("A.run"));
    assert_eq!(scheduler.trigger_state(&trigger).await.unwrap(), TriggerState::Normal);
    scheduler.shutdown(true).await.unwrap();

    let outcomes = listener.outcomes.lock();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(&outcomes[0].1, Err(JobExecutionError::Failed { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_job_marks_trigger_error() {
    let scheduler = scheduler();
    let listener = Arc::new(RecordingListener::default());
    scheduler.add_listener(listener.clone());
    scheduler.start().await.unwrap();
    let job = TestJob::new(Behavior::Panic);
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    scheduler.trigger_job(&key("A.run")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let trigger = TriggerKey::for_job(&key("A.run"));
    assert_eq!(scheduler.trigger_state(&trigger).await.unwrap(), TriggerState::Error);

    {
        let outcomes = listener.outcomes.lock();
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0].1 {
            Err(JobExecutionError::Worker { message, .. }) => assert_eq!(message, "job exploded"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    scheduler.shutdown(true).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_listener_is_contained() {
    let scheduler = scheduler();
    let recording = Arc::new(RecordingListener::default());
    scheduler.add_listener(Arc::new(PanickingListener));
    scheduler.add_listener(recording.clone());
    scheduler.start().await.unwrap();
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    scheduler.trigger_job(&key("A.run")).await.unwrap();
    scheduler.shutdown(true).await.unwrap();

    assert_eq!(job.runs(), 1);
    assert_eq!(recording.outcomes.lock().len(), 1);
    let state = scheduler.inner.jobs.read()[&key("A.run")].state();
    assert_eq!(state, TriggerState::Normal);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_waits_for_running_jobs() {
    let scheduler = scheduler();
    scheduler.start().await.unwrap();
    let job = TestJob::slow(Behavior::Succeed, Duration::from_millis(300));
    scheduler
        .schedule_job(detail("A.run", job.clone()), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    scheduler.trigger_job(&key("A.run")).await.unwrap();
    assert_eq!(scheduler.running_count(), 1);
    scheduler.shutdown(true).await.unwrap();

    assert_eq!(job.runs(), 1);
    assert_eq!(scheduler.running_count(), 0);
}

#[tokio::test]
async fn test_operations_after_shutdown() {
    let scheduler = scheduler();
    scheduler.start().await.unwrap();
    scheduler.shutdown(true).await.unwrap();
    scheduler.shutdown(true).await.unwrap();

    assert!(scheduler.is_started());
    assert!(scheduler.is_shutdown());
    assert!(matches!(scheduler.start().await, Err(SchedulerError::ShutDown)));
    assert!(matches!(
        scheduler.check_exists(&key("A.run")).await,
        Err(SchedulerError::ShutDown)
    ));
    assert!(matches!(
        scheduler.job_group_names().await,
        Err(SchedulerError::ShutDown)
    ));

    let job = TestJob::new(Behavior::Succeed);
    let result = scheduler
        .schedule_job(detail("A.run", job), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await;
    assert!(matches!(result, Err(SchedulerError::ShutDown)));
}

#[tokio::test]
async fn test_unschedule() {
    let scheduler = scheduler();
    let job = TestJob::new(Behavior::Succeed);
    scheduler
        .schedule_job(detail("A.run", job), Trigger::cron(&key("A.run"), FAR_FUTURE))
        .await
        .unwrap();

    assert!(scheduler.unschedule_job(&key("A.run")).await.unwrap());
    assert!(!scheduler.unschedule_job(&key("A.run")).await.unwrap());
    assert!(!scheduler.check_exists(&key("A.run")).await.unwrap());
    assert!(scheduler.job_group_names().await.unwrap().is_empty());
}
