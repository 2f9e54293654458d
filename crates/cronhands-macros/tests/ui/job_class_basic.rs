use cronhands_core::{JobClass, JobContext, DEFAULT_GROUP};
use cronhands_macros::job_class;

#[derive(Default)]
struct Tracker {
    runs: std::sync::atomic::AtomicUsize,
}

#[job_class]
impl Tracker {
    #[job(cron = "0/10 * * * * ?")]
    #[run_now]
    fn track(&self) {
        self.runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    #[job(cron = "0 0 12 * * ?", group = "reports")]
    fn report(&self, ctx: &JobContext) -> anyhow::Result<()> {
        anyhow::ensure!(ctx.parameters().is_empty(), "unexpected parameters");
        Ok(())
    }

    fn helper(&self) -> usize {
        self.runs.load(std::sync::atomic::Ordering::SeqCst)
    }
}

fn main() {
    assert_eq!(Tracker::type_name(), "Tracker");

    let methods = Tracker::job_methods();
    assert_eq!(methods.len(), 2);

    assert_eq!(methods[0].name, "track");
    assert_eq!(methods[0].config.cron_expression, "0/10 * * * * ?");
    assert_eq!(methods[0].config.group, DEFAULT_GROUP);
    assert!(methods[0].config.run_immediately);

    assert_eq!(methods[1].name, "report");
    assert_eq!(methods[1].config.group, "reports");
    assert!(!methods[1].config.run_immediately);

    let tracker = Tracker::construct().unwrap();
    assert_eq!(tracker.helper(), 0);
}
