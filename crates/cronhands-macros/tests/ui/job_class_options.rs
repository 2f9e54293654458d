use cronhands_core::{FireKind, JobClass, JobContext, JobKey};
use cronhands_macros::job_class;

#[derive(Default)]
struct Exporter;

#[job_class]
impl Exporter {
    #[job(
        cron = "0 0 12 * * ? 2099",
        group = "exports",
        param = "Prod",
        param = "v1",
        run_now,
        concurrent = false,
        description = "Nightly export"
    )]
    fn export(&self, ctx: &JobContext) -> Result<(), std::io::Error> {
        match ctx.parameter(0) {
            Some("Prod") => Ok(()),
            _ => Err(std::io::Error::other("missing environment")),
        }
    }
}

fn main() {
    let methods = Exporter::job_methods();
    let config = &methods[0].config;
    assert_eq!(config.cron_expression, "0 0 12 * * ? 2099");
    assert_eq!(config.group, "exports");
    assert_eq!(config.parameters, vec!["Prod", "v1"]);
    assert!(config.run_immediately);
    assert!(!config.allow_concurrent);
    assert_eq!(config.description.as_deref(), Some("Nightly export"));

    let key = JobKey::new("Exporter.export", "exports");
    let ok = JobContext::new(key.clone(), FireKind::Manual, None, vec!["Prod".to_string()].into());
    assert!((methods[0].call)(&Exporter, &ok).is_ok());

    let bad = JobContext::new(key, FireKind::Manual, None, Vec::<String>::new().into());
    let err = (methods[0].call)(&Exporter, &bad).unwrap_err();
    assert_eq!(err.to_string(), "missing environment");
}
