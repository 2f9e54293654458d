use cronhands_core::{Discovery, JobCatalog, JobClass};
use cronhands_macros::job_class;

mod billing {
    use cronhands_macros::job_class;

    #[derive(Default)]
    pub struct Invoices;

    #[job_class]
    impl Invoices {
        #[job(cron = "0 0 1 * * ?")]
        fn issue(&self) {}
    }
}

#[derive(Default)]
struct Audit;

#[job_class(namespace = "ops::audit")]
impl Audit {
    #[job(cron = "0 * * * * ?")]
    fn sweep(&self) {}
}

fn main() {
    assert!(billing::Invoices::namespace().ends_with("::billing"));
    assert_eq!(Audit::namespace(), "ops::audit");

    let catalog = JobCatalog::new();
    catalog.add::<Audit>().add::<billing::Invoices>();

    let descriptors = catalog.discover("ops");
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].job_key().name, "Audit.sweep");
}
