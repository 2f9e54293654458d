use cronhands_core::JobClass;
use cronhands_macros::job_class;

struct Warehouse {
    url: String,
}

impl Warehouse {
    fn connect() -> Result<Self, String> {
        Ok(Self {
            url: "postgres://localhost/warehouse".to_string(),
        })
    }
}

#[job_class(constructor = "Warehouse::connect")]
impl Warehouse {
    #[job(cron = "0 0 3 * * ?")]
    fn vacuum(&self) {
        let _ = &self.url;
    }
}

struct Offline;

impl Offline {
    fn open() -> Result<Self, std::io::Error> {
        Err(std::io::Error::other("no network"))
    }
}

#[job_class(constructor = "Offline::open")]
impl Offline {
    #[job(cron = "0 0 3 * * ?")]
    fn sync(&self) {}
}

fn main() {
    let warehouse = Warehouse::construct().unwrap();
    assert_eq!(warehouse.url, "postgres://localhost/warehouse");

    let err = Offline::construct().err().unwrap();
    assert_eq!(err.message(), "no network");
}
