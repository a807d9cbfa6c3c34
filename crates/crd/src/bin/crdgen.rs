//! Prints the `ScrapeConfig` CRD as YAML generated from the rust types.
//! Writes to `CRDS_DIR/scrapeconfig-crd.yaml` when `CRDS_DIR` is set, to stdout otherwise.
use std::{fs::File, io::Write, path};

use kube::CustomResourceExt;
use scrapeconfig_crd::ScrapeConfig;

#[allow(clippy::unwrap_used)]
fn main() {
    let schema = serde_yaml::to_string(&ScrapeConfig::crd()).unwrap();
    match std::env::var_os("CRDS_DIR") {
        Some(dir) => {
            let crd_path = path::Path::new(&dir).join("scrapeconfig-crd.yaml");
            let mut file = File::create(crd_path).unwrap();
            file.write_all(schema.as_bytes()).unwrap();
        }
        None => print!("{schema}"),
    }
}
