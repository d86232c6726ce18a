//! Prints the MyAppResource CRD as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/myappresources.yaml`

use crds::MyAppResource;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&MyAppResource::crd())?);
    Ok(())
}
