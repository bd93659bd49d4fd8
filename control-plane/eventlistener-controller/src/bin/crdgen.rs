use eventlistener_controller::crd::EventListener;
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = EventListener::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    println!("{}", yaml);
    Ok(())
}
