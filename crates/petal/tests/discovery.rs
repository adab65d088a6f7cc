//! Link-time registration through `#[register_component]` and
//! `#[register_provider]`.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use petal::core::{BoxError, COMPONENT_REGISTRY, ConstructorLoader};
use petal::framework::{
    Application, ComponentDir, PROVIDER_REGISTRY, ProviderContext, ProviderDescriptor,
    ProviderState, SliceConfig,
};
use petal::{register_component, register_provider};

static TICKS: AtomicUsize = AtomicUsize::new(0);
static CLOCK_STOPPED: AtomicBool = AtomicBool::new(false);

#[register_component("Main::Actions::Greet")]
#[derive(Default)]
struct Greet;

struct Tick(usize);

#[register_component("Main::Jobs::Tick")]
fn tick() -> Tick {
    Tick(TICKS.fetch_add(1, Ordering::SeqCst))
}

#[register_component("Reports::Summary")]
fn summary() -> petal::core::Component {
    petal::core::Component::new(String::from("weekly"))
}

fn start_clock(ctx: &mut ProviderContext) -> Result<(), BoxError> {
    ctx.register("clock.epoch", 1_700_000_000u64)?;
    Ok(())
}

fn stop_clock(_ctx: &mut ProviderContext) -> Result<(), BoxError> {
    CLOCK_STOPPED.store(true, Ordering::SeqCst);
    Ok(())
}

#[register_provider]
static CLOCK: ProviderDescriptor = ProviderDescriptor::new("main", "clock")
    .on_start(start_clock)
    .on_stop(stop_clock);

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

fn app_in(root: &Path) -> Application {
    touch(root, "actions/greet.rs");
    touch(root, "jobs/tick.rs");
    let config = SliceConfig::builder()
        .root(root)
        .component_dirs([ComponentDir::new("actions"), ComponentDir::new("jobs")])
        .memoize(["actions/"])
        .build()
        .unwrap();
    Application::builder("main").config(config).build().unwrap()
}

#[test]
fn test_registries_are_populated() {
    let paths: Vec<_> = COMPONENT_REGISTRY.iter().map(|c| c.constant_path).collect();
    assert!(paths.contains(&"Main::Actions::Greet"));
    assert!(paths.contains(&"Main::Jobs::Tick"));
    assert!(PROVIDER_REGISTRY.iter().any(|p| p.slice == "main" && p.name == "clock"));

    let loader = ConstructorLoader::discovered();
    assert!(loader.contains("Reports::Summary"));
}

#[test]
fn test_discovered_constructors_back_auto_registration() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(dir.path());

    let first = app.resolve("actions.greet").unwrap();
    let second = app.resolve("actions.greet").unwrap();
    assert!(first.is::<Greet>());
    assert!(first.ptr_eq(&second));

    let a = app.root().resolve_as::<Tick>("jobs.tick").unwrap();
    let b = app.root().resolve_as::<Tick>("jobs.tick").unwrap();
    assert_ne!(a.0, b.0);
}

#[test]
fn test_discovered_provider_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(dir.path());

    assert_eq!(*app.root().resolve_as::<u64>("clock.epoch").unwrap(), 1_700_000_000);
    assert_eq!(app.root().provider_state("clock"), Some(ProviderState::Started));

    app.shutdown().unwrap();
    assert!(CLOCK_STOPPED.load(Ordering::SeqCst));
}
