//! A runtime built from `petal.toml`, backed by link-time registrations.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use petal::core::{BoxError, ContainerError};
use petal::framework::{ProviderContext, ProviderDescriptor, ProviderState, SliceState};
use petal::runtime::{PetalRuntime, RuntimeError};
use petal::{register_component, register_provider};

static INVENTORY_STOPS: AtomicUsize = AtomicUsize::new(0);

#[register_component("Shop::Actions::Checkout")]
#[derive(Default)]
struct Checkout;

#[register_component("Catalog::Products")]
#[derive(Default)]
struct Products;

#[register_component("Catalog::SKULookup")]
#[derive(Default)]
struct SkuLookup;

struct Inventory {
    warehouse: String,
}

fn start_inventory(ctx: &mut ProviderContext) -> Result<(), BoxError> {
    let warehouse = ctx
        .raw_config()
        .get("warehouse")
        .and_then(|w| w.as_str())
        .unwrap_or("default")
        .to_string();
    ctx.register("inventory.stock", Inventory { warehouse })?;
    Ok(())
}

fn stop_inventory(_ctx: &mut ProviderContext) -> Result<(), BoxError> {
    INVENTORY_STOPS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

#[register_provider]
static INVENTORY: ProviderDescriptor = ProviderDescriptor::new("catalog", "inventory")
    .on_start(start_inventory)
    .on_stop(stop_inventory);

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

fn write_config(root: &Path) -> std::path::PathBuf {
    touch(root, "actions/checkout.rs");
    touch(root, "slices/catalog/lib/products.rs");
    touch(root, "slices/catalog/lib/sku_lookup.rs");

    let config = format!(
        r#"
[app]
name = "shop"
root = '{root}'
component_dirs = ["actions"]
memoize = ["actions/"]
imports = [{{ from = "catalog", keys = ["products", "inventory.stock"] }}]

[inflections]
acronyms = ["SKU"]

[slices.catalog]
component_dirs = [{{ path = "lib", namespace = "" }}]
memoize = ["lib/"]
export = ["products", "sku_lookup", "inventory.stock"]

[slices.catalog.providers.inventory]
warehouse = "north"
"#,
        root = root.display()
    );
    let path = root.join("petal.toml");
    fs::write(&path, config).unwrap();
    path
}

fn runtime_in(root: &Path) -> PetalRuntime {
    let path = write_config(root);
    PetalRuntime::builder()
        .config_file(path)
        .without_env()
        .build()
        .unwrap()
}

#[test]
fn test_components_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_in(dir.path());

    let checkout = runtime.resolve("actions.checkout").unwrap();
    assert!(checkout.is::<Checkout>());
    assert!(checkout.ptr_eq(&runtime.resolve("actions.checkout").unwrap()));

    let products = runtime.resolve("catalog.products").unwrap();
    assert!(products.is::<Products>());

    let catalog = runtime.slice("catalog").unwrap();
    assert!(catalog.resolve("sku_lookup").unwrap().is::<SkuLookup>());
}

#[test]
fn test_unimported_keys_stay_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_in(dir.path());

    let err = runtime.resolve("catalog.sku_lookup").unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Container(ref e) if e.is_unknown_key()
    ));
}

#[test]
fn test_provider_config_and_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_in(dir.path());
    let catalog = runtime.slice("catalog").unwrap();

    let stock = runtime
        .application()
        .root()
        .resolve_as::<Inventory>("catalog.inventory.stock")
        .unwrap();
    assert_eq!(stock.warehouse, "north");
    assert_eq!(catalog.provider_state("inventory"), Some(ProviderState::Started));

    let before = INVENTORY_STOPS.load(Ordering::SeqCst);
    runtime.shutdown().unwrap();
    assert!(INVENTORY_STOPS.load(Ordering::SeqCst) > before);
    assert_eq!(catalog.state(), SliceState::ShutDown);

    let err = runtime.resolve("actions.checkout").unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Container(ContainerError::ShutDown { .. })
    ));
}

#[tokio::test]
async fn test_run_until_boots_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_in(dir.path());
    let catalog = runtime.slice("catalog").unwrap();

    runtime
        .run_until(async {
            assert_eq!(catalog.provider_state("inventory"), Some(ProviderState::Started));
        })
        .await
        .unwrap();
    assert!(runtime.application().is_shut_down());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("petal.toml");
    fs::write(
        &path,
        r#"
[slices.admin]
imports = [{ from = "billing" }]
"#,
    )
    .unwrap();

    let err = PetalRuntime::builder()
        .config_file(&path)
        .without_env()
        .build()
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)));
}
