use petstore_probe::logging::init_tracing;

#[test]
fn init_installs_the_global_subscriber() {
    assert!(!tracing::dispatcher::has_been_set());

    init_tracing(true);

    assert!(tracing::dispatcher::has_been_set());
}
