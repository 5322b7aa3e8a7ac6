fn main() {
    println!("cargo:rerun-if-env-changed=TEMPNODE_BROKER_HOST");

    // Only device builds need the ESP-IDF environment exported.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
