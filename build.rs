fn main() {
    // Build-time configuration is read with `option_env!`; rebuild when it changes.
    for key in [
        "PIN",
        "EDGE",
        "EDGE_MODE",
        "HYSTERESIS_SECS",
        "POLL_INTERVAL_MS",
        "IFTTT_KEY",
        "MAKER_EVENT_NAME",
        "STATUS_PORT",
        "EFFECT_TIMEOUT_MS",
        "STORE_WRITE_ATTEMPTS",
        "WIFI_SSID",
        "WIFI_PASS",
    ] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
