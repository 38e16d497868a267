// TWatch - Firmware Entry Point
//
// All of the work lives in the library; see `twatch::firmware` for the boot
// sequence.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    twatch::firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("twatch is watch firmware; build it for the ESP32 (espidf) target");
}
